//! The interactive rendering surface seam.
//!
//! A surface is a disposable projection of the document: it holds renderable
//! objects, a background slot and the user's active selection, and reports
//! manipulation through [`SurfaceEvent`]s. The reconciler is its only writer.

use crate::{BackgroundPlacement, ElementId, PixelSize, RasterImage};

/// Handle to an object placed on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u64);

/// Type-specific visual content of a surface object.
#[derive(Debug, Clone, PartialEq)]
pub enum Renderable {
    /// Styled text box.
    Text {
        /// Resolved text.
        text: String,
        /// Font size in pixels.
        font_size: f64,
        /// Fill color.
        color: String,
        /// Font weight.
        font_weight: String,
        /// Font family list.
        font_family: String,
        /// Horizontal alignment.
        align: String,
    },
    /// Raster image, optionally clipped to a centred circle.
    Image {
        /// Decoded pixels.
        image: RasterImage,
        /// Circular clip radius in intrinsic pixels.
        clip_radius: Option<f64>,
    },
    /// Filled rounded rectangle.
    Rect {
        /// Fill color.
        fill: String,
        /// Corner radius.
        radius: f64,
    },
}

/// A renderable object with its geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceObject {
    /// Originating element; identification only.
    pub element_id: Option<ElementId>,
    /// Document order of the originating element, used for stacking.
    pub z_order: usize,
    /// Left position.
    pub left: f64,
    /// Top position.
    pub top: f64,
    /// Intrinsic width.
    pub width: f64,
    /// Intrinsic height.
    pub height: f64,
    /// Horizontal scale factor.
    pub scale_x: f64,
    /// Vertical scale factor.
    pub scale_y: f64,
    /// Rotation in degrees.
    pub angle: f64,
    /// Opacity.
    pub opacity: f64,
    /// Visual content.
    pub content: Renderable,
}

impl SurfaceObject {
    /// Rendered width (intrinsic width times scale).
    #[must_use]
    pub fn effective_width(&self) -> f64 {
        self.width * self.scale_x
    }

    /// Rendered height (intrinsic height times scale).
    #[must_use]
    pub fn effective_height(&self) -> f64 {
        self.height * self.scale_y
    }
}

/// Background image placed on a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceBackground {
    /// Decoded pixels.
    pub image: RasterImage,
    /// Scale, offset and rendering attributes.
    pub placement: BackgroundPlacement,
}

/// Manipulation and selection events reported by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// An object is being dragged.
    ObjectMoving(ObjectHandle),
    /// An object is being resized.
    ObjectScaling(ObjectHandle),
    /// An object is being rotated.
    ObjectRotating(ObjectHandle),
    /// A manipulation was committed.
    ObjectModified(ObjectHandle),
    /// A selection was made.
    SelectionCreated,
    /// The selection changed.
    SelectionUpdated,
    /// The selection was cleared.
    SelectionCleared,
}

/// Interactive 2D surface collaborator.
pub trait RenderSurface {
    /// Current canvas size.
    fn size(&self) -> PixelSize;

    /// Resize the canvas.
    fn resize(&mut self, size: PixelSize);

    /// Insert an object at `index` in stacking order (0 is bottom-most).
    fn insert(&mut self, index: usize, object: SurfaceObject) -> ObjectHandle;

    /// Remove an object. Returns whether it existed.
    fn remove(&mut self, handle: ObjectHandle) -> bool;

    /// Handles of all objects, bottom-most first.
    fn objects(&self) -> Vec<ObjectHandle>;

    /// Look up an object.
    fn get(&self, handle: ObjectHandle) -> Option<&SurfaceObject>;

    /// Look up an object mutably.
    fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut SurfaceObject>;

    /// Replace the background; `None` renders the blank default color.
    fn set_background(&mut self, background: Option<SurfaceBackground>);

    /// Handles in the user's active selection.
    fn active_selection(&self) -> Vec<ObjectHandle>;

    /// Schedule a repaint.
    fn request_render(&mut self);

    /// Raster export of the current card, if the surface can produce one.
    fn snapshot(&self) -> Option<RasterImage> {
        None
    }

    /// Release all resources. The surface is never used afterwards.
    fn dispose(&mut self);

    /// Append an object on top.
    fn add(&mut self, object: SurfaceObject) -> ObjectHandle {
        let top = self.objects().len();
        self.insert(top, object)
    }
}

/// Headless retained-mode surface.
///
/// Keeps objects in memory and applies manipulation directly, returning the
/// event an interactive surface would emit.
#[derive(Debug, Default)]
pub struct SceneSurface {
    size: Option<PixelSize>,
    objects: Vec<(ObjectHandle, SurfaceObject)>,
    background: Option<SurfaceBackground>,
    selection: Vec<ObjectHandle>,
    next_handle: u64,
    renders: u64,
    disposed: bool,
}

impl SceneSurface {
    /// Create a surface of the given size.
    #[must_use]
    pub fn new(size: PixelSize) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }

    /// Current background.
    #[must_use]
    pub fn background(&self) -> Option<&SurfaceBackground> {
        self.background.as_ref()
    }

    /// Number of repaints requested so far.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    /// Whether [`RenderSurface::dispose`] has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Find the object materialized for an element.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<ObjectHandle> {
        self.objects
            .iter()
            .find(|(_, o)| o.element_id.as_ref().is_some_and(|e| e.as_str() == id))
            .map(|(h, _)| *h)
    }

    /// Drag an object to a raw pointer position.
    pub fn drag_to(&mut self, handle: ObjectHandle, left: f64, top: f64) -> SurfaceEvent {
        if let Some(object) = self.get_mut(handle) {
            object.left = left;
            object.top = top;
        }
        SurfaceEvent::ObjectMoving(handle)
    }

    /// Resize an object by setting its scale factors.
    pub fn scale_to(&mut self, handle: ObjectHandle, scale_x: f64, scale_y: f64) -> SurfaceEvent {
        if let Some(object) = self.get_mut(handle) {
            object.scale_x = scale_x;
            object.scale_y = scale_y;
        }
        SurfaceEvent::ObjectScaling(handle)
    }

    /// Rotate an object to an absolute angle in degrees.
    pub fn rotate_to(&mut self, handle: ObjectHandle, angle: f64) -> SurfaceEvent {
        if let Some(object) = self.get_mut(handle) {
            object.angle = angle;
        }
        SurfaceEvent::ObjectRotating(handle)
    }

    /// Replace the active selection.
    pub fn select(&mut self, handles: &[ObjectHandle]) -> SurfaceEvent {
        let created = self.selection.is_empty();
        self.selection = handles
            .iter()
            .copied()
            .filter(|h| self.objects.iter().any(|(oh, _)| oh == h))
            .collect();
        if self.selection.is_empty() {
            SurfaceEvent::SelectionCleared
        } else if created {
            SurfaceEvent::SelectionCreated
        } else {
            SurfaceEvent::SelectionUpdated
        }
    }

    /// Clear the active selection.
    pub fn clear_selection(&mut self) -> SurfaceEvent {
        self.selection.clear();
        SurfaceEvent::SelectionCleared
    }
}

impl RenderSurface for SceneSurface {
    fn size(&self) -> PixelSize {
        self.size.unwrap_or(PixelSize::new(0, 0))
    }

    fn resize(&mut self, size: PixelSize) {
        self.size = Some(size);
    }

    fn insert(&mut self, index: usize, object: SurfaceObject) -> ObjectHandle {
        self.next_handle += 1;
        let handle = ObjectHandle(self.next_handle);
        let index = index.min(self.objects.len());
        self.objects.insert(index, (handle, object));
        handle
    }

    fn remove(&mut self, handle: ObjectHandle) -> bool {
        self.selection.retain(|h| *h != handle);
        let before = self.objects.len();
        self.objects.retain(|(h, _)| *h != handle);
        self.objects.len() != before
    }

    fn objects(&self) -> Vec<ObjectHandle> {
        self.objects.iter().map(|(h, _)| *h).collect()
    }

    fn get(&self, handle: ObjectHandle) -> Option<&SurfaceObject> {
        self.objects
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, o)| o)
    }

    fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut SurfaceObject> {
        self.objects
            .iter_mut()
            .find(|(h, _)| *h == handle)
            .map(|(_, o)| o)
    }

    fn set_background(&mut self, background: Option<SurfaceBackground>) {
        self.background = background;
    }

    fn active_selection(&self) -> Vec<ObjectHandle> {
        self.selection.clone()
    }

    fn request_render(&mut self) {
        self.renders += 1;
    }

    fn dispose(&mut self) {
        self.objects.clear();
        self.selection.clear();
        self.background = None;
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(id: &str, z_order: usize) -> SurfaceObject {
        SurfaceObject {
            element_id: Some(ElementId::new(id)),
            z_order,
            left: 0.0,
            top: 0.0,
            width: 10.0,
            height: 10.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            opacity: 1.0,
            content: Renderable::Rect {
                fill: "#000".to_string(),
                radius: 0.0,
            },
        }
    }

    #[test]
    fn test_insert_respects_index() {
        let mut surface = SceneSurface::new(PixelSize::new(100, 100));
        let a = surface.add(rect("a", 0));
        let c = surface.add(rect("c", 2));
        let b = surface.insert(1, rect("b", 1));
        assert_eq!(surface.objects(), vec![a, b, c]);
    }

    #[test]
    fn test_remove_drops_from_selection() {
        let mut surface = SceneSurface::new(PixelSize::new(100, 100));
        let a = surface.add(rect("a", 0));
        assert_eq!(surface.select(&[a]), SurfaceEvent::SelectionCreated);
        assert!(surface.remove(a));
        assert!(surface.active_selection().is_empty());
        assert!(!surface.remove(a));
    }

    #[test]
    fn test_select_events() {
        let mut surface = SceneSurface::new(PixelSize::new(100, 100));
        let a = surface.add(rect("a", 0));
        let b = surface.add(rect("b", 1));
        assert_eq!(surface.select(&[a]), SurfaceEvent::SelectionCreated);
        assert_eq!(surface.select(&[a, b]), SurfaceEvent::SelectionUpdated);
        assert_eq!(surface.select(&[]), SurfaceEvent::SelectionCleared);
    }

    #[test]
    fn test_effective_size() {
        let mut object = rect("a", 0);
        object.scale_x = 2.0;
        object.scale_y = 0.5;
        assert!((object.effective_width() - 20.0).abs() < f64::EPSILON);
        assert!((object.effective_height() - 5.0).abs() < f64::EPSILON);
    }
}
