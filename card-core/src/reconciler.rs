//! Canvas reconciler: two-way sync between the document and a rendering surface.
//!
//! ```text
//!   uninitialized ──mount──▶ ready ──dispose──▶ disposed
//!                              │
//!        materialize / apply_background ──▶ AssetRequest ──▶ AssetLoader
//!                              ▲                                 │
//!                              └──────────── complete ◀──────────┘
//! ```
//!
//! Elements are rebuilt statelessly on every pass. Asynchronous completions
//! are checked against the pass that issued them and against the ready
//! lifetime, so a stale or late result never reaches a rebuilt or released
//! surface.

use futures::stream::{FuturesUnordered, StreamExt};

use crate::asset::{AssetRequest, AssetSource, AssetTarget, CancelFlag, LoadToken, PendingElement};
use crate::surface::{Renderable, RenderSurface, SurfaceBackground, SurfaceEvent, SurfaceObject};
use crate::{
    resolve_text, AssetLoader, Background, CardError, CardResult, Clip, DataRecord, Element,
    ElementId, ElementKind, GeometryUpdate, PixelSize, RasterImage,
};

/// Default snap grid unit in pixels.
pub const DEFAULT_GRID_PX: f64 = 10.0;

const TEXT_WIDTH: f64 = 200.0;
const TEXT_LINE_HEIGHT: f64 = 1.16;
const RECT_WIDTH: f64 = 120.0;
const RECT_HEIGHT: f64 = 60.0;
const QR_SIZE: f64 = 120.0;
const QR_PLACEHOLDER: &str = "QR";
const CLIP_WIDTH: f64 = 120.0;

/// Lifecycle of a reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    /// No surface yet.
    Uninitialized,
    /// Surface constructed and owned.
    Ready,
    /// Surface released; terminal.
    Disposed,
}

/// Outcome of delivering an asset load result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The asset was placed on the surface.
    Applied,
    /// The request was stale or the surface is gone; nothing was touched.
    Discarded,
    /// The load failed; the element or background stays unrendered.
    Failed,
}

/// What a surface event produced for the rest of the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// Geometry of every materialized element, to merge into the document.
    Geometry(Vec<GeometryUpdate>),
    /// Element ids of the active selection.
    Selection(Vec<ElementId>),
}

/// Bridges the document model and one exclusively owned rendering surface.
#[derive(Debug)]
pub struct Reconciler<S: RenderSurface> {
    state: ReconcilerState,
    surface: Option<S>,
    grid: f64,
    element_generation: u64,
    background_generation: u64,
    cancel: CancelFlag,
}

impl<S: RenderSurface> Default for Reconciler<S> {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_PX)
    }
}

impl<S: RenderSurface> Reconciler<S> {
    /// Create an uninitialized reconciler snapping drags to `grid` pixels.
    #[must_use]
    pub fn new(grid: f64) -> Self {
        Self {
            state: ReconcilerState::Uninitialized,
            surface: None,
            grid,
            element_generation: 0,
            background_generation: 0,
            cancel: CancelFlag::new(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ReconcilerState {
        self.state
    }

    /// Snap grid unit.
    #[must_use]
    pub fn grid(&self) -> f64 {
        self.grid
    }

    /// Construct the surface at the document's pixel size.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::InvalidOperation`] unless the reconciler is uninitialized.
    pub fn mount(&mut self, size: PixelSize, create: impl FnOnce(PixelSize) -> S) -> CardResult<()> {
        if self.state != ReconcilerState::Uninitialized {
            return Err(CardError::InvalidOperation(format!(
                "cannot mount a reconciler in state {:?}",
                self.state
            )));
        }
        self.surface = Some(create(size));
        self.state = ReconcilerState::Ready;
        tracing::debug!("Reconciler ready at {}x{}", size.width, size.height);
        Ok(())
    }

    /// The surface, while ready.
    #[must_use]
    pub fn surface(&self) -> Option<&S> {
        match self.state {
            ReconcilerState::Ready => self.surface.as_ref(),
            _ => None,
        }
    }

    /// Mutable surface access for the host's input layer.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::SurfaceUnavailable`] unless ready.
    pub fn surface_mut(&mut self) -> CardResult<&mut S> {
        match self.state {
            ReconcilerState::Ready => self.surface.as_mut().ok_or(CardError::SurfaceUnavailable),
            _ => Err(CardError::SurfaceUnavailable),
        }
    }

    /// Resize the surface after a card size change.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::SurfaceUnavailable`] unless ready.
    pub fn resize(&mut self, size: PixelSize) -> CardResult<()> {
        let surface = self.surface_mut()?;
        surface.resize(size);
        surface.request_render();
        Ok(())
    }

    /// Clear all element objects and rebuild them from `elements`.
    ///
    /// Text and rectangles are placed immediately. Image-like and QR
    /// elements are returned as asset requests; an image element with an
    /// empty resolved source is left unrendered.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::SurfaceUnavailable`] unless ready.
    pub fn materialize(
        &mut self,
        elements: &[Element],
        record: &DataRecord,
    ) -> CardResult<Vec<AssetRequest>> {
        self.surface_mut()?;
        self.element_generation += 1;
        let token = LoadToken::new(self.element_generation, self.cancel.clone());
        let surface = self.surface_mut()?;

        let stale: Vec<_> = surface
            .objects()
            .into_iter()
            .filter(|h| surface.get(*h).is_some_and(|o| o.element_id.is_some()))
            .collect();
        for handle in stale {
            surface.remove(handle);
        }

        let mut requests = Vec::new();
        for (z_order, element) in elements.iter().enumerate() {
            match build(element, z_order, record) {
                Built::Object(object) => {
                    surface.add(object);
                }
                Built::Pending(source, pending) => requests.push(AssetRequest {
                    source,
                    target: AssetTarget::Element(pending),
                    token: token.clone(),
                }),
                Built::Skipped => {
                    tracing::debug!("Element {} has no image source, leaving it unrendered", element.id());
                }
            }
        }
        surface.request_render();
        tracing::debug!(
            "Materialized {} elements, {} assets pending",
            elements.len(),
            requests.len()
        );
        Ok(requests)
    }

    /// Apply a background configuration.
    ///
    /// The slot is cleared at once; an image, if configured, is returned as
    /// an asset request.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::SurfaceUnavailable`] unless ready.
    pub fn apply_background(&mut self, background: &Background) -> CardResult<Option<AssetRequest>> {
        self.surface_mut()?;
        self.background_generation += 1;
        let token = LoadToken::new(self.background_generation, self.cancel.clone());
        let surface = self.surface_mut()?;
        surface.set_background(None);
        surface.request_render();
        if !background.has_image() {
            return Ok(None);
        }
        Ok(Some(AssetRequest {
            source: AssetSource::Image {
                src: background.image.clone(),
            },
            target: AssetTarget::Background(background.clone()),
            token,
        }))
    }

    /// Deliver the result of an asset request.
    pub fn complete(&mut self, request: &AssetRequest, result: CardResult<RasterImage>) -> Completion {
        if self.state != ReconcilerState::Ready || request.token.is_cancelled() {
            tracing::debug!("Discarding asset completion after disposal");
            return Completion::Discarded;
        }
        let current = match request.target {
            AssetTarget::Element(_) => self.element_generation,
            AssetTarget::Background(_) => self.background_generation,
        };
        if request.token.generation != current {
            tracing::debug!(
                "Discarding stale asset completion (generation {} != {current})",
                request.token.generation
            );
            return Completion::Discarded;
        }
        let image = match result {
            Ok(image) if image.width > 0 && image.height > 0 => image,
            Ok(_) => {
                tracing::warn!("Asset {:?} decoded to an empty image", request.source);
                return Completion::Failed;
            }
            Err(e) => {
                tracing::warn!("Asset {:?} failed to load: {e}", request.source);
                return Completion::Failed;
            }
        };
        let Some(surface) = self.surface.as_mut() else {
            return Completion::Discarded;
        };

        match &request.target {
            AssetTarget::Element(pending) => {
                let index = surface
                    .objects()
                    .into_iter()
                    .filter(|h| surface.get(*h).is_some_and(|o| o.z_order < pending.z_order))
                    .count();
                surface.insert(index, image_object(pending, image));
            }
            AssetTarget::Background(background) => {
                let image_size = PixelSize::new(image.width, image.height);
                let Some(placement) = background.placement(surface.size(), image_size) else {
                    return Completion::Failed;
                };
                surface.set_background(Some(SurfaceBackground { image, placement }));
            }
        }
        surface.request_render();
        Completion::Applied
    }

    /// Drive `requests` through `loader`, applying results in whatever order
    /// they finish.
    pub async fn load_assets<L>(&mut self, loader: &L, requests: Vec<AssetRequest>) -> Vec<Completion>
    where
        L: AssetLoader + ?Sized,
    {
        let mut in_flight: FuturesUnordered<_> = requests
            .into_iter()
            .filter(|r| !r.token.is_cancelled())
            .map(|request| async move {
                let result = loader.load(&request.source).await;
                (request, result)
            })
            .collect();

        let mut completions = Vec::new();
        while let Some((request, result)) = in_flight.next().await {
            completions.push(self.complete(&request, result));
        }
        completions
    }

    /// React to a surface event.
    ///
    /// Moves snap the dragged object to the grid before geometry is read.
    /// Any manipulation yields the geometry of every element object;
    /// selection events yield the selected element ids.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::SurfaceUnavailable`] unless ready.
    pub fn handle_event(&mut self, event: SurfaceEvent) -> CardResult<Reconciled> {
        let grid = self.grid;
        let surface = self.surface_mut()?;
        match event {
            SurfaceEvent::ObjectMoving(handle) => {
                if let Some(object) = surface.get_mut(handle) {
                    object.left = snap(object.left, grid);
                    object.top = snap(object.top, grid);
                }
                Ok(Reconciled::Geometry(self.collect_geometry()?))
            }
            SurfaceEvent::ObjectScaling(_)
            | SurfaceEvent::ObjectRotating(_)
            | SurfaceEvent::ObjectModified(_) => Ok(Reconciled::Geometry(self.collect_geometry()?)),
            SurfaceEvent::SelectionCreated
            | SurfaceEvent::SelectionUpdated
            | SurfaceEvent::SelectionCleared => Ok(Reconciled::Selection(self.selection()?)),
        }
    }

    /// Current geometry of every element object, in stacking order.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::SurfaceUnavailable`] unless ready.
    pub fn collect_geometry(&self) -> CardResult<Vec<GeometryUpdate>> {
        let surface = self.surface().ok_or(CardError::SurfaceUnavailable)?;
        Ok(surface
            .objects()
            .into_iter()
            .filter_map(|h| surface.get(h))
            .filter_map(|o| {
                let id = o.element_id.clone()?;
                Some(GeometryUpdate {
                    id,
                    x: o.left,
                    y: o.top,
                    width: o.effective_width(),
                    height: o.effective_height(),
                    rotation: o.angle,
                    opacity: o.opacity,
                })
            })
            .collect())
    }

    /// Element ids of the surface's active selection.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::SurfaceUnavailable`] unless ready.
    pub fn selection(&self) -> CardResult<Vec<ElementId>> {
        let surface = self.surface().ok_or(CardError::SurfaceUnavailable)?;
        Ok(surface
            .active_selection()
            .into_iter()
            .filter_map(|h| surface.get(h).and_then(|o| o.element_id.clone()))
            .collect())
    }

    /// Raster export of the current card.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::SurfaceUnavailable`] unless ready.
    pub fn snapshot(&self) -> CardResult<Option<RasterImage>> {
        Ok(self.surface().ok_or(CardError::SurfaceUnavailable)?.snapshot())
    }

    /// Release the surface and cancel every outstanding load token.
    ///
    /// Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.state == ReconcilerState::Disposed {
            return;
        }
        self.cancel.cancel();
        if let Some(mut surface) = self.surface.take() {
            surface.dispose();
        }
        self.state = ReconcilerState::Disposed;
        tracing::debug!("Reconciler disposed");
    }
}

impl<S: RenderSurface> Drop for Reconciler<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

enum Built {
    Object(SurfaceObject),
    Pending(AssetSource, PendingElement),
    Skipped,
}

/// Nearest grid line; exact midpoints go toward positive infinity.
fn snap(value: f64, grid: f64) -> f64 {
    if grid > 0.0 {
        (value / grid + 0.5).floor() * grid
    } else {
        value
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn base_object(element: &Element, z_order: usize, content: Renderable) -> SurfaceObject {
    let frame = element.frame();
    SurfaceObject {
        element_id: Some(element.id().clone()),
        z_order,
        left: frame.x,
        top: frame.y,
        width: 0.0,
        height: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        angle: frame.rotation.unwrap_or(0.0),
        opacity: frame.opacity.unwrap_or(1.0),
        content,
    }
}

fn build(element: &Element, z_order: usize, record: &DataRecord) -> Built {
    let pending = |qr_size, clip_radius| PendingElement {
        id: element.id().clone(),
        z_order,
        frame: *element.frame(),
        qr_size,
        clip_radius,
    };

    match element.kind() {
        ElementKind::Text(props) => {
            let text = resolve_text(element, "text", record).unwrap_or_default();
            let font_size = positive(props.font_size).unwrap_or(16.0);
            #[allow(clippy::cast_precision_loss)]
            let lines = text.lines().count().max(1) as f64;
            let mut object = base_object(
                element,
                z_order,
                Renderable::Text {
                    text,
                    font_size,
                    color: props.color.clone().unwrap_or_else(|| "#111".to_string()),
                    font_weight: props
                        .font_weight
                        .clone()
                        .unwrap_or_else(|| "normal".to_string()),
                    font_family: props
                        .font_family
                        .clone()
                        .unwrap_or_else(|| "Inter, system-ui".to_string()),
                    align: props.align.clone().unwrap_or_else(|| "left".to_string()),
                },
            );
            object.width = positive(props.frame.width).unwrap_or(TEXT_WIDTH);
            object.height = font_size * TEXT_LINE_HEIGHT * lines;
            Built::Object(object)
        }
        ElementKind::Rect(props) => {
            let mut object = base_object(
                element,
                z_order,
                Renderable::Rect {
                    fill: props.fill.clone().unwrap_or_else(|| "#e5e7eb".to_string()),
                    radius: props.radius.unwrap_or(0.0),
                },
            );
            object.width = positive(props.frame.width).unwrap_or(RECT_WIDTH);
            object.height = positive(props.frame.height).unwrap_or(RECT_HEIGHT);
            Built::Object(object)
        }
        ElementKind::Image(_) | ElementKind::Logo(_) | ElementKind::Photo(_) => {
            let src = resolve_text(element, "src", record).unwrap_or_default();
            if src.is_empty() {
                return Built::Skipped;
            }
            let clip_radius = match element.kind() {
                ElementKind::Photo(props) if props.clip == Some(Clip::Circle) => {
                    Some(positive(props.frame.width).unwrap_or(CLIP_WIDTH) / 2.0)
                }
                _ => None,
            };
            Built::Pending(AssetSource::Image { src }, pending(None, clip_radius))
        }
        ElementKind::Qr(props) => {
            let value = resolve_text(element, "value", record)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| QR_PLACEHOLDER.to_string());
            let size = positive(props.size).unwrap_or(QR_SIZE);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let pixels = size.round().max(1.0) as u32;
            Built::Pending(
                AssetSource::Qr {
                    value,
                    size: pixels,
                },
                pending(Some(size), None),
            )
        }
    }
}

/// Place a loaded image: QR symbols scale to their size, other images scale
/// uniformly to the declared width, then to the declared height if present.
fn image_object(pending: &PendingElement, image: RasterImage) -> SurfaceObject {
    let iw = f64::from(image.width);
    let ih = f64::from(image.height);
    let frame = &pending.frame;
    let scale = if let Some(size) = pending.qr_size {
        size / iw
    } else {
        let mut scale = 1.0;
        if let Some(width) = positive(frame.width) {
            scale = width / iw;
        }
        if let Some(height) = positive(frame.height) {
            scale = height / ih;
        }
        scale
    };
    SurfaceObject {
        element_id: Some(pending.id.clone()),
        z_order: pending.z_order,
        left: frame.x,
        top: frame.y,
        width: iw,
        height: ih,
        scale_x: scale,
        scale_y: scale,
        angle: frame.rotation.unwrap_or(0.0),
        opacity: frame.opacity.unwrap_or(1.0),
        content: Renderable::Image {
            image,
            clip_radius: pending.clip_radius,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SceneSurface;
    use crate::{ElementType, Frame, ImageProps, PhotoProps, QrProps, RectProps};

    fn ready() -> Reconciler<SceneSurface> {
        let mut reconciler = Reconciler::default();
        reconciler
            .mount(PixelSize::new(1082, 709), SceneSurface::new)
            .expect("mount");
        reconciler
    }

    fn photo(id: &str, src: &str) -> Element {
        Element::new(
            id,
            ElementKind::Photo(PhotoProps {
                frame: Frame::at(24.0, 60.0, Some(120.0), None),
                src: src.to_string(),
                clip: Some(Clip::Circle),
            }),
        )
    }

    fn rect(id: &str, x: f64) -> Element {
        Element::new(
            id,
            ElementKind::Rect(RectProps {
                frame: Frame::at(x, 0.0, None, None),
                fill: None,
                radius: None,
            }),
        )
    }

    #[test]
    fn test_lifecycle() {
        let mut reconciler: Reconciler<SceneSurface> = Reconciler::default();
        assert_eq!(reconciler.state(), ReconcilerState::Uninitialized);
        assert!(matches!(
            reconciler.materialize(&[], &DataRecord::new()),
            Err(CardError::SurfaceUnavailable)
        ));
        reconciler
            .mount(PixelSize::new(10, 10), SceneSurface::new)
            .expect("mount");
        assert!(reconciler
            .mount(PixelSize::new(10, 10), SceneSurface::new)
            .is_err());
        reconciler.dispose();
        assert_eq!(reconciler.state(), ReconcilerState::Disposed);
        assert!(reconciler.surface().is_none());
        reconciler.dispose();
    }

    #[test]
    fn test_materialize_applies_fallbacks() {
        let mut reconciler = ready();
        let requests = reconciler
            .materialize(&[rect("r", 5.0)], &DataRecord::new())
            .expect("materialize");
        assert!(requests.is_empty());
        let surface = reconciler.surface().expect("surface");
        let object = surface.get(surface.find("r").expect("r")).expect("object");
        assert!((object.width - 120.0).abs() < f64::EPSILON);
        assert!((object.height - 60.0).abs() < f64::EPSILON);
        assert!((object.opacity - 1.0).abs() < f64::EPSILON);
        assert_eq!(
            object.content,
            Renderable::Rect {
                fill: "#e5e7eb".to_string(),
                radius: 0.0
            }
        );
    }

    #[test]
    fn test_text_uses_resolved_value_and_styling_defaults() {
        let mut reconciler = ready();
        let element =
            Element::new("n1", ElementKind::defaults(ElementType::Text)).with_binding("text", "name");
        let mut record = DataRecord::new();
        record.insert("name".to_string(), "Alex".to_string());
        reconciler.materialize(&[element], &record).expect("materialize");
        let surface = reconciler.surface().expect("surface");
        let object = surface.get(surface.find("n1").expect("n1")).expect("object");
        let Renderable::Text {
            text,
            font_weight,
            font_family,
            align,
            ..
        } = &object.content
        else {
            panic!("expected text");
        };
        assert_eq!(text, "Alex");
        assert_eq!(font_weight, "normal");
        assert_eq!(font_family, "Inter, system-ui");
        assert_eq!(align, "left");
        assert!((object.width - 160.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_src_is_left_unrendered() {
        let mut reconciler = ready();
        let requests = reconciler
            .materialize(&[photo("p1", "")], &DataRecord::new())
            .expect("materialize");
        assert!(requests.is_empty());
        assert!(reconciler.surface().expect("surface").objects().is_empty());
    }

    #[test]
    fn test_qr_request_uses_placeholder_and_default_size() {
        let mut reconciler = ready();
        let qr = Element::new(
            "q",
            ElementKind::Qr(QrProps {
                frame: Frame::at(0.0, 0.0, None, None),
                size: None,
                value: String::new(),
            }),
        );
        let requests = reconciler.materialize(&[qr], &DataRecord::new()).expect("materialize");
        assert_eq!(
            requests[0].source,
            AssetSource::Qr {
                value: "QR".to_string(),
                size: 120
            }
        );
    }

    #[test]
    fn test_completion_inserts_in_document_order() {
        let mut reconciler = ready();
        let elements = vec![rect("a", 0.0), photo("p", "x.png"), rect("b", 0.0)];
        let requests = reconciler
            .materialize(&elements, &DataRecord::new())
            .expect("materialize");
        assert_eq!(requests.len(), 1);
        let outcome = reconciler.complete(&requests[0], Ok(RasterImage::solid(240, 240, [0; 4])));
        assert_eq!(outcome, Completion::Applied);

        let surface = reconciler.surface().expect("surface");
        let order: Vec<_> = surface
            .objects()
            .into_iter()
            .filter_map(|h| surface.get(h).and_then(|o| o.element_id.clone()))
            .map(|id| id.to_string())
            .collect();
        assert_eq!(order, vec!["a", "p", "b"]);

        let object = surface.get(surface.find("p").expect("p")).expect("object");
        assert!((object.effective_width() - 120.0).abs() < 1e-9);
        let Renderable::Image { clip_radius, .. } = object.content else {
            panic!("expected image");
        };
        assert_eq!(clip_radius, Some(60.0));
    }

    #[test]
    fn test_image_height_overrides_width_scale() {
        let pending = PendingElement {
            id: ElementId::new("i"),
            z_order: 0,
            frame: Frame::at(0.0, 0.0, Some(100.0), Some(100.0)),
            qr_size: None,
            clip_radius: None,
        };
        let object = image_object(&pending, RasterImage::solid(200, 50, [0; 4]));
        assert!((object.scale_x - 2.0).abs() < f64::EPSILON);
        assert!((object.scale_y - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut reconciler = ready();
        let elements = vec![Element::new(
            "i",
            ElementKind::Image(ImageProps {
                frame: Frame::at(0.0, 0.0, Some(50.0), None),
                src: "a.png".to_string(),
            }),
        )];
        let first = reconciler
            .materialize(&elements, &DataRecord::new())
            .expect("materialize");
        let second = reconciler
            .materialize(&elements, &DataRecord::new())
            .expect("materialize");
        let image = RasterImage::solid(10, 10, [0; 4]);
        assert_eq!(
            reconciler.complete(&first[0], Ok(image.clone())),
            Completion::Discarded
        );
        assert_eq!(reconciler.complete(&second[0], Ok(image)), Completion::Applied);
        assert_eq!(reconciler.surface().expect("surface").objects().len(), 1);
    }

    #[test]
    fn test_failed_load_is_swallowed() {
        let mut reconciler = ready();
        let requests = reconciler
            .materialize(&[photo("p", "broken")], &DataRecord::new())
            .expect("materialize");
        let outcome = reconciler.complete(&requests[0], Err(CardError::AssetLoad("nope".into())));
        assert_eq!(outcome, Completion::Failed);
        assert!(reconciler.surface().expect("surface").objects().is_empty());
    }

    #[test]
    fn test_completion_after_dispose_is_discarded() {
        let mut reconciler = ready();
        let requests = reconciler
            .materialize(&[photo("p", "late.png")], &DataRecord::new())
            .expect("materialize");
        reconciler.dispose();
        let outcome = reconciler.complete(&requests[0], Ok(RasterImage::solid(4, 4, [0; 4])));
        assert_eq!(outcome, Completion::Discarded);
    }

    #[test]
    fn test_background_without_image_clears_slot() {
        let mut reconciler = ready();
        let request = reconciler
            .apply_background(&Background::default())
            .expect("background");
        assert!(request.is_none());
        assert!(reconciler.surface().expect("surface").background().is_none());
    }

    #[test]
    fn test_background_completion_places_image() {
        let mut reconciler = ready();
        let background = Background {
            image: "bg.png".to_string(),
            ..Background::default()
        };
        let request = reconciler
            .apply_background(&background)
            .expect("background")
            .expect("request");
        let outcome = reconciler.complete(&request, Ok(RasterImage::solid(541, 709, [0; 4])));
        assert_eq!(outcome, Completion::Applied);
        let placed = reconciler
            .surface()
            .expect("surface")
            .background()
            .expect("background");
        assert!((placed.placement.scale_x - 2.0).abs() < 1e-9);
        assert!(!placed.placement.selectable);
    }

    #[test]
    fn test_move_snaps_to_grid() {
        let mut reconciler = ready();
        reconciler
            .materialize(&[rect("r", 0.0)], &DataRecord::new())
            .expect("materialize");
        let surface = reconciler.surface_mut().expect("surface");
        let handle = surface.find("r").expect("r");
        let event = surface.drag_to(handle, 23.0, 47.0);
        let Reconciled::Geometry(batch) = reconciler.handle_event(event).expect("event") else {
            panic!("expected geometry");
        };
        assert_eq!(batch.len(), 1);
        assert!((batch[0].x - 20.0).abs() < f64::EPSILON);
        assert!((batch[0].y - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_negative_midpoint_snaps_up() {
        let mut reconciler = ready();
        reconciler
            .materialize(&[rect("r", 0.0)], &DataRecord::new())
            .expect("materialize");
        let surface = reconciler.surface_mut().expect("surface");
        let handle = surface.find("r").expect("r");
        let event = surface.drag_to(handle, -15.0, 35.0);
        let Reconciled::Geometry(batch) = reconciler.handle_event(event).expect("event") else {
            panic!("expected geometry");
        };
        assert!((batch[0].x + 10.0).abs() < f64::EPSILON);
        assert!((batch[0].y - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scale_reports_effective_size() {
        let mut reconciler = ready();
        reconciler
            .materialize(&[rect("r", 0.0)], &DataRecord::new())
            .expect("materialize");
        let surface = reconciler.surface_mut().expect("surface");
        let handle = surface.find("r").expect("r");
        let event = surface.scale_to(handle, 2.0, 0.5);
        let Reconciled::Geometry(batch) = reconciler.handle_event(event).expect("event") else {
            panic!("expected geometry");
        };
        assert!((batch[0].width - 240.0).abs() < f64::EPSILON);
        assert!((batch[0].height - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_selection_maps_to_ids() {
        let mut reconciler = ready();
        reconciler
            .materialize(&[rect("a", 0.0), rect("b", 0.0)], &DataRecord::new())
            .expect("materialize");
        let surface = reconciler.surface_mut().expect("surface");
        let b = surface.find("b").expect("b");
        let event = surface.select(&[b]);
        assert_eq!(
            reconciler.handle_event(event).expect("event"),
            Reconciled::Selection(vec![ElementId::new("b")])
        );
        let event = reconciler.surface_mut().expect("surface").clear_selection();
        assert_eq!(
            reconciler.handle_event(event).expect("event"),
            Reconciled::Selection(Vec::new())
        );
    }

    #[test]
    fn test_snap_helper() {
        assert!((snap(23.0, 10.0) - 20.0).abs() < f64::EPSILON);
        assert!((snap(25.0, 10.0) - 30.0).abs() < f64::EPSILON);
        assert!((snap(-14.0, 10.0) + 10.0).abs() < f64::EPSILON);
        assert!((snap(-15.0, 10.0) + 10.0).abs() < f64::EPSILON);
        assert!((snap(-25.0, 10.0) + 20.0).abs() < f64::EPSILON);
        assert!((snap(15.0, 10.0) - 20.0).abs() < f64::EPSILON);
        assert!((snap(7.3, 0.0) - 7.3).abs() < f64::EPSILON);
    }
}
