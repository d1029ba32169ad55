//! Template documents: the single source of truth for a card.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    Background, CardError, CardResult, CardSize, Element, ElementId, IdGenerator, PixelSize,
};

/// A complete card template: size, background and ordered elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateDocument {
    /// Display name.
    pub name: String,
    /// Physical card size.
    pub size: CardSize,
    /// Background configuration.
    pub background: Background,
    /// Elements in stacking order (first is bottom-most).
    elements: Vec<Element>,
}

impl TemplateDocument {
    /// Create an empty document.
    #[must_use]
    pub fn new(name: impl Into<String>, size: CardSize, background: Background) -> Self {
        Self {
            name: name.into(),
            size,
            background,
            elements: Vec::new(),
        }
    }

    /// Create a document with elements, checking id uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::MalformedTemplate`] on a duplicate element id.
    pub fn with_elements(mut self, elements: Vec<Element>) -> CardResult<Self> {
        let mut seen = HashSet::new();
        for element in &elements {
            if !seen.insert(element.id().clone()) {
                return Err(CardError::MalformedTemplate(format!(
                    "duplicate element id: {}",
                    element.id()
                )));
            }
        }
        self.elements = elements;
        Ok(self)
    }

    /// Pixel footprint of the card including bleed.
    #[must_use]
    pub fn pixel_size(&self) -> PixelSize {
        self.size.pixel_size()
    }

    /// All elements in stacking order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Get an element by id.
    #[must_use]
    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    /// Get a mutable element by id.
    pub fn element_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id() == id)
    }

    /// Whether an element with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.elements.iter().any(|e| e.id().as_str() == id)
    }

    /// Append an element on top of the stack.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::InvalidOperation`] if the id is already used.
    pub fn push(&mut self, element: Element) -> CardResult<()> {
        if self.contains(element.id().as_str()) {
            return Err(CardError::InvalidOperation(format!(
                "element id already in use: {}",
                element.id()
            )));
        }
        self.elements.push(element);
        Ok(())
    }

    /// Append a new element with a freshly generated id.
    pub fn push_new(&mut self, ids: &mut IdGenerator, kind: crate::ElementKind) -> ElementId {
        let id = ids.next_id(kind.element_type(), |candidate| self.contains(candidate));
        self.elements.push(Element::new(id.clone(), kind));
        id
    }

    /// Replace an element by id, keeping its type.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::ElementNotFound`] for an unknown id and
    /// [`CardError::InvalidOperation`] if the replacement changes the type.
    pub fn replace_element(&mut self, element: Element) -> CardResult<()> {
        let current = self
            .element_mut(element.id())
            .ok_or_else(|| CardError::ElementNotFound(element.id().to_string()))?;
        let bindings = element.bindings().clone();
        current.set_kind(element.kind().clone())?;
        *current.bindings_mut() = bindings;
        Ok(())
    }

    /// Merge a geometry batch into matching elements.
    ///
    /// Elements absent from the batch are untouched; updates for unknown ids
    /// are skipped. Returns the number of elements updated.
    pub fn apply_geometry(&mut self, batch: &[GeometryUpdate]) -> usize {
        let mut applied = 0;
        for update in batch {
            if let Some(element) = self.element_mut(&update.id) {
                update.merge_into(element);
                applied += 1;
            } else {
                tracing::debug!("Skipping geometry for unknown element {}", update.id);
            }
        }
        applied
    }
}

/// Geometry read back from a rendered object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryUpdate {
    /// Originating element.
    pub id: ElementId,
    /// Left position.
    pub x: f64,
    /// Top position.
    pub y: f64,
    /// Effective width (intrinsic width times scale).
    pub width: f64,
    /// Effective height (intrinsic height times scale).
    pub height: f64,
    /// Rotation in degrees.
    pub rotation: f64,
    /// Opacity.
    pub opacity: f64,
}

impl GeometryUpdate {
    fn merge_into(&self, element: &mut Element) {
        let frame = element.frame_mut();
        frame.x = self.x;
        frame.y = self.y;
        frame.width = Some(self.width);
        frame.height = Some(self.height);
        frame.rotation = Some(self.rotation);
        frame.opacity = Some(self.opacity);
    }
}
