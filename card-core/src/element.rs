//! Card elements - the placeable, bindable building blocks of a template.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CardError, CardResult};

/// Identifier of an element, unique within a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Create an id from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The kind of an element, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// Styled text box.
    Text,
    /// Free image.
    Image,
    /// Portrait photo, optionally clipped.
    Photo,
    /// Organisation logo.
    Logo,
    /// QR symbol.
    Qr,
    /// Filled rounded rectangle.
    Rect,
}

impl ElementType {
    /// Every element type, in toolbar order.
    pub const ALL: [Self; 6] = [
        Self::Text,
        Self::Image,
        Self::Photo,
        Self::Logo,
        Self::Qr,
        Self::Rect,
    ];

    /// Lowercase name used in documents and generated ids.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Photo => "photo",
            Self::Logo => "logo",
            Self::Qr => "qr",
            Self::Rect => "rect",
        }
    }

    /// Whether elements of this type render from a fetched image source.
    #[must_use]
    pub const fn is_image_like(self) -> bool {
        matches!(self, Self::Image | Self::Photo | Self::Logo)
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Geometry shared by every element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Left edge in card pixels.
    pub x: f64,
    /// Top edge in card pixels.
    pub y: f64,
    /// Declared width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Declared height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Rotation in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    /// Opacity in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl Frame {
    /// A frame at `(x, y)` with an optional size.
    #[must_use]
    pub const fn at(x: f64, y: f64, width: Option<f64>, height: Option<f64>) -> Self {
        Self {
            x,
            y,
            width,
            height,
            rotation: None,
            opacity: None,
        }
    }
}

/// Properties of a text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProps {
    /// Geometry.
    #[serde(flatten)]
    pub frame: Frame,
    /// Authored text.
    #[serde(default)]
    pub text: String,
    /// Font size in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// Fill color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// CSS-style font weight (`"700"`, `"bold"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    /// Font family list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Horizontal alignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
}

/// Properties of an image or logo element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageProps {
    /// Geometry.
    #[serde(flatten)]
    pub frame: Frame,
    /// Image source (URL, path or data URI). Empty means no image.
    #[serde(default)]
    pub src: String,
}

/// Clip region applied to a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clip {
    /// Circle inscribed in the photo width.
    Circle,
    /// No clipping. Unrecognised clip names read as this.
    #[serde(other)]
    None,
}

/// Properties of a photo element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoProps {
    /// Geometry.
    #[serde(flatten)]
    pub frame: Frame,
    /// Image source. Empty means no image.
    #[serde(default)]
    pub src: String,
    /// Clip region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<Clip>,
}

/// Properties of a QR element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrProps {
    /// Geometry.
    #[serde(flatten)]
    pub frame: Frame,
    /// Rendered edge length in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    /// Encoded payload.
    #[serde(default)]
    pub value: String,
}

/// Properties of a rectangle element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectProps {
    /// Geometry.
    #[serde(flatten)]
    pub frame: Frame,
    /// Fill color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    /// Corner radius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

/// Type-specific content of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// Text box.
    Text(TextProps),
    /// Image.
    Image(ImageProps),
    /// Photo.
    Photo(PhotoProps),
    /// Logo.
    Logo(ImageProps),
    /// QR symbol.
    Qr(QrProps),
    /// Rectangle.
    Rect(RectProps),
}

impl ElementKind {
    /// Default properties for a freshly added element of the given type.
    #[must_use]
    pub fn defaults(element_type: ElementType) -> Self {
        match element_type {
            ElementType::Text => Self::Text(TextProps {
                frame: Frame::at(40.0, 40.0, Some(160.0), Some(60.0)),
                text: "Text".to_string(),
                font_size: Some(16.0),
                color: Some("#111".to_string()),
                font_weight: None,
                font_family: None,
                align: None,
            }),
            ElementType::Image => Self::Image(ImageProps {
                frame: Frame::at(40.0, 40.0, Some(120.0), Some(80.0)),
                src: String::new(),
            }),
            ElementType::Photo => Self::Photo(PhotoProps {
                frame: Frame::at(40.0, 40.0, Some(120.0), Some(120.0)),
                src: String::new(),
                clip: Some(Clip::Circle),
            }),
            ElementType::Logo => Self::Logo(ImageProps {
                frame: Frame::at(40.0, 40.0, Some(80.0), None),
                src: String::new(),
            }),
            ElementType::Qr => Self::Qr(QrProps {
                frame: Frame::at(40.0, 40.0, Some(160.0), Some(60.0)),
                size: Some(100.0),
                value: "QR".to_string(),
            }),
            ElementType::Rect => Self::Rect(RectProps {
                frame: Frame::at(40.0, 40.0, Some(160.0), Some(80.0)),
                fill: Some("#e5e7eb".to_string()),
                radius: Some(8.0),
            }),
        }
    }

    /// The element type of this content.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        match self {
            Self::Text(_) => ElementType::Text,
            Self::Image(_) => ElementType::Image,
            Self::Photo(_) => ElementType::Photo,
            Self::Logo(_) => ElementType::Logo,
            Self::Qr(_) => ElementType::Qr,
            Self::Rect(_) => ElementType::Rect,
        }
    }

    /// Shared geometry.
    #[must_use]
    pub const fn frame(&self) -> &Frame {
        match self {
            Self::Text(p) => &p.frame,
            Self::Image(p) | Self::Logo(p) => &p.frame,
            Self::Photo(p) => &p.frame,
            Self::Qr(p) => &p.frame,
            Self::Rect(p) => &p.frame,
        }
    }

    /// Mutable shared geometry.
    pub fn frame_mut(&mut self) -> &mut Frame {
        match self {
            Self::Text(p) => &mut p.frame,
            Self::Image(p) | Self::Logo(p) => &mut p.frame,
            Self::Photo(p) => &mut p.frame,
            Self::Qr(p) => &mut p.frame,
            Self::Rect(p) => &mut p.frame,
        }
    }

    /// The properties as a flat JSON object, keyed by document prop names.
    ///
    /// # Errors
    ///
    /// Returns an error if the properties cannot be represented as JSON.
    pub fn props_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Text(p) => serde_json::to_value(p),
            Self::Image(p) | Self::Logo(p) => serde_json::to_value(p),
            Self::Photo(p) => serde_json::to_value(p),
            Self::Qr(p) => serde_json::to_value(p),
            Self::Rect(p) => serde_json::to_value(p),
        }
    }

    /// Rebuild typed properties of the given type from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object lacks required geometry or a field has the wrong shape.
    pub fn from_props_value(
        element_type: ElementType,
        props: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match element_type {
            ElementType::Text => Self::Text(serde_json::from_value(props)?),
            ElementType::Image => Self::Image(serde_json::from_value(props)?),
            ElementType::Photo => Self::Photo(serde_json::from_value(props)?),
            ElementType::Logo => Self::Logo(serde_json::from_value(props)?),
            ElementType::Qr => Self::Qr(serde_json::from_value(props)?),
            ElementType::Rect => Self::Rect(serde_json::from_value(props)?),
        })
    }
}

/// A placed element: id, typed content and property bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "crate::schema::ElementDocument",
    into = "crate::schema::ElementDocument"
)]
pub struct Element {
    id: ElementId,
    kind: ElementKind,
    bind: BTreeMap<String, String>,
}

impl Element {
    /// Create an element with no bindings.
    #[must_use]
    pub fn new(id: impl Into<ElementId>, kind: ElementKind) -> Self {
        Self {
            id: id.into(),
            kind,
            bind: BTreeMap::new(),
        }
    }

    /// Bind a property to a data-record field.
    #[must_use]
    pub fn with_binding(mut self, property: impl Into<String>, field: impl Into<String>) -> Self {
        self.bind.insert(property.into(), field.into());
        self
    }

    /// Replace all bindings.
    #[must_use]
    pub fn with_bindings(mut self, bind: BTreeMap<String, String>) -> Self {
        self.bind = bind;
        self
    }

    /// Element id.
    #[must_use]
    pub fn id(&self) -> &ElementId {
        &self.id
    }

    /// Element type.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        self.kind.element_type()
    }

    /// Typed content.
    #[must_use]
    pub const fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Shared geometry.
    #[must_use]
    pub const fn frame(&self) -> &Frame {
        self.kind.frame()
    }

    /// Mutable shared geometry.
    pub fn frame_mut(&mut self) -> &mut Frame {
        self.kind.frame_mut()
    }

    /// Property bindings (property name to record field name).
    #[must_use]
    pub fn bindings(&self) -> &BTreeMap<String, String> {
        &self.bind
    }

    /// Mutable property bindings.
    pub fn bindings_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.bind
    }

    /// Replace the typed content, keeping the element type.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::InvalidOperation`] if `kind` is of a different type.
    pub fn set_kind(&mut self, kind: ElementKind) -> CardResult<()> {
        if kind.element_type() != self.element_type() {
            return Err(CardError::InvalidOperation(format!(
                "cannot change {} from {} to {}",
                self.id,
                self.element_type(),
                kind.element_type()
            )));
        }
        self.kind = kind;
        Ok(())
    }

    /// Look up an authored property by its document name.
    #[must_use]
    pub fn prop(&self, key: &str) -> Option<serde_json::Value> {
        let props = self.kind.props_value().ok()?;
        props.get(key).filter(|v| !v.is_null()).cloned()
    }
}

/// Generates element ids of the form `<type>-<n>` that never collide.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    counter: u64,
}

impl IdGenerator {
    /// Create a generator starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next id for `element_type`, skipping ids for which `taken` returns true.
    pub fn next_id(&mut self, element_type: ElementType, taken: impl Fn(&str) -> bool) -> ElementId {
        loop {
            self.counter += 1;
            let candidate = format!("{}-{}", element_type.as_str(), self.counter);
            if !taken(&candidate) {
                return ElementId(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_by_type() {
        let ElementKind::Text(text) = ElementKind::defaults(ElementType::Text) else {
            panic!("expected text");
        };
        assert_eq!(text.text, "Text");
        assert_eq!(text.font_size, Some(16.0));
        assert_eq!(text.color.as_deref(), Some("#111"));
        assert_eq!(text.frame, Frame::at(40.0, 40.0, Some(160.0), Some(60.0)));

        let ElementKind::Logo(logo) = ElementKind::defaults(ElementType::Logo) else {
            panic!("expected logo");
        };
        assert_eq!(logo.frame.width, Some(80.0));
        assert_eq!(logo.frame.height, None);

        let ElementKind::Photo(photo) = ElementKind::defaults(ElementType::Photo) else {
            panic!("expected photo");
        };
        assert_eq!(photo.clip, Some(Clip::Circle));

        let ElementKind::Qr(qr) = ElementKind::defaults(ElementType::Qr) else {
            panic!("expected qr");
        };
        assert_eq!(qr.size, Some(100.0));
        assert_eq!(qr.value, "QR");

        let ElementKind::Rect(rect) = ElementKind::defaults(ElementType::Rect) else {
            panic!("expected rect");
        };
        assert_eq!(rect.fill.as_deref(), Some("#e5e7eb"));
        assert_eq!(rect.radius, Some(8.0));
    }

    #[test]
    fn test_defaults_keep_type() {
        for ty in ElementType::ALL {
            assert_eq!(ElementKind::defaults(ty).element_type(), ty);
        }
    }

    #[test]
    fn test_set_kind_rejects_type_change() {
        let mut element = Element::new("t1", ElementKind::defaults(ElementType::Text));
        let result = element.set_kind(ElementKind::defaults(ElementType::Rect));
        assert!(matches!(result, Err(CardError::InvalidOperation(_))));
        assert_eq!(element.element_type(), ElementType::Text);

        let mut edited = ElementKind::defaults(ElementType::Text);
        edited.frame_mut().x = 99.0;
        element.set_kind(edited).expect("same type");
        assert!((element.frame().x - 99.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_prop_lookup_uses_document_names() {
        let element = Element::new("t1", ElementKind::defaults(ElementType::Text));
        assert_eq!(element.prop("text"), Some(serde_json::json!("Text")));
        assert_eq!(element.prop("fontSize"), Some(serde_json::json!(16.0)));
        assert_eq!(element.prop("fontWeight"), None);
        assert_eq!(element.prop("missing"), None);
    }

    #[test]
    fn test_id_generator_skips_taken() {
        let mut ids = IdGenerator::new();
        let id = ids.next_id(ElementType::Qr, |candidate| candidate == "qr-1");
        assert_eq!(id.as_str(), "qr-2");
        let next = ids.next_id(ElementType::Text, |_| false);
        assert_eq!(next.as_str(), "text-3");
    }
}
