//! Portable JSON representation of templates and elements.
//!
//! ```text
//! {
//!   "name": "Modern School",
//!   "size": { "widthMM": 85.6, "heightMM": 54, "dpi": 300, "bleedMM": 3, "orientation": "landscape" },
//!   "background": { "mode": "fill", "image": "", "opacity": 1, "locked": true },
//!   "elements": [ { "id": "t1", "type": "text", "props": { ... }, "bind": { "text": "school" } } ],
//!   "bindings": ["name", "role"]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    Background, CardError, CardResult, CardSize, DataRecord, Element, ElementKind, ElementType,
    TemplateDocument,
};

/// Name given to an uploaded template that carries none.
pub const IMPORTED_TEMPLATE_NAME: &str = "Imported Template";

/// Document-friendly element description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementDocument {
    /// Element identifier.
    pub id: String,
    /// Element type tag.
    #[serde(rename = "type")]
    pub element_type: ElementType,
    /// Type-dependent properties.
    #[serde(default)]
    pub props: serde_json::Value,
    /// Property bindings.
    #[serde(default)]
    pub bind: BTreeMap<String, String>,
}

impl From<Element> for ElementDocument {
    fn from(element: Element) -> Self {
        let props = element
            .kind()
            .props_value()
            .unwrap_or(serde_json::Value::Null);
        Self {
            id: element.id().to_string(),
            element_type: element.element_type(),
            props,
            bind: element.bindings().clone(),
        }
    }
}

impl TryFrom<ElementDocument> for Element {
    type Error = String;

    fn try_from(doc: ElementDocument) -> Result<Self, Self::Error> {
        if doc.id.is_empty() {
            return Err("element id must not be empty".to_string());
        }
        let kind = ElementKind::from_props_value(doc.element_type, doc.props)
            .map_err(|e| format!("invalid props for {} element {}: {e}", doc.element_type, doc.id))?;
        Ok(Element::new(crate::element::ElementId::new(doc.id), kind).with_bindings(doc.bind))
    }
}

/// Canonical template file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateFile {
    /// Template name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Card size.
    pub size: CardSize,
    /// Background.
    #[serde(default)]
    pub background: Background,
    /// Elements in stacking order.
    #[serde(default)]
    pub elements: Vec<Element>,
    /// Field names of the active data record when saved (informational).
    #[serde(default)]
    pub bindings: Vec<String>,
}

impl TemplateFile {
    /// Build a file from a document and the active record.
    #[must_use]
    pub fn from_document(document: &TemplateDocument, record: &DataRecord) -> Self {
        Self {
            name: Some(document.name.clone()),
            size: document.size,
            background: document.background.clone(),
            elements: document.elements().to_vec(),
            bindings: record.keys().cloned().collect(),
        }
    }

    /// Convert into a validated document.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::MalformedTemplate`] if the size is invalid or element ids repeat.
    pub fn into_document(self) -> CardResult<TemplateDocument> {
        self.size.validate()?;
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| IMPORTED_TEMPLATE_NAME.to_string());
        TemplateDocument::new(name, self.size, self.background).with_elements(self.elements)
    }
}

/// Serialize a document, recording the active record's field names.
///
/// # Errors
///
/// Returns an error if JSON encoding fails.
pub fn serialize(document: &TemplateDocument, record: &DataRecord) -> CardResult<String> {
    let file = TemplateFile::from_document(document, record);
    serde_json::to_string_pretty(&file).map_err(CardError::Serialization)
}

/// Parse template text into a document.
///
/// # Errors
///
/// Returns [`CardError::MalformedTemplate`] for any syntax, shape or invariant failure.
pub fn deserialize(text: &str) -> CardResult<TemplateDocument> {
    let file: TemplateFile =
        serde_json::from_str(text).map_err(|e| CardError::MalformedTemplate(e.to_string()))?;
    file.into_document()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Clip, ElementId, FitMode, Frame, PhotoProps};

    #[allow(clippy::cast_precision_loss)]
    fn every_type_document() -> TemplateDocument {
        let elements = ElementType::ALL
            .iter()
            .enumerate()
            .map(|(i, ty)| {
                let mut kind = ElementKind::defaults(*ty);
                kind.frame_mut().x = 10.0 * i as f64;
                Element::new(format!("{ty}-{i}").as_str(), kind).with_binding("text", "name")
            })
            .collect();
        TemplateDocument::new(
            "All Types",
            CardSize::default(),
            Background {
                mode: FitMode::Manual,
                image: "data:image/png;base64,AAAA".to_string(),
                opacity: 0.8,
                scale: Some(1.25),
                locked: false,
            },
        )
        .with_elements(elements)
        .expect("unique")
    }

    #[test]
    fn test_round_trip_every_type() {
        let doc = every_type_document();
        let mut record = DataRecord::new();
        record.insert("name".to_string(), "Alex".to_string());

        let text = serialize(&doc, &record).expect("serialize");
        let back = deserialize(&text).expect("deserialize");

        assert_eq!(back.elements(), doc.elements());
        assert_eq!(back.size, doc.size);
        assert_eq!(back.background, doc.background);
        assert_eq!(back.name, "All Types");
    }

    #[test]
    fn test_bindings_are_field_names() {
        let doc = every_type_document();
        let mut record = DataRecord::new();
        record.insert("role".to_string(), "Student".to_string());
        record.insert("name".to_string(), "Alex".to_string());
        let text = serialize(&doc, &record).expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value["bindings"], serde_json::json!(["name", "role"]));
        assert!(!text.contains("Student"));
    }

    #[test]
    fn test_missing_name_defaults() {
        let text = r#"{
            "size": {"widthMM": 85.6, "heightMM": 54, "dpi": 300, "bleedMM": 3, "orientation": "landscape"},
            "background": {"mode": "fit", "opacity": 1, "locked": true, "image": ""},
            "elements": [
                {"id": "p1", "type": "photo", "props": {"x": 24, "y": 60, "width": 120, "height": 120, "clip": "circle", "src": ""}, "bind": {"src": "photo"}}
            ]
        }"#;
        let doc = deserialize(text).expect("deserialize");
        assert_eq!(doc.name, IMPORTED_TEMPLATE_NAME);
        let photo = doc.element(&ElementId::new("p1")).expect("p1");
        assert_eq!(
            photo.kind(),
            &ElementKind::Photo(PhotoProps {
                frame: Frame::at(24.0, 60.0, Some(120.0), Some(120.0)),
                src: String::new(),
                clip: Some(Clip::Circle),
            })
        );
    }

    #[test]
    fn test_unknown_clip_reads_as_none() {
        let text = r#"{
            "size": {"widthMM": 85.6, "heightMM": 54, "dpi": 300},
            "elements": [
                {"id": "p1", "type": "photo", "props": {"x": 0, "y": 0, "clip": "rect", "src": "a.png"}}
            ]
        }"#;
        let doc = deserialize(text).expect("deserialize");
        let photo = doc.element(&ElementId::new("p1")).expect("p1");
        let ElementKind::Photo(props) = photo.kind() else {
            panic!("expected photo");
        };
        assert_eq!(props.clip, Some(Clip::None));
    }

    #[test]
    fn test_malformed_inputs() {
        let cases = [
            "not json",
            r#"{"elements": []}"#,
            r#"{"size": {"widthMM": 0, "heightMM": 54, "dpi": 300}}"#,
            r#"{"size": {"widthMM": 85.6, "heightMM": 54, "dpi": 300},
                "elements": [{"id": "a", "type": "star", "props": {"x": 1, "y": 1}}]}"#,
            r#"{"size": {"widthMM": 85.6, "heightMM": 54, "dpi": 300},
                "elements": [{"id": "a", "type": "text", "props": {"y": 1}}]}"#,
            r#"{"size": {"widthMM": 85.6, "heightMM": 54, "dpi": 300},
                "elements": [{"id": "a", "type": "rect", "props": {"x": 1, "y": 1}},
                             {"id": "a", "type": "rect", "props": {"x": 2, "y": 2}}]}"#,
        ];
        for case in cases {
            assert!(
                matches!(deserialize(case), Err(CardError::MalformedTemplate(_))),
                "should reject: {case}"
            );
        }
    }
}
