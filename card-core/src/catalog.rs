//! Built-in ready-made templates.

use crate::{
    Background, CardResult, CardSize, Clip, Element, ElementKind, FitMode, Frame, ImageProps,
    PhotoProps, QrProps, TemplateDocument, TextProps,
};

fn text(
    frame: Frame,
    content: &str,
    font_size: f64,
    color: Option<&str>,
    weight: Option<&str>,
) -> ElementKind {
    ElementKind::Text(TextProps {
        frame,
        text: content.to_string(),
        font_size: Some(font_size),
        color: color.map(str::to_string),
        font_weight: weight.map(str::to_string),
        font_family: None,
        align: None,
    })
}

fn qr(x: f64, y: f64, size: f64, value: &str) -> ElementKind {
    ElementKind::Qr(QrProps {
        frame: Frame::at(x, y, None, None),
        size: Some(size),
        value: value.to_string(),
    })
}

fn locked_background(mode: FitMode) -> Background {
    Background {
        mode,
        image: String::new(),
        opacity: 1.0,
        scale: None,
        locked: true,
    }
}

/// School ID card: school name, circular photo, name, role and QR.
///
/// # Errors
///
/// Never fails in practice; ids are fixed and unique.
pub fn modern_school() -> CardResult<TemplateDocument> {
    let elements = vec![
        Element::new(
            "t1",
            text(Frame::at(24.0, 24.0, Some(260.0), None), "School Name", 20.0, Some("#111"), Some("700")),
        )
        .with_binding("text", "school"),
        Element::new(
            "p1",
            ElementKind::Photo(PhotoProps {
                frame: Frame::at(24.0, 60.0, Some(120.0), Some(120.0)),
                src: String::new(),
                clip: Some(Clip::Circle),
            }),
        )
        .with_binding("src", "photo"),
        Element::new(
            "n1",
            text(Frame::at(160.0, 80.0, Some(260.0), None), "Name", 18.0, Some("#111"), None),
        )
        .with_binding("text", "name"),
        Element::new(
            "r1",
            text(Frame::at(160.0, 110.0, Some(260.0), None), "Role", 14.0, Some("#334155"), None),
        )
        .with_binding("text", "role"),
        Element::new("q1", qr(300.0, 140.0, 80.0, "123")).with_binding("value", "qrPayload"),
    ];
    TemplateDocument::new("Modern School", CardSize::default(), locked_background(FitMode::Fill))
        .with_elements(elements)
}

/// Corporate badge: logo, name, staff id and QR.
///
/// # Errors
///
/// Never fails in practice; ids are fixed and unique.
pub fn corporate_minimal() -> CardResult<TemplateDocument> {
    let elements = vec![
        Element::new(
            "logo",
            ElementKind::Logo(ImageProps {
                frame: Frame::at(24.0, 20.0, Some(80.0), None),
                src: String::new(),
            }),
        )
        .with_binding("src", "logo"),
        Element::new(
            "name",
            text(Frame::at(24.0, 120.0, Some(260.0), None), "Full Name", 18.0, None, Some("600")),
        )
        .with_binding("text", "name"),
        Element::new(
            "id",
            text(Frame::at(24.0, 150.0, Some(200.0), None), "ID: 0000", 12.0, None, None),
        )
        .with_binding("text", "id"),
        Element::new("qr", qr(300.0, 120.0, 80.0, "QR")).with_binding("value", "qrPayload"),
    ];
    TemplateDocument::new("Corporate Minimal", CardSize::default(), locked_background(FitMode::Fit))
        .with_elements(elements)
}

/// Every built-in template, in catalog order.
///
/// # Errors
///
/// Propagates a construction failure of any entry.
pub fn builtin_templates() -> CardResult<Vec<TemplateDocument>> {
    Ok(vec![modern_school()?, corporate_minimal()?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resolve_text, DataRecord, ElementId, ElementType};

    #[test]
    fn test_catalog_entries() {
        let templates = builtin_templates().expect("catalog");
        let names: Vec<_> = templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Modern School", "Corporate Minimal"]);
        assert_eq!(templates[0].elements().len(), 5);
        assert_eq!(templates[1].elements().len(), 4);
        assert_eq!(templates[1].background.mode, FitMode::Fit);
    }

    #[test]
    fn test_modern_school_bindings() {
        let doc = modern_school().expect("template");
        let mut record = DataRecord::new();
        record.insert("name".to_string(), "Alex Johnson".to_string());
        let name = doc.element(&ElementId::new("n1")).expect("n1");
        assert_eq!(resolve_text(name, "text", &record).as_deref(), Some("Alex Johnson"));
        let school = doc.element(&ElementId::new("t1")).expect("t1");
        assert_eq!(resolve_text(school, "text", &record).as_deref(), Some("School Name"));
        let qr = doc.element(&ElementId::new("q1")).expect("q1");
        assert_eq!(qr.element_type(), ElementType::Qr);
        assert_eq!(qr.frame().width, None);
    }
}
