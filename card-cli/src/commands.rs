//! Command implementations.
//!
//! Every command starts from the same editor state: the template (or the
//! first built-in one), the page, an optional uploaded background, and the
//! active record assembled from the record file, the chosen batch row and
//! `--set` overrides.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use card_core::{
    builtin_templates, deserialize, resolve, Completion, DataRecord, EditorConfig, EditorSession,
    EditorState, Element, ElementType, SheetField, TemplateDocument, TemplateFile,
};
use card_renderer::image::{encode_file_data_uri, encode_raster_png};
use card_renderer::{render_sheet_preview, ImageAssetLoader, RasterSurface};
use serde_json::{json, Map};

use crate::{CliConfig, Command, SheetArgs};

/// Build the editor state described by `config`.
///
/// # Errors
///
/// Returns an error if the template or record file cannot be read or parsed.
pub async fn load_state(config: &CliConfig) -> anyhow::Result<EditorState> {
    let editor = EditorConfig::default();
    let mut state = match &config.template {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            let document = deserialize(&text)
                .with_context(|| format!("Invalid template {}", path.display()))?;
            tracing::debug!("Loaded template {:?} from {}", document.name, path.display());
            EditorState::with_document(editor, document)
        }
        None => EditorState::new(editor)?,
    };
    state.set_page(config.page);

    if let Some(path) = &config.record {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read record {}", path.display()))?;
        let record: DataRecord = serde_json::from_str(&text)
            .with_context(|| format!("Record {} must be an object of strings", path.display()))?;
        state.set_record(record);
    }
    if let Some(path) = &config.batch {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read batch {}", path.display()))?;
        let rows: Vec<DataRecord> = serde_json::from_str(&text).with_context(|| {
            format!("Batch {} must be an array of objects of strings", path.display())
        })?;
        state.set_batch_records(rows);
    }
    if let Some(index) = config.row {
        state.activate_batch_row(index)?;
    }
    if let Some(path) = &config.background {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read background {}", path.display()))?;
        let uri = encode_file_data_uri(path, &bytes);
        state.update_background(|background| background.image = uri);
    }
    for (field, value) in &config.overrides {
        state.set_record_field(field.clone(), value.clone());
    }
    Ok(state)
}

/// Run the configured command, writing its report to `out`.
///
/// # Errors
///
/// Returns an error if loading the state, rendering, or writing output fails.
pub async fn run(config: CliConfig, out: &mut impl Write) -> anyhow::Result<()> {
    let mut state = load_state(&config).await?;
    match config.command {
        Command::Validate => validate(state.document(), out),
        Command::Catalog { out_dir } => catalog(state.record(), out_dir.as_deref(), out).await,
        Command::Resolve => resolve_bindings(&state, out),
        Command::Layout(sheet) => {
            apply_sheet(&mut state, &sheet);
            layout(&state, out)
        }
        Command::Preview { out: path, card, sheet } => {
            apply_sheet(&mut state, &sheet);
            let loader = ImageAssetLoader::with_base_dir(asset_base_dir(config.template.as_deref()));
            preview(state, loader, &path, card.as_deref(), out).await
        }
    }
}

fn apply_sheet(state: &mut EditorState, sheet: &SheetArgs) {
    state.set_sheet_field(SheetField::Rows, &sheet.rows);
    state.set_sheet_field(SheetField::Cols, &sheet.cols);
    state.set_sheet_field(SheetField::Spacing, &sheet.spacing);
    state.set_sheet_field(SheetField::Margin, &sheet.margin);
}

/// Relative asset paths in a template resolve against the template's directory.
fn asset_base_dir(template: Option<&Path>) -> PathBuf {
    template
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

fn validate(document: &TemplateDocument, out: &mut impl Write) -> anyhow::Result<()> {
    let size = &document.size;
    let px = document.pixel_size();
    let background = &document.background;
    writeln!(out, "Template: {}", document.name)?;
    writeln!(
        out,
        "Card: {} x {} mm @ {} dpi, bleed {} mm -> {} x {} px",
        size.width_mm, size.height_mm, size.dpi, size.bleed_mm, px.width, px.height
    )?;
    writeln!(
        out,
        "Background: {:?}, opacity {}, {}, {}",
        background.mode,
        background.opacity,
        if background.locked { "locked" } else { "unlocked" },
        if background.image.is_empty() { "no image" } else { "image set" }
    )?;
    writeln!(out, "Elements: {}", document.elements().len())?;
    for element in document.elements() {
        let frame = element.frame();
        writeln!(
            out,
            "  {:<12} {:<6} at ({}, {})",
            element.id().as_str(),
            element.element_type(),
            frame.x,
            frame.y
        )?;
    }
    Ok(())
}

fn slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

async fn catalog(
    record: &DataRecord,
    out_dir: Option<&Path>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let templates = builtin_templates()?;
    let Some(dir) = out_dir else {
        let files: Vec<_> = templates
            .iter()
            .map(|doc| TemplateFile::from_document(doc, record))
            .collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&files)?)?;
        return Ok(());
    };

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    for doc in &templates {
        let path = dir.join(format!("{}.json", slug(&doc.name)));
        tokio::fs::write(&path, card_core::serialize(doc, record)?).await?;
        writeln!(out, "Wrote {}", path.display())?;
    }
    Ok(())
}

/// The property each element type displays.
const fn primary_property(element_type: ElementType) -> &'static str {
    match element_type {
        ElementType::Text => "text",
        ElementType::Image | ElementType::Photo | ElementType::Logo => "src",
        ElementType::Qr => "value",
        ElementType::Rect => "fill",
    }
}

fn resolved_properties(element: &Element, record: &DataRecord) -> Map<String, serde_json::Value> {
    let primary = primary_property(element.element_type());
    std::iter::once(primary)
        .chain(element.bindings().keys().map(String::as_str))
        .filter_map(|property| {
            resolve(element, property, record).map(|value| (property.to_string(), value))
        })
        .collect()
}

fn resolve_bindings(state: &EditorState, out: &mut impl Write) -> anyhow::Result<()> {
    let elements: Vec<_> = state
        .document()
        .elements()
        .iter()
        .map(|element| {
            json!({
                "id": element.id(),
                "type": element.element_type(),
                "bindings": element.bindings(),
                "resolved": resolved_properties(element, state.record()),
            })
        })
        .collect();
    writeln!(out, "{}", serde_json::to_string_pretty(&elements)?)?;
    Ok(())
}

fn layout(state: &EditorState, out: &mut impl Write) -> anyhow::Result<()> {
    let preview = state.sheet_preview();
    let overflowing = preview.overflowing();
    if !overflowing.is_empty() {
        tracing::info!(
            "{} of {} tiles extend past the page",
            overflowing.len(),
            preview.tiles.len()
        );
    }
    let report = json!({
        "page": state.sheet().page,
        "pagePx": preview.page_px,
        "cardPx": preview.card_px,
        "tiles": preview.tiles,
        "overflowing": overflowing,
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(())
}

async fn preview(
    state: EditorState,
    loader: ImageAssetLoader,
    path: &Path,
    card: Option<&Path>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut session = EditorSession::new(state, loader);
    session.mount(RasterSurface::new)?;
    let completions = session.flush().await;
    let failed = completions
        .iter()
        .filter(|c| **c == Completion::Failed)
        .count();
    if failed > 0 {
        tracing::warn!("{failed} asset(s) failed to load and were left unrendered");
    }

    let snapshot = session
        .snapshot()?
        .ok_or_else(|| anyhow!("Surface produced no snapshot"))?;
    let sheet = render_sheet_preview(&session.state().sheet_preview(), Some(&snapshot))?;
    tokio::fs::write(path, encode_raster_png(&sheet)?)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writeln!(out, "Wrote sheet preview {}", path.display())?;

    if let Some(card_path) = card {
        tokio::fs::write(card_path, encode_raster_png(&snapshot)?)
            .await
            .with_context(|| format!("Failed to write {}", card_path.display()))?;
        writeln!(out, "Wrote card snapshot {}", card_path.display())?;
    }
    session.dispose();
    Ok(())
}
