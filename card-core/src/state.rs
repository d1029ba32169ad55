//! Editor state: the document context shared by every editor component.
//!
//! All writes go through the methods here. Each write marks the kind of
//! change it made so the session knows which reconciler effect to re-run.

use crate::{
    binding::normalize_rows, catalog, schema, Background, CardError, CardResult, DataRecord,
    EditorConfig, Element, ElementId, ElementKind, ElementType, GeometryUpdate, IdGenerator,
    PageSize, PixelSize, SheetConfig, SheetField, SheetPreview, TemplateDocument,
};

/// Which parts of the state changed since the last [`EditorState::take_changes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Element sequence or element content.
    pub elements: bool,
    /// Active data record.
    pub record: bool,
    /// Background configuration.
    pub background: bool,
    /// Card size.
    pub size: bool,
}

impl ChangeSet {
    /// Everything changed.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            elements: true,
            record: true,
            background: true,
            size: true,
        }
    }

    /// Nothing changed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !(self.elements || self.record || self.background || self.size)
    }
}

/// The editor's single mutable source of truth.
#[derive(Debug, Clone)]
pub struct EditorState {
    document: TemplateDocument,
    record: DataRecord,
    batch_headers: Vec<String>,
    batch: Vec<DataRecord>,
    sheet: SheetConfig,
    selection: Vec<ElementId>,
    ids: IdGenerator,
    changes: ChangeSet,
    config: EditorConfig,
}

impl EditorState {
    /// Create a state on the first built-in template.
    ///
    /// # Errors
    ///
    /// Propagates a catalog construction failure.
    pub fn new(config: EditorConfig) -> CardResult<Self> {
        Ok(Self::with_document(config, catalog::modern_school()?))
    }

    /// Create a state on `document`.
    #[must_use]
    pub fn with_document(config: EditorConfig, document: TemplateDocument) -> Self {
        Self {
            document,
            record: config.default_record.clone(),
            batch_headers: Vec::new(),
            batch: Vec::new(),
            sheet: config.sheet,
            selection: Vec::new(),
            ids: IdGenerator::new(),
            changes: ChangeSet::all(),
            config,
        }
    }

    /// Editor configuration.
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Current document.
    #[must_use]
    pub fn document(&self) -> &TemplateDocument {
        &self.document
    }

    /// Active data record.
    #[must_use]
    pub fn record(&self) -> &DataRecord {
        &self.record
    }

    /// Headers of the batch records, in first-seen order.
    #[must_use]
    pub fn batch_headers(&self) -> &[String] {
        &self.batch_headers
    }

    /// Normalised batch records.
    #[must_use]
    pub fn batch(&self) -> &[DataRecord] {
        &self.batch
    }

    /// Print sheet settings.
    #[must_use]
    pub fn sheet(&self) -> &SheetConfig {
        &self.sheet
    }

    /// Element ids of the current selection.
    #[must_use]
    pub fn selection(&self) -> &[ElementId] {
        &self.selection
    }

    /// The first selected element, as shown by the property panel.
    #[must_use]
    pub fn selected_element(&self) -> Option<&Element> {
        self.selection
            .first()
            .and_then(|id| self.document.element(id))
    }

    /// Pixel footprint of the card.
    #[must_use]
    pub fn card_pixel_size(&self) -> PixelSize {
        self.document.pixel_size()
    }

    /// Return and reset the accumulated changes.
    pub fn take_changes(&mut self) -> ChangeSet {
        std::mem::take(&mut self.changes)
    }

    /// Replace size, background and elements with a template.
    pub fn load_template(&mut self, document: TemplateDocument) {
        tracing::info!("Loading template {:?}", document.name);
        self.document = document;
        self.selection.clear();
        self.changes = ChangeSet {
            record: self.changes.record,
            ..ChangeSet::all()
        };
    }

    /// Parse and load uploaded template text. On failure nothing changes.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::MalformedTemplate`] if the text is not a valid template.
    pub fn import_template(&mut self, text: &str) -> CardResult<()> {
        match schema::deserialize(text) {
            Ok(document) => {
                self.load_template(document);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Rejected template upload: {e}");
                Err(e)
            }
        }
    }

    /// Serialize the current document with the active record's field names.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn export_template(&self) -> CardResult<String> {
        schema::serialize(&self.document, &self.record)
    }

    /// Append a default element of `element_type` with a fresh id.
    pub fn add_element(&mut self, element_type: ElementType) -> ElementId {
        let id = self
            .document
            .push_new(&mut self.ids, ElementKind::defaults(element_type));
        tracing::debug!("Added element {id}");
        self.changes.elements = true;
        id
    }

    /// Replace an element's content and bindings by id.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::ElementNotFound`] for an unknown id and
    /// [`CardError::InvalidOperation`] on a type change.
    pub fn update_element(&mut self, element: Element) -> CardResult<()> {
        self.document.replace_element(element)?;
        self.changes.elements = true;
        Ok(())
    }

    /// Merge a write-back batch. Returns the number of elements updated.
    pub fn apply_geometry(&mut self, batch: &[GeometryUpdate]) -> usize {
        let applied = self.document.apply_geometry(batch);
        if applied > 0 {
            self.changes.elements = true;
        }
        applied
    }

    /// Replace the background configuration.
    pub fn set_background(&mut self, background: Background) {
        self.document.background = background;
        self.changes.background = true;
    }

    /// Edit the background in place.
    pub fn update_background(&mut self, edit: impl FnOnce(&mut Background)) {
        edit(&mut self.document.background);
        self.changes.background = true;
    }

    /// Set one field of the active record.
    pub fn set_record_field(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.record.insert(field.into(), value.into());
        self.changes.record = true;
    }

    /// Replace the active record, e.g. with one batch row.
    pub fn set_record(&mut self, record: DataRecord) {
        self.record = record;
        self.changes.record = true;
    }

    /// Make batch row `index` the active record.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::InvalidOperation`] if there is no such row.
    pub fn activate_batch_row(&mut self, index: usize) -> CardResult<()> {
        let row = self.batch.get(index).cloned().ok_or_else(|| {
            CardError::InvalidOperation(format!(
                "batch row {index} out of range ({} rows)",
                self.batch.len()
            ))
        })?;
        self.set_record(row);
        Ok(())
    }

    /// Store parsed batch rows, normalised to a common header set.
    pub fn set_batch_records(&mut self, rows: Vec<DataRecord>) {
        let (headers, rows) = normalize_rows(rows);
        tracing::debug!("Loaded {} batch rows with {} columns", rows.len(), headers.len());
        self.batch_headers = headers;
        self.batch = rows;
    }

    /// Update a sheet field from raw form text.
    pub fn set_sheet_field(&mut self, field: SheetField, text: &str) {
        self.sheet.set_field(field, text);
    }

    /// Select the preview page.
    pub fn set_page(&mut self, page: PageSize) {
        self.sheet.page = page;
    }

    /// Replace the selection with element ids reported by the surface.
    pub fn set_selection(&mut self, ids: Vec<ElementId>) {
        self.selection = ids;
    }

    /// Sheet preview model for the current card size.
    #[must_use]
    pub fn sheet_preview(&self) -> SheetPreview {
        self.sheet
            .preview(self.card_pixel_size(), self.config.preview_scale)
    }
}
