//! Editor session: state, reconciler and asset loader wired together.

use crate::asset::AssetRequest;
use crate::reconciler::{Completion, Reconciled, Reconciler};
use crate::state::{ChangeSet, EditorState};
use crate::surface::{RenderSurface, SurfaceEvent};
use crate::{AssetLoader, CardResult, PixelSize, RasterImage};

/// One editing session over one rendering surface.
#[derive(Debug)]
pub struct EditorSession<S: RenderSurface, L: AssetLoader> {
    state: EditorState,
    reconciler: Reconciler<S>,
    loader: L,
    pending: Vec<AssetRequest>,
}

impl<S: RenderSurface, L: AssetLoader> EditorSession<S, L> {
    /// Create an unmounted session.
    #[must_use]
    pub fn new(state: EditorState, loader: L) -> Self {
        let reconciler = Reconciler::new(state.config().grid_px);
        Self {
            state,
            reconciler,
            loader,
            pending: Vec::new(),
        }
    }

    /// Construct the surface at the card's pixel size and render everything.
    ///
    /// # Errors
    ///
    /// Returns an error if the session was already mounted or disposed.
    pub fn mount(&mut self, create: impl FnOnce(PixelSize) -> S) -> CardResult<()> {
        self.reconciler.mount(self.state.card_pixel_size(), create)?;
        self.state.take_changes();
        self.apply(ChangeSet::all())
    }

    /// Editor state.
    #[must_use]
    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// Mutable editor state. Call [`Self::sync`] after editing.
    pub fn state_mut(&mut self) -> &mut EditorState {
        &mut self.state
    }

    /// The reconciler.
    #[must_use]
    pub fn reconciler(&self) -> &Reconciler<S> {
        &self.reconciler
    }

    /// The surface, for the host's input layer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CardError::SurfaceUnavailable`] unless mounted.
    pub fn surface_mut(&mut self) -> CardResult<&mut S> {
        self.reconciler.surface_mut()
    }

    /// Number of asset requests waiting for [`Self::flush`].
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Re-run the reconciler effects for whatever changed in the state.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CardError::SurfaceUnavailable`] unless mounted.
    pub fn sync(&mut self) -> CardResult<()> {
        let changes = self.state.take_changes();
        if changes.is_empty() {
            return Ok(());
        }
        self.apply(changes)
    }

    fn apply(&mut self, changes: ChangeSet) -> CardResult<()> {
        if changes.size {
            self.reconciler.resize(self.state.card_pixel_size())?;
        }
        if changes.background || changes.size {
            let request = self
                .reconciler
                .apply_background(&self.state.document().background)?;
            self.pending.extend(request);
        }
        if changes.elements || changes.record || changes.size {
            let requests = self
                .reconciler
                .materialize(self.state.document().elements(), self.state.record())?;
            self.pending.extend(requests);
        }
        Ok(())
    }

    /// Hand the queued asset requests to the host.
    ///
    /// The session keeps no record of them. Each result goes back through
    /// [`Self::complete`] whenever it arrives, so the host can keep handling
    /// surface events while slow loads are still in flight.
    pub fn take_pending(&mut self) -> Vec<AssetRequest> {
        std::mem::take(&mut self.pending)
    }

    /// Apply one loaded asset, unless its request went stale in the meantime.
    pub fn complete(&mut self, request: &AssetRequest, result: CardResult<RasterImage>) -> Completion {
        self.reconciler.complete(request, result)
    }

    /// Load every queued asset, applying results as they arrive.
    ///
    /// Holds the session until the slowest load finishes. Hosts that must
    /// stay interactive use [`Self::take_pending`] and [`Self::complete`].
    pub async fn flush(&mut self) -> Vec<Completion> {
        let requests = self.take_pending();
        if requests.is_empty() {
            return Vec::new();
        }
        self.reconciler.load_assets(&self.loader, requests).await
    }

    /// Sync and then flush.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CardError::SurfaceUnavailable`] unless mounted.
    pub async fn refresh(&mut self) -> CardResult<Vec<Completion>> {
        self.sync()?;
        Ok(self.flush().await)
    }

    /// Forward a surface event and apply its write-back or selection.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CardError::SurfaceUnavailable`] unless mounted.
    pub fn handle_event(&mut self, event: SurfaceEvent) -> CardResult<Reconciled> {
        let reconciled = self.reconciler.handle_event(event)?;
        match &reconciled {
            Reconciled::Geometry(batch) => {
                self.state.apply_geometry(batch);
            }
            Reconciled::Selection(ids) => self.state.set_selection(ids.clone()),
        }
        Ok(reconciled)
    }

    /// Raster export of the current card.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CardError::SurfaceUnavailable`] unless mounted.
    pub fn snapshot(&self) -> CardResult<Option<RasterImage>> {
        self.reconciler.snapshot()
    }

    /// Tear down the surface. Queued and in-flight loads are discarded on arrival.
    pub fn dispose(&mut self) {
        self.reconciler.dispose();
    }
}
