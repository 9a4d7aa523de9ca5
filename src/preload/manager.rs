//! Preload lifecycle manager - owns the session and its placeholder view

use std::sync::Arc;
use std::time::{Duration, Instant};

use flume::Sender;
use log::{debug, info, warn};

use super::acquire::{AcquireError, AcquiredBatch, BlobFetcher, PageRequest, acquire_pages, plan_requests};
use super::host::{HostViewer, PreloadContainer, PreloadEvent};
use super::metadata::extract_geometry;
use super::resources::{ResourceKey, ResourceRegistry};
use super::scale::scaled_dimensions;
use super::session::{PreloadSession, PreloadState, SessionId};
use super::types::{DocumentGeometry, ScaledDimensions};
use super::view::{PlaceholderImage, PreloadElement, PreloadView};
use crate::settings::PreloadSettings;

/// What the host asks to preload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreloadRequest {
    pub primary_url: String,
    /// Paged preload URL containing the page token, if the host has one
    pub paged_url_template: Option<String>,
    pub page_count: u32,
}

impl PreloadRequest {
    pub fn new(primary_url: impl Into<String>, page_count: u32) -> Self {
        Self {
            primary_url: primary_url.into(),
            paged_url_template: None,
            page_count,
        }
    }

    #[must_use]
    pub fn with_paged_template(mut self, template: impl Into<String>) -> Self {
        self.paged_url_template = Some(template.into());
        self
    }
}

/// Errors surfaced to the host
#[derive(Debug, thiserror::Error)]
pub enum PreloadError {
    #[error(transparent)]
    Acquire(#[from] AcquireError),
}

/// How a completed preload ended up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreloadOutcome {
    /// The mosaic is visible with this many placeholders
    Showing { pages: usize },
    /// The real document won the race; the preload is fading out
    DocumentAlreadyLoaded,
    /// The session was replaced or cleaned up while fetching
    Discarded,
}

/// Fetches started by [`PreloadManager::begin_preload`].
///
/// Holds its own fetcher so the manager stays free for `hide_preload` and
/// `cleanup_preload` while requests are in flight.
pub struct PendingPreload<F> {
    session: SessionId,
    fetcher: F,
    requests: Vec<PageRequest>,
}

impl<F: BlobFetcher> PendingPreload<F> {
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    #[must_use]
    pub fn requests(&self) -> &[PageRequest] {
        &self.requests
    }

    /// Run every fetch and wait for the batch to settle
    pub async fn acquire(self) -> (SessionId, Result<AcquiredBatch, AcquireError>) {
        let result = acquire_pages(&self.fetcher, self.requests).await;
        (self.session, result)
    }
}

/// Shows a low-fidelity page mosaic while the full viewer loads and tears
/// it down once the viewer is ready
pub struct PreloadManager<F, H> {
    fetcher: F,
    host: H,
    settings: PreloadSettings,
    registry: ResourceRegistry,
    session: Option<PreloadSession>,
    next_session_id: u64,
    /// State reported while no session exists
    resting_state: PreloadState,
    events: Option<Sender<PreloadEvent>>,
}

impl<F, H> PreloadManager<F, H>
where
    F: BlobFetcher + Clone,
    H: HostViewer,
{
    /// Create a manager with default settings
    #[must_use]
    pub fn new(fetcher: F, host: H) -> Self {
        Self::with_settings(fetcher, host, PreloadSettings::default())
    }

    #[must_use]
    pub fn with_settings(fetcher: F, host: H, settings: PreloadSettings) -> Self {
        Self {
            fetcher,
            host,
            settings,
            registry: ResourceRegistry::new(),
            session: None,
            next_session_id: 1,
            resting_state: PreloadState::Idle,
            events: None,
        }
    }

    /// Send lifecycle events to `events`
    #[must_use]
    pub fn with_events(mut self, events: Sender<PreloadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn state(&self) -> PreloadState {
        self.session
            .as_ref()
            .map_or(self.resting_state, |session| session.state)
    }

    #[must_use]
    pub fn session(&self) -> Option<&PreloadSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn view(&self) -> Option<&PreloadView> {
        self.session.as_ref().map(|session| &session.view)
    }

    #[must_use]
    pub fn geometry(&self) -> Option<DocumentGeometry> {
        self.session.as_ref().and_then(|session| session.geometry)
    }

    #[must_use]
    pub fn dimensions(&self) -> Option<ScaledDimensions> {
        self.session.as_ref().and_then(|session| session.dimensions)
    }

    #[must_use]
    pub fn load_elapsed(&self) -> Option<Duration> {
        self.session.as_ref().and_then(PreloadSession::load_elapsed)
    }

    /// Image bytes behind a placeholder, `None` once released
    #[must_use]
    pub fn resource(&self, key: ResourceKey) -> Option<Arc<[u8]>> {
        self.registry.get(key)
    }

    #[must_use]
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    #[must_use]
    pub fn settings(&self) -> &PreloadSettings {
        &self.settings
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Fetch, size and show a preload in `container`.
    ///
    /// Fails only when the primary page cannot be fetched or decoded.
    pub async fn show_preload<C>(
        &mut self,
        request: PreloadRequest,
        container: C,
    ) -> Result<PreloadOutcome, PreloadError>
    where
        C: PreloadContainer + 'static,
    {
        let pending = self.begin_preload(request, container);
        let (session, result) = pending.acquire().await;
        self.complete_preload(session, result)
    }

    /// Start a new session and return its pending fetches.
    ///
    /// Any previous session is cleaned up first.
    pub fn begin_preload<C>(&mut self, request: PreloadRequest, container: C) -> PendingPreload<F>
    where
        C: PreloadContainer + 'static,
    {
        self.cleanup_preload();

        let id = SessionId(self.next_session_id);
        self.next_session_id += 1;

        let requests = plan_requests(
            &request.primary_url,
            request.paged_url_template.as_deref(),
            request.page_count,
            &self.settings,
        );
        info!(
            "Starting preload session {} for {} ({} page requests)",
            id.0,
            request.primary_url,
            requests.len()
        );

        self.session = Some(PreloadSession::new(
            id,
            Box::new(container),
            request.page_count,
        ));

        PendingPreload {
            session: id,
            fetcher: self.fetcher.clone(),
            requests,
        }
    }

    /// Build the mosaic from a settled batch.
    ///
    /// Results for a session that is no longer active are dropped.
    pub fn complete_preload(
        &mut self,
        id: SessionId,
        result: Result<AcquiredBatch, AcquireError>,
    ) -> Result<PreloadOutcome, PreloadError> {
        let is_current = self.session.as_ref().is_some_and(|session| {
            session.id == id && session.handles.is_empty() && session.state != PreloadState::Hiding
        });
        if !is_current {
            debug!("Dropping results for stale preload session {}", id.0);
            return Ok(PreloadOutcome::Discarded);
        }

        let batch = match result {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Preload session {} failed: {e}", id.0);
                self.cleanup_preload();
                return Err(e.into());
            }
        };

        let dims = self.populate_mosaic(batch);

        self.host.init_thumbnails();
        if let Some(session) = self.session.as_mut() {
            session.loaded_at = Some(Instant::now());
        }

        if self.scale_and_show_preload(dims.width, dims.height, 1) {
            let pages = self
                .view()
                .and_then(|view| view.preload.as_ref())
                .map_or(0, |element| element.placeholders.len());
            Ok(PreloadOutcome::Showing { pages })
        } else {
            Ok(PreloadOutcome::DocumentAlreadyLoaded)
        }
    }

    fn populate_mosaic(&mut self, batch: AcquiredBatch) -> ScaledDimensions {
        let Some(session) = self.session.as_mut() else {
            return ScaledDimensions::default();
        };
        session.state = PreloadState::RenderingFirstPage;

        let primary_natural = batch.primary.natural;
        let geometry = match extract_geometry(&batch.primary.bytes, primary_natural, &self.settings)
        {
            Ok(geometry) => {
                debug!("Using embedded geometry {geometry:?}");
                Some(geometry)
            }
            Err(e) => {
                debug!("No usable embedded geometry, sizing from image: {e}");
                None
            }
        };
        session.geometry = geometry;
        session.primary_natural = Some(primary_natural);

        let source = geometry.map_or_else(|| primary_natural.as_source(), |g| g.source_size());
        let dims = scaled_dimensions(source, session.container.client_box(), &self.settings);
        session.dimensions = Some(dims);
        session.view.width = Some(dims.width);

        let element = session.view.attach_preload(PreloadElement::new());
        let mut slot = 0;
        for page in batch.into_loaded_pages() {
            slot += 1;
            let handle = self.registry.create(page.bytes);
            element.push_page(
                page.page,
                PlaceholderImage {
                    resource: handle.key(),
                    natural: page.natural,
                },
                dims,
            );
            session.handles.insert(slot, handle);
        }

        session.state = PreloadState::MosaicPopulated;
        debug!(
            "Preload mosaic populated with {slot} pages at {}x{}",
            dims.width, dims.height
        );
        dims
    }

    /// Size the preload, pad it to `num_pages` placeholders and reveal it.
    ///
    /// Returns false without touching the view when there is nothing to
    /// show, or when the real document already loaded (which starts the
    /// hide instead).
    pub fn scale_and_show_preload(&mut self, width: u32, height: u32, num_pages: u32) -> bool {
        if !self.session.as_ref().is_some_and(|s| s.state.is_active()) {
            return false;
        }
        if self.check_document_loaded() {
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.state == PreloadState::Hiding {
            return false;
        }

        let dims = ScaledDimensions::new(width, height);
        session.dimensions = Some(dims);
        session.view.width = Some(width);

        let element = session
            .view
            .preload
            .get_or_insert_with(PreloadElement::new);
        match element.placeholders.first_mut() {
            Some(first) => first.dimensions = Some(dims),
            None => element.push_blank(dims),
        }
        for _ in 1..num_pages {
            element.push_blank(dims);
        }
        element.invisible = false;

        let pages = element.placeholders.len();
        session.state = PreloadState::Showing;
        info!("Showing preload session {} with {pages} placeholders", session.id.0);
        self.emit(PreloadEvent::Preload { pages });
        true
    }

    /// Re-fit every placeholder to the container's current size
    pub fn resize(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.view.preload.is_none() {
            return;
        }
        let Some(source) = session.source_size() else {
            return;
        };

        let dims = scaled_dimensions(source, session.container.client_box(), &self.settings);
        session.dimensions = Some(dims);
        if let Some(element) = session.view.preload.as_mut() {
            element.apply_dimensions(dims);
        }
        debug!("Resized preload to {}x{}", dims.width, dims.height);
    }

    /// Start fading the preload out.
    ///
    /// The wrapper is removed on the first `transition_ended` or
    /// `wrapper_scrolled` afterwards.
    pub fn hide_preload(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.state == PreloadState::Hiding {
            return;
        }

        let scroll_top = session.view.scroll_top;
        if scroll_top > 0 {
            self.host.set_document_scroll_top(scroll_top);
        }
        session.view.transparent = true;
        session.state = PreloadState::Hiding;
        debug!("Hiding preload session {}", session.id.0);
        self.emit(PreloadEvent::Hidden);
    }

    /// The wrapper's fade-out transition finished
    pub fn transition_ended(&mut self) {
        if self.state() == PreloadState::Hiding {
            self.cleanup_preload();
        }
    }

    /// The user scrolled the preload wrapper.
    ///
    /// While hiding, the half-faded preload is removed at once so it never
    /// sits over real content during a scroll.
    pub fn wrapper_scrolled(&mut self, scroll_top: u32) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.view.scroll_top = scroll_top;
        if session.state == PreloadState::Hiding {
            self.cleanup_preload();
        }
    }

    /// Drop the session and release its resources. Safe to call repeatedly.
    pub fn cleanup_preload(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        let released = session.release_resources(&mut self.registry);
        self.resting_state = PreloadState::CleanedUp;
        debug!(
            "Cleaned up preload session {} ({released} resources released)",
            session.id.0
        );
        self.emit(PreloadEvent::CleanedUp);
    }

    fn check_document_loaded(&mut self) -> bool {
        if self.host.is_document_already_loaded() {
            self.hide_preload();
            return true;
        }
        false
    }

    fn emit(&self, event: PreloadEvent) {
        if let Some(events) = &self.events {
            if events.send(event).is_err() {
                debug!("Preload event receiver dropped");
            }
        }
    }
}
