//! One preload cycle and its lifecycle state

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::host::PreloadContainer;
use super::resources::{ResourceHandle, ResourceRegistry};
use super::types::{DocumentGeometry, NaturalSize, ScaledDimensions, SourceSize};
use super::view::PreloadView;

/// Identifies a session so late fetch results can be matched or dropped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(pub u64);

/// Lifecycle of a preload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreloadState {
    Idle,
    Fetching,
    RenderingFirstPage,
    MosaicPopulated,
    Showing,
    Hiding,
    CleanedUp,
}

impl PreloadState {
    /// Whether a session in this state still owns a wrapper
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Idle | Self::CleanedUp)
    }
}

pub struct PreloadSession {
    pub id: SessionId,
    pub container: Box<dyn PreloadContainer>,
    /// Page count the host asked for
    pub page_count: u32,
    /// Resource handles keyed by contiguous 1-based slot
    pub handles: BTreeMap<u32, ResourceHandle>,
    /// Embedded geometry, `None` when the natural-size fallback is in use
    pub geometry: Option<DocumentGeometry>,
    /// Decoded size of the primary page image
    pub primary_natural: Option<NaturalSize>,
    pub dimensions: Option<ScaledDimensions>,
    pub created_at: Instant,
    pub loaded_at: Option<Instant>,
    pub state: PreloadState,
    pub view: PreloadView,
}

impl PreloadSession {
    #[must_use]
    pub fn new(id: SessionId, container: Box<dyn PreloadContainer>, page_count: u32) -> Self {
        Self {
            id,
            container,
            page_count,
            handles: BTreeMap::new(),
            geometry: None,
            primary_natural: None,
            dimensions: None,
            created_at: Instant::now(),
            loaded_at: None,
            state: PreloadState::Fetching,
            view: PreloadView::new(),
        }
    }

    /// What placeholders are scaled from: embedded geometry when known,
    /// otherwise the primary image's natural size
    #[must_use]
    pub fn source_size(&self) -> Option<SourceSize> {
        self.geometry
            .map(|g| g.source_size())
            .or_else(|| self.primary_natural.map(NaturalSize::as_source))
    }

    /// Time from session creation until every page was processed
    #[must_use]
    pub fn load_elapsed(&self) -> Option<Duration> {
        self.loaded_at
            .map(|loaded| loaded.saturating_duration_since(self.created_at))
    }

    /// Release every held handle, returning how many were released
    pub fn release_resources(&mut self, registry: &mut ResourceRegistry) -> usize {
        let handles = std::mem::take(&mut self.handles);
        handles
            .into_values()
            .map(|handle| registry.release(handle))
            .filter(|released| *released)
            .count()
    }
}

impl fmt::Debug for PreloadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreloadSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("page_count", &self.page_count)
            .field("handles", &self.handles.len())
            .field("geometry", &self.geometry)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}
