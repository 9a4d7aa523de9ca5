//! Seams to the surrounding viewer

use super::types::ClientBox;

/// The full document viewer the preload stands in for
pub trait HostViewer {
    /// Whether the real document has already rendered
    fn is_document_already_loaded(&self) -> bool;

    /// Called once every preload page has been processed
    fn init_thumbnails(&mut self);

    /// Scroll the real document so reading continues where the preload was
    fn set_document_scroll_top(&mut self, scroll_top: u32);
}

/// Element the preload wrapper is attached to
pub trait PreloadContainer {
    /// Current inner size; queried on every sizing pass
    fn client_box(&self) -> ClientBox;
}

/// Container with a size fixed at construction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedContainer(pub ClientBox);

impl PreloadContainer for FixedContainer {
    fn client_box(&self) -> ClientBox {
        self.0
    }
}

/// Lifecycle notifications sent to the host
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreloadEvent {
    /// The mosaic became visible
    Preload { pages: usize },
    /// The wrapper started fading out
    Hidden,
    /// The session was torn down
    CleanedUp,
}
