//! Document preload infrastructure

mod acquire;
mod fetch;
mod host;
mod manager;
pub mod metadata;
mod resources;
pub mod scale;
mod session;
mod types;
mod view;

pub use acquire::{
    AcquireError, AcquiredBatch, BlobFetcher, FetchError, FetchedPage, PageError, PageFailure,
    PageRequest, acquire_pages, decode_natural_size, page_url, plan_requests,
};
pub use fetch::DefaultFetcher;
pub use host::{FixedContainer, HostViewer, PreloadContainer, PreloadEvent};
pub use manager::{PendingPreload, PreloadError, PreloadManager, PreloadOutcome, PreloadRequest};
pub use metadata::MetadataError;
pub use resources::{ResourceHandle, ResourceKey, ResourceRegistry};
pub use session::{PreloadSession, PreloadState, SessionId};
pub use types::*;
pub use view::{Placeholder, PlaceholderImage, PreloadElement, PreloadView};
