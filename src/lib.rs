// Export modules for use in tests
pub mod panic_handler;
pub mod preload;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export the lifecycle entry points
pub use preload::{PreloadManager, PreloadOutcome, PreloadRequest};
pub use settings::PreloadSettings;
