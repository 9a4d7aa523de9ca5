//! Core geometry types for document preloads

use serde::Serialize;

/// PDF points to CSS pixels (96 dpi / 72 pt per inch)
pub const CSS_UNITS: f64 = 96.0 / 72.0;

/// Horizontal space the full renderer reserves around a page
pub const WIDTH_PADDING_PX: f64 = 40.0;

/// Vertical space the full renderer reserves around a page
pub const HEIGHT_PADDING_PX: f64 = 5.0;

/// Upper bound for the automatic fit-to-width zoom
pub const MAX_AUTO_SCALE: f64 = 1.25;

/// Maximum number of page images fetched for one preload
pub const MAX_PRELOAD_PAGES: usize = 8;

/// Accepted difference between the document ratio and the image ratio
pub const ACCEPTABLE_RATIO_DIFFERENCE: f64 = 0.025;

/// Token in a paged preload URL replaced by `<page>.png`
pub const PAGE_URL_TOKEN: &str = "asset_url";

/// True document geometry read from the preload image metadata.
///
/// Width and height are CSS pixels, already converted from PDF points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DocumentGeometry {
    /// Page width in CSS pixels
    pub pdf_width: f64,
    /// Page height in CSS pixels
    pub pdf_height: f64,
    /// Total number of pages in the document
    pub num_pages: u32,
}

impl DocumentGeometry {
    #[must_use]
    pub const fn source_size(&self) -> SourceSize {
        SourceSize::new(self.pdf_width, self.pdf_height)
    }
}

/// Width and height of whatever the placeholder is scaled from
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SourceSize {
    pub width: f64,
    pub height: f64,
}

impl SourceSize {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Landscape sources must also fit the available height
    #[must_use]
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// Pixel dimensions of a decoded preload image
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct NaturalSize {
    pub width: u32,
    pub height: u32,
}

impl NaturalSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn as_source(self) -> SourceSize {
        SourceSize::new(f64::from(self.width), f64::from(self.height))
    }

    /// Width over height, `None` for degenerate images
    #[must_use]
    pub fn ratio(self) -> Option<f64> {
        if self.height == 0 {
            None
        } else {
            Some(f64::from(self.width) / f64::from(self.height))
        }
    }
}

/// Inner size of the element the preload is laid out in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClientBox {
    pub width: u32,
    pub height: u32,
}

impl ClientBox {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Placeholder size in whole pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScaledDimensions {
    pub width: u32,
    pub height: u32,
}

impl ScaledDimensions {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}
