//! Retained placeholder tree owned by the lifecycle manager
//!
//! Hosts read it to paint; only the manager mutates it.

use serde::Serialize;

use super::resources::ResourceKey;
use super::types::{NaturalSize, ScaledDimensions};

/// Outer wrapper attached to the host container
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PreloadView {
    /// Wrapper width in pixels, set once the first page is sized
    pub width: Option<u32>,
    /// Fading out after `hide_preload`
    pub transparent: bool,
    /// Vertical scroll offset of the preload in pixels
    pub scroll_top: u32,
    /// Page mosaic, attached once the fetch batch settles
    pub preload: Option<PreloadElement>,
}

impl PreloadView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach_preload(&mut self, element: PreloadElement) -> &mut PreloadElement {
        self.preload.insert(element)
    }
}

/// Container of page placeholders
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PreloadElement {
    /// Hidden until sized
    pub invisible: bool,
    pub placeholders: Vec<Placeholder>,
}

impl Default for PreloadElement {
    fn default() -> Self {
        Self {
            invisible: true,
            placeholders: Vec::new(),
        }
    }
}

impl PreloadElement {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&mut self, page: u32, image: PlaceholderImage, dims: ScaledDimensions) {
        self.placeholders.push(Placeholder {
            page: Some(page),
            image: Some(image),
            dimensions: Some(dims),
            loaded: true,
        });
    }

    /// Append an empty block standing in for a page without an image
    pub fn push_blank(&mut self, dims: ScaledDimensions) {
        self.placeholders.push(Placeholder {
            page: None,
            image: None,
            dimensions: Some(dims),
            loaded: false,
        });
    }

    pub fn apply_dimensions(&mut self, dims: ScaledDimensions) {
        for placeholder in &mut self.placeholders {
            placeholder.dimensions = Some(dims);
        }
    }

    /// Page numbers of image placeholders, in mosaic order
    #[must_use]
    pub fn page_numbers(&self) -> Vec<u32> {
        self.placeholders.iter().filter_map(|p| p.page).collect()
    }
}

/// One page slot in the mosaic
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Placeholder {
    /// Document page number the image was requested for
    pub page: Option<u32>,
    pub image: Option<PlaceholderImage>,
    pub dimensions: Option<ScaledDimensions>,
    pub loaded: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PlaceholderImage {
    pub resource: ResourceKey,
    pub natural: NaturalSize,
}
