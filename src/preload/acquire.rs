//! Page image acquisition
//!
//! The first page is fetched from the primary preload URL and is required:
//! it carries the embedded document geometry. Further pages come from a
//! templated URL and are optional; a failed page is reported per page and
//! left out of the mosaic.

use futures::future::{join_all, try_join};
use image::GenericImageView;
use log::{debug, warn};

use super::types::NaturalSize;
use crate::settings::PreloadSettings;

/// Errors from the blob fetch layer
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {detail}")]
    Request { url: String, detail: String },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn request(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Request {
            url: url.into(),
            detail: detail.into(),
        }
    }
}

/// Fetches a URL as raw bytes
#[allow(async_fn_in_trait)]
pub trait BlobFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Why a single page could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("image failed to decode: {0}")]
    Decode(#[from] image::ImageError),
}

/// Errors that abort a whole acquisition
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("primary preload page {url} failed: {source}")]
    Primary {
        url: String,
        #[source]
        source: PageError,
    },

    #[error("no pages requested")]
    NoRequests,
}

/// One page image to fetch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    /// Document page number (1-based)
    pub page: u32,
    pub url: String,
}

/// A fetched and decoded page image
#[derive(Clone, Debug)]
pub struct FetchedPage {
    pub page: u32,
    pub bytes: Vec<u8>,
    pub natural: NaturalSize,
}

/// A page that could not be loaded
#[derive(Debug)]
pub struct PageFailure {
    pub page: u32,
    pub url: String,
    pub error: PageError,
}

/// Settled result of one acquisition, secondary pages in request order
#[derive(Debug)]
pub struct AcquiredBatch {
    pub primary: FetchedPage,
    pub secondary: Vec<Result<FetchedPage, PageFailure>>,
}

impl AcquiredBatch {
    /// Successfully loaded pages, primary first, in request order
    pub fn into_loaded_pages(self) -> impl Iterator<Item = FetchedPage> {
        std::iter::once(self.primary).chain(self.secondary.into_iter().filter_map(|result| {
            match result {
                Ok(page) => Some(page),
                Err(failure) => {
                    warn!(
                        "Omitting preload page {} ({}): {}",
                        failure.page, failure.url, failure.error
                    );
                    None
                }
            }
        }))
    }
}

/// URL of `page` derived from a paged preload template
#[must_use]
pub fn page_url(template: &str, token: &str, page: u32) -> String {
    template.replacen(token, &format!("{page}.png"), 1)
}

/// Requests for one preload: the primary page plus templated pages up to
/// the configured cap
#[must_use]
pub fn plan_requests(
    primary_url: &str,
    paged_template: Option<&str>,
    page_count: u32,
    settings: &PreloadSettings,
) -> Vec<PageRequest> {
    let mut requests = vec![PageRequest {
        page: 1,
        url: primary_url.to_string(),
    }];

    let Some(template) = paged_template.filter(|t| !t.is_empty()) else {
        return requests;
    };

    let cap = u32::try_from(settings.max_preload_pages).unwrap_or(u32::MAX);
    let count = page_count.min(cap);
    requests.extend((2..=count).map(|page| PageRequest {
        page,
        url: page_url(template, &settings.page_token, page),
    }));

    requests
}

/// Issue all requests concurrently and wait for the batch to settle.
///
/// Fails fast when the primary page fails; secondary failures are kept in
/// the batch as per-page errors.
pub async fn acquire_pages<F: BlobFetcher>(
    fetcher: &F,
    requests: Vec<PageRequest>,
) -> Result<AcquiredBatch, AcquireError> {
    let mut requests = requests.into_iter();
    let primary = requests.next().ok_or(AcquireError::NoRequests)?;
    debug!(
        "Acquiring preload pages: primary {} plus {} more",
        primary.url,
        requests.len()
    );

    let primary_load = async {
        load_page(fetcher, primary)
            .await
            .map_err(|failure| AcquireError::Primary {
                url: failure.url,
                source: failure.error,
            })
    };
    let secondary_loads = async {
        Ok::<_, AcquireError>(join_all(requests.map(|request| load_page(fetcher, request))).await)
    };

    let (primary, secondary) = try_join(primary_load, secondary_loads).await?;
    Ok(AcquiredBatch { primary, secondary })
}

async fn load_page<F: BlobFetcher>(
    fetcher: &F,
    request: PageRequest,
) -> Result<FetchedPage, PageFailure> {
    let PageRequest { page, url } = request;

    let bytes = match fetcher.fetch(&url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return Err(PageFailure {
                page,
                url,
                error: e.into(),
            });
        }
    };

    match decode_natural_size(&bytes) {
        Ok(natural) => {
            debug!(
                "Loaded preload page {page}: {}x{} ({} bytes)",
                natural.width,
                natural.height,
                bytes.len()
            );
            Ok(FetchedPage {
                page,
                bytes,
                natural,
            })
        }
        Err(e) => Err(PageFailure {
            page,
            url,
            error: e.into(),
        }),
    }
}

/// Decode an image fully and report its pixel size
pub fn decode_natural_size(bytes: &[u8]) -> Result<NaturalSize, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let (width, height) = img.dimensions();
    Ok(NaturalSize::new(width, height))
}
