pub mod fixtures {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::rc::Rc;

    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    use crate::preload::{BlobFetcher, ClientBox, FetchError, HostViewer, PreloadContainer};

    const EXIF_TAG_EXIF_IFD_POINTER: u16 = 0x8769;
    const EXIF_TAG_USER_COMMENT: u16 = 0x9286;
    const TIFF_TYPE_LONG: u16 = 4;
    const TIFF_TYPE_UNDEFINED: u16 = 7;

    /// Encode a flat grey JPEG of the given size
    pub fn plain_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 200, 200])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Jpeg)
            .expect("encoding a test JPEG should not fail");
        out.into_inner()
    }

    /// JPEG whose EXIF `UserComment` holds `comment`
    pub fn jpeg_with_comment(width: u32, height: u32, comment: &str) -> Vec<u8> {
        let jpeg = plain_jpeg(width, height);
        let tiff = exif_with_user_comment(comment);

        // APP1 segment goes right after SOI
        let mut app1 = Vec::new();
        app1.extend_from_slice(b"Exif\0\0");
        app1.extend_from_slice(&tiff);
        let segment_len = u16::try_from(app1.len() + 2).expect("test EXIF segment too large");

        let mut out = Vec::with_capacity(jpeg.len() + app1.len() + 4);
        out.extend_from_slice(&jpeg[..2]);
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&segment_len.to_be_bytes());
        out.extend_from_slice(&app1);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    /// Minimal little-endian TIFF block: IFD0 pointing at an Exif IFD with
    /// a single `UserComment` entry in the ASCII character set
    pub fn exif_with_user_comment(comment: &str) -> Vec<u8> {
        let mut value = b"ASCII\0\0\0".to_vec();
        value.extend_from_slice(comment.as_bytes());
        let value_len = value.len() as u32;

        let ifd_size: u32 = 2 + 12 + 4;
        let ifd0_offset: u32 = 8;
        let exif_ifd_offset = ifd0_offset + ifd_size;
        let value_offset = exif_ifd_offset + ifd_size;

        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II");
        tiff.extend_from_slice(&42u16.to_le_bytes());
        tiff.extend_from_slice(&ifd0_offset.to_le_bytes());

        // IFD0
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&EXIF_TAG_EXIF_IFD_POINTER.to_le_bytes());
        tiff.extend_from_slice(&TIFF_TYPE_LONG.to_le_bytes());
        tiff.extend_from_slice(&1u32.to_le_bytes());
        tiff.extend_from_slice(&exif_ifd_offset.to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());

        // Exif IFD
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&EXIF_TAG_USER_COMMENT.to_le_bytes());
        tiff.extend_from_slice(&TIFF_TYPE_UNDEFINED.to_le_bytes());
        tiff.extend_from_slice(&value_len.to_le_bytes());
        tiff.extend_from_slice(&value_offset.to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());

        tiff.extend_from_slice(&value);
        tiff
    }

    /// In-memory fetcher serving canned bytes per URL; unknown URLs 404.
    ///
    /// Clones share the same script and call log.
    #[derive(Clone, Debug, Default)]
    pub struct ScriptedFetcher {
        pages: Rc<RefCell<HashMap<String, Vec<u8>>>>,
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl ScriptedFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(self, url: &str, bytes: Vec<u8>) -> Self {
            self.pages.borrow_mut().insert(url.to_string(), bytes);
            self
        }

        /// URLs requested so far, in call order
        pub fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl BlobFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.borrow_mut().push(url.to_string());
            let bytes = self.pages.borrow().get(url).cloned();
            bytes.ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    /// Host that records what the preload asked of it
    #[derive(Debug, Default)]
    pub struct RecordingHost {
        pub document_loaded: bool,
        pub thumbnail_inits: usize,
        pub document_scroll_top: Option<u32>,
    }

    impl HostViewer for RecordingHost {
        fn is_document_already_loaded(&self) -> bool {
            self.document_loaded
        }

        fn init_thumbnails(&mut self) {
            self.thumbnail_inits += 1;
        }

        fn set_document_scroll_top(&mut self, scroll_top: u32) {
            self.document_scroll_top = Some(scroll_top);
        }
    }

    /// Container whose size the test can change after handing it over
    #[derive(Clone, Debug, Default)]
    pub struct SharedContainer {
        client: Rc<Cell<ClientBox>>,
    }

    impl SharedContainer {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                client: Rc::new(Cell::new(ClientBox::new(width, height))),
            }
        }

        pub fn set(&self, width: u32, height: u32) {
            self.client.set(ClientBox::new(width, height));
        }
    }

    impl PreloadContainer for SharedContainer {
        fn client_box(&self) -> ClientBox {
            self.client.get()
        }
    }
}
