//! Document geometry embedded in preload image EXIF
//!
//! The conversion service writes the source document's page size and page
//! count into the `UserComment` tag of the first page image, e.g.
//! `pdfWidth:612pts,pdfHeight:792pts,numPages:12`. Anything that deviates
//! from that pattern is treated as absent metadata.

use std::io::Cursor;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use super::types::{DocumentGeometry, NaturalSize};
use crate::settings::PreloadSettings;

static GEOMETRY_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"pdfWidth:([0-9.]+)pts,pdfHeight:([0-9.]+)pts,numPages:([0-9]+)")
        .expect("Failed to compile geometry comment regex")
});

/// Reasons embedded geometry could not be used
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("error reading EXIF data: {0}")]
    Exif(#[from] exif::Error),

    #[error("no EXIF user comment found")]
    MissingComment,

    #[error("no valid geometry found in EXIF user comment")]
    NoMatch,

    #[error("EXIF num pages data is invalid")]
    InvalidPageCount,

    #[error("EXIF PDF width and height are invalid")]
    InvalidDimensions,
}

/// Read, parse and validate the geometry embedded in `bytes`.
///
/// `natural` is the decoded size of the same image; it is used to detect
/// rotated documents whose width and height were recorded swapped.
pub fn extract_geometry(
    bytes: &[u8],
    natural: NaturalSize,
    settings: &PreloadSettings,
) -> Result<DocumentGeometry, MetadataError> {
    let comment = read_user_comment(bytes)?;
    let geometry = parse_geometry_comment(&comment, settings.css_units)?;
    correct_orientation(geometry, natural, settings.ratio_tolerance)
}

/// Raw `UserComment` contents, character code per byte
pub fn read_user_comment(bytes: &[u8]) -> Result<String, MetadataError> {
    let mut cursor = Cursor::new(bytes);
    let exif = exif::Reader::new().read_from_container(&mut cursor)?;

    let field = exif
        .get_field(exif::Tag::UserComment, exif::In::PRIMARY)
        .ok_or(MetadataError::MissingComment)?;

    let raw: Vec<u8> = match field.value {
        exif::Value::Undefined(ref data, _) => data.clone(),
        exif::Value::Ascii(ref parts) => parts.concat(),
        _ => return Err(MetadataError::MissingComment),
    };

    Ok(raw.iter().map(|&b| char::from(b)).collect())
}

/// Parse the geometry pattern out of a comment, converting points to pixels
pub fn parse_geometry_comment(
    comment: &str,
    css_units: f64,
) -> Result<DocumentGeometry, MetadataError> {
    let caps = GEOMETRY_COMMENT_RE
        .captures(comment)
        .ok_or(MetadataError::NoMatch)?;

    let (Some(width), Some(height), Some(pages)) = (caps.get(1), caps.get(2), caps.get(3)) else {
        return Err(MetadataError::NoMatch);
    };

    let width: f64 = width.as_str().parse().map_err(|_| MetadataError::NoMatch)?;
    let height: f64 = height.as_str().parse().map_err(|_| MetadataError::NoMatch)?;
    let num_pages: u32 = pages.as_str().parse().map_err(|_| MetadataError::NoMatch)?;

    if num_pages == 0 {
        return Err(MetadataError::InvalidPageCount);
    }

    Ok(DocumentGeometry {
        pdf_width: width * css_units,
        pdf_height: height * css_units,
        num_pages,
    })
}

/// Check the document ratio against the image ratio, swapping width and
/// height when only the rotated ratio fits
pub fn correct_orientation(
    geometry: DocumentGeometry,
    natural: NaturalSize,
    tolerance: f64,
) -> Result<DocumentGeometry, MetadataError> {
    let DocumentGeometry {
        pdf_width,
        pdf_height,
        num_pages,
    } = geometry;

    if !(pdf_width > 0.0 && pdf_height > 0.0) {
        return Err(MetadataError::InvalidDimensions);
    }
    let image_ratio = natural.ratio().ok_or(MetadataError::InvalidDimensions)?;

    let pdf_ratio = pdf_width / pdf_height;
    if (pdf_ratio - image_ratio).abs() <= tolerance {
        return Ok(geometry);
    }

    let rotated_ratio = pdf_height / pdf_width;
    if (rotated_ratio - image_ratio).abs() > tolerance {
        return Err(MetadataError::InvalidDimensions);
    }

    debug!("Embedded geometry looks rotated, swapping {pdf_width}x{pdf_height}");
    Ok(DocumentGeometry {
        pdf_width: pdf_height,
        pdf_height: pdf_width,
        num_pages,
    })
}
