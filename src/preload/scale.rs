//! Placeholder sizing
//!
//! Mirrors the full renderer's automatic page-fit so the preload occupies
//! the same box the real pages will.

use super::types::{ClientBox, ScaledDimensions, SourceSize};
use crate::settings::PreloadSettings;

/// Scale factor the full renderer would pick for `source` inside `client`
#[must_use]
pub fn fit_scale(source: SourceSize, client: ClientBox, settings: &PreloadSettings) -> f64 {
    let width_scale = (f64::from(client.width) - settings.width_padding_px) / source.width;
    let height_scale = (f64::from(client.height) - settings.height_padding_px) / source.height;

    let scale = if source.is_landscape() {
        height_scale.min(width_scale)
    } else {
        width_scale
    };

    match settings.max_zoom_scale {
        Some(max) => scale.min(max),
        None => scale,
    }
}

/// Placeholder pixel size for `source`, floored to whole pixels
#[must_use]
pub fn scaled_dimensions(
    source: SourceSize,
    client: ClientBox,
    settings: &PreloadSettings,
) -> ScaledDimensions {
    let scale = fit_scale(source, client, settings);
    ScaledDimensions::new(
        floor_px(scale * source.width),
        floor_px(scale * source.height),
    )
}

fn floor_px(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.floor().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}
