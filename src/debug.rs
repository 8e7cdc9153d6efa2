//! Debug view of a state grid.
//!
//! Each slot becomes one pixel, channels mapped from `[-1, 1]` to `[0, 255]`.
//! Even columns show position (rgb) and phase (alpha is forced opaque), odd
//! columns show velocity.

use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::error::DebugError;
use crate::grid::StateGrid;

#[inline]
fn to_byte(value: f32) -> u8 {
    (((value.clamp(-1.0, 1.0) + 1.0) * 0.5) * 255.0).round() as u8
}

/// Render `grid` as a `width x height` RGBA image.
pub fn grid_to_image(grid: &StateGrid) -> RgbaImage {
    let layout = grid.layout();
    RgbaImage::from_fn(layout.width(), layout.height(), |x, y| {
        let [r, g, b, _] = grid.slot(x, y);
        Rgba([to_byte(r), to_byte(g), to_byte(b), 255])
    })
}

/// Write the debug view of `grid` to `path` as PNG.
pub fn save_png(grid: &StateGrid, path: impl AsRef<Path>) -> Result<(), DebugError> {
    let path = path.as_ref();
    grid_to_image(grid).save_with_format(path, image::ImageFormat::Png)?;
    log::info!("Wrote state grid debug view to {}", path.display());
    Ok(())
}
