//! Categorical map rendering for a single time slice.

use image::{Rgba as Px, RgbaImage};
use landflow_core::{ClassRegistry, LabelGrid};

/// Colour for cells that carry no registered class.
const NO_CLASS: Px<u8> = Px([0, 0, 0, 0]);

/// Paint each cell with its class colour. Sentinel and unregistered codes
/// are left transparent.
pub fn render_map(grid: &LabelGrid, registry: &ClassRegistry) -> RgbaImage {
    let mut img = RgbaImage::new(grid.width as u32, grid.height as u32);
    for r in 0..grid.height {
        for c in 0..grid.width {
            let code = grid.get(r, c);
            let px = if grid.is_nodata(code) {
                NO_CLASS
            } else {
                registry.color(code).map_or(NO_CLASS, |rgba| Px(rgba.to_rgba8()))
            };
            img.put_pixel(c as u32, r as u32, px);
        }
    }
    img
}
