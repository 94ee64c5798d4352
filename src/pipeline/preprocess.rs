//! Mode-driven image preprocessing for DeepSeek-OCR.
//!
//! Every inference call sees one *global* view of the page. In crop mode,
//! pages larger than a single tile are additionally cut into a grid of
//! square *local* tiles so fine print survives the downscaling of the global
//! view. The grid is the one whose aspect ratio is closest to the page's,
//! among grids of [`MIN_TILES`]..=[`MAX_TILES`] tiles.
//!
//! | Mode   | Global view          | Tiles      | Vision tokens   |
//! |--------|----------------------|------------|-----------------|
//! | Tiny   | resize to 512²       | –          | 64              |
//! | Small  | resize to 640²       | –          | 100             |
//! | Base   | letterbox to 1024²   | –          | 256             |
//! | Large  | letterbox to 1280²   | –          | 400             |
//! | Gundam | letterbox to 1024²   | n × 640²   | 256 + 100·n     |

use crate::config::ModeParams;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Fewest tiles a crop grid may have.
pub const MIN_TILES: u32 = 2;
/// Most tiles a crop grid may have.
pub const MAX_TILES: u32 = 9;
/// Pages at or below this size on both sides are never tiled.
pub const TILE_THRESHOLD: u32 = 640;
/// Largest side that is resized rather than letterboxed.
const RESIZE_LIMIT: u32 = 640;
/// Letterbox fill: the model's normalisation mean (0.5) in 8-bit.
pub const PAD_COLOR: Rgb<u8> = Rgb([127, 127, 127]);
/// Pixels per vision token side (16 px patches, 4× token compression).
const PIXELS_PER_TOKEN_SIDE: u32 = 64;

/// Views handed to the model for one page.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub global: RgbImage,
    /// Local tiles in row-major order; empty unless cropping applied.
    pub tiles: Vec<RgbImage>,
    /// `(columns, rows)` of the tile grid; `(1, 1)` without tiles.
    pub grid: (u32, u32),
}

impl PreparedImage {
    /// Vision tokens the model spends on this page.
    pub fn vision_tokens(&self) -> u32 {
        let tile_tokens: u32 = self.tiles.iter().map(|t| tokens_for_side(t.width())).sum();
        tokens_for_side(self.global.width()) + tile_tokens
    }

    /// Global view first, then tiles.
    pub fn views(&self) -> impl Iterator<Item = &RgbImage> {
        std::iter::once(&self.global).chain(self.tiles.iter())
    }
}

fn tokens_for_side(side: u32) -> u32 {
    let n = side / PIXELS_PER_TOKEN_SIDE;
    n * n
}

/// Build the global view and, in crop mode, the local tiles.
pub fn prepare(image: &RgbImage, params: ModeParams) -> PreparedImage {
    if !params.crop_mode {
        let global = if params.base_size <= RESIZE_LIMIT {
            imageops::resize(
                image,
                params.image_size,
                params.image_size,
                FilterType::CatmullRom,
            )
        } else {
            letterbox(image, params.base_size)
        };
        return PreparedImage {
            global,
            tiles: Vec::new(),
            grid: (1, 1),
        };
    }

    let global = letterbox(image, params.base_size);
    let (width, height) = image.dimensions();
    if width <= TILE_THRESHOLD && height <= TILE_THRESHOLD {
        return PreparedImage {
            global,
            tiles: Vec::new(),
            grid: (1, 1),
        };
    }

    let grid = closest_grid(width, height, params.image_size);
    let tiles = split_tiles(image, grid, params.image_size);
    PreparedImage {
        global,
        tiles,
        grid,
    }
}

/// Scale to fit a `side`² square, preserving aspect ratio, centred on grey.
pub fn letterbox(image: &RgbImage, side: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let scale = side as f64 / width.max(height) as f64;
    let new_w = ((width as f64 * scale).round() as u32).clamp(1, side);
    let new_h = ((height as f64 * scale).round() as u32).clamp(1, side);

    let resized = imageops::resize(image, new_w, new_h, FilterType::CatmullRom);
    let mut canvas = RgbImage::from_pixel(side, side, PAD_COLOR);
    let x = ((side - new_w) / 2) as i64;
    let y = ((side - new_h) / 2) as i64;
    imageops::overlay(&mut canvas, &resized, x, y);
    canvas
}

/// Candidate `(columns, rows)` grids ordered by tile count.
fn candidate_grids() -> Vec<(u32, u32)> {
    let mut grids = Vec::new();
    for count in MIN_TILES..=MAX_TILES {
        for cols in 1..=count {
            if count % cols == 0 {
                grids.push((cols, count / cols));
            }
        }
    }
    grids
}

/// Grid whose aspect ratio best matches `width / height`.
///
/// On a tie the larger grid wins when the page has more than half the pixels
/// that grid would cover.
pub fn closest_grid(width: u32, height: u32, tile_size: u32) -> (u32, u32) {
    let aspect = width as f64 / height as f64;
    let area = width as f64 * height as f64;

    let mut best = (1, 1);
    let mut best_diff = f64::INFINITY;
    for (cols, rows) in candidate_grids() {
        let diff = (aspect - cols as f64 / rows as f64).abs();
        if diff < best_diff {
            best_diff = diff;
            best = (cols, rows);
        } else if diff == best_diff {
            let covered = 0.5 * (tile_size * tile_size) as f64 * (cols * rows) as f64;
            if area > covered {
                best = (cols, rows);
            }
        }
    }
    best
}

fn split_tiles(image: &RgbImage, (cols, rows): (u32, u32), tile_size: u32) -> Vec<RgbImage> {
    let resized = imageops::resize(
        image,
        tile_size * cols,
        tile_size * rows,
        FilterType::CatmullRom,
    );

    let mut tiles = Vec::with_capacity((cols * rows) as usize);
    for row in 0..rows {
        for col in 0..cols {
            let tile = imageops::crop_imm(
                &resized,
                col * tile_size,
                row * tile_size,
                tile_size,
                tile_size,
            )
            .to_image();
            tiles.push(tile);
        }
    }
    tiles
}
