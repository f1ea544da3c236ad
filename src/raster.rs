//! # Rasterizer
//!
//! Evaluates the region fold once per pixel centre over an image grid. Rows are
//! split into chunks that rayon workers fill independently.

use std::sync::atomic::{AtomicBool, Ordering};

use glam::DVec2;
use log::debug;
use rayon::prelude::*;

use crate::error::Cancelled;
use crate::geometry::{contains_all, PixelRegion};

/// Chunks per rayon thread. More chunks than threads keeps workers busy when
/// some rows are cheaper than others.
const CHUNKS_PER_THREAD: usize = 3;

fn auto_chunk_rows(height: usize) -> usize {
    let num_chunks = rayon::current_num_threads() * CHUNKS_PER_THREAD;
    (height / num_chunks).max(1)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Image coordinate of the centre of array element `(0, 0)`. FITS and DS9
    /// count pixels from 1, so element `(row, col)` sits at `(col + 1, row + 1)`.
    pub pixel_origin: f64,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self { pixel_origin: 1.0 }
    }
}

/// Row-major boolean grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    height: usize,
    width: usize,
    data: Vec<bool>,
}

impl Mask {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width, data: vec![false; height * width] }
    }

    /// `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<bool> {
        if row < self.height && col < self.width {
            Some(self.data[row * self.width + col])
        } else {
            None
        }
    }

    /// Number of `true` cells.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> + '_ {
        (0..self.height).map(move |row| &self.data[row * self.width..(row + 1) * self.width])
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<bool> {
        self.data
    }
}

/// Rasterizes with default options and no cancellation.
pub fn rasterize(regions: &[PixelRegion], shape: (usize, usize)) -> Mask {
    let mut mask = Mask::new(shape.0, shape.1);
    fill_rows(regions, &mut mask, &RasterOptions::default(), None);
    mask
}

/// Rasterizes `regions` over an image of `shape = (height, width)`.
///
/// `cancel` is polled before each chunk of rows; once it reads `true`, remaining
/// chunks are skipped and the call returns [`Cancelled`].
pub fn rasterize_with(
    regions: &[PixelRegion],
    shape: (usize, usize),
    options: &RasterOptions,
    cancel: Option<&AtomicBool>,
) -> Result<Mask, Cancelled> {
    let mut mask = Mask::new(shape.0, shape.1);
    if fill_rows(regions, &mut mask, options, cancel) {
        Ok(mask)
    } else {
        Err(Cancelled)
    }
}

/// Returns `false` when cancelled.
fn fill_rows(regions: &[PixelRegion], mask: &mut Mask, options: &RasterOptions, cancel: Option<&AtomicBool>) -> bool {
    let (height, width) = mask.shape();
    if regions.is_empty() || mask.data.is_empty() {
        return !is_set(cancel);
    }

    let chunk_rows = auto_chunk_rows(height);
    let origin = options.pixel_origin;
    let finished = mask
        .data
        .par_chunks_mut(width * chunk_rows)
        .enumerate()
        .try_for_each(|(chunk_index, chunk)| {
            if is_set(cancel) {
                return Err(Cancelled);
            }
            let first_row = chunk_index * chunk_rows;
            for (i, row) in chunk.chunks_mut(width).enumerate() {
                let y = (first_row + i) as f64 + origin;
                for (col, cell) in row.iter_mut().enumerate() {
                    *cell = contains_all(regions, DVec2::new(col as f64 + origin, y));
                }
            }
            Ok(())
        })
        .is_ok();

    if finished {
        debug!("rasterized {} regions over {height}x{width}: {} pixels set", regions.len(), mask.count());
    } else {
        debug!("rasterization of {height}x{width} cancelled");
    }
    finished
}

fn is_set(flag: Option<&AtomicBool>) -> bool {
    flag.is_some_and(|f| f.load(Ordering::Relaxed))
}
