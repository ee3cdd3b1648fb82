// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contrast-limited adaptive histogram equalisation (CLAHE).

use image::{GrayImage, Luma};

/// Equalise `gray` tile by tile with clipped histograms.
///
/// The image is split into at most `tiles x tiles` regions. Each region gets
/// a lookup table built from its histogram, clipped at
/// `max(clip_limit * area / 256, 1)` with the excess spread over all bins.
/// Every pixel is mapped through the four nearest tables and the results are
/// blended bilinearly, which keeps tile borders invisible.
///
/// Lookup tables are monotone, so the order of grey levels within a tile is
/// preserved.
pub fn equalize_adaptive(gray: &GrayImage, tiles: u32, clip_limit: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 || tiles == 0 {
        return gray.clone();
    }

    let tile_w = w.div_ceil(tiles).max(1);
    let tile_h = h.div_ceil(tiles).max(1);
    let tiles_x = w.div_ceil(tile_w);
    let tiles_y = h.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);
            luts.push(tile_lut(gray, x0, y0, x1, y1, clip_limit));
        }
    }

    let inv_tw = 1.0 / tile_w as f32;
    let inv_th = 1.0 / tile_h as f32;
    let last_x = tiles_x as i64 - 1;
    let last_y = tiles_y as i64 - 1;

    GrayImage::from_fn(w, h, |x, y| {
        let v = gray.get_pixel(x, y)[0] as usize;

        let fx = x as f32 * inv_tw - 0.5;
        let fy = y as f32 * inv_th - 0.5;
        let gx = fx.floor();
        let gy = fy.floor();
        let ax = fx - gx;
        let ay = fy - gy;

        let tx0 = (gx as i64).clamp(0, last_x) as usize;
        let tx1 = (gx as i64 + 1).clamp(0, last_x) as usize;
        let ty0 = (gy as i64).clamp(0, last_y) as usize;
        let ty1 = (gy as i64 + 1).clamp(0, last_y) as usize;
        let row = tiles_x as usize;

        let top =
            luts[ty0 * row + tx0][v] as f32 * (1.0 - ax) + luts[ty0 * row + tx1][v] as f32 * ax;
        let bottom =
            luts[ty1 * row + tx0][v] as f32 * (1.0 - ax) + luts[ty1 * row + tx1][v] as f32 * ax;
        let blended = top * (1.0 - ay) + bottom * ay;

        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Clipped-histogram lookup table of the region `[x0, x1) x [y0, y1)`.
fn tile_lut(gray: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y)[0] as usize] += 1;
        }
    }
    let area = (x1 - x0) * (y1 - y0);

    let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }

    let per_bin = excess / 256;
    let mut residual = excess % 256;
    for bin in hist.iter_mut() {
        *bin += per_bin;
    }
    if residual > 0 {
        let step = (256 / residual).max(1) as usize;
        let mut i = 0;
        while i < 256 && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0u8; 256];
    let mut cumulative = 0u32;
    for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
        cumulative += count;
        *entry = (cumulative as f32 * scale).round().min(255.0) as u8;
    }
    lut
}
