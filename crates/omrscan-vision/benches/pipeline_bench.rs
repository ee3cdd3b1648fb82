// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the omrscan-vision grading pipeline.
// Covers the full pipeline on a synthetic sheet and the binarizer on its own,
// since CLAHE and morphology dominate the per-sheet cost.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::GrayImage;

use omrscan_core::{ProcessorConfig, ScanRequest};
use omrscan_vision::synthetic::SyntheticSheet;
use omrscan_vision::{Binarizer, process_with};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Grade a 20-question, 4-option synthetic sheet at the default resolution.
fn bench_full_pipeline(c: &mut Criterion) {
    let key: Vec<Option<u32>> = (0..20).map(|q| Some(q % 4)).collect();
    let png = SyntheticSheet::new(20, 4)
        .with_key(&key)
        .to_png()
        .expect("synthetic sheet encodes");
    let config = ProcessorConfig::default();
    let request = ScanRequest::new(20, 4).with_min_pixel_threshold(200);

    c.bench_function("process (20x4 synthetic sheet)", |b| {
        b.iter(|| {
            let result = process_with(&config, black_box(&png), &request);
            black_box(result.ok());
        });
    });
}

/// Binarize a 1240x1240 grayscale sheet.
fn bench_binarize(c: &mut Criterion) {
    let photo = SyntheticSheet::new(10, 4).render();
    let gray: GrayImage = image::imageops::grayscale(&photo);
    let binarizer = Binarizer::new(&ProcessorConfig::default());

    c.bench_function("binarize (synthetic sheet)", |b| {
        b.iter(|| black_box(binarizer.binarize(black_box(&gray))));
    });
}

criterion_group!(benches, bench_full_pipeline, bench_binarize);
criterion_main!(benches);
