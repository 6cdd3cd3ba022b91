//! End-to-end template matching on synthetic noise scenes.
//!
//! The layer is uniform noise with one exact copy of the template pasted at
//! `EXACT` and one copy blended 50/50 with the background at `BLENDED`. The
//! blended copy correlates at roughly 0.7, everything else well below 0.5.

use chipmatch::bank::Orientation;
use chipmatch::model::TemplateId;
use chipmatch::search::RegularGrid;
use chipmatch::{
    run_template_match, CandidateSource, ChipMatchError, GridConfig, GridMode, MatchCandidate,
    OrientationMode, OwnedImage, Rect, RunContext, TemplateMatchConfig, TemplateSource,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const IMG_W: usize = 160;
const IMG_H: usize = 120;
const TPL_W: usize = 24;
const TPL_H: usize = 20;
const EXACT: (usize, usize) = (20, 20);
const BLENDED: (usize, usize) = (100, 70);

/// Position tolerance in source pixels.
const POSITION_TOLERANCE_PX: f32 = 0.5;

fn noise(width: usize, height: usize, seed: u64) -> OwnedImage {
    let mut rng = StdRng::seed_from_u64(seed);
    OwnedImage::from_fn(width, height, |_, _| rng.random_range(0..=255)).unwrap()
}

fn paste(dst: &mut [u8], width: usize, tpl: &OwnedImage, at: (usize, usize), blend: bool) {
    for y in 0..tpl.height() {
        for x in 0..tpl.width() {
            let idx = (at.1 + y) * width + at.0 + x;
            let t = tpl.data()[y * tpl.width() + x];
            dst[idx] = if blend {
                ((u16::from(t) + u16::from(dst[idx]) + 1) / 2) as u8
            } else {
                t
            };
        }
    }
}

fn scene(tpl: &OwnedImage, with_blended: bool) -> OwnedImage {
    let mut data = noise(IMG_W, IMG_H, 5).data().to_vec();
    paste(&mut data, IMG_W, tpl, EXACT, false);
    if with_blended {
        paste(&mut data, IMG_W, tpl, BLENDED, true);
    }
    OwnedImage::new(data, IMG_W, IMG_H).unwrap()
}

fn source(tpl: &OwnedImage) -> [TemplateSource<'_>; 1] {
    [TemplateSource {
        source: CandidateSource::Template(TemplateId(3)),
        image: tpl.view(),
    }]
}

fn config(detect_threshold: f32) -> TemplateMatchConfig {
    TemplateMatchConfig {
        orientation: OrientationMode::Normal,
        climb_threshold: 0.5,
        detect_threshold,
        ..TemplateMatchConfig::default()
    }
}

fn run(
    image: &OwnedImage,
    tpl: &OwnedImage,
    cfg: &TemplateMatchConfig,
    grid: &GridConfig,
) -> Vec<MatchCandidate> {
    let region = Rect::full(image.width(), image.height());
    let detection =
        run_template_match(image.view(), region, &source(tpl), cfg, grid, &RunContext::new())
            .unwrap();
    assert!(!detection.cancelled);
    detection.items
}

fn is_at(c: &MatchCandidate, at: (usize, usize)) -> bool {
    (c.x - at.0 as f32).abs() <= POSITION_TOLERANCE_PX
        && (c.y - at.1 as f32).abs() <= POSITION_TOLERANCE_PX
}

#[test]
fn finds_exact_copy_with_unit_score() {
    let tpl = noise(TPL_W, TPL_H, 11);
    let image = scene(&tpl, false);
    let found = run(&image, &tpl, &config(0.7), &GridConfig::default());

    assert_eq!(found.len(), 1, "{found:?}");
    let best = found[0];
    assert!(is_at(&best, EXACT), "{best:?}");
    assert!(best.score > 0.99);
    assert_eq!((best.width, best.height), (TPL_W as f32, TPL_H as f32));
    assert_eq!(best.orientation, Orientation::Normal);
    assert_eq!(best.source, CandidateSource::Template(TemplateId(3)));
}

#[test]
fn raising_detect_threshold_only_removes_candidates() {
    let tpl = noise(TPL_W, TPL_H, 11);
    let image = scene(&tpl, true);
    let loose = run(&image, &tpl, &config(0.55), &GridConfig::default());
    let strict = run(&image, &tpl, &config(0.9), &GridConfig::default());

    assert_eq!(loose.len(), 2, "{loose:?}");
    assert_eq!(strict.len(), 1, "{strict:?}");
    for c in &strict {
        assert!(loose.iter().any(|l| l.x == c.x && l.y == c.y));
    }
    assert!(loose.iter().any(|c| is_at(c, BLENDED)));
    assert!(loose.iter().all(|c| c.score >= 0.55));
}

#[test]
fn candidates_are_sorted_and_truncated() {
    let tpl = noise(TPL_W, TPL_H, 11);
    let image = scene(&tpl, true);
    let all = run(&image, &tpl, &config(0.55), &GridConfig::default());
    assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(is_at(&all[0], EXACT));

    let cfg = TemplateMatchConfig {
        max_results: 1,
        ..config(0.55)
    };
    let top = run(&image, &tpl, &cfg, &GridConfig::default());
    assert_eq!(top, all[..1].to_vec());
}

#[test]
fn repeated_runs_are_identical() {
    let tpl = noise(TPL_W, TPL_H, 11);
    let image = scene(&tpl, true);
    let cfg = TemplateMatchConfig {
        orientation: OrientationMode::Any,
        ..config(0.55)
    };
    let first = run(&image, &tpl, &cfg, &GridConfig::default());
    let second = run(&image, &tpl, &cfg, &GridConfig::default());
    assert_eq!(first, second);
}

#[test]
fn flipped_copy_is_reported_with_its_orientation() {
    let tpl = noise(TPL_W, TPL_H, 11);
    let flipped = Orientation::FlipBoth.apply(tpl.view()).unwrap();
    let image = scene(&flipped, false);

    let cfg = TemplateMatchConfig {
        orientation: OrientationMode::Any,
        ..config(0.7)
    };
    let found = run(&image, &tpl, &cfg, &GridConfig::default());
    assert_eq!(found.len(), 1, "{found:?}");
    assert_eq!(found[0].orientation, Orientation::FlipBoth);
    assert!(is_at(&found[0], EXACT));

    let normal_only = run(&image, &tpl, &config(0.7), &GridConfig::default());
    assert!(normal_only.is_empty());
}

#[test]
fn scale_down_maps_back_to_source_pixels() {
    let tpl = noise(TPL_W, TPL_H, 11);
    let image = scene(&tpl, false);
    let cfg = TemplateMatchConfig {
        scale_down: 2.0,
        ..config(0.7)
    };
    let found = run(&image, &tpl, &cfg, &GridConfig::default());
    let best = found.first().expect("exact copy");
    assert!(is_at(best, EXACT), "{best:?}");
    assert!(best.score > 0.99);
    assert_eq!((best.width, best.height), (TPL_W as f32, TPL_H as f32));
}

#[test]
fn region_offsets_candidates() {
    let tpl = noise(TPL_W, TPL_H, 11);
    let image = scene(&tpl, false);
    let region = Rect::new(10, 12, 60, 50);
    let detection = run_template_match(
        image.view(),
        region,
        &source(&tpl),
        &config(0.7),
        &GridConfig::default(),
        &RunContext::new(),
    )
    .unwrap();
    assert_eq!(detection.len(), 1);
    assert!(is_at(&detection.items[0], EXACT));
}

#[test]
fn grid_rows_restrict_anchors() {
    let tpl = noise(TPL_W, TPL_H, 11);
    let image = scene(&tpl, true);
    let free = run(&image, &tpl, &config(0.55), &GridConfig::default());

    let cfg = TemplateMatchConfig {
        grid_mode: GridMode::AlongGridRows,
        ..config(0.55)
    };
    let on_rows = GridConfig {
        rows: Some(RegularGrid::new(20.0, 50.0)),
        columns: None,
    };
    let gridded = run(&image, &tpl, &cfg, &on_rows);
    assert!(gridded.iter().any(|c| is_at(c, EXACT)));
    for c in &gridded {
        assert!(free.iter().any(|f| f.x == c.x && f.y == c.y), "{c:?}");
    }

    let off_rows = GridConfig {
        rows: Some(RegularGrid::new(25.0, 50.0)),
        columns: None,
    };
    let missed = run(&image, &tpl, &cfg, &off_rows);
    assert!(missed.iter().all(|c| !is_at(c, EXACT)));
    assert!(missed.iter().all(|c| c.y == 25.0 || c.y == 75.0));
}

#[test]
fn extreme_grid_spacings_finish() {
    let tpl = noise(TPL_W, TPL_H, 11);
    let image = scene(&tpl, true);
    let cfg = TemplateMatchConfig {
        grid_mode: GridMode::AlongGridRows,
        ..config(0.55)
    };

    // Finer than a pixel: every row is a grid row.
    let dense = GridConfig {
        rows: Some(RegularGrid::new(0.0, 1e-6)),
        columns: None,
    };
    let found = run(&image, &tpl, &cfg, &dense);
    assert!(found.iter().any(|c| is_at(c, EXACT)), "{found:?}");

    // A single row inside the layer.
    let sparse = GridConfig {
        rows: Some(RegularGrid::new(EXACT.1 as f32, 1e9)),
        columns: None,
    };
    let found = run(&image, &tpl, &cfg, &sparse);
    assert!(found.iter().any(|c| is_at(c, EXACT)), "{found:?}");
    assert!(found.iter().all(|c| c.y == EXACT.1 as f32));
}

#[test]
fn grid_mode_requires_a_grid() {
    let tpl = noise(TPL_W, TPL_H, 11);
    let image = scene(&tpl, false);
    let cfg = TemplateMatchConfig {
        grid_mode: GridMode::AlongGridColumns,
        ..config(0.7)
    };
    let err = run_template_match(
        image.view(),
        Rect::full(IMG_W, IMG_H),
        &source(&tpl),
        &cfg,
        &GridConfig::default(),
        &RunContext::new(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, ChipMatchError::InvalidConfig { .. }));
}

#[test]
fn preflight_errors() {
    let tpl = noise(TPL_W, TPL_H, 11);
    let image = scene(&tpl, false);
    let grid = GridConfig::default();
    let ctx = RunContext::new();
    let full = Rect::full(IMG_W, IMG_H);

    let err = run_template_match(image.view(), full, &[], &config(0.7), &grid, &ctx)
        .err()
        .unwrap();
    assert_eq!(err, ChipMatchError::NoTemplateSelected);

    let small = Rect::new(0, 0, 20, 20);
    let err = run_template_match(image.view(), small, &source(&tpl), &config(0.7), &grid, &ctx)
        .err()
        .unwrap();
    assert!(matches!(err, ChipMatchError::TemplateTooLarge { .. }), "{err:?}");

    let outside = Rect::new(150, 0, 40, 40);
    let err = run_template_match(image.view(), outside, &source(&tpl), &config(0.7), &grid, &ctx)
        .err()
        .unwrap();
    assert!(matches!(err, ChipMatchError::InvalidRegion { .. }), "{err:?}");

    let flat = OwnedImage::new(vec![128; TPL_W * TPL_H], TPL_W, TPL_H).unwrap();
    let err = run_template_match(image.view(), full, &source(&flat), &config(0.7), &grid, &ctx)
        .err()
        .unwrap();
    assert!(matches!(err, ChipMatchError::DegenerateTemplate { .. }), "{err:?}");
}
