use chipmatch::bank::TemplateSource;
use chipmatch::model::TemplateId;
use chipmatch::{
    detect_vias, run_template_match, run_wire_match, CandidateSource, GridConfig, OrientationMode,
    OwnedImage, Rect, RunContext, TemplateMatchConfig, ViaMatchConfig, WireMatchConfig,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn make_image(width: usize, height: usize) -> OwnedImage {
    OwnedImage::from_fn(width, height, |x, y| (((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF) as u8).unwrap()
}

fn extract_patch(image: &OwnedImage, x0: usize, y0: usize, width: usize, height: usize) -> OwnedImage {
    let view = image.view().region(Rect::new(x0, y0, width, height)).unwrap();
    OwnedImage::from_view(view).unwrap()
}

fn bench_template_match(c: &mut Criterion) {
    let image = make_image(384, 384);
    let template = extract_patch(&image, 120, 100, 48, 40);
    let sources = [TemplateSource {
        source: CandidateSource::Template(TemplateId(0)),
        image: template.view(),
    }];
    let region = Rect::full(image.width(), image.height());
    let grid = GridConfig::default();

    for (name, orientation, scale_down) in [
        ("gates_normal_scale1", OrientationMode::Normal, 1.0),
        ("gates_any_scale2", OrientationMode::Any, 2.0),
    ] {
        let cfg = TemplateMatchConfig {
            orientation,
            scale_down,
            climb_threshold: 0.6,
            detect_threshold: 0.8,
            ..TemplateMatchConfig::default()
        };
        c.bench_function(name, |b| {
            b.iter(|| {
                black_box(
                    run_template_match(image.view(), region, &sources, &cfg, &grid, &RunContext::new())
                        .unwrap(),
                )
            });
        });
    }
}

fn bench_via_and_wire(c: &mut Criterion) {
    let image = OwnedImage::from_fn(256, 256, |x, y| {
        let on_via = (x % 32).abs_diff(16).pow(2) + (y % 32).abs_diff(16).pow(2) <= 9;
        let on_wire = (y % 40) < 6;
        if on_via || on_wire {
            210
        } else {
            30
        }
    })
    .unwrap();
    let region = Rect::full(256, 256);

    let via_cfg = ViaMatchConfig::default();
    c.bench_function("vias_256", |b| {
        b.iter(|| black_box(detect_vias(image.view(), region, &via_cfg, &RunContext::new()).unwrap()));
    });

    let wire_cfg = WireMatchConfig::default();
    c.bench_function("wires_256", |b| {
        b.iter(|| {
            black_box(run_wire_match(image.view(), region, &wire_cfg, &RunContext::new()).unwrap())
        });
    });
}

criterion_group!(benches, bench_template_match, bench_via_and_wire);
criterion_main!(benches);
