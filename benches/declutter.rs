use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use map_label_declutter::config::{DeclutterConfig, PolicyConfig};
use map_label_declutter::ir::{
    Camera, GeoPoint, LabelCandidate, LayoutMode, MarkerZone, ObstacleScope, StickyState, Viewport,
};
use map_label_declutter::layout::{LayoutParams, compute_label_layout};
use map_label_declutter::parser::parse_scene;
use std::collections::BTreeSet;
use std::hint::black_box;

const CENTER: GeoPoint = GeoPoint {
    lon: 13.405,
    lat: 52.52,
};

/// Deterministic scatter of POIs around `CENTER`, roughly two viewports wide.
fn synthetic_candidates(count: usize) -> Vec<LabelCandidate> {
    let mut state = 0x2545_f491_4f6c_dd1du64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 11) as f64 / (1u64 << 53) as f64
    };
    (0..count)
        .map(|i| {
            let coordinate = GeoPoint::new(
                CENTER.lon + (next() - 0.5) * 0.02,
                CENTER.lat + (next() - 0.5) * 0.014,
            );
            let mut candidate =
                LabelCandidate::new(format!("poi-{i}"), format!("Place {i}"), coordinate);
            candidate.rating = (next() * 50.0).round() / 10.0;
            candidate.label_width = Some(40.0 + next() * 80.0);
            candidate.label_height = Some(16.0);
            if i % 3 == 0 {
                candidate.marker_zone = Some(MarkerZone {
                    width: 20.0,
                    height: 28.0,
                    offset_x: 0.0,
                    offset_y: -14.0,
                });
            }
            if i % 7 == 0 {
                candidate.priority = Some((i % 5) as f64);
            }
            candidate
        })
        .collect()
}

fn camera(zoom: f64) -> Camera {
    Camera {
        center: CENTER,
        zoom,
    }
}

fn forced_ids(candidates: &[LabelCandidate]) -> BTreeSet<String> {
    candidates.iter().step_by(97).take(4).map(|c| c.id.clone()).collect()
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let viewport = Viewport::new(390.0, 844.0);
    let config = DeclutterConfig {
        policy: PolicyConfig {
            max_markers_for_labels: Some(10_000.0),
            ..Default::default()
        },
        ..DeclutterConfig::default()
    };
    let sticky = StickyState::default();

    for count in [500usize, 2000, 8000] {
        let candidates = synthetic_candidates(count);
        let forced = forced_ids(&candidates);
        group.bench_with_input(BenchmarkId::from_parameter(count), &candidates, |b, data| {
            b.iter(|| {
                let layout = compute_label_layout(&LayoutParams {
                    candidates: black_box(data),
                    camera: camera(15.4),
                    viewport,
                    config: &config,
                    sticky: &sticky,
                    forced: &forced,
                });
                black_box(layout.placements.len());
            });
        });
    }
    group.finish();
}

fn bench_layout_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_modes");
    let viewport = Viewport::new(390.0, 844.0);
    let candidates = synthetic_candidates(2000);
    let forced = forced_ids(&candidates);
    let sticky = StickyState::default();

    let variants = [
        ("overview_placed", LayoutMode::Overview, ObstacleScope::Placed),
        ("overview_all", LayoutMode::Overview, ObstacleScope::All),
        (
            "visible_non_overlapping",
            LayoutMode::VisibleNonOverlapping,
            ObstacleScope::Placed,
        ),
    ];
    for (name, mode, scope) in variants {
        let config = DeclutterConfig {
            mode,
            obstacle_scope: scope,
            max_candidates: 600,
            ..DeclutterConfig::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(name), &config, |b, data| {
            b.iter(|| {
                let layout = compute_label_layout(&LayoutParams {
                    candidates: &candidates,
                    camera: camera(16.5),
                    viewport,
                    config: black_box(data),
                    sticky: &sticky,
                    forced: &forced,
                });
                black_box(layout.hash.len());
            });
        });
    }
    group.finish();
}

fn bench_sticky_pan(c: &mut Criterion) {
    let mut group = c.benchmark_group("sticky_pan");
    let viewport = Viewport::new(390.0, 844.0);
    let candidates = synthetic_candidates(2000);
    let forced = BTreeSet::new();
    let config = DeclutterConfig {
        policy: PolicyConfig {
            max_markers_for_labels: Some(10_000.0),
            ..Default::default()
        },
        ..DeclutterConfig::default()
    };
    let frames: Vec<Camera> = (0..30)
        .map(|i| Camera {
            center: GeoPoint::new(CENTER.lon + i as f64 * 0.00005, CENTER.lat),
            zoom: 15.2 + i as f64 * 0.01,
        })
        .collect();

    group.bench_function("30_frames", |b| {
        b.iter(|| {
            let mut sticky = StickyState::default();
            for frame in &frames {
                let layout = compute_label_layout(&LayoutParams {
                    candidates: &candidates,
                    camera: *frame,
                    viewport,
                    config: &config,
                    sticky: &sticky,
                    forced: &forced,
                });
                sticky = StickyState::from_layout(&layout);
            }
            black_box(sticky.visible.len());
        });
    });
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let input = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/cluster.json5"
    ));
    c.bench_function("parse_scene/cluster", |b| {
        b.iter(|| {
            let parsed = parse_scene(black_box(input)).expect("parse failed");
            black_box(parsed.scene.candidates.len());
        });
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_layout, bench_layout_modes, bench_sticky_pan, bench_parse
);
criterion_main!(benches);
