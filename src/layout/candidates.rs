// Candidate projection, box resolution and viewport culling.

use crate::config::{
    DeclutterConfig, MAX_LABEL_HEIGHT, MIN_LABEL_HEIGHT, MIN_LABEL_WIDTH, finite_or, opt_finite_or,
    positive_or,
};
use crate::ir::{LabelCandidate, MarkerGeometry, MarkerZone, Viewport};
use serde::Serialize;

use super::VIEWPORT_MARGIN;
use super::projection::Projector;
use super::types::{ObstacleRow, ObstacleShape, ProjectedCandidate, Rect, union_bounds};

/// Label box resolved for one candidate before slot offsets.
#[derive(Debug, Clone, Copy)]
struct LabelBox {
    width: f64,
    height: f64,
    offset_x: f64,
    offset_y: f64,
    collision_width: f64,
    collision_height: f64,
}

fn resolve_label_box(
    candidate: &LabelCandidate,
    viewport: Viewport,
    config: &DeclutterConfig,
) -> LabelBox {
    let max_width = config.max_label_width();
    let width_cap = (viewport.width - VIEWPORT_MARGIN).max(MIN_LABEL_WIDTH);
    let default_width = positive_or(Some(config.default_label_width), 96.0);
    let width = positive_or(candidate.label_width, default_width)
        .clamp(MIN_LABEL_WIDTH, max_width)
        .min(width_cap);

    let height_cap = MAX_LABEL_HEIGHT.min(viewport.height + VIEWPORT_MARGIN);
    let default_height = positive_or(Some(config.default_label_height), 16.0);
    let height = positive_or(candidate.label_height, default_height)
        .max(MIN_LABEL_HEIGHT)
        .min(height_cap);

    let offset_x = opt_finite_or(candidate.label_offset_x, 0.0);
    let offset_y = opt_finite_or(
        candidate.label_offset_y,
        finite_or(config.label_offset_y, 0.0),
    );

    let (width_scale, height_scale) = config.collision_scales();
    let collision_width = positive_or(candidate.collision_width, width * width_scale).min(width);
    let collision_height =
        positive_or(candidate.collision_height, height * height_scale).min(height);

    LabelBox {
        width,
        height,
        offset_x,
        offset_y,
        collision_width,
        collision_height,
    }
}

fn zone_rect(zone: &MarkerZone, x: f64, y: f64) -> Option<Rect> {
    let width = positive_or(Some(zone.width), 0.0);
    let height = positive_or(Some(zone.height), 0.0);
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    let cx = x + finite_or(zone.offset_x, 0.0);
    let cy = y + finite_or(zone.offset_y, 0.0);
    Some(Rect::new(cx - width / 2.0, cy - height / 2.0, width, height))
}

/// Resolve marker obstacle geometry around the marker center `(x, y)`.
/// An explicit zone wins over a geometry list; neither yields `None`.
pub(crate) fn resolve_obstacle(
    candidate: &LabelCandidate,
    x: f64,
    y: f64,
) -> Option<ObstacleShape> {
    if let Some(zone) = candidate.marker_zone.as_ref()
        && let Some(rect) = zone_rect(zone, x, y)
    {
        return Some(ObstacleShape::Zones(vec![rect]));
    }
    match candidate.marker_geometry.as_ref()? {
        MarkerGeometry::Zones(zones) => {
            let rects: Vec<Rect> = zones.iter().filter_map(|z| zone_rect(z, x, y)).collect();
            (!rects.is_empty()).then_some(ObstacleShape::Zones(rects))
        }
        MarkerGeometry::Rows(rows) => {
            let rows: Vec<ObstacleRow> = rows
                .iter()
                .filter_map(|row| {
                    let height = positive_or(Some(row.height), 0.0);
                    if height <= 0.0 || !row.top.is_finite() {
                        return None;
                    }
                    let spans: Vec<(f64, f64)> = row
                        .spans
                        .iter()
                        .filter(|s| s.left.is_finite() && s.width.is_finite() && s.width > 0.0)
                        .map(|s| (x + s.left, x + s.left + s.width))
                        .collect();
                    (!spans.is_empty()).then(|| ObstacleRow {
                        top: y + row.top,
                        bottom: y + row.top + height,
                        spans,
                    })
                })
                .collect();
            let bounds = union_bounds(rows.iter().flat_map(|row| {
                row.spans
                    .iter()
                    .map(move |&(x0, x1)| Rect::new(x0, row.top, x1 - x0, row.bottom - row.top))
            }))?;
            Some(ObstacleShape::Rows { bounds, rows })
        }
    }
}

/// Box a label would occupy in its default (below, centered) position.
pub(crate) fn default_label_rect(candidate: &ProjectedCandidate) -> Rect {
    Rect::new(
        candidate.screen_x + candidate.offset_x - candidate.label_width / 2.0,
        candidate.screen_y + candidate.offset_y,
        candidate.label_width,
        candidate.label_height,
    )
}

pub(crate) fn viewport_bounds(viewport: Viewport) -> Rect {
    Rect::new(0.0, 0.0, viewport.width, viewport.height).inflate(VIEWPORT_MARGIN, VIEWPORT_MARGIN)
}

/// Project every candidate and drop the ones whose label cannot be seen.
///
/// Culling runs before density and scoring so off-screen clutter never
/// inflates neighbor counts.
pub(crate) fn project_candidates(
    candidates: &[LabelCandidate],
    projector: &Projector,
    viewport: Viewport,
    config: &DeclutterConfig,
) -> Vec<ProjectedCandidate> {
    let visible = viewport_bounds(viewport);
    let center = (viewport.width / 2.0, viewport.height / 2.0);

    candidates
        .iter()
        .filter_map(|candidate| {
            let screen = projector.resolve(candidate.coordinate, candidate.screen)?;
            let label = resolve_label_box(candidate, viewport, config);
            let projected = ProjectedCandidate {
                id: candidate.id.clone(),
                title: candidate.title.clone(),
                rating: finite_or(candidate.rating, 0.0).clamp(0.0, 5.0),
                priority: candidate.priority.filter(|p| p.is_finite()),
                screen_x: screen.x,
                screen_y: screen.y,
                label_width: label.width,
                label_height: label.height,
                offset_x: label.offset_x,
                offset_y: label.offset_y,
                collision_width: label.collision_width,
                collision_height: label.collision_height,
                obstacle: resolve_obstacle(candidate, screen.x, screen.y),
                distance_to_center: (screen.x - center.0).hypot(screen.y - center.1),
                neighbor_count: 0,
            };
            default_label_rect(&projected)
                .intersects(&visible)
                .then_some(projected)
        })
        .collect()
}

/// Screen position and obstacle boxes of one marker, for previews.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerFootprint {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub obstacles: Vec<Rect>,
}

/// Markers that land inside the viewport margin, in input order.
pub fn marker_footprints(
    candidates: &[LabelCandidate],
    projector: &Projector,
    viewport: Viewport,
) -> Vec<MarkerFootprint> {
    let visible = viewport_bounds(viewport);
    candidates
        .iter()
        .filter_map(|candidate| {
            let screen = projector.resolve(candidate.coordinate, candidate.screen)?;
            if screen.x < visible.x
                || screen.x > visible.right()
                || screen.y < visible.y
                || screen.y > visible.bottom()
            {
                return None;
            }
            let obstacles = match resolve_obstacle(candidate, screen.x, screen.y) {
                Some(ObstacleShape::Zones(rects)) => rects,
                Some(ObstacleShape::Rows { rows, .. }) => rows
                    .iter()
                    .flat_map(|row| {
                        row.spans
                            .iter()
                            .map(move |&(x0, x1)| {
                                Rect::new(x0, row.top, x1 - x0, row.bottom - row.top)
                            })
                    })
                    .collect(),
                None => Vec::new(),
            };
            Some(MarkerFootprint {
                id: candidate.id.clone(),
                x: screen.x,
                y: screen.y,
                obstacles,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Camera, GeoPoint, MarkerRow, MarkerSpan, ScreenPoint};

    fn at(id: &str, x: f64, y: f64) -> LabelCandidate {
        let mut candidate = LabelCandidate::new(id, id, GeoPoint::new(0.0, 0.0));
        candidate.screen = Some(ScreenPoint { x, y });
        candidate
    }

    fn run(candidates: &[LabelCandidate], config: &DeclutterConfig) -> Vec<ProjectedCandidate> {
        let viewport = Viewport::new(400.0, 300.0);
        let camera = Camera {
            center: GeoPoint::new(0.0, 0.0),
            zoom: 14.0,
        };
        let projector = Projector::new(&camera, viewport);
        project_candidates(candidates, &projector, viewport, config)
    }

    #[test]
    fn culls_labels_outside_viewport_margin() {
        let config = DeclutterConfig::default();
        let projected = run(
            &[
                at("inside", 200.0, 150.0),
                at("far-left", -400.0, 150.0),
                at("far-below", 200.0, 900.0),
                at("edge", -30.0, 150.0),
            ],
            &config,
        );
        let ids: Vec<&str> = projected.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["inside", "edge"]);
    }

    #[test]
    fn label_sizes_are_clamped() {
        let config = DeclutterConfig::default();
        let mut wide = at("wide", 200.0, 150.0);
        wide.label_width = Some(5000.0);
        wide.label_height = Some(2.0);
        let mut broken = at("broken", 200.0, 150.0);
        broken.label_width = Some(f64::NAN);
        broken.label_height = Some(-10.0);
        let projected = run(&[wide, broken], &config);

        assert_eq!(projected[0].label_width, 180.0);
        assert_eq!(projected[0].label_height, MIN_LABEL_HEIGHT);
        assert_eq!(projected[1].label_width, 96.0);
        assert_eq!(projected[1].label_height, 16.0);
        assert!((projected[1].collision_width - 96.0 * 0.92).abs() < 1e-9);
        assert_eq!(projected[1].offset_y, 14.0);
    }

    #[test]
    fn explicit_zone_wins_over_geometry() {
        let mut candidate = at("pin", 100.0, 100.0);
        candidate.marker_zone = Some(MarkerZone {
            width: 20.0,
            height: 30.0,
            offset_x: 0.0,
            offset_y: -15.0,
        });
        candidate.marker_geometry = Some(MarkerGeometry::Zones(vec![MarkerZone {
            width: 200.0,
            height: 200.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }]));
        let shape = resolve_obstacle(&candidate, 100.0, 100.0).unwrap();
        assert_eq!(shape, ObstacleShape::Zones(vec![Rect::new(90.0, 70.0, 20.0, 30.0)]));
    }

    #[test]
    fn rows_resolve_to_screen_space_with_bounds() {
        let mut candidate = at("badge", 50.0, 50.0);
        candidate.marker_geometry = Some(MarkerGeometry::Rows(vec![
            MarkerRow {
                top: -30.0,
                height: 10.0,
                spans: vec![MarkerSpan {
                    left: -4.0,
                    width: 20.0,
                }],
            },
            MarkerRow {
                top: -20.0,
                height: 20.0,
                spans: vec![MarkerSpan {
                    left: -8.0,
                    width: 16.0,
                }],
            },
        ]));
        let Some(ObstacleShape::Rows { bounds, rows }) = resolve_obstacle(&candidate, 50.0, 50.0)
        else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].spans, vec![(46.0, 66.0)]);
        assert_eq!(bounds, Rect::new(42.0, 20.0, 24.0, 30.0));
    }

    #[test]
    fn empty_geometry_yields_no_obstacle() {
        let mut candidate = at("bare", 0.0, 0.0);
        candidate.marker_geometry = Some(MarkerGeometry::Zones(vec![]));
        assert!(resolve_obstacle(&candidate, 0.0, 0.0).is_none());
    }

    #[test]
    fn footprints_skip_offscreen_markers() {
        let viewport = Viewport::new(400.0, 300.0);
        let camera = Camera {
            center: GeoPoint::new(0.0, 0.0),
            zoom: 14.0,
        };
        let projector = Projector::new(&camera, viewport);
        let mut pin = at("pin", 100.0, 100.0);
        pin.marker_zone = Some(MarkerZone {
            width: 20.0,
            height: 30.0,
            offset_x: 0.0,
            offset_y: -15.0,
        });
        let footprints = marker_footprints(&[pin, at("far", 900.0, 100.0)], &projector, viewport);
        assert_eq!(footprints.len(), 1);
        assert_eq!(footprints[0].obstacles, vec![Rect::new(90.0, 70.0, 20.0, 30.0)]);
    }
}
