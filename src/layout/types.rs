use serde::{Deserialize, Serialize};

use crate::ir::LabelSlot;

/// Axis-aligned screen rectangle, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn inflate(&self, pad_x: f64, pad_y: f64) -> Rect {
        Rect::new(
            self.x - pad_x,
            self.y - pad_y,
            self.width + pad_x * 2.0,
            self.height + pad_y * 2.0,
        )
    }

    /// Width and height of the intersection, zero when disjoint.
    pub fn intersection_size(&self, other: &Rect) -> (f64, f64) {
        let w = (self.right().min(other.right()) - self.x.max(other.x)).max(0.0);
        let h = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0);
        (w, h)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

/// Overlap that matters for layout: at least one pixel wide, one pixel tall
/// and one square pixel of area.
pub fn meaningful_overlap(a: &Rect, b: &Rect) -> bool {
    let (w, h) = a.intersection_size(b);
    w >= 1.0 && h >= 1.0 && w * h >= 1.0
}

/// One horizontal band of a marker silhouette in screen space.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ObstacleRow {
    pub top: f64,
    pub bottom: f64,
    pub spans: Vec<(f64, f64)>,
}

/// Marker obstacle geometry resolved to screen space.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ObstacleShape {
    Zones(Vec<Rect>),
    Rows { bounds: Rect, rows: Vec<ObstacleRow> },
}

impl ObstacleShape {
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            ObstacleShape::Zones(zones) => union_bounds(zones.iter().copied()),
            ObstacleShape::Rows { bounds, .. } => Some(*bounds),
        }
    }
}

pub(crate) fn union_bounds(rects: impl Iterator<Item = Rect>) -> Option<Rect> {
    let mut acc: Option<(f64, f64, f64, f64)> = None;
    for rect in rects {
        acc = Some(match acc {
            None => (rect.x, rect.y, rect.right(), rect.bottom()),
            Some((x0, y0, x1, y1)) => (
                x0.min(rect.x),
                y0.min(rect.y),
                x1.max(rect.right()),
                y1.max(rect.bottom()),
            ),
        });
    }
    acc.map(|(x0, y0, x1, y1)| Rect::new(x0, y0, x1 - x0, y1 - y0))
}

/// A candidate after projection and viewport culling.
#[derive(Debug, Clone)]
pub(crate) struct ProjectedCandidate {
    pub id: String,
    pub title: String,
    pub rating: f64,
    pub priority: Option<f64>,
    pub screen_x: f64,
    pub screen_y: f64,
    pub label_width: f64,
    pub label_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub collision_width: f64,
    pub collision_height: f64,
    pub obstacle: Option<ObstacleShape>,
    pub distance_to_center: f64,
    pub neighbor_count: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct ScoredCandidate {
    pub candidate: ProjectedCandidate,
    pub score: f64,
}

/// Final position of one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelPlacement {
    pub id: String,
    pub title: String,
    pub slot: LabelSlot,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub screen_x: f64,
    pub screen_y: f64,
    pub score: f64,
    pub forced: bool,
    /// Label collision box including gaps; pairwise disjoint across a result.
    pub collision: Rect,
}

/// Result of one engine invocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelLayout {
    pub placements: Vec<LabelPlacement>,
    pub ids: Vec<String>,
    pub hash: String,
    pub enabled: bool,
    pub budget: usize,
    pub candidate_count: usize,
    pub projected_count: usize,
    pub hidden_count: usize,
    pub rejected_by_collision: usize,
    pub forced_placed: usize,
    pub evicted: usize,
}

impl LabelLayout {
    pub(crate) fn empty(enabled: bool, budget: usize, candidate_count: usize) -> Self {
        Self {
            enabled,
            budget,
            candidate_count,
            ..Self::default()
        }
    }
}
