use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::layout::LabelLayout;

/// Geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub center: GeoPoint,
    pub zoom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub(crate) fn is_degenerate(&self) -> bool {
        !(self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 1.0
            && self.height >= 1.0)
    }
}

/// Named anchor position of a label relative to its marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelSlot {
    Below,
    BelowLeft,
    BelowRight,
    Above,
}

impl LabelSlot {
    pub const ALL: [LabelSlot; 4] = [
        LabelSlot::Below,
        LabelSlot::BelowLeft,
        LabelSlot::BelowRight,
        LabelSlot::Above,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LabelSlot::Below => "below",
            LabelSlot::BelowLeft => "below-left",
            LabelSlot::BelowRight => "below-right",
            LabelSlot::Above => "above",
        }
    }

    /// Declared order, used as the final tie-break between slot variants.
    pub fn order_index(self) -> usize {
        match self {
            LabelSlot::Below => 0,
            LabelSlot::BelowLeft => 1,
            LabelSlot::BelowRight => 2,
            LabelSlot::Above => 3,
        }
    }
}

impl std::fmt::Display for LabelSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rectangular marker zone relative to the marker's screen center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerZone {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
}

/// Horizontal run of opaque marker pixels, relative to the marker center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpan {
    pub left: f64,
    pub width: f64,
}

/// One horizontal band of a marker silhouette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRow {
    pub top: f64,
    pub height: f64,
    pub spans: Vec<MarkerSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "items")]
pub enum MarkerGeometry {
    Zones(Vec<MarkerZone>),
    Rows(Vec<MarkerRow>),
}

/// A point of interest that may receive a label this frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelCandidate {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub coordinate: GeoPoint,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub priority: Option<f64>,
    #[serde(default)]
    pub label_width: Option<f64>,
    #[serde(default)]
    pub label_height: Option<f64>,
    #[serde(default)]
    pub label_offset_x: Option<f64>,
    #[serde(default)]
    pub label_offset_y: Option<f64>,
    #[serde(default)]
    pub collision_width: Option<f64>,
    #[serde(default)]
    pub collision_height: Option<f64>,
    /// Explicit single marker box; wins over `marker_geometry`.
    #[serde(default)]
    pub marker_zone: Option<MarkerZone>,
    #[serde(default)]
    pub marker_geometry: Option<MarkerGeometry>,
    /// Renderer-space position; skips re-projection when present.
    #[serde(default)]
    pub screen: Option<ScreenPoint>,
}

impl LabelCandidate {
    pub fn new(id: impl Into<String>, title: impl Into<String>, coordinate: GeoPoint) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            coordinate,
            rating: 0.0,
            priority: None,
            label_width: None,
            label_height: None,
            label_offset_x: None,
            label_offset_y: None,
            collision_width: None,
            collision_height: None,
            marker_zone: None,
            marker_geometry: None,
            screen: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    /// Budget-capped overview with enter/exit hysteresis.
    #[default]
    Overview,
    /// Exhaustive non-overlapping layout whenever zoom reaches single mode.
    VisibleNonOverlapping,
}

/// Order in which the placer visits candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementOrder {
    /// Forced candidates by rank, then everyone else by rank.
    #[default]
    ForcedFirst,
    /// Strict rank order; forced candidates may evict weaker incumbents.
    Ranked,
}

/// Which marker obstacles labels must avoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObstacleScope {
    /// Only markers whose label is currently active.
    #[default]
    Placed,
    /// Every projected marker, labeled or not.
    All,
}

/// Caller-owned state carried from one frame to the next.
///
/// The engine only reads it; callers replace it wholesale with
/// [`StickyState::from_layout`] after every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickyState {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub visible: BTreeSet<String>,
    #[serde(default)]
    pub slots: BTreeMap<String, LabelSlot>,
}

impl StickyState {
    pub fn from_layout(layout: &LabelLayout) -> Self {
        Self {
            enabled: layout.enabled,
            visible: layout.ids.iter().cloned().collect(),
            slots: layout
                .placements
                .iter()
                .map(|placement| (placement.id.clone(), placement.slot))
                .collect(),
        }
    }
}
