use crate::ir::{LabelSlot, LayoutMode, ObstacleScope, PlacementOrder};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MIN_LABEL_WIDTH: f64 = 24.0;
pub const MIN_LABEL_HEIGHT: f64 = 8.0;
pub const MAX_LABEL_HEIGHT: f64 = 128.0;
pub const MIN_COLLISION_SCALE: f64 = 0.45;
pub const MAX_COLLISION_SCALE: f64 = 1.0;
pub const MAX_ZOOM: f64 = 20.0;

/// Replace NaN/inf with `fallback`.
pub(crate) fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

pub(crate) fn opt_finite_or(value: Option<f64>, fallback: f64) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(fallback)
}

/// Replace missing, non-finite or non-positive values with `fallback`.
pub(crate) fn positive_or(value: Option<f64>, fallback: f64) -> f64 {
    value
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(fallback)
}

/// Horizontal alignment of the label box against its anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotAlign {
    Center,
    Start,
    End,
}

/// Which side of the marker the label box sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotSide {
    Below,
    Above,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotConfig {
    pub dx: f64,
    pub dy: f64,
    pub penalty: f64,
    pub align: SlotAlign,
    pub side: SlotSide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotTable {
    pub below: SlotConfig,
    pub below_left: SlotConfig,
    pub below_right: SlotConfig,
    pub above: SlotConfig,
}

impl SlotTable {
    pub fn get(&self, slot: LabelSlot) -> &SlotConfig {
        match slot {
            LabelSlot::Below => &self.below,
            LabelSlot::BelowLeft => &self.below_left,
            LabelSlot::BelowRight => &self.below_right,
            LabelSlot::Above => &self.above,
        }
    }

    fn get_mut(&mut self, slot: LabelSlot) -> &mut SlotConfig {
        match slot {
            LabelSlot::Below => &mut self.below,
            LabelSlot::BelowLeft => &mut self.below_left,
            LabelSlot::BelowRight => &mut self.below_right,
            LabelSlot::Above => &mut self.above,
        }
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self {
            below: SlotConfig {
                dx: 0.0,
                dy: 0.0,
                penalty: 0.0,
                align: SlotAlign::Center,
                side: SlotSide::Below,
            },
            below_left: SlotConfig {
                dx: -6.0,
                dy: -4.0,
                penalty: 0.04,
                align: SlotAlign::End,
                side: SlotSide::Below,
            },
            below_right: SlotConfig {
                dx: 6.0,
                dy: -4.0,
                penalty: 0.04,
                align: SlotAlign::Start,
                side: SlotSide::Below,
            },
            above: SlotConfig {
                dx: 0.0,
                dy: 0.0,
                penalty: 0.08,
                align: SlotAlign::Center,
                side: SlotSide::Above,
            },
        }
    }
}

/// Partial zoom policy as supplied by the caller. Resolved by
/// [`crate::layout::resolve_policy`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfig {
    pub min_zoom: Option<f64>,
    pub exit_zoom: Option<f64>,
    pub enter_zoom: Option<f64>,
    pub low_zoom_max: Option<f64>,
    pub mid_zoom_max: Option<f64>,
    pub high_zoom_max: Option<f64>,
    pub max_markers_for_labels: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclutterConfig {
    pub policy: PolicyConfig,
    pub mode: LayoutMode,
    pub obstacle_scope: ObstacleScope,
    pub placement_order: PlacementOrder,
    pub single_mode_zoom: f64,
    pub candidate_multiplier: f64,
    pub max_candidates: usize,
    pub label_gap_x: f64,
    pub label_gap_y: f64,
    pub collision_width_scale: f64,
    pub collision_height_scale: f64,
    pub sticky_score_bonus: f64,
    pub sticky_slot_bonus: f64,
    pub max_label_width: f64,
    pub default_label_width: f64,
    pub default_label_height: f64,
    pub label_offset_y: f64,
    pub slots: SlotTable,
}

impl Default for DeclutterConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            mode: LayoutMode::Overview,
            obstacle_scope: ObstacleScope::Placed,
            placement_order: PlacementOrder::ForcedFirst,
            single_mode_zoom: 15.0,
            candidate_multiplier: 3.0,
            max_candidates: 240,
            label_gap_x: 4.0,
            label_gap_y: 2.0,
            collision_width_scale: 0.92,
            collision_height_scale: 0.86,
            sticky_score_bonus: 0.12,
            sticky_slot_bonus: 0.06,
            max_label_width: 180.0,
            default_label_width: 96.0,
            default_label_height: 16.0,
            label_offset_y: 14.0,
            slots: SlotTable::default(),
        }
    }
}

impl DeclutterConfig {
    pub(crate) fn collision_scales(&self) -> (f64, f64) {
        let clamp = |v: f64| {
            finite_or(v, MAX_COLLISION_SCALE).clamp(MIN_COLLISION_SCALE, MAX_COLLISION_SCALE)
        };
        (
            clamp(self.collision_width_scale),
            clamp(self.collision_height_scale),
        )
    }

    pub(crate) fn gaps(&self) -> (f64, f64) {
        (
            finite_or(self.label_gap_x, 0.0).max(0.0),
            finite_or(self.label_gap_y, 0.0).max(0.0),
        )
    }

    pub(crate) fn max_label_width(&self) -> f64 {
        finite_or(self.max_label_width, 180.0).max(MIN_LABEL_WIDTH)
    }

    pub(crate) fn candidate_multiplier(&self) -> f64 {
        finite_or(self.candidate_multiplier, 1.0).max(1.0)
    }

    pub(crate) fn sticky_score_bonus(&self) -> f64 {
        finite_or(self.sticky_score_bonus, 0.0).max(0.0)
    }

    pub(crate) fn sticky_slot_bonus(&self) -> f64 {
        finite_or(self.sticky_slot_bonus, 0.0).max(0.0)
    }

    pub(crate) fn single_mode_zoom(&self) -> f64 {
        finite_or(self.single_mode_zoom, MAX_ZOOM).clamp(0.0, MAX_ZOOM)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    pub show_obstacles: bool,
    pub show_collision_boxes: bool,
    pub fast_text: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            show_obstacles: true,
            show_collision_boxes: false,
            fast_text: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub declutter: DeclutterConfig,
    pub theme: Theme,
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SlotConfigFile {
    dx: Option<f64>,
    dy: Option<f64>,
    penalty: Option<f64>,
    align: Option<SlotAlign>,
    side: Option<SlotSide>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SlotTableFile {
    below: Option<SlotConfigFile>,
    below_left: Option<SlotConfigFile>,
    below_right: Option<SlotConfigFile>,
    above: Option<SlotConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ThemeFile {
    font_family: Option<String>,
    font_size: Option<f32>,
    background: Option<String>,
    marker_color: Option<String>,
    obstacle_color: Option<String>,
    label_text_color: Option<String>,
    label_halo_color: Option<String>,
    forced_label_color: Option<String>,
}

/// On-disk mirror of [`Config`]; every key is optional and overlays the
/// defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    policy: Option<PolicyConfig>,
    mode: Option<LayoutMode>,
    obstacle_scope: Option<ObstacleScope>,
    placement_order: Option<PlacementOrder>,
    single_mode_zoom: Option<f64>,
    candidate_multiplier: Option<f64>,
    max_candidates: Option<usize>,
    label_gap_x: Option<f64>,
    label_gap_y: Option<f64>,
    collision_width_scale: Option<f64>,
    collision_height_scale: Option<f64>,
    sticky_score_bonus: Option<f64>,
    sticky_slot_bonus: Option<f64>,
    max_label_width: Option<f64>,
    default_label_width: Option<f64>,
    default_label_height: Option<f64>,
    label_offset_y: Option<f64>,
    slots: Option<SlotTableFile>,
    theme: Option<ThemeFile>,
    fast_text: Option<bool>,
    show_obstacles: Option<bool>,
    show_collision_boxes: Option<bool>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;
    apply_config_file(&mut config, parsed);
    Ok(config)
}

pub fn apply_config_file(config: &mut Config, parsed: ConfigFile) {
    let declutter = &mut config.declutter;
    if let Some(policy) = parsed.policy {
        let current = &mut declutter.policy;
        current.min_zoom = policy.min_zoom.or(current.min_zoom);
        current.exit_zoom = policy.exit_zoom.or(current.exit_zoom);
        current.enter_zoom = policy.enter_zoom.or(current.enter_zoom);
        current.low_zoom_max = policy.low_zoom_max.or(current.low_zoom_max);
        current.mid_zoom_max = policy.mid_zoom_max.or(current.mid_zoom_max);
        current.high_zoom_max = policy.high_zoom_max.or(current.high_zoom_max);
        current.max_markers_for_labels = policy
            .max_markers_for_labels
            .or(current.max_markers_for_labels);
    }
    if let Some(v) = parsed.mode {
        declutter.mode = v;
    }
    if let Some(v) = parsed.obstacle_scope {
        declutter.obstacle_scope = v;
    }
    if let Some(v) = parsed.placement_order {
        declutter.placement_order = v;
    }
    if let Some(v) = parsed.single_mode_zoom {
        declutter.single_mode_zoom = v;
    }
    if let Some(v) = parsed.candidate_multiplier {
        declutter.candidate_multiplier = v;
    }
    if let Some(v) = parsed.max_candidates {
        declutter.max_candidates = v;
    }
    if let Some(v) = parsed.label_gap_x {
        declutter.label_gap_x = v;
    }
    if let Some(v) = parsed.label_gap_y {
        declutter.label_gap_y = v;
    }
    if let Some(v) = parsed.collision_width_scale {
        declutter.collision_width_scale = v;
    }
    if let Some(v) = parsed.collision_height_scale {
        declutter.collision_height_scale = v;
    }
    if let Some(v) = parsed.sticky_score_bonus {
        declutter.sticky_score_bonus = v;
    }
    if let Some(v) = parsed.sticky_slot_bonus {
        declutter.sticky_slot_bonus = v;
    }
    if let Some(v) = parsed.max_label_width {
        declutter.max_label_width = v;
    }
    if let Some(v) = parsed.default_label_width {
        declutter.default_label_width = v;
    }
    if let Some(v) = parsed.default_label_height {
        declutter.default_label_height = v;
    }
    if let Some(v) = parsed.label_offset_y {
        declutter.label_offset_y = v;
    }
    if let Some(slots) = parsed.slots {
        let overrides = [
            (LabelSlot::Below, slots.below),
            (LabelSlot::BelowLeft, slots.below_left),
            (LabelSlot::BelowRight, slots.below_right),
            (LabelSlot::Above, slots.above),
        ];
        for (slot, file) in overrides {
            let Some(file) = file else { continue };
            let target = declutter.slots.get_mut(slot);
            if let Some(v) = file.dx {
                target.dx = v;
            }
            if let Some(v) = file.dy {
                target.dy = v;
            }
            if let Some(v) = file.penalty {
                target.penalty = v;
            }
            if let Some(v) = file.align {
                target.align = v;
            }
            if let Some(v) = file.side {
                target.side = v;
            }
        }
    }

    if let Some(theme) = parsed.theme {
        if let Some(v) = theme.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = theme.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = theme.background {
            config.theme.background = v;
        }
        if let Some(v) = theme.marker_color {
            config.theme.marker_color = v;
        }
        if let Some(v) = theme.obstacle_color {
            config.theme.obstacle_color = v;
        }
        if let Some(v) = theme.label_text_color {
            config.theme.label_text_color = v;
        }
        if let Some(v) = theme.label_halo_color {
            config.theme.label_halo_color = v;
        }
        if let Some(v) = theme.forced_label_color {
            config.theme.forced_label_color = v;
        }
    }
    if let Some(v) = parsed.fast_text {
        config.render.fast_text = v;
    }
    if let Some(v) = parsed.show_obstacles {
        config.render.show_obstacles = v;
    }
    if let Some(v) = parsed.show_collision_boxes {
        config.render.show_collision_boxes = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_overlays_only_given_keys() {
        let parsed: ConfigFile = serde_json::from_str(
            r#"{
                "policy": {"enterZoom": 14.5},
                "obstacleScope": "all",
                "stickySlotBonus": 0.2,
                "slots": {"above": {"penalty": 0.5}},
                "theme": {"fontSize": 11}
            }"#,
        )
        .unwrap();
        let mut config = Config::default();
        apply_config_file(&mut config, parsed);

        assert_eq!(config.declutter.policy.enter_zoom, Some(14.5));
        assert_eq!(config.declutter.policy.exit_zoom, None);
        assert_eq!(config.declutter.obstacle_scope, ObstacleScope::All);
        assert_eq!(config.declutter.sticky_slot_bonus, 0.2);
        assert_eq!(config.declutter.slots.above.penalty, 0.5);
        assert_eq!(config.declutter.slots.above.side, SlotSide::Above);
        assert_eq!(config.declutter.candidate_multiplier, 3.0);
        assert_eq!(config.theme.font_size, 11.0);
    }

    #[test]
    fn collision_scales_are_clamped() {
        let config = DeclutterConfig {
            collision_width_scale: 0.1,
            collision_height_scale: f64::NAN,
            ..DeclutterConfig::default()
        };
        assert_eq!(config.collision_scales(), (0.45, 1.0));
    }

    #[test]
    fn positive_or_rejects_bad_numbers() {
        assert_eq!(positive_or(Some(-3.0), 5.0), 5.0);
        assert_eq!(positive_or(Some(f64::INFINITY), 5.0), 5.0);
        assert_eq!(positive_or(None, 5.0), 5.0);
        assert_eq!(positive_or(Some(2.0), 5.0), 2.0);
    }
}
