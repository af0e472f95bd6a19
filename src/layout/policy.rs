use crate::config::{MAX_ZOOM, PolicyConfig, opt_finite_or};
use crate::ir::LayoutMode;

const DEFAULT_MIN_ZOOM: f64 = 12.0;
const DEFAULT_EXIT_ZOOM: f64 = 13.0;
const DEFAULT_ENTER_ZOOM: f64 = 13.5;
const DEFAULT_LOW_ZOOM_MAX: f64 = 6.0;
const DEFAULT_MID_ZOOM_MAX: f64 = 12.0;
const DEFAULT_HIGH_ZOOM_MAX: f64 = 24.0;
const DEFAULT_MAX_MARKERS_FOR_LABELS: f64 = 150.0;

/// Zoom policy with every ordering invariant enforced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Policy {
    pub min_zoom: f64,
    pub exit_zoom: f64,
    pub enter_zoom: f64,
    pub low_zoom_max: usize,
    pub mid_zoom_max: usize,
    pub high_zoom_max: usize,
    pub max_markers_for_labels: usize,
}

fn count_or(value: Option<f64>, fallback: f64, floor: usize) -> usize {
    let value = opt_finite_or(value, fallback).round();
    if value < floor as f64 {
        floor
    } else {
        value as usize
    }
}

/// Clamp a partial policy into a consistent one. Never fails.
pub fn resolve_policy(partial: &PolicyConfig) -> Policy {
    let min_zoom = opt_finite_or(partial.min_zoom, DEFAULT_MIN_ZOOM).clamp(0.0, MAX_ZOOM);
    let enter_zoom =
        opt_finite_or(partial.enter_zoom, DEFAULT_ENTER_ZOOM).clamp(min_zoom, MAX_ZOOM);
    let exit_zoom = opt_finite_or(partial.exit_zoom, DEFAULT_EXIT_ZOOM).clamp(min_zoom, enter_zoom);

    let low_zoom_max = count_or(partial.low_zoom_max, DEFAULT_LOW_ZOOM_MAX, 1);
    let mid_zoom_max = count_or(partial.mid_zoom_max, DEFAULT_MID_ZOOM_MAX, low_zoom_max);
    let high_zoom_max = count_or(partial.high_zoom_max, DEFAULT_HIGH_ZOOM_MAX, mid_zoom_max);
    let max_markers_for_labels = count_or(
        partial.max_markers_for_labels,
        DEFAULT_MAX_MARKERS_FOR_LABELS,
        1,
    );

    Policy {
        min_zoom,
        exit_zoom,
        enter_zoom,
        low_zoom_max,
        mid_zoom_max,
        high_zoom_max,
        max_markers_for_labels,
    }
}

/// Enable/disable decision. Overview mode applies `min_zoom` and the
/// enter/exit hysteresis; visible-non-overlapping mode only needs the
/// single-mode zoom and at least one candidate.
pub fn resolve_enabled(
    policy: &Policy,
    zoom: f64,
    previously_enabled: bool,
    candidate_count: usize,
    single_mode_zoom: f64,
    mode: LayoutMode,
) -> bool {
    if !zoom.is_finite() {
        return false;
    }
    match mode {
        LayoutMode::VisibleNonOverlapping => zoom >= single_mode_zoom && candidate_count > 0,
        LayoutMode::Overview => {
            if zoom < policy.min_zoom {
                return false;
            }
            if candidate_count > policy.max_markers_for_labels && zoom < single_mode_zoom {
                return false;
            }
            if previously_enabled {
                zoom >= policy.exit_zoom
            } else {
                zoom >= policy.enter_zoom
            }
        }
    }
}

/// Label budget for the zoom tier.
pub fn budget_for_zoom(
    policy: &Policy,
    zoom: f64,
    single_mode_zoom: f64,
    mode: LayoutMode,
    max_candidates: usize,
) -> usize {
    if mode == LayoutMode::VisibleNonOverlapping {
        return max_candidates.max(1);
    }
    if zoom < single_mode_zoom {
        policy.low_zoom_max
    } else if zoom < single_mode_zoom + 1.0 {
        policy.mid_zoom_max
    } else {
        policy.high_zoom_max
    }
}
