//! Label decluttering engine.
//!
//! One call of [`compute_label_layout`] turns a camera, a viewport and a list
//! of candidates into a budgeted set of non-overlapping label placements.
//! The call is synchronous, allocates only call-local scratch state and never
//! mutates caller-owned sticky state.

mod candidates;
mod label_placement;
mod policy;
mod projection;
mod scoring;
mod slots;
mod spatial;
mod types;

use std::collections::BTreeSet;

use crate::config::DeclutterConfig;
use crate::ir::{Camera, LabelCandidate, ObstacleScope, StickyState, Viewport};

pub use candidates::{MarkerFootprint, marker_footprints};
pub use label_placement::stability_hash;
pub use policy::{Policy, budget_for_zoom, resolve_enabled, resolve_policy};
pub use projection::{Projector, project, world_size, wrap_delta};
pub use slots::{SlotSet, SlotVariant};
pub use spatial::{SpatialIndex, cell_size_for};
pub use types::{LabelLayout, LabelPlacement, Rect, meaningful_overlap};

use candidates::project_candidates;
use label_placement::{PlacementContext, final_placements, place_labels, trim_to_budget};
use scoring::{assign_neighbor_counts, cap_candidates, candidate_cap, score_candidates};

/// Margin around the viewport inside which labels still count as visible.
pub const VIEWPORT_MARGIN: f64 = 12.0;

/// Everything one invocation needs. All of it is read-only.
#[derive(Debug, Clone, Copy)]
pub struct LayoutParams<'a> {
    pub candidates: &'a [LabelCandidate],
    pub camera: Camera,
    pub viewport: Viewport,
    pub config: &'a DeclutterConfig,
    pub sticky: &'a StickyState,
    pub forced: &'a BTreeSet<String>,
}

pub fn compute_label_layout(params: &LayoutParams<'_>) -> LabelLayout {
    let config = params.config;
    let policy = resolve_policy(&config.policy);
    let zoom = params.camera.zoom;
    let candidate_count = params.candidates.len();
    let single_mode_zoom = config.single_mode_zoom();

    let enabled = resolve_enabled(
        &policy,
        zoom,
        params.sticky.enabled,
        candidate_count,
        single_mode_zoom,
        config.mode,
    );
    if !enabled {
        return LabelLayout::empty(false, 0, candidate_count);
    }
    let budget = budget_for_zoom(
        &policy,
        zoom,
        single_mode_zoom,
        config.mode,
        config.max_candidates,
    );
    if candidate_count == 0 || budget == 0 || params.viewport.is_degenerate() {
        return LabelLayout::empty(enabled, budget, candidate_count);
    }

    let projector = Projector::new(&params.camera, params.viewport);
    let mut projected = project_candidates(params.candidates, &projector, params.viewport, config);
    let projected_count = projected.len();
    if projected.is_empty() {
        return LabelLayout::empty(enabled, budget, candidate_count);
    }

    assign_neighbor_counts(&mut projected);
    let ranked = score_candidates(
        projected,
        params.viewport,
        &params.sticky.visible,
        config.sticky_score_bonus(),
    );

    let scene_obstacles = match config.obstacle_scope {
        ObstacleScope::All => ranked
            .iter()
            .filter_map(|s| {
                s.candidate
                    .obstacle
                    .clone()
                    .map(|shape| (s.candidate.id.clone(), shape))
            })
            .collect(),
        ObstacleScope::Placed => Vec::new(),
    };

    let cap = candidate_cap(
        budget,
        config.candidate_multiplier(),
        config.max_candidates,
        ranked.len(),
    );
    let (working, capped_out) = cap_candidates(ranked, cap, params.forced);

    let gaps = config.gaps();
    let slot_set = SlotSet::from_table(&config.slots);
    let cell_size = cell_size_for(working.iter().map(|s| {
        (
            s.candidate.collision_width + gaps.0 * 2.0,
            s.candidate.collision_height + gaps.1 * 2.0,
        )
    }));

    let ctx = PlacementContext {
        viewport: params.viewport,
        budget,
        slots: &slot_set,
        forced: params.forced,
        previous_slots: &params.sticky.slots,
        sticky_slot_bonus: config.sticky_slot_bonus(),
        gaps,
        scope: config.obstacle_scope,
        order: config.placement_order,
        cell_size,
    };
    let (mut entries, stats) = place_labels(&working, scene_obstacles, &ctx);
    let trimmed = trim_to_budget(&mut entries, budget);

    let placements = final_placements(&entries);
    let ids: Vec<String> = placements.iter().map(|p| p.id.clone()).collect();
    let hash = stability_hash(&placements);
    let forced_placed = placements.iter().filter(|p| p.forced).count();
    // Capped, skipped, trimmed, evicted, or with every slot off screen.
    let hidden_count = projected_count
        .saturating_sub(placements.len())
        .saturating_sub(stats.rejected_by_collision);

    tracing::debug!(
        zoom,
        budget,
        candidates = candidate_count,
        projected = projected_count,
        working = working.len(),
        capped_out,
        skipped = stats.skipped_by_budget,
        trimmed,
        placed = placements.len(),
        hidden = hidden_count,
        rejected = stats.rejected_by_collision,
        evicted = stats.evicted,
        forced_placed,
        cell_size,
        "label layout computed"
    );

    LabelLayout {
        placements,
        ids,
        hash,
        enabled,
        budget,
        candidate_count,
        projected_count,
        hidden_count,
        rejected_by_collision: stats.rejected_by_collision,
        forced_placed,
        evicted: stats.evicted,
    }
}
