// Greedy label placement with forced-label eviction and budget trimming.
// All functions here work with pure geometry; nothing is drawn.

use std::collections::{BTreeMap, BTreeSet};

use crate::ir::{LabelSlot, ObstacleScope, PlacementOrder, Viewport};

use super::candidates::viewport_bounds;
use super::slots::{SlotSet, SlotVariant};
use super::spatial::{MarkerObstacleIndex, SpatialIndex};
use super::types::{LabelPlacement, ObstacleShape, ProjectedCandidate, Rect, ScoredCandidate};

/// A label placed during one invocation. `active` may go true -> false
/// once (eviction or trimming) and never back.
#[derive(Debug, Clone)]
pub(crate) struct PlacedLabelEntry {
    pub id: String,
    pub forced: bool,
    pub active: bool,
    pub score: f64,
    /// Carries the resolved slot and collision rect.
    pub placement: LabelPlacement,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PlacementStats {
    pub rejected_by_collision: usize,
    pub skipped_by_budget: usize,
    pub evicted: usize,
}

pub(crate) struct PlacementContext<'a> {
    pub viewport: Viewport,
    pub budget: usize,
    pub slots: &'a SlotSet,
    pub forced: &'a BTreeSet<String>,
    pub previous_slots: &'a BTreeMap<String, LabelSlot>,
    pub sticky_slot_bonus: f64,
    pub gaps: (f64, f64),
    pub scope: ObstacleScope,
    pub order: PlacementOrder,
    pub cell_size: f64,
}

/// Collision box centered on the label box, grown by the gaps.
pub(crate) fn collision_rect(
    label: &Rect,
    candidate: &ProjectedCandidate,
    gaps: (f64, f64),
) -> Rect {
    let (cx, cy) = label.center();
    let w = candidate.collision_width;
    let h = candidate.collision_height;
    Rect::new(cx - w / 2.0, cy - h / 2.0, w, h).inflate(gaps.0, gaps.1)
}

fn slot_score(
    base: f64,
    variant: &SlotVariant,
    previous: Option<LabelSlot>,
    sticky_slot_bonus: f64,
) -> f64 {
    let sticky = previous.is_some_and(|slot| variant.contains(slot));
    base - variant.penalty + if sticky { sticky_slot_bonus } else { 0.0 }
}

/// Processing order over `ranked`, tagged with the forced flag.
/// `ForcedFirst` runs forced candidates before the rest; `Ranked` keeps the
/// slice order for everyone.
fn processing_order<'a>(
    ranked: &'a [ScoredCandidate],
    forced: &BTreeSet<String>,
    order: PlacementOrder,
) -> Vec<(&'a ScoredCandidate, bool)> {
    let tagged = ranked
        .iter()
        .map(|s| (s, forced.contains(&s.candidate.id)));
    match order {
        PlacementOrder::Ranked => tagged.collect(),
        PlacementOrder::ForcedFirst => {
            let (mut first, rest): (Vec<_>, Vec<_>) = tagged.partition(|(_, f)| *f);
            first.extend(rest);
            first
        }
    }
}

/// Region that holds every collision box a visible label can have.
fn query_extent(visible: Rect, ranked: &[ScoredCandidate], gaps: (f64, f64)) -> Rect {
    let (reach_x, reach_y) = ranked.iter().fold((0.0f64, 0.0f64), |(rx, ry), s| {
        let c = &s.candidate;
        (
            rx.max(c.label_width.max(c.collision_width)),
            ry.max(c.label_height.max(c.collision_height)),
        )
    });
    visible.inflate(reach_x + gaps.0, reach_y + gaps.1)
}

/// Greedily place `ranked` candidates. `scene_obstacles` holds every
/// projected marker when the scope is [`ObstacleScope::All`].
pub(crate) fn place_labels(
    ranked: &[ScoredCandidate],
    scene_obstacles: Vec<(String, ObstacleShape)>,
    ctx: &PlacementContext<'_>,
) -> (Vec<PlacedLabelEntry>, PlacementStats) {
    let visible = viewport_bounds(ctx.viewport);
    let extent = query_extent(visible, ranked, ctx.gaps);
    let mut labels = SpatialIndex::new(ctx.cell_size).clipped_to(extent);
    let mut markers = MarkerObstacleIndex::new(ctx.cell_size, extent);
    for (owner, shape) in scene_obstacles {
        markers.insert(&owner, shape);
    }

    let mut entries: Vec<PlacedLabelEntry> = Vec::new();
    let mut stats = PlacementStats::default();
    let mut active_count = 0usize;

    for (scored, forced) in processing_order(ranked, ctx.forced, ctx.order) {
        let candidate = &scored.candidate;
        if !forced && active_count >= ctx.budget {
            stats.skipped_by_budget += 1;
            continue;
        }
        let previous = ctx.previous_slots.get(&candidate.id).copied();
        let mut collided = false;
        let mut placed = false;

        for variant in ctx.slots.ordered_for(previous, ctx.sticky_slot_bonus) {
            let label = variant.label_rect(candidate);
            if !label.intersects(&visible) {
                continue;
            }
            let collision = collision_rect(&label, candidate, ctx.gaps);
            if markers.collides(&collision, &candidate.id) {
                collided = true;
                continue;
            }

            let score = slot_score(scored.score, variant, previous, ctx.sticky_slot_bonus);
            let overlaps: Vec<usize> = labels
                .query_overlapping(&collision)
                .filter(|&handle| entries[handle].active)
                .collect();
            if !overlaps.is_empty() {
                collided = true;
                if !forced {
                    continue;
                }
                let evictable = overlaps
                    .iter()
                    .all(|&handle| !entries[handle].forced && entries[handle].score < score);
                if !evictable {
                    continue;
                }
                for handle in overlaps {
                    let incumbent = &mut entries[handle];
                    incumbent.active = false;
                    if ctx.scope == ObstacleScope::Placed {
                        markers.deactivate_owner(&incumbent.id);
                    }
                    tracing::trace!(
                        evicted = %incumbent.id,
                        by = %candidate.id,
                        incumbent_score = incumbent.score,
                        score,
                        "forced label evicted incumbent"
                    );
                    active_count -= 1;
                    stats.evicted += 1;
                }
            }

            let slot = variant.primary(previous);
            let handle = labels.insert(collision);
            debug_assert_eq!(handle, entries.len());
            if ctx.scope == ObstacleScope::Placed
                && let Some(shape) = candidate.obstacle.as_ref()
            {
                markers.insert(&candidate.id, shape.clone());
            }
            entries.push(PlacedLabelEntry {
                id: candidate.id.clone(),
                forced,
                active: true,
                score,
                placement: LabelPlacement {
                    id: candidate.id.clone(),
                    title: candidate.title.clone(),
                    slot,
                    left: label.x,
                    top: label.y,
                    width: label.width,
                    height: label.height,
                    screen_x: candidate.screen_x,
                    screen_y: candidate.screen_y,
                    score,
                    forced,
                    collision,
                },
            });
            active_count += 1;
            placed = true;
            break;
        }

        if !placed && collided {
            stats.rejected_by_collision += 1;
        }
    }

    (entries, stats)
}

/// Deactivate the lowest-scoring non-forced entries until the active count
/// fits `budget`. Forced entries always stay. Returns how many were dropped.
pub(crate) fn trim_to_budget(entries: &mut [PlacedLabelEntry], budget: usize) -> usize {
    let active = entries.iter().filter(|e| e.active).count();
    if active <= budget {
        return 0;
    }
    let forced = entries.iter().filter(|e| e.active && e.forced).count();
    let room = budget.saturating_sub(forced);

    let mut optional: Vec<usize> = (0..entries.len())
        .filter(|&i| entries[i].active && !entries[i].forced)
        .collect();
    optional.sort_by(|&a, &b| {
        entries[b]
            .score
            .total_cmp(&entries[a].score)
            .then_with(|| entries[a].id.cmp(&entries[b].id))
    });
    let mut dropped = 0;
    for &idx in optional.iter().skip(room) {
        entries[idx].active = false;
        dropped += 1;
    }
    dropped
}

/// Active placements, best score first.
pub(crate) fn final_placements(entries: &[PlacedLabelEntry]) -> Vec<LabelPlacement> {
    let mut placements: Vec<LabelPlacement> = entries
        .iter()
        .filter(|e| e.active)
        .map(|e| e.placement.clone())
        .collect();
    placements.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    placements
}

/// `id:slot` pairs sorted by id, joined with `|`.
pub fn stability_hash(placements: &[LabelPlacement]) -> String {
    let mut pairs: Vec<(&str, LabelSlot)> = placements
        .iter()
        .map(|p| (p.id.as_str(), p.slot))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
        .iter()
        .map(|(id, slot)| format!("{id}:{slot}"))
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SlotTable;

    const VIEWPORT: Viewport = Viewport {
        width: 400.0,
        height: 400.0,
    };

    fn scored(id: &str, x: f64, y: f64, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            candidate: ProjectedCandidate {
                id: id.to_string(),
                title: id.to_string(),
                rating: 0.0,
                priority: None,
                screen_x: x,
                screen_y: y,
                label_width: 80.0,
                label_height: 16.0,
                offset_x: 0.0,
                offset_y: 10.0,
                collision_width: 80.0,
                collision_height: 16.0,
                obstacle: None,
                distance_to_center: 0.0,
                neighbor_count: 0,
            },
            score,
        }
    }

    /// Only the `below` slot; every other slot is pushed far off-screen.
    fn single_slot() -> SlotSet {
        let mut table = SlotTable::default();
        for cfg in [
            &mut table.below_left,
            &mut table.below_right,
            &mut table.above,
        ] {
            cfg.dy = 10_000.0;
        }
        SlotSet::from_table(&table)
    }

    fn context<'a>(
        slots: &'a SlotSet,
        forced: &'a BTreeSet<String>,
        previous: &'a BTreeMap<String, LabelSlot>,
        budget: usize,
    ) -> PlacementContext<'a> {
        PlacementContext {
            viewport: VIEWPORT,
            budget,
            slots,
            forced,
            previous_slots: previous,
            sticky_slot_bonus: 0.06,
            gaps: (0.0, 0.0),
            scope: ObstacleScope::Placed,
            order: PlacementOrder::ForcedFirst,
            cell_size: 64.0,
        }
    }

    fn active_ids(entries: &[PlacedLabelEntry]) -> Vec<&str> {
        entries
            .iter()
            .filter(|e| e.active)
            .map(|e| e.id.as_str())
            .collect()
    }

    #[test]
    fn higher_score_wins_without_eviction() {
        let slots = single_slot();
        let forced = BTreeSet::new();
        let previous = BTreeMap::new();
        let ranked = vec![scored("a", 200.0, 200.0, 0.9), scored("b", 200.0, 200.0, 0.3)];
        let ctx = context(&slots, &forced, &previous, 5);
        let (entries, stats) = place_labels(&ranked, Vec::new(), &ctx);
        assert_eq!(active_ids(&entries), vec!["a"]);
        assert_eq!(stats.evicted, 0);
        assert_eq!(stats.rejected_by_collision, 1);
    }

    #[test]
    fn forced_label_evicts_weaker_incumbent() {
        let slots = single_slot();
        let forced: BTreeSet<String> = ["a".to_string()].into();
        let previous = BTreeMap::new();
        let mut ctx = context(&slots, &forced, &previous, 5);
        ctx.order = PlacementOrder::Ranked;
        // Ranked order processes b first; forced a then evicts it.
        let ranked = vec![scored("b", 200.0, 200.0, 0.3), scored("a", 200.0, 200.0, 0.9)];
        let (entries, stats) = place_labels(&ranked, Vec::new(), &ctx);
        assert_eq!(active_ids(&entries), vec!["a"]);
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].active);
        assert_eq!(stats.evicted, 1);
        assert_eq!(stats.rejected_by_collision, 0);
    }

    #[test]
    fn forced_first_order_never_meets_optional_incumbents() {
        let slots = single_slot();
        let forced: BTreeSet<String> = ["a".to_string()].into();
        let previous = BTreeMap::new();
        let ranked = vec![scored("b", 200.0, 200.0, 0.3), scored("a", 200.0, 200.0, 0.9)];
        let ctx = context(&slots, &forced, &previous, 5);
        let (entries, stats) = place_labels(&ranked, Vec::new(), &ctx);
        assert_eq!(active_ids(&entries), vec!["a"]);
        assert_eq!(stats.evicted, 0);
        assert_eq!(stats.rejected_by_collision, 1);
    }

    #[test]
    fn forced_cannot_evict_stronger_incumbent() {
        let slots = single_slot();
        let forced: BTreeSet<String> = ["a".to_string()].into();
        let previous = BTreeMap::new();
        let mut ctx = context(&slots, &forced, &previous, 5);
        ctx.order = PlacementOrder::Ranked;
        let ranked = vec![scored("b", 200.0, 200.0, 0.95), scored("a", 200.0, 200.0, 0.9)];
        let (entries, stats) = place_labels(&ranked, Vec::new(), &ctx);
        assert_eq!(active_ids(&entries), vec!["b"]);
        assert_eq!(stats.evicted, 0);
        assert_eq!(stats.rejected_by_collision, 1);
    }

    #[test]
    fn forced_cannot_evict_forced() {
        let slots = single_slot();
        let forced: BTreeSet<String> = ["a".to_string(), "b".to_string()].into();
        let previous = BTreeMap::new();
        let ranked = vec![scored("a", 200.0, 200.0, 0.9), scored("b", 200.0, 200.0, 0.3)];
        let ctx = context(&slots, &forced, &previous, 5);
        let (entries, stats) = place_labels(&ranked, Vec::new(), &ctx);
        assert_eq!(active_ids(&entries), vec!["a"]);
        assert_eq!(stats.rejected_by_collision, 1);
        assert_eq!(stats.evicted, 0);
    }

    #[test]
    fn budget_stops_optional_labels_but_not_forced() {
        let slots = single_slot();
        let forced: BTreeSet<String> = ["late".to_string()].into();
        let previous = BTreeMap::new();
        let ranked = vec![
            scored("one", 50.0, 50.0, 0.9),
            scored("two", 200.0, 50.0, 0.8),
            scored("late", 200.0, 300.0, 0.1),
        ];
        let ctx = context(&slots, &forced, &previous, 2);
        let (entries, stats) = place_labels(&ranked, Vec::new(), &ctx);
        assert_eq!(active_ids(&entries), vec!["late", "one"]);
        assert_eq!(stats.skipped_by_budget, 1);
    }

    #[test]
    fn falls_back_to_next_slot_on_collision() {
        let slots = SlotSet::from_table(&SlotTable::default());
        let forced = BTreeSet::new();
        let previous = BTreeMap::new();
        let ranked = vec![scored("a", 200.0, 200.0, 0.9), scored("b", 200.0, 200.0, 0.5)];
        let ctx = context(&slots, &forced, &previous, 5);
        let (entries, _) = place_labels(&ranked, Vec::new(), &ctx);
        let b = entries.iter().find(|e| e.id == "b").unwrap();
        assert_eq!(b.placement.slot, LabelSlot::Above);
        assert!((b.score - (0.5 - 0.08)).abs() < 1e-9);
    }

    #[test]
    fn all_scope_markers_block_labels() {
        let slots = single_slot();
        let forced = BTreeSet::new();
        let previous = BTreeMap::new();
        let mut ctx = context(&slots, &forced, &previous, 5);
        ctx.scope = ObstacleScope::All;
        let obstacle = ObstacleShape::Zones(vec![Rect::new(180.0, 205.0, 40.0, 30.0)]);
        let ranked = vec![scored("a", 200.0, 200.0, 0.9)];
        let unlabeled = vec![("unlabeled".to_string(), obstacle.clone())];
        let (entries, stats) = place_labels(&ranked, unlabeled, &ctx);
        assert!(entries.is_empty());
        assert_eq!(stats.rejected_by_collision, 1);

        // The same geometry owned by the label itself does not block it.
        let (entries, _) = place_labels(&ranked, vec![("a".to_string(), obstacle)], &ctx);
        assert_eq!(active_ids(&entries), vec!["a"]);
    }

    #[test]
    fn trimming_keeps_forced_and_best() {
        let slots = single_slot();
        let forced: BTreeSet<String> = ["f1".to_string(), "f2".to_string()].into();
        let previous = BTreeMap::new();
        let ranked = vec![
            scored("x", 50.0, 50.0, 0.9),
            scored("y", 200.0, 50.0, 0.5),
            scored("f1", 50.0, 250.0, 0.2),
            scored("f2", 200.0, 250.0, 0.1),
        ];
        let ctx = context(&slots, &forced, &previous, 4);
        let (mut entries, _) = place_labels(&ranked, Vec::new(), &ctx);
        assert_eq!(active_ids(&entries).len(), 4);
        let dropped = trim_to_budget(&mut entries, 3);
        assert_eq!(dropped, 1);
        let mut ids = active_ids(&entries);
        ids.sort();
        assert_eq!(ids, vec!["f1", "f2", "x"]);
    }

    #[test]
    fn hash_is_sorted_by_id() {
        let slots = single_slot();
        let forced = BTreeSet::new();
        let previous = BTreeMap::new();
        let ranked = vec![scored("zeta", 50.0, 50.0, 0.9), scored("alpha", 250.0, 250.0, 0.5)];
        let ctx = context(&slots, &forced, &previous, 5);
        let (entries, _) = place_labels(&ranked, Vec::new(), &ctx);
        let placements = final_placements(&entries);
        assert_eq!(placements[0].id, "zeta");
        assert_eq!(stability_hash(&placements), "alpha:below|zeta:below");
        assert_eq!(stability_hash(&[]), "");
    }
}
