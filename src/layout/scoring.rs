// Local density estimation, composite scoring and the working-set cap.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::ir::Viewport;

use super::types::{ProjectedCandidate, ScoredCandidate};

const DENSITY_CELL: f64 = 96.0;
const WEIGHT_RATING: f64 = 0.55;
const WEIGHT_CENTER: f64 = 0.35;
const WEIGHT_PRIORITY: f64 = 0.10;
const ORPHAN_BONUS: f64 = 0.08;
const MAX_RATING: f64 = 5.0;

fn density_cell(x: f64, y: f64) -> (i64, i64) {
    ((x / DENSITY_CELL).floor() as i64, (y / DENSITY_CELL).floor() as i64)
}

/// Fill `neighbor_count` from 3x3 cell occupancy around each candidate.
pub(crate) fn assign_neighbor_counts(candidates: &mut [ProjectedCandidate]) {
    let mut occupancy: HashMap<(i64, i64), usize> = HashMap::new();
    for candidate in candidates.iter() {
        *occupancy
            .entry(density_cell(candidate.screen_x, candidate.screen_y))
            .or_default() += 1;
    }
    for candidate in candidates.iter_mut() {
        let (cx, cy) = density_cell(candidate.screen_x, candidate.screen_y);
        let mut total = 0usize;
        for ix in cx - 1..=cx + 1 {
            for iy in cy - 1..=cy + 1 {
                total += occupancy.get(&(ix, iy)).copied().unwrap_or(0);
            }
        }
        candidate.neighbor_count = total.saturating_sub(1);
    }
}

#[derive(Debug, Clone, Copy)]
struct PriorityRange {
    min: f64,
    max: f64,
}

impl PriorityRange {
    fn of(candidates: &[ProjectedCandidate]) -> Option<Self> {
        candidates
            .iter()
            .filter_map(|c| c.priority)
            .fold(None, |acc: Option<Self>, p| {
                Some(match acc {
                    None => Self { min: p, max: p },
                    Some(r) => Self {
                        min: r.min.min(p),
                        max: r.max.max(p),
                    },
                })
            })
    }

    fn normalize(&self, priority: f64) -> f64 {
        let span = self.max - self.min;
        if span > f64::EPSILON {
            ((priority - self.min) / span).clamp(0.0, 1.0)
        } else if priority > 0.0 {
            1.0
        } else {
            0.0
        }
    }
}

/// Composite ranking score for every candidate, sorted best first.
pub(crate) fn score_candidates(
    candidates: Vec<ProjectedCandidate>,
    viewport: Viewport,
    previous_visible: &BTreeSet<String>,
    sticky_score_bonus: f64,
) -> Vec<ScoredCandidate> {
    let max_distance = (viewport.width / 2.0).hypot(viewport.height / 2.0).max(1.0);
    let priorities = PriorityRange::of(&candidates);

    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|candidate| {
            let rating = candidate.rating / MAX_RATING;
            let centrality = 1.0 - (candidate.distance_to_center / max_distance).clamp(0.0, 1.0);
            let priority = match (candidate.priority, priorities) {
                (Some(p), Some(range)) => range.normalize(p),
                _ => 0.0,
            };
            let mut score =
                WEIGHT_RATING * rating + WEIGHT_CENTER * centrality + WEIGHT_PRIORITY * priority;
            if candidate.neighbor_count == 0 {
                score += ORPHAN_BONUS;
            }
            if previous_visible.contains(&candidate.id) {
                score += sticky_score_bonus;
            }
            ScoredCandidate { candidate, score }
        })
        .collect();

    scored.sort_by(compare_ranked);
    scored
}

/// Score desc, then priority desc, rating desc, id asc.
pub(crate) fn compare_ranked(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| {
            let pa = a.candidate.priority.unwrap_or(0.0);
            let pb = b.candidate.priority.unwrap_or(0.0);
            pb.total_cmp(&pa)
        })
        .then_with(|| b.candidate.rating.total_cmp(&a.candidate.rating))
        .then_with(|| a.candidate.id.cmp(&b.candidate.id))
}

/// Working-set size for a budget.
pub(crate) fn candidate_cap(
    budget: usize,
    multiplier: f64,
    max_candidates: usize,
    available: usize,
) -> usize {
    let scaled = (budget as f64 * multiplier).round();
    let scaled = if scaled.is_finite() && scaled > 0.0 {
        scaled as usize
    } else {
        0
    };
    budget
        .max(scaled)
        .min(max_candidates.max(budget))
        .max(1)
        .min(available)
}

/// Keep the top `cap` ranked candidates plus every forced id, in rank order.
/// Returns the kept set and how many were cut.
pub(crate) fn cap_candidates(
    ranked: Vec<ScoredCandidate>,
    cap: usize,
    forced: &BTreeSet<String>,
) -> (Vec<ScoredCandidate>, usize) {
    let total = ranked.len();
    let kept: Vec<ScoredCandidate> = ranked
        .into_iter()
        .enumerate()
        .filter(|(rank, entry)| *rank < cap || forced.contains(&entry.candidate.id))
        .map(|(_, entry)| entry)
        .collect();
    let cut = total - kept.len();
    (kept, cut)
}
