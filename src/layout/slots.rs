use crate::config::{SlotAlign, SlotSide, SlotTable, finite_or};
use crate::ir::LabelSlot;

use super::types::{ProjectedCandidate, Rect};

/// One distinct anchor geometry shared by one or more named slots.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotVariant {
    pub dx: f64,
    pub dy: f64,
    pub penalty: f64,
    pub align: SlotAlign,
    pub side: SlotSide,
    /// Named slots with this exact geometry, in declared order.
    pub slots: Vec<LabelSlot>,
    order: usize,
}

impl SlotVariant {
    /// Name reported for a placement in this variant.
    pub fn primary(&self, previous: Option<LabelSlot>) -> LabelSlot {
        match previous {
            Some(slot) if self.slots.contains(&slot) => slot,
            _ => self.slots[0],
        }
    }

    pub fn contains(&self, slot: LabelSlot) -> bool {
        self.slots.contains(&slot)
    }

    fn signature(&self) -> (u64, u64, u64, SlotAlign, SlotSide) {
        (
            self.dx.to_bits(),
            self.dy.to_bits(),
            self.penalty.to_bits(),
            self.align,
            self.side,
        )
    }

    /// Label box for `candidate` in this variant.
    pub(crate) fn label_rect(&self, candidate: &ProjectedCandidate) -> Rect {
        let w = candidate.label_width;
        let h = candidate.label_height;
        let ax = candidate.screen_x + candidate.offset_x + self.dx;
        let left = match self.align {
            SlotAlign::Center => ax - w / 2.0,
            SlotAlign::Start => ax,
            SlotAlign::End => ax - w,
        };
        let top = match self.side {
            SlotSide::Below => candidate.screen_y + candidate.offset_y + self.dy,
            SlotSide::Above => candidate.screen_y - candidate.offset_y - h + self.dy,
        };
        Rect::new(left, top, w, h)
    }
}

/// Canonical, deduplicated slot variants for one invocation.
#[derive(Debug, Clone)]
pub struct SlotSet {
    variants: Vec<SlotVariant>,
}

impl SlotSet {
    pub fn from_table(table: &SlotTable) -> Self {
        let mut variants: Vec<SlotVariant> = Vec::new();
        for slot in LabelSlot::ALL {
            let cfg = table.get(slot);
            let variant = SlotVariant {
                dx: finite_or(cfg.dx, 0.0),
                dy: finite_or(cfg.dy, 0.0),
                penalty: finite_or(cfg.penalty, 0.0).max(0.0),
                align: cfg.align,
                side: cfg.side,
                slots: vec![slot],
                order: slot.order_index(),
            };
            if let Some(existing) = variants
                .iter_mut()
                .find(|v| v.signature() == variant.signature())
            {
                existing.slots.push(slot);
                continue;
            }
            variants.push(variant);
        }
        variants.sort_by(|a, b| a.penalty.total_cmp(&b.penalty).then(a.order.cmp(&b.order)));
        Self { variants }
    }

    pub fn variants(&self) -> &[SlotVariant] {
        &self.variants
    }

    /// Variants in try order for a candidate. The variant holding the
    /// previous slot competes with its penalty reduced by `sticky_bonus`.
    pub fn ordered_for(
        &self,
        previous: Option<LabelSlot>,
        sticky_bonus: f64,
    ) -> Vec<&SlotVariant> {
        let mut ordered: Vec<&SlotVariant> = self.variants.iter().collect();
        let Some(previous) = previous else {
            return ordered;
        };
        let effective = |v: &SlotVariant| {
            if v.contains(previous) {
                v.penalty - sticky_bonus
            } else {
                v.penalty
            }
        };
        ordered.sort_by(|a, b| {
            effective(a)
                .total_cmp(&effective(b))
                .then(a.order.cmp(&b.order))
        });
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(order: &[&SlotVariant]) -> Vec<LabelSlot> {
        order.iter().map(|v| v.slots[0]).collect()
    }

    #[test]
    fn default_order_is_penalty_then_declared() {
        let set = SlotSet::from_table(&SlotTable::default());
        assert_eq!(set.variants().len(), 4);
        assert_eq!(
            names(&set.ordered_for(None, 0.06)),
            vec![
                LabelSlot::Below,
                LabelSlot::BelowLeft,
                LabelSlot::BelowRight,
                LabelSlot::Above
            ]
        );
    }

    #[test]
    fn sticky_slot_moves_first_when_competitive() {
        let set = SlotSet::from_table(&SlotTable::default());
        let order = set.ordered_for(Some(LabelSlot::BelowRight), 0.06);
        assert_eq!(order[0].slots[0], LabelSlot::BelowRight);
        assert_eq!(order[1].slots[0], LabelSlot::Below);

        // Too expensive to win with a small bonus.
        let order = set.ordered_for(Some(LabelSlot::Above), 0.01);
        assert_eq!(order[0].slots[0], LabelSlot::Below);
    }

    #[test]
    fn identical_slots_collapse_into_one_variant() {
        let mut table = SlotTable::default();
        table.above = table.below;
        let set = SlotSet::from_table(&table);
        assert_eq!(set.variants().len(), 3);
        let first = &set.variants()[0];
        assert_eq!(first.slots, vec![LabelSlot::Below, LabelSlot::Above]);
        assert_eq!(first.primary(Some(LabelSlot::Above)), LabelSlot::Above);
        assert_eq!(first.primary(None), LabelSlot::Below);
    }
}
