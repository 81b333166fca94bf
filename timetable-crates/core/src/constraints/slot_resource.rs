use crate::model::Placement;
use crate::model::PlacementId;
use crate::model::TimetableModel;
use crate::model::NR_DAYS;
use crate::model::SLOTS_PER_DAY;

pub(crate) const SLOTS_PER_WEEK: usize = NR_DAYS * SLOTS_PER_DAY as usize;

/// The placements which use a resource, per slot of the week.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SlotResource {
    slots: Vec<Vec<PlacementId>>,
}

impl Default for SlotResource {
    fn default() -> Self {
        SlotResource {
            slots: vec![Vec::new(); SLOTS_PER_WEEK],
        }
    }
}

impl SlotResource {
    pub(crate) fn add(&mut self, placement: &Placement) {
        for slot in placement.time().slots() {
            self.slots[slot].push(placement.id());
        }
    }

    pub(crate) fn remove(&mut self, placement: &Placement) {
        for slot in placement.time().slots() {
            self.slots[slot].retain(|&other| other != placement.id());
        }
    }

    pub(crate) fn placements(&self, slot: usize) -> &[PlacementId] {
        &self.slots[slot]
    }

    /// The placements in `slot` which meet in a week in which `placement` meets as well.
    pub(crate) fn placements_sharing_weeks<'a>(
        &'a self,
        model: &'a TimetableModel,
        slot: usize,
        placement: &'a Placement,
    ) -> impl Iterator<Item = &'a Placement> + 'a {
        self.slots[slot]
            .iter()
            .map(|&id| model.placement(id))
            .filter(|other| other.time().share_weeks(placement.time()))
    }

    pub(crate) fn is_empty(&self, slot: usize) -> bool {
        self.slots[slot].is_empty()
    }
}
