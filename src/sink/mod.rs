pub mod recorder;
#[cfg(target_os = "linux")]
pub mod uinput;

use crate::config::ABSOLUTE_MAX_TOUCHES;

/// One slot per touch of the larger family, plus one for hover.
pub const SLOT_CAPACITY: usize = ABSOLUTE_MAX_TOUCHES + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsAxis {
    PositionX,
    PositionY,
    Pressure,
    TouchMajor,
    TouchMinor,
    Orientation,
}

/// Slots that carried a contact this cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotBitmap {
    bits: [bool; SLOT_CAPACITY],
}

impl SlotBitmap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when `slot` is outside the fixed capacity.
    pub fn set(&mut self, slot: usize) -> bool {
        match self.bits.get_mut(slot) {
            Some(bit) => {
                *bit = true;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self, slot: usize) {
        if let Some(bit) = self.bits.get_mut(slot) {
            *bit = false;
        }
    }

    pub fn contains(&self, slot: usize) -> bool {
        self.bits.get(slot).copied().unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// Slots set here but not in `other`.
    pub fn missing_from<'a>(&'a self, other: &'a SlotBitmap) -> impl Iterator<Item = usize> + 'a {
        self.iter().filter(move |slot| !other.contains(*slot))
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(slot, bit)| bit.then_some(slot))
    }
}

/// Receiver of the normalized contact stream.
///
/// Calls arrive in kernel input order: `report_slot` opens a contact, the axis
/// reports follow, `sync_contact` closes it, and `final_sync` ends the frame.
pub trait InputSink {
    /// `BTN_TOUCH` edge.
    fn report_touch_key(&mut self, pressed: bool);
    fn report_slot(&mut self, slot: usize);
    fn report_abs(&mut self, axis: AbsAxis, value: i32);
    fn sync_contact(&mut self);
    /// End of frame; slots missing from `active` have lifted. Track ids may
    /// map above `max_slots`, so sinks look for lifted slots across the whole
    /// [`SLOT_CAPACITY`].
    fn final_sync(&mut self, max_slots: usize, emitted: usize, active: &SlotBitmap);
    /// Release every slot that is still down.
    fn release_all(&mut self);
    fn sync(&mut self);
}
