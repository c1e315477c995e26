use crate::contact::{ContactRecord, EventType, ObjectType};

pub const GLOVE_SLOTS: usize = 4;
pub const GLOVE_FILTER_DIST: i32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchTypeState {
    FingerBelieved,
    GloveBelieved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Report,
    Suppress,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GloveTrackSlot {
    pub candidate: Option<u32>,
    pub anchor_x: i32,
    pub anchor_y: i32,
}

impl GloveTrackSlot {
    fn claim(&mut self, contact: &ContactRecord) {
        self.candidate = Some(contact.track_id);
        self.anchor_x = contact.x;
        self.anchor_y = contact.y;
    }

    fn travelled(&self, contact: &ContactRecord) -> bool {
        (contact.x - self.anchor_x).abs() >= GLOVE_FILTER_DIST
            || (contact.y - self.anchor_y).abs() >= GLOVE_FILTER_DIST
    }
}

/// The controller tags a gloved touch as hover. A hover contact only flips the
/// belief to glove once it has travelled [`GLOVE_FILTER_DIST`] along either
/// axis from where it was first seen; a finger contact flips it back. Hover
/// contacts themselves are never reported, the belief only biases later ones.
#[derive(Debug, Clone)]
pub struct GloveClassifier {
    state: TouchTypeState,
    slots: [GloveTrackSlot; GLOVE_SLOTS],
}

impl Default for GloveClassifier {
    fn default() -> Self {
        Self {
            state: TouchTypeState::GloveBelieved,
            slots: [GloveTrackSlot::default(); GLOVE_SLOTS],
        }
    }
}

impl GloveClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TouchTypeState {
        self.state
    }

    pub fn set_state(&mut self, state: TouchTypeState) {
        self.state = state;
    }

    pub fn slots(&self) -> &[GloveTrackSlot; GLOVE_SLOTS] {
        &self.slots
    }

    pub fn classify(&mut self, contact: &ContactRecord, surface_covered: bool) -> Verdict {
        match contact.object_type {
            ObjectType::Hover if surface_covered => {
                tracing::debug!(t = contact.track_id, "surface covered, filter glove info");
                Verdict::Suppress
            }
            ObjectType::StandardFinger => {
                self.state = TouchTypeState::FingerBelieved;
                if let Some(slot) = self.slot_of(contact.track_id) {
                    self.slots[slot] = GloveTrackSlot::default();
                }
                Verdict::Report
            }
            ObjectType::Hover => {
                if self.state == TouchTypeState::FingerBelieved {
                    self.check_distance(contact);
                }
                Verdict::Suppress
            }
            _ => Verdict::Report,
        }
    }

    fn check_distance(&mut self, contact: &ContactRecord) {
        let held = self.slot_of(contact.track_id);
        match contact.event_type {
            EventType::TouchDown | EventType::Move => match held {
                Some(slot) => {
                    if self.slots[slot].travelled(contact) {
                        self.believe_glove(contact);
                    }
                }
                None => match self.slots.iter().position(|s| s.candidate.is_none()) {
                    Some(free) => self.slots[free].claim(contact),
                    None => tracing::debug!(
                        t = contact.track_id,
                        "glove candidate pool full, contact not tracked"
                    ),
                },
            },
            EventType::LiftOff => {
                if let Some(slot) = held {
                    if self.slots[slot].travelled(contact) {
                        self.believe_glove(contact);
                    }
                    self.slots[slot] = GloveTrackSlot::default();
                }
            }
            EventType::NoEvent => {}
        }
    }

    fn believe_glove(&mut self, contact: &ContactRecord) {
        tracing::debug!(t = contact.track_id, x = contact.x, y = contact.y, "glove drag");
        self.state = TouchTypeState::GloveBelieved;
    }

    fn slot_of(&self, track_id: u32) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.candidate == Some(track_id))
    }
}
