use crate::config::DeviceConfig;
use crate::contact::{extract_contact, ContactRecord, EventType, ObjectType};
use crate::glove::{GloveClassifier, Verdict};
use crate::sink::{AbsAxis, InputSink, SlotBitmap, SLOT_CAPACITY};

/// Slot reserved for the active stylus; it never reports pressure.
pub const ACTIVE_STYLUS_SLOT: usize = 10;

/// Aggregate state carried from one cycle to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotMemory {
    pub previous_contact_count: usize,
    pub previous_object_type: ObjectType,
}

impl Default for SlotMemory {
    fn default() -> Self {
        Self {
            previous_contact_count: 0,
            previous_object_type: ObjectType::StandardFinger,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Emit { slot: usize },
    SuppressGlove,
    DropInvalidId,
    DropLiftOff { slot: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportedContact {
    pub slot: usize,
    pub contact: ContactRecord,
}

/// What one packet produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub contacts: Vec<ReportedContact>,
    pub synced: usize,
    pub active: SlotBitmap,
    pub pressed: bool,
}

pub struct ReportAssembler<'a> {
    cfg: &'a DeviceConfig,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(cfg: &'a DeviceConfig) -> Self {
        Self { cfg }
    }

    /// Classify one decoded contact. Only the glove classifier is mutated.
    pub fn decide(
        &self,
        contact: &ContactRecord,
        classifier: &mut GloveClassifier,
        surface_covered: bool,
    ) -> Decision {
        let ids = &self.cfg.track_ids;
        if !ids.contains(contact.track_id) {
            return Decision::DropInvalidId;
        }
        let slot = (contact.track_id - ids.min) as usize;
        if slot >= SLOT_CAPACITY {
            return Decision::DropInvalidId;
        }
        if classifier.classify(contact, surface_covered) == Verdict::Suppress {
            return Decision::SuppressGlove;
        }
        if contact.event_type == EventType::LiftOff {
            Decision::DropLiftOff { slot }
        } else {
            Decision::Emit { slot }
        }
    }

    pub fn assemble<S: InputSink + ?Sized>(
        &self,
        records: &[u8],
        active_count: usize,
        classifier: &mut GloveClassifier,
        surface_covered: bool,
        memory: &mut SlotMemory,
        sink: &mut S,
    ) -> Frame {
        let si = &self.cfg.sysinfo;
        let extended = si.has_extended_fields();
        let mut frame = Frame::default();
        let mut last_type = memory.previous_object_type;

        for idx in 0..active_count {
            let start = idx * si.record_size;
            let Some(record) = records.get(start..start + si.record_size) else {
                tracing::error!(idx, len = records.len(), "touch record past end of buffer");
                break;
            };
            let mut contact = extract_contact(record, si, &self.cfg.orientation);
            last_type = contact.object_type;

            let decision = self.decide(&contact, classifier, surface_covered);
            let slot = match decision {
                Decision::DropInvalidId => {
                    tracing::warn!(
                        tch = idx,
                        trk_id = contact.track_id,
                        max_id = self.cfg.track_ids.max,
                        "bad track id"
                    );
                    sink.sync_contact();
                    frame.synced += 1;
                    continue;
                }
                Decision::SuppressGlove => {
                    tracing::debug!(t = contact.track_id, "glove touch ignored");
                    continue;
                }
                Decision::Emit { slot } | Decision::DropLiftOff { slot } => slot,
            };

            // With a hover contact in play it is the only one, so the previous
            // type is enough to detect hover -> touch.
            if !frame.pressed
                && (memory.previous_contact_count == 0
                    || (memory.previous_object_type == ObjectType::Hover
                        && contact.object_type != ObjectType::Hover))
            {
                sink.report_touch_key(true);
                frame.pressed = true;
            }

            if let Decision::DropLiftOff { .. } = decision {
                tracing::debug!(t = slot, "lift-off");
                continue;
            }

            sink.report_slot(slot);
            frame.active.set(slot);

            if slot == ACTIVE_STYLUS_SLOT {
                contact.pressure = 0;
            }
            sink.report_abs(AbsAxis::PositionX, contact.x);
            sink.report_abs(AbsAxis::PositionY, contact.y);
            sink.report_abs(AbsAxis::Pressure, contact.pressure);
            if extended {
                contact.correct_zero_size();
                sink.report_abs(AbsAxis::TouchMajor, contact.major_axis);
                sink.report_abs(AbsAxis::TouchMinor, contact.minor_axis);
                sink.report_abs(AbsAxis::Orientation, contact.orientation);
            }
            sink.sync_contact();
            frame.synced += 1;

            tracing::debug!(
                t = slot,
                x = contact.x,
                y = contact.y,
                z = contact.pressure,
                major = contact.major_axis,
                minor = contact.minor_axis,
                o = contact.orientation,
                "contact"
            );
            frame.contacts.push(ReportedContact { slot, contact });
        }

        sink.final_sync(si.max_touches, frame.synced, &frame.active);

        memory.previous_contact_count = active_count;
        memory.previous_object_type = last_type;
        frame
    }
}
