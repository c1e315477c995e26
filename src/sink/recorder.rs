use super::{AbsAxis, InputSink, SlotBitmap, SLOT_CAPACITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    TouchKey(bool),
    Slot(usize),
    Abs(AbsAxis, i32),
    ContactSync,
    FinalSync {
        max_slots: usize,
        emitted: usize,
        active: SlotBitmap,
    },
    ReleaseAll,
    Sync,
}

/// Sink that keeps every call, in order.
#[derive(Debug, Default)]
pub struct EventRecorder {
    pub events: Vec<SinkEvent>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<SinkEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn key_edges(&self) -> Vec<bool> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::TouchKey(pressed) => Some(*pressed),
                _ => None,
            })
            .collect()
    }
}

impl InputSink for EventRecorder {
    fn report_touch_key(&mut self, pressed: bool) {
        self.events.push(SinkEvent::TouchKey(pressed));
    }

    fn report_slot(&mut self, slot: usize) {
        self.events.push(SinkEvent::Slot(slot));
    }

    fn report_abs(&mut self, axis: AbsAxis, value: i32) {
        self.events.push(SinkEvent::Abs(axis, value));
    }

    fn sync_contact(&mut self) {
        self.events.push(SinkEvent::ContactSync);
    }

    fn final_sync(&mut self, max_slots: usize, emitted: usize, active: &SlotBitmap) {
        self.events.push(SinkEvent::FinalSync {
            max_slots,
            emitted,
            active: *active,
        });
    }

    fn release_all(&mut self) {
        self.events.push(SinkEvent::ReleaseAll);
    }

    fn sync(&mut self) {
        self.events.push(SinkEvent::Sync);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TouchData {
    pub used: bool,
    pub position_x: i32,
    pub position_y: i32,
    pub pressure: i32,
    pub touch_major: i32,
    pub touch_minor: i32,
    pub orientation: i32,
}

/// Rebuilds per-slot contact state from a recorded event stream.
#[derive(Debug)]
pub struct ContactView {
    slot: Option<usize>,
    pub touching: bool,
    pub touches: [TouchData; SLOT_CAPACITY],
}

impl Default for ContactView {
    fn default() -> Self {
        Self {
            slot: None,
            touching: false,
            touches: [TouchData::default(); SLOT_CAPACITY],
        }
    }
}

impl ContactView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, event: &SinkEvent) {
        match *event {
            SinkEvent::TouchKey(pressed) => self.touching = pressed,
            SinkEvent::Slot(slot) if slot < SLOT_CAPACITY => {
                self.slot = Some(slot);
                self.touches[slot].used = true;
            }
            SinkEvent::Slot(_) => self.slot = None,
            SinkEvent::Abs(axis, value) => {
                let Some(slot) = self.slot else {
                    return;
                };
                let touch = &mut self.touches[slot];
                match axis {
                    AbsAxis::PositionX => touch.position_x = value,
                    AbsAxis::PositionY => touch.position_y = value,
                    AbsAxis::Pressure => touch.pressure = value,
                    AbsAxis::TouchMajor => touch.touch_major = value,
                    AbsAxis::TouchMinor => touch.touch_minor = value,
                    AbsAxis::Orientation => touch.orientation = value,
                }
            }
            SinkEvent::ContactSync => self.slot = None,
            SinkEvent::FinalSync { active, .. } => {
                for (slot, touch) in self.touches.iter_mut().enumerate() {
                    if !active.contains(slot) {
                        touch.used = false;
                    }
                }
            }
            SinkEvent::ReleaseAll => {
                for touch in &mut self.touches {
                    touch.used = false;
                }
            }
            SinkEvent::Sync => {}
        }
    }

    pub fn active(&self) -> impl Iterator<Item = (usize, &TouchData)> {
        self.touches.iter().enumerate().filter(|(_, t)| t.used)
    }
}

/// Format one event in evtest notation.
pub fn format_event(event: &SinkEvent) -> String {
    match event {
        SinkEvent::TouchKey(pressed) => format!("EV_KEY(BTN_TOUCH, {})", u8::from(*pressed)),
        SinkEvent::Slot(slot) => format!("EV_ABS(SLOT, {})", slot),
        SinkEvent::Abs(axis, value) => format!("EV_ABS({}, {})", axis_name(*axis), value),
        SinkEvent::ContactSync => "EV_SYN(SYN_MT_REPORT)".to_string(),
        SinkEvent::FinalSync {
            max_slots,
            emitted,
            active,
        } => format!(
            "FINAL_SYNC(max={}, emitted={}, active={:?})",
            max_slots,
            emitted,
            active.iter().collect::<Vec<_>>()
        ),
        SinkEvent::ReleaseAll => "RELEASE_ALL".to_string(),
        SinkEvent::Sync => "EV_SYN(SYN_REPORT)".to_string(),
    }
}

fn axis_name(axis: AbsAxis) -> &'static str {
    match axis {
        AbsAxis::PositionX => "POSITION_X",
        AbsAxis::PositionY => "POSITION_Y",
        AbsAxis::Pressure => "PRESSURE",
        AbsAxis::TouchMajor => "TOUCH_MAJOR",
        AbsAxis::TouchMinor => "TOUCH_MINOR",
        AbsAxis::Orientation => "ORIENTATION",
    }
}
