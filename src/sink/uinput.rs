use super::{AbsAxis, InputSink, SlotBitmap, SLOT_CAPACITY};
use crate::config::DeviceConfig;
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AbsInfo, AbsoluteAxisType, AttributeSet, EventType, InputEvent, Key, UinputAbsSetup};
use std::io;

const DEVICE_NAME: &str = "glovefilter touchscreen";
const MAX_TRACKING_ID: i32 = 0xFFFF;

pub struct UinputSink {
    device: VirtualDevice,
    pending: Vec<InputEvent>,
    down: SlotBitmap,
    next_tracking_id: i32,
}

impl UinputSink {
    pub fn create(cfg: &DeviceConfig) -> io::Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        keys.insert(Key::BTN_TOUCH);

        let (max_x, max_y) = cfg.axis_ranges();
        let max_slot = cfg.slot_count().min(SLOT_CAPACITY) as i32 - 1;
        let mut axes = vec![
            abs_setup(AbsoluteAxisType::ABS_MT_SLOT, 0, max_slot),
            abs_setup(AbsoluteAxisType::ABS_MT_TRACKING_ID, 0, MAX_TRACKING_ID),
            abs_setup(AbsoluteAxisType::ABS_MT_POSITION_X, 0, max_x as i32),
            abs_setup(AbsoluteAxisType::ABS_MT_POSITION_Y, 0, max_y as i32),
            abs_setup(AbsoluteAxisType::ABS_MT_PRESSURE, 0, cfg.sysinfo.max_p as i32),
        ];
        if cfg.sysinfo.has_extended_fields() {
            axes.push(abs_setup(AbsoluteAxisType::ABS_MT_TOUCH_MAJOR, 0, 255));
            axes.push(abs_setup(AbsoluteAxisType::ABS_MT_TOUCH_MINOR, 0, 255));
            axes.push(abs_setup(AbsoluteAxisType::ABS_MT_ORIENTATION, -127, 127));
        }

        let mut builder = VirtualDeviceBuilder::new()?
            .name(DEVICE_NAME)
            .with_keys(&keys)?;
        for axis in &axes {
            builder = builder.with_absolute_axis(axis)?;
        }
        let device = builder.build()?;
        tracing::info!(name = DEVICE_NAME, max_x, max_y, "created uinput device");

        Ok(Self {
            device,
            pending: Vec::new(),
            down: SlotBitmap::new(),
            next_tracking_id: 0,
        })
    }

    fn push_abs(&mut self, code: AbsoluteAxisType, value: i32) {
        self.pending
            .push(InputEvent::new(EventType::ABSOLUTE, code.0, value));
    }

    fn release_slot(&mut self, slot: usize) {
        self.push_abs(AbsoluteAxisType::ABS_MT_SLOT, slot as i32);
        self.push_abs(AbsoluteAxisType::ABS_MT_TRACKING_ID, -1);
        self.down.clear(slot);
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        if let Err(e) = self.device.emit(&self.pending) {
            tracing::error!("uinput emit failed: {}", e);
        }
        self.pending.clear();
    }
}

fn abs_setup(code: AbsoluteAxisType, min: i32, max: i32) -> UinputAbsSetup {
    UinputAbsSetup::new(code, AbsInfo::new(0, min, max, 0, 0, 0))
}

impl InputSink for UinputSink {
    fn report_touch_key(&mut self, pressed: bool) {
        self.pending.push(InputEvent::new(
            EventType::KEY,
            Key::BTN_TOUCH.code(),
            i32::from(pressed),
        ));
    }

    fn report_slot(&mut self, slot: usize) {
        if slot >= SLOT_CAPACITY {
            return;
        }
        self.push_abs(AbsoluteAxisType::ABS_MT_SLOT, slot as i32);
        if !self.down.contains(slot) {
            let id = self.next_tracking_id;
            self.next_tracking_id = (id + 1) & MAX_TRACKING_ID;
            self.push_abs(AbsoluteAxisType::ABS_MT_TRACKING_ID, id);
            self.down.set(slot);
        }
    }

    fn report_abs(&mut self, axis: AbsAxis, value: i32) {
        let code = match axis {
            AbsAxis::PositionX => AbsoluteAxisType::ABS_MT_POSITION_X,
            AbsAxis::PositionY => AbsoluteAxisType::ABS_MT_POSITION_Y,
            AbsAxis::Pressure => AbsoluteAxisType::ABS_MT_PRESSURE,
            AbsAxis::TouchMajor => AbsoluteAxisType::ABS_MT_TOUCH_MAJOR,
            AbsAxis::TouchMinor => AbsoluteAxisType::ABS_MT_TOUCH_MINOR,
            AbsAxis::Orientation => AbsoluteAxisType::ABS_MT_ORIENTATION,
        };
        self.push_abs(code, value);
    }

    // Protocol B has no per-contact marker.
    fn sync_contact(&mut self) {}

    fn final_sync(&mut self, _max_slots: usize, _emitted: usize, active: &SlotBitmap) {
        let lifted: Vec<usize> = self.down.missing_from(active).collect();
        for slot in lifted {
            self.release_slot(slot);
        }
        self.flush();
    }

    fn release_all(&mut self) {
        let down: Vec<usize> = self.down.iter().collect();
        for slot in down {
            self.release_slot(slot);
        }
    }

    fn sync(&mut self) {
        self.flush();
    }
}
