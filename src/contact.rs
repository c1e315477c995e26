use crate::axis::decode_field;
use crate::config::{AxisField, Orientation, SysInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    StandardFinger,
    LargeObject,
    Stylus,
    Hover,
    Other(u8),
}

impl ObjectType {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => ObjectType::StandardFinger,
            1 => ObjectType::LargeObject,
            2 => ObjectType::Stylus,
            3 => ObjectType::Hover,
            other => ObjectType::Other(other as u8),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            ObjectType::StandardFinger => 0,
            ObjectType::LargeObject => 1,
            ObjectType::Stylus => 2,
            ObjectType::Hover => 3,
            ObjectType::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    NoEvent,
    TouchDown,
    Move,
    LiftOff,
}

impl EventType {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0x03 {
            1 => EventType::TouchDown,
            2 => EventType::Move,
            3 => EventType::LiftOff,
            _ => EventType::NoEvent,
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            EventType::NoEvent => 0,
            EventType::TouchDown => 1,
            EventType::Move => 2,
            EventType::LiftOff => 3,
        }
    }
}

/// One decoded contact with the orientation transforms applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactRecord {
    pub track_id: u32,
    pub x: i32,
    pub y: i32,
    pub pressure: i32,
    pub major_axis: i32,
    pub minor_axis: i32,
    pub orientation: i32,
    pub object_type: ObjectType,
    pub event_type: EventType,
}

impl ContactRecord {
    /// Sensor artifact: a pressed contact sometimes reports a zero-size blob.
    pub fn correct_zero_size(&mut self) {
        if self.pressure > 0 && self.major_axis == 0 {
            self.major_axis = 1;
            self.minor_axis = 1;
        }
    }
}

/// Decode one raw contact record and apply flip, then invert-x, then invert-y.
///
/// Under flip the inversions use the opposite axis maximum, since x and y
/// have already been swapped.
pub fn extract_contact(record: &[u8], si: &SysInfo, orientation: &Orientation) -> ContactRecord {
    let fields = &si.fields;
    let extended = si.has_extended_fields();
    let extended_field = |field: &AxisField| {
        if extended {
            decode_field(record, field) as i32
        } else {
            0
        }
    };

    let mut contact = ContactRecord {
        track_id: decode_field(record, &fields.track_id),
        x: decode_field(record, &fields.x) as i32,
        y: decode_field(record, &fields.y) as i32,
        pressure: decode_field(record, &fields.pressure) as i32,
        major_axis: extended_field(&fields.major),
        minor_axis: extended_field(&fields.minor),
        orientation: extended_field(&fields.orientation),
        object_type: ObjectType::from_raw(decode_field(record, &fields.object)),
        event_type: EventType::from_raw(decode_field(record, &fields.event)),
    };

    let flipped = orientation.flip;
    if flipped {
        std::mem::swap(&mut contact.x, &mut contact.y);
    }

    let (max_x, max_y) = (si.max_x as i32, si.max_y as i32);
    if orientation.invert_x {
        contact.x = (if flipped { max_y } else { max_x }) - contact.x;
    }
    if orientation.invert_y {
        contact.y = (if flipped { max_x } else { max_y }) - contact.y;
    }

    tracing::trace!(
        flip = flipped,
        inv_x = orientation.invert_x,
        inv_y = orientation.invert_y,
        x = contact.x,
        y = contact.y,
        "extracted contact"
    );

    contact
}
