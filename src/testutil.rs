use crate::config::{AxisField, SysInfo};
use crate::contact::{ContactRecord, EventType, ObjectType};

pub fn finger(track_id: u32, x: i32, y: i32, pressure: i32) -> ContactRecord {
    ContactRecord {
        track_id,
        x,
        y,
        pressure,
        major_axis: 0,
        minor_axis: 0,
        orientation: 0,
        object_type: ObjectType::StandardFinger,
        event_type: EventType::TouchDown,
    }
}

pub fn hover(track_id: u32, event_type: EventType, x: i32, y: i32) -> ContactRecord {
    ContactRecord {
        object_type: ObjectType::Hover,
        event_type,
        ..finger(track_id, x, y, 0)
    }
}

fn put(record: &mut [u8], field: &AxisField, value: u32) {
    let value = value & field.max.wrapping_sub(1);
    for i in 0..field.size {
        let byte = (value >> (8 * (field.size - 1 - i))) & 0xFF;
        record[field.ofs + i] |= (byte << field.bofs) as u8;
    }
}

/// Inverse of `extract_contact` with every orientation flag off.
pub fn encode_record(si: &SysInfo, contact: &ContactRecord) -> Vec<u8> {
    let f = &si.fields;
    let mut record = vec![0u8; si.record_size];
    put(&mut record, &f.object, u32::from(contact.object_type.raw()));
    put(&mut record, &f.x, contact.x as u32);
    put(&mut record, &f.y, contact.y as u32);
    put(&mut record, &f.pressure, contact.pressure as u32);
    put(&mut record, &f.track_id, contact.track_id);
    put(&mut record, &f.event, u32::from(contact.event_type.raw()));
    if si.has_extended_fields() {
        put(&mut record, &f.major, contact.major_axis as u32);
        put(&mut record, &f.minor, contact.minor_axis as u32);
        put(&mut record, &f.orientation, contact.orientation as u32);
    }
    record
}

pub fn encode_records(si: &SysInfo, contacts: &[ContactRecord]) -> Vec<u8> {
    contacts.iter().flat_map(|c| encode_record(si, c)).collect()
}

/// Full operational snapshot: header then records. `tt_flags` is OR-ed into
/// the touch status byte above the count.
pub fn packet(si: &SysInfo, rep_stat: u8, tt_flags: u8, contacts: &[ContactRecord]) -> Vec<u8> {
    let records = encode_records(si, contacts);
    let mut data = vec![0u8; si.records_ofs()];
    data[si.rep_ofs] = records.len().max(1) as u8;
    data[si.rep_ofs + 1] = rep_stat;
    data[si.tt_stat_ofs] = tt_flags | contacts.len() as u8;
    data.extend(records);
    data
}
