use crate::config::AxisField;

/// Read `size` bytes big-endian from `data`, shifting each byte right by
/// `bofs` before it is accumulated, and mask the result to `max - 1`.
///
/// `max` is a power of two in every real layout. A zero `size` yields 0.
pub fn decode_axis(data: &[u8], size: usize, max: u32, bofs: u8) -> u32 {
    let axis = data.iter().take(size).fold(0u32, |acc, &byte| {
        let shifted = byte.checked_shr(u32::from(bofs)).unwrap_or(0);
        (acc << 8) | u32::from(shifted)
    });
    axis & max.wrapping_sub(1)
}

/// Decode `field` out of one contact record.
pub fn decode_field(record: &[u8], field: &AxisField) -> u32 {
    match record.get(field.ofs..) {
        Some(bytes) => decode_axis(bytes, field.size, field.max, field.bofs),
        None => 0,
    }
}
