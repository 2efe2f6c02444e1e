//! Versioned container header
//!
//! Encrypted containers open with a fixed 28-byte UTF-16LE header spelling
//! `Lineage2Ver<NNN>`. A stream that does not start with the tag is treated
//! as already clear and the header bytes are left untouched.

/// Size of the version header in bytes (14 UTF-16LE code units).
pub const HEADER_LEN: usize = 28;

/// The header tag preceding the three-digit version number.
pub const HEADER_TAG: &str = "Lineage2Ver";

/// Parse the version header from the front of a raw stream.
///
/// Returns `Some(version)` when the first 28 bytes decode to the tag plus a
/// decimal version number, `None` for clear streams (too short, not UTF-16LE
/// text, or tag mismatch).
pub fn parse_version(raw: &[u8]) -> Option<u32> {
    if raw.len() < HEADER_LEN {
        return None;
    }
    let mut text = String::with_capacity(HEADER_LEN / 2);
    for pair in raw[..HEADER_LEN].chunks_exact(2) {
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        // The header alphabet is plain ASCII; anything else is payload data.
        if unit == 0 || unit > 0x7F {
            return None;
        }
        text.push(unit as u8 as char);
    }
    let digits = text.strip_prefix(HEADER_TAG)?;
    digits.parse::<u32>().ok()
}

/// Emit the 28-byte header for `version` into `out`.
pub fn write_version(out: &mut Vec<u8>, version: u32) {
    let text = format!("{}{}", HEADER_TAG, version);
    debug_assert_eq!(text.len() * 2, HEADER_LEN);
    for ch in text.bytes() {
        out.push(ch);
        out.push(0);
    }
}
