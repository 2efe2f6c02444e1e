//! XOR scheme family
//!
//! Three single-pass XOR schemes (versions 111, 121, 120) plus the rolling
//! wrapper the legacy 6xx/8xx/9xx tags layer on top of their base schemes.

/// Fixed key for version 111.
pub const KEY_111: u8 = 0xAC;

/// Rolling-XOR start index for version 120.
pub const START_120: u64 = 0xE6;

/// Constant key string for the legacy 6xx/8xx/9xx wrapper.
///
/// The wrapper's rolling index starts at `HEADER_LEN % key.len()` so the
/// key phase lines up with absolute stream positions, header included.
const LEGACY_KEY: &[u8] = b"Range check error while converting variant of type (%s) into type (%s)";

/// Derive the version-121 key from the container's file name: the 8-bit sum
/// of the lower-cased name bytes.
pub fn filename_key(file_name: &str) -> u8 {
    file_name
        .to_lowercase()
        .bytes()
        .fold(0u8, |acc, b| acc.wrapping_add(b))
}

/// XOR every byte with a single fixed key (versions 111 and 121).
pub fn xor_in_place(data: &mut [u8], key: u8) {
    for b in data.iter_mut() {
        *b ^= key;
    }
}

/// Rolling XOR state for version 120.
///
/// Byte `i` of the stream is XORed with `(START_120 + i) & 0xFF`. The state
/// is symmetric, so the same pass encrypts and decrypts. `mark`/`reset`
/// snapshot the rolling index so a streaming reader can rewind.
#[derive(Debug, Clone)]
pub struct RollingXor {
    index: u64,
    mark: u64,
}

impl RollingXor {
    pub fn new() -> Self {
        Self {
            index: START_120,
            mark: START_120,
        }
    }

    /// Transform `data` in place, advancing the rolling index.
    pub fn apply(&mut self, data: &mut [u8]) {
        for b in data.iter_mut() {
            *b ^= (self.index & 0xFF) as u8;
            self.index += 1;
        }
    }

    /// Snapshot the current rolling index.
    pub fn mark(&mut self) {
        self.mark = self.index;
    }

    /// Rewind the rolling index to the last snapshot.
    pub fn reset(&mut self) {
        self.index = self.mark;
    }
}

impl Default for RollingXor {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply the legacy wrapper to the stream body (the bytes after the header).
///
/// Symmetric: one call unwraps, a second call re-wraps.
pub fn legacy_wrap(body: &mut [u8]) {
    let len = LEGACY_KEY.len();
    let start = crate::header::HEADER_LEN % len;
    for (i, b) in body.iter_mut().enumerate() {
        *b ^= LEGACY_KEY[(start + i) % len];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xor_111_symmetric() {
        let mut data = b"Hello, world".to_vec();
        xor_in_place(&mut data, KEY_111);
        assert_ne!(&data, b"Hello, world");
        xor_in_place(&mut data, KEY_111);
        assert_eq!(&data, b"Hello, world");
    }

    #[test]
    fn test_filename_key_case_folds() {
        assert_eq!(filename_key("LineageII.ini"), filename_key("lineageii.ini"));
        assert_eq!(filename_key(""), 0);
    }

    #[test]
    fn test_rolling_xor_roundtrip() {
        let original: Vec<u8> = (0..=255u8).collect();
        let mut data = original.clone();
        let mut enc = RollingXor::new();
        enc.apply(&mut data);
        assert_ne!(data, original);
        let mut dec = RollingXor::new();
        dec.apply(&mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_rolling_xor_mark_reset() {
        let mut state = RollingXor::new();
        let mut prefix = vec![0u8; 16];
        state.apply(&mut prefix);

        state.mark();
        let mut a = vec![0u8; 16];
        state.apply(&mut a);
        state.reset();
        let mut b = vec![0u8; 16];
        state.apply(&mut b);

        // Same rolling index after reset, so the same key stream
        assert_eq!(a, b);
        assert_ne!(a, prefix);
    }

    #[test]
    fn test_legacy_wrap_symmetric() {
        let original = b"package body bytes".to_vec();
        let mut data = original.clone();
        legacy_wrap(&mut data);
        assert_ne!(data, original);
        legacy_wrap(&mut data);
        assert_eq!(data, original);
    }
}
