//! Cryptographic transport for Lineage 2 asset containers
//!
//! Containers open with a 28-byte `Lineage2Ver<NNN>` header whose version
//! tag selects one of five cipher families: whole-stream XOR (111/121),
//! rolling XOR (120), raw-block Blowfish (211/212), and RSA blocks over a
//! zlib payload (411-414). Legacy tags (611-614, 811-812, 911-912) add a
//! constant-keyed rolling-XOR wrapper around one of the base schemes.
//!
//! A stream without the header tag is already clear and passes through
//! untouched. A crypto failure is fatal for that one file only.

pub mod block;
pub mod error;
pub mod header;
pub mod rsa;
pub mod xor;

pub use error::CryptError;
pub use header::{HEADER_LEN, HEADER_TAG};
pub use rsa::{RsaKeyPair, RsaKeyRing};
pub use xor::RollingXor;

use tracing::debug;

/// The transform family selected by a container's version tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// No header tag: the stream is already clear
    None,
    /// Whole-stream XOR with the fixed key 0xAC
    Xor111,
    /// Whole-stream XOR keyed by the lower-cased file name
    Xor121,
    /// Rolling position-keyed XOR
    Xor120,
    /// Blowfish raw blocks, version 211 key
    Blowfish211,
    /// Blowfish raw blocks, version 212 key
    Blowfish212,
    /// RSA blocks over a zlib payload
    Rsa411,
    Rsa412,
    Rsa413,
    Rsa414,
}

impl Scheme {
    /// Scheme for a normalized (non-legacy) version tag.
    pub fn from_version(version: u32) -> Option<Self> {
        match version {
            111 => Some(Scheme::Xor111),
            121 => Some(Scheme::Xor121),
            120 => Some(Scheme::Xor120),
            211 => Some(Scheme::Blowfish211),
            212 => Some(Scheme::Blowfish212),
            411 => Some(Scheme::Rsa411),
            412 => Some(Scheme::Rsa412),
            413 => Some(Scheme::Rsa413),
            414 => Some(Scheme::Rsa414),
            _ => None,
        }
    }

    /// Version tag this scheme writes into a header, if any.
    pub fn version(&self) -> Option<u32> {
        match self {
            Scheme::None => None,
            Scheme::Xor111 => Some(111),
            Scheme::Xor121 => Some(121),
            Scheme::Xor120 => Some(120),
            Scheme::Blowfish211 => Some(211),
            Scheme::Blowfish212 => Some(212),
            Scheme::Rsa411 => Some(411),
            Scheme::Rsa412 => Some(412),
            Scheme::Rsa413 => Some(413),
            Scheme::Rsa414 => Some(414),
        }
    }
}

/// Map a legacy version tag onto its base version. Returns the normalized
/// version and whether the legacy wrapper applies.
fn normalize_version(version: u32) -> (u32, bool) {
    match version {
        611..=614 => (version - 200, true),
        811..=812 => (version - 600, true),
        911..=912 => (version - 800, true),
        _ => (version, false),
    }
}

fn apply_scheme_decrypt(
    version: u32,
    tag: u32,
    body: &mut Vec<u8>,
    file_name: &str,
    ring: &RsaKeyRing,
) -> Result<Scheme, CryptError> {
    let scheme = Scheme::from_version(version).ok_or(CryptError::UnsupportedVersion(tag))?;
    match scheme {
        Scheme::None => unreachable!("from_version never yields None"),
        Scheme::Xor111 => xor::xor_in_place(body, xor::KEY_111),
        Scheme::Xor121 => xor::xor_in_place(body, xor::filename_key(file_name)),
        Scheme::Xor120 => RollingXor::new().apply(body),
        Scheme::Blowfish211 => *body = block::decrypt(body, block::KEY_211)?,
        Scheme::Blowfish212 => *body = block::decrypt(body, block::KEY_212)?,
        Scheme::Rsa411 | Scheme::Rsa412 | Scheme::Rsa413 | Scheme::Rsa414 => {
            let pair = ring
                .pair_for(version)
                .ok_or(CryptError::UnsupportedVersion(tag))?;
            *body = rsa::decrypt(body, pair)?;
        }
    }
    Ok(scheme)
}

/// Decrypt a raw container stream using the built-in RSA key ring.
///
/// Returns the detected scheme and the clear bytes. A stream without the
/// version header passes through unchanged as [`Scheme::None`].
pub fn decrypt(raw: &[u8], file_name: &str) -> Result<(Scheme, Vec<u8>), CryptError> {
    decrypt_with_ring(raw, file_name, RsaKeyRing::builtin())
}

/// Decrypt with a caller-supplied RSA key ring.
pub fn decrypt_with_ring(
    raw: &[u8],
    file_name: &str,
    ring: &RsaKeyRing,
) -> Result<(Scheme, Vec<u8>), CryptError> {
    let Some(tag) = header::parse_version(raw) else {
        return Ok((Scheme::None, raw.to_vec()));
    };
    let mut body = raw[HEADER_LEN..].to_vec();
    let (version, legacy) = normalize_version(tag);
    if legacy {
        xor::legacy_wrap(&mut body);
    }
    let scheme = apply_scheme_decrypt(version, tag, &mut body, file_name, ring)?;
    debug!(%file_name, tag, ?scheme, "container stream unwrapped");
    Ok((scheme, body))
}

/// Encrypt clear bytes into a container stream for a version tag, using the
/// built-in RSA key ring.
pub fn encrypt(clear: &[u8], file_name: &str, version: u32) -> Result<Vec<u8>, CryptError> {
    encrypt_with_ring(clear, file_name, version, RsaKeyRing::builtin())
}

/// Encrypt with a caller-supplied RSA key ring.
pub fn encrypt_with_ring(
    clear: &[u8],
    file_name: &str,
    version: u32,
    ring: &RsaKeyRing,
) -> Result<Vec<u8>, CryptError> {
    let (base, legacy) = normalize_version(version);
    let scheme = Scheme::from_version(base).ok_or(CryptError::UnsupportedVersion(version))?;

    let mut body = match scheme {
        Scheme::None => unreachable!("from_version never yields None"),
        Scheme::Xor111 => {
            let mut body = clear.to_vec();
            xor::xor_in_place(&mut body, xor::KEY_111);
            body
        }
        Scheme::Xor121 => {
            let mut body = clear.to_vec();
            xor::xor_in_place(&mut body, xor::filename_key(file_name));
            body
        }
        Scheme::Xor120 => {
            let mut body = clear.to_vec();
            RollingXor::new().apply(&mut body);
            body
        }
        Scheme::Blowfish211 => block::encrypt(clear, block::KEY_211)?,
        Scheme::Blowfish212 => block::encrypt(clear, block::KEY_212)?,
        Scheme::Rsa411 | Scheme::Rsa412 | Scheme::Rsa413 | Scheme::Rsa414 => {
            let pair = ring
                .pair_for(base)
                .ok_or(CryptError::UnsupportedVersion(version))?;
            rsa::encrypt(clear, pair)?
        }
    };
    if legacy {
        xor::legacy_wrap(&mut body);
    }

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    header::write_version(&mut out, version);
    out.extend_from_slice(&body);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ver111_literal_scenario() {
        let mut raw = Vec::new();
        header::write_version(&mut raw, 111);
        raw.push(0xAC ^ b'H');
        raw.push(0xAC ^ b'i');

        let (scheme, clear) = decrypt(&raw, "scenario.ini").unwrap();
        assert_eq!(scheme, Scheme::Xor111);
        assert_eq!(&clear, b"Hi");
    }

    #[test]
    fn test_clear_stream_passthrough() {
        let raw = b"no header here, just plain bytes beyond 28".to_vec();
        let (scheme, clear) = decrypt(&raw, "plain.u").unwrap();
        assert_eq!(scheme, Scheme::None);
        assert_eq!(clear, raw);
    }

    #[test]
    fn test_roundtrip_all_supported_versions() {
        let data: Vec<u8> = (0..2000u32).map(|i| (i * 7 % 256) as u8).collect();
        for version in [111, 121, 120, 211, 212, 411, 412, 413, 414] {
            let wrapped = encrypt(&data, "lineage2.ini", version).unwrap();
            let (scheme, clear) = decrypt(&wrapped, "lineage2.ini").unwrap();
            assert_eq!(scheme.version(), Some(version), "version {}", version);
            // Blowfish keeps its zero padding; the clear prefix must match
            assert_eq!(&clear[..data.len()], &data[..], "version {}", version);
        }
    }

    #[test]
    fn test_roundtrip_legacy_wrapped_versions() {
        let data = b"legacy wrapped payload".to_vec();
        for (tag, base) in [(611, 411), (614, 414), (811, 211), (911, 111)] {
            let wrapped = encrypt(&data, "system.int", tag).unwrap();
            let (scheme, clear) = decrypt(&wrapped, "system.int").unwrap();
            assert_eq!(scheme.version(), Some(base), "tag {}", tag);
            assert_eq!(&clear[..data.len()], &data[..], "tag {}", tag);
        }
    }

    #[test]
    fn test_filename_key_sensitivity() {
        let data = b"keyed by name".to_vec();
        let wrapped = encrypt(&data, "interface.u", 121).unwrap();
        let (_, clear) = decrypt(&wrapped, "INTERFACE.U").unwrap();
        // Case-insensitive: the key is derived from the lower-cased name
        assert_eq!(clear, data);
        let (_, garbled) = decrypt(&wrapped, "other.u").unwrap();
        assert_ne!(garbled, data);
    }

    #[test]
    fn test_unsupported_version() {
        let mut raw = Vec::new();
        header::write_version(&mut raw, 999);
        raw.extend_from_slice(&[1, 2, 3]);
        let err = decrypt(&raw, "odd.u").unwrap_err();
        assert!(matches!(err, CryptError::UnsupportedVersion(999)));

        // 912 normalizes to 112, which no scheme covers; the error names
        // the tag as it appeared in the header.
        let mut raw = Vec::new();
        header::write_version(&mut raw, 912);
        raw.extend_from_slice(&[1, 2, 3]);
        let err = decrypt(&raw, "odd.u").unwrap_err();
        assert!(matches!(err, CryptError::UnsupportedVersion(912)));
    }
}
