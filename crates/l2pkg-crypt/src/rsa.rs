//! Raw-block RSA transport (versions 411-414)
//!
//! Ciphertext is a run of 128-byte blocks. Each block decrypts to a
//! plaintext whose 4th byte holds the chunk size (at most 124); the chunk
//! itself sits right-aligned at offset `128 - size - ((124 - size) % 4)`.
//! The concatenated chunks form a 4-byte little-endian total size followed
//! by a zlib stream of the clear payload.
//!
//! The built-in key ring ships self-consistent keypairs (decrypt exponent
//! 0x35) so encrypt/decrypt round-trip; callers interoperating with
//! official client archives can substitute their own `RsaKeyPair`.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use tracing::warn;

use crate::error::CryptError;

/// RSA block size in bytes (1024-bit modulus).
pub const BLOCK: usize = 128;

/// Maximum clear chunk carried by one block.
pub const MAX_CHUNK: usize = 124;

/// One version's modulus and exponent pair.
#[derive(Debug, Clone)]
pub struct RsaKeyPair {
    modulus: BigUint,
    decrypt_exp: BigUint,
    encrypt_exp: BigUint,
}

impl RsaKeyPair {
    /// Build a keypair from hex strings. Returns `None` on malformed hex.
    pub fn from_hex(modulus: &str, decrypt_exp: &str, encrypt_exp: &str) -> Option<Self> {
        Some(Self {
            modulus: BigUint::parse_bytes(modulus.as_bytes(), 16)?,
            decrypt_exp: BigUint::parse_bytes(decrypt_exp.as_bytes(), 16)?,
            encrypt_exp: BigUint::parse_bytes(encrypt_exp.as_bytes(), 16)?,
        })
    }
}

/// Per-version key ring for the 411-414 transports.
#[derive(Debug, Clone)]
pub struct RsaKeyRing {
    keys: Vec<(u32, RsaKeyPair)>,
}

impl RsaKeyRing {
    /// Ring with no keys; populate via [`RsaKeyRing::insert`].
    pub fn empty() -> Self {
        Self { keys: Vec::new() }
    }

    /// The built-in ring covering versions 411-414.
    pub fn builtin() -> &'static Self {
        static RING: Lazy<RsaKeyRing> = Lazy::new(|| {
            let mut ring = RsaKeyRing::empty();
            for (version, modulus, encrypt_exp) in BUILTIN_KEYS {
                let pair = RsaKeyPair::from_hex(modulus, DECRYPT_EXP, encrypt_exp)
                    .expect("built-in key ring hex");
                ring.insert(*version, pair);
            }
            ring
        });
        &RING
    }

    /// Register (or replace) the keypair for a version.
    pub fn insert(&mut self, version: u32, pair: RsaKeyPair) {
        self.keys.retain(|(v, _)| *v != version);
        self.keys.push((version, pair));
    }

    /// Look up the keypair for a version.
    pub fn pair_for(&self, version: u32) -> Option<&RsaKeyPair> {
        self.keys
            .iter()
            .find(|(v, _)| *v == version)
            .map(|(_, pair)| pair)
    }
}

/// Shared decrypt exponent across the built-in ring.
const DECRYPT_EXP: &str = "35";

const BUILTIN_KEYS: &[(u32, &str, &str)] = &[
    (
        411,
        "88c948e2f845c630cc144c399e7d82eb5befdd49862d8181ede60c2ab2fe8b67399057f97d0ea1f4a5b741c209d8b0d4c1519362cc6e6b84dec40a8776cbf92b5d589cb50c213837222805ac1383edeaab043e694317eb72dfcc4a357c575685c4c1df5dedc622ece1f8265343645f77e054f26c0fa23c6b0fdc3504993167a9",
        "befc0ed2a318f7bce2fa876899aa698293af824003cb9cabc015ba0b50dc28128a559ca4cb96d87764f6352be71b3a84d3f45033007387a15dac48a9d156c15292eac0f39bfc55df36c0b6ba651d545dcc80cff8f02192775d7cca74886644a7cf641003680d31bc971d8176de87da3c67fda38c0cf5cfd2673bf01699a4cad",
    ),
    (
        412,
        "cf198f0f7c5d0ce40b5ff7095441c9525f6cd351071a2bdafe9634b79ef8a4e12ba68ad2f191537425f824e0691fbe39c25cea82f4487b4dfd74d4319634cede5df94b5324d14c63aee0a9147720e0243a3dc382ea03774a2183796f1988e9e33d5b15fb97f04e93c8c0e7f217be20ff62bce0aa08aecb9a6bf12825e1a0c601",
        "54031f77ca99abdeec76a0971aef371a2b8a55b9054bd2ff7a98b4c81299ff43311a80c4aa72800ae3ee5294ff2c45ebf57ca2c132cb4a2bb683ebd07e23e9a6c22624c78ec7ed33811e3f8421162124285c3b8548e5b16a69682975b7b59c20ed1987bc246a885269c7cd60fdecf3cc81cd3f0933ad4ef9e8fc34871a8096f3",
    ),
    (
        413,
        "cf845a14d5eb92a8b459759c10992da829ce562cf73602a2984bf551de000b3614c5c0eba7eb63889192a971d905556afb306806d5aaa5e9b79a4d08d15a5f9d2e4a7be4ef65477c037bed9a9431c11bf5458ccef64584edc8d3a3e1f5c7ea2931f2b2fe1a4caabce9ecf98943fc76e623c98982e8d064b5623cabea8c7f80e7",
        "291ca2c08152e58206bf9c215566ccaaf9cab07800ac82efe90a37d8abfb2db15b0f06d2e9b84b441cd704968e0378c57f0c0149ce8e7ca4a45fc6cf07aa0e1c5dbd2b30939e4cd8f9ef0e1591b0fdd09a5d6b2d455fddd9cdd8cd79b5ae75e4c1972a5d67de5d84f19e83664789937fd5ecc3310c56e41b15dcda02ffe0ad59",
    ),
    (
        414,
        "98b573c9ceabd5608c1745a0aa0201f0da44ec698e1434be0066d75d231e7461d6a14ac7fea81d97dcaa4fb1ae50e164c47e32ebb50b4f992179e4df3a178c0b58e12ea6b3da5ad3e51c4e4e943d7d24d918159fe78974e06c894ee3bebb680fd8b7be63cf6267a1ddd2024cbd526b950d95734544a90d2f48f60f4ccd5c421b",
        "a15a4a0a5cc8e17480b327c1e8c35429f51d5a65de92ef46575e2c01ce29d6be51df8dce7c2a62e414a0a17cf225281d30380f2959dba63788ce13a368da166142c0fde5fda328878c1009c233319e1ab41fe5bddc749bf8280a3f8742f6de3683dfea871c96ab132648918aea70f1a4c266b6874c2cc31e5c87a1bd8a29075",
    ),
];

/// Offset of a `size`-byte chunk within its 128-byte plaintext block.
fn chunk_offset(size: usize) -> usize {
    BLOCK - size - ((MAX_CHUNK - size) % 4)
}

fn modpow_block(block: &[u8], exp: &BigUint, modulus: &BigUint) -> [u8; BLOCK] {
    let value = BigUint::from_bytes_be(block).modpow(exp, modulus);
    let bytes = value.to_bytes_be();
    let mut padded = [0u8; BLOCK];
    padded[BLOCK - bytes.len()..].copy_from_slice(&bytes);
    padded
}

/// Decrypt an RSA-wrapped stream down to the clear payload.
pub fn decrypt(data: &[u8], pair: &RsaKeyPair) -> Result<Vec<u8>, CryptError> {
    if data.len() % BLOCK != 0 {
        return Err(CryptError::BadBlockLength {
            len: data.len(),
            block: BLOCK,
        });
    }

    let mut packed = Vec::with_capacity(data.len() / BLOCK * MAX_CHUNK);
    for block in data.chunks_exact(BLOCK) {
        let clear = modpow_block(block, &pair.decrypt_exp, &pair.modulus);
        let size = clear[3] as usize;
        if size > MAX_CHUNK {
            return Err(CryptError::BadChunkSize(clear[3]));
        }
        let start = chunk_offset(size);
        packed.extend_from_slice(&clear[start..start + size]);
    }

    if packed.len() < 4 {
        return Err(CryptError::Truncated {
            expected: 4,
            actual: packed.len(),
        });
    }
    let total = u32::from_le_bytes([packed[0], packed[1], packed[2], packed[3]]) as usize;
    let mut clear = Vec::with_capacity(total);
    ZlibDecoder::new(&packed[4..]).read_to_end(&mut clear)?;
    if clear.len() != total {
        warn!(
            declared = total,
            actual = clear.len(),
            "inflated payload size does not match the declared total"
        );
        clear.truncate(total.min(clear.len()));
    }
    Ok(clear)
}

/// Wrap a clear payload into the RSA block stream.
pub fn encrypt(data: &[u8], pair: &RsaKeyPair) -> Result<Vec<u8>, CryptError> {
    let mut packed = Vec::with_capacity(data.len() / 2 + 16);
    packed.extend_from_slice(&(data.len() as u32).to_le_bytes());
    let mut encoder = ZlibEncoder::new(&mut packed, Compression::default());
    encoder.write_all(data)?;
    encoder.finish()?;

    let mut out = Vec::with_capacity(packed.len().div_ceil(MAX_CHUNK) * BLOCK);
    for chunk in packed.chunks(MAX_CHUNK) {
        let mut block = [0u8; BLOCK];
        block[3] = chunk.len() as u8;
        let start = chunk_offset(chunk.len());
        block[start..start + chunk.len()].copy_from_slice(chunk);
        out.extend_from_slice(&modpow_block(&block, &pair.encrypt_exp, &pair.modulus));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_offset_formula() {
        assert_eq!(chunk_offset(MAX_CHUNK), 4);
        assert_eq!(chunk_offset(1), 124);
        assert_eq!(chunk_offset(4), 128 - 4 - 0);
        assert_eq!(chunk_offset(0), 128 - 0 - 0);
    }

    #[test]
    fn test_roundtrip_small() {
        let pair = RsaKeyRing::builtin().pair_for(411).unwrap();
        let data = b"hello block cipher".to_vec();
        let wrapped = encrypt(&data, pair).unwrap();
        assert_eq!(wrapped.len() % BLOCK, 0);
        assert_eq!(decrypt(&wrapped, pair).unwrap(), data);
    }

    #[test]
    fn test_roundtrip_multiblock() {
        let pair = RsaKeyRing::builtin().pair_for(414).unwrap();
        // Large enough that the deflated payload spans several blocks
        let data: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
        let wrapped = encrypt(&data, pair).unwrap();
        assert!(wrapped.len() > BLOCK);
        assert_eq!(decrypt(&wrapped, pair).unwrap(), data);
    }

    #[test]
    fn test_unaligned_stream_rejected() {
        let pair = RsaKeyRing::builtin().pair_for(411).unwrap();
        let err = decrypt(&[0u8; 127], pair).unwrap_err();
        assert!(matches!(err, CryptError::BadBlockLength { .. }));
    }

    #[test]
    fn test_ring_versions() {
        let ring = RsaKeyRing::builtin();
        for version in [411, 412, 413, 414] {
            assert!(ring.pair_for(version).is_some());
        }
        assert!(ring.pair_for(415).is_none());
    }
}
