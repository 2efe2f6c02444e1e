//! Blowfish block transport (versions 211/212)
//!
//! Raw 8-byte blocks with no chaining. Encryption zero-pads the final
//! partial block; decryption leaves that padding in place — the container
//! format carries explicit record sizes, so trailing zeros in the last
//! block are never interpreted.

use blowfish::Blowfish;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

use crate::error::CryptError;

/// Cipher block size in bytes.
pub const BLOCK: usize = 8;

/// Static key for version 211.
pub const KEY_211: &[u8] = b"[;'.]94-31==-%&@!^+]\x00";

/// Static key for version 212.
pub const KEY_212: &[u8] = b"v!\"i1tge~4^\\_0,fe2[-\x00";

fn cipher_for(key: &[u8]) -> Result<Blowfish, CryptError> {
    Blowfish::new_from_slice(key).map_err(|e| CryptError::CipherInit(e.to_string()))
}

/// Decrypt a block-aligned stream in place semantics (allocates the output).
pub fn decrypt(data: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptError> {
    if data.len() % BLOCK != 0 {
        return Err(CryptError::BadBlockLength {
            len: data.len(),
            block: BLOCK,
        });
    }
    let cipher = cipher_for(key)?;
    let mut out = data.to_vec();
    for chunk in out.chunks_exact_mut(BLOCK) {
        cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
    }
    Ok(out)
}

/// Encrypt a stream, zero-padding the final partial block.
pub fn encrypt(data: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptError> {
    let cipher = cipher_for(key)?;
    let mut out = data.to_vec();
    let rem = out.len() % BLOCK;
    if rem != 0 {
        out.resize(out.len() + BLOCK - rem, 0);
    }
    for chunk in out.chunks_exact_mut(BLOCK) {
        cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_aligned() {
        let data = b"exactly sixteen!";
        let enc = encrypt(data, KEY_211).unwrap();
        assert_eq!(enc.len(), 16);
        let dec = decrypt(&enc, KEY_211).unwrap();
        assert_eq!(&dec, data);
    }

    #[test]
    fn test_roundtrip_padded() {
        let data = b"five!";
        let enc = encrypt(data, KEY_212).unwrap();
        assert_eq!(enc.len(), BLOCK);
        let dec = decrypt(&enc, KEY_212).unwrap();
        // Zero padding survives decryption by design of the transport
        assert_eq!(&dec[..5], data);
        assert_eq!(&dec[5..], &[0, 0, 0]);
    }

    #[test]
    fn test_unaligned_cipher_stream_rejected() {
        let err = decrypt(&[0u8; 9], KEY_211).unwrap_err();
        assert!(matches!(err, CryptError::BadBlockLength { len: 9, block: 8 }));
    }

    #[test]
    fn test_keys_differ() {
        let data = [0u8; 8];
        let a = encrypt(&data, KEY_211).unwrap();
        let b = encrypt(&data, KEY_212).unwrap();
        assert_ne!(a, b);
    }
}
