//! Transport error types

use thiserror::Error;

/// Errors raised while wrapping or unwrapping a container stream.
///
/// A `CryptError` is fatal for the single file being opened; callers are
/// expected to skip the file and continue with their broader operation.
#[derive(Debug, Error)]
pub enum CryptError {
    /// Header carried a version tag no scheme is registered for
    #[error("unsupported container version {0}")]
    UnsupportedVersion(u32),

    /// Stream ended before the scheme's framing said it should
    #[error("truncated cipher stream: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Block cipher input is not block-aligned
    #[error("cipher stream length {len} is not a multiple of the {block}-byte block size")]
    BadBlockLength { len: usize, block: usize },

    /// RSA plaintext block declared an impossible chunk size
    #[error("malformed block: declared payload size {0} exceeds the 124-byte maximum")]
    BadChunkSize(u8),

    /// Cipher could not be initialized from its key material
    #[error("cipher initialization failed: {0}")]
    CipherInit(String),

    /// Inner payload failed to inflate/deflate
    #[error("payload compression error: {0}")]
    Compression(#[from] std::io::Error),
}
