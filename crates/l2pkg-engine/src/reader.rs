//! Record byte cursor
//!
//! Little-endian scalar reads, the container's signed variable-length
//! compact index, and zero-terminated strings in the archive's character
//! encoding. `RecordWriter` is the matching encode direction.

use crate::archive::Charset;
use crate::error::DecodeError;

/// Cursor over one raw record's bytes.
#[derive(Debug, Clone)]
pub struct RecordReader<'a> {
    data: &'a [u8],
    pos: usize,
    charset: Charset,
}

impl<'a> RecordReader<'a> {
    pub fn new(data: &'a [u8], charset: Charset) -> Self {
        Self {
            data,
            pos: 0,
            charset,
        }
    }

    /// Current byte offset in the record.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// The archive's string encoding.
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Take `len` bytes as a slice, advancing the cursor.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::UnexpectedEnd(self.pos));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Consume all remaining bytes.
    pub fn take_rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        rest
    }

    /// Skip `len` bytes without interpreting them.
    pub fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.take(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Read the signed variable-length compact index.
    ///
    /// Byte 0: bit 7 sign, bit 6 continuation, 6 data bits. Bytes 1-3:
    /// bit 7 continuation, 7 data bits. Byte 4: 8 data bits, no
    /// continuation.
    pub fn read_compact(&mut self) -> Result<i32, DecodeError> {
        let start = self.pos;
        let b0 = self.read_u8()?;
        let negative = b0 & 0x80 != 0;
        let mut value = (b0 & 0x3F) as i64;
        let mut more = b0 & 0x40 != 0;
        let mut shift = 6u32;
        for i in 1..5 {
            if !more {
                break;
            }
            let b = self.read_u8()?;
            if i == 4 {
                value |= (b as i64) << shift;
                more = false;
            } else {
                value |= ((b & 0x7F) as i64) << shift;
                more = b & 0x80 != 0;
                shift += 7;
            }
        }
        if value > i32::MAX as i64 {
            return Err(DecodeError::BadCompactIndex(start));
        }
        Ok(if negative { -(value as i32) } else { value as i32 })
    }

    /// Read a zero-terminated string in the archive's encoding.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let unit = self.charset.unit_len();
        let mut bytes = Vec::new();
        loop {
            let chunk = self.take(unit)?;
            if chunk.iter().all(|&b| b == 0) {
                break;
            }
            bytes.extend_from_slice(chunk);
        }
        self.charset.decode(&bytes)
    }
}

/// Encode direction matching [`RecordReader`].
#[derive(Debug, Clone)]
pub struct RecordWriter {
    buf: Vec<u8>,
    charset: Charset,
}

impl RecordWriter {
    pub fn new(charset: Charset) -> Self {
        Self {
            buf: Vec::new(),
            charset,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// The archive's string encoding.
    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_u32(v as u32);
    }

    pub fn write_f32(&mut self, v: f32) {
        self.write_u32(v.to_bits());
    }

    /// Write the signed compact index encoding of `value`.
    pub fn write_compact(&mut self, value: i32) {
        let negative = value < 0;
        let mut rest = (value as i64).unsigned_abs();
        let mut b0 = (rest & 0x3F) as u8;
        if negative {
            b0 |= 0x80;
        }
        rest >>= 6;
        if rest != 0 {
            b0 |= 0x40;
        }
        self.buf.push(b0);
        for i in 1..5 {
            if rest == 0 {
                break;
            }
            if i == 4 {
                self.buf.push((rest & 0xFF) as u8);
                break;
            }
            let mut b = (rest & 0x7F) as u8;
            rest >>= 7;
            if rest != 0 {
                b |= 0x80;
            }
            self.buf.push(b);
        }
    }

    /// Write a zero-terminated string in the archive's encoding.
    pub fn write_string(&mut self, text: &str) {
        self.buf.extend_from_slice(&self.charset.encode(text));
        self.buf.extend(std::iter::repeat(0u8).take(self.charset.unit_len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_compact(value: i32) {
        let mut w = RecordWriter::new(Charset::Latin1);
        w.write_compact(value);
        let bytes = w.into_bytes();
        let mut r = RecordReader::new(&bytes, Charset::Latin1);
        assert_eq!(r.read_compact().unwrap(), value, "value {}", value);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_compact_roundtrip() {
        for value in [0, 1, -1, 63, 64, -64, 8191, 8192, 1 << 20, -(1 << 20), i32::MAX, i32::MIN + 1] {
            roundtrip_compact(value);
        }
    }

    #[test]
    fn test_compact_single_byte_range() {
        let mut w = RecordWriter::new(Charset::Latin1);
        w.write_compact(63);
        assert_eq!(w.len(), 1);
        let mut w = RecordWriter::new(Charset::Latin1);
        w.write_compact(64);
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn test_scalars_roundtrip() {
        let mut w = RecordWriter::new(Charset::Latin1);
        w.write_u8(0xAB);
        w.write_u16(0xBEEF);
        w.write_u32(0xDEADBEEF);
        w.write_i32(-7);
        w.write_f32(1.5);
        let bytes = w.into_bytes();
        let mut r = RecordReader::new(&bytes, Charset::Latin1);
        assert_eq!(r.read_u8().unwrap(), 0xAB);
        assert_eq!(r.read_u16().unwrap(), 0xBEEF);
        assert_eq!(r.read_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(r.read_i32().unwrap(), -7);
        assert_eq!(r.read_f32().unwrap(), 1.5);
    }

    #[test]
    fn test_string_roundtrip_both_charsets() {
        for charset in [Charset::Latin1, Charset::Utf16Le] {
            let mut w = RecordWriter::new(charset);
            w.write_string("Health");
            w.write_u8(0x7F);
            let bytes = w.into_bytes();
            let mut r = RecordReader::new(&bytes, charset);
            assert_eq!(r.read_string().unwrap(), "Health");
            assert_eq!(r.read_u8().unwrap(), 0x7F);
        }
    }

    #[test]
    fn test_truncated_read() {
        let mut r = RecordReader::new(&[1, 2], Charset::Latin1);
        assert!(matches!(r.read_u32(), Err(DecodeError::UnexpectedEnd(0))));
    }
}
