use bytes::{Buf, BufMut};

use crate::error::DecodeError;

/// First byte of the explicit 32-bit big-endian length form.
pub const LEN_32BIT: u8 = 0x80;
/// First byte of the explicit 64-bit big-endian length form.
pub const LEN_64BIT: u8 = 0x81;

/// Fails with `UnexpectedEof` unless `buf` still holds `needed` bytes.
pub(crate) fn ensure(buf: &impl Buf, needed: usize, context: &'static str) -> Result<(), DecodeError> {
    if buf.remaining() < needed {
        return Err(DecodeError::UnexpectedEof {
            context,
            needed,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}

/// Decodes a length-encoded integer and advances `buf` past it.
pub fn read_length(buf: &mut impl Buf) -> Result<u64, DecodeError> {
    ensure(&*buf, 1, "length")?;
    let first = buf.get_u8();
    read_length_after(first, buf)
}

/// Same as [`read_length`] when the first byte was already consumed by the caller.
pub(crate) fn read_length_after(first: u8, buf: &mut impl Buf) -> Result<u64, DecodeError> {
    match first >> 6 {
        0b00 => Ok(u64::from(first & 0x3F)),
        0b01 => {
            ensure(&*buf, 1, "14-bit length")?;
            Ok((u64::from(first & 0x3F) << 8) | u64::from(buf.get_u8()))
        }
        0b10 if first == LEN_64BIT => {
            ensure(&*buf, 8, "64-bit length")?;
            Ok(buf.get_u64())
        }
        0b10 => {
            ensure(&*buf, 4, "32-bit length")?;
            Ok(u64::from(buf.get_u32()))
        }
        _ => Err(DecodeError::EncodedStringAsLength(first)),
    }
}

/// Writes `value` using the shortest length form.
pub fn write_length(value: u64, out: &mut impl BufMut) {
    if value < 1 << 6 {
        out.put_u8(value as u8);
    } else if value < 1 << 14 {
        out.put_u8(0x40 | (value >> 8) as u8);
        out.put_u8(value as u8);
    } else if value <= u64::from(u32::MAX) {
        out.put_u8(LEN_32BIT);
        out.put_u32(value as u32);
    } else {
        out.put_u8(LEN_64BIT);
        out.put_u64(value);
    }
}
