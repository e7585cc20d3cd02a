use bytes::{Buf, BufMut, Bytes};

use super::length::{ensure, read_length_after, write_length};
use crate::error::DecodeError;

const ENC_INT8: u8 = 0;
const ENC_INT16: u8 = 1;
const ENC_INT32: u8 = 2;

/// Decodes one snapshot string: either a length-prefixed byte run or a
/// special-encoded integer rendered as decimal text.
pub fn read_string(buf: &mut impl Buf) -> Result<Bytes, DecodeError> {
    ensure(&*buf, 1, "string")?;
    let first = buf.get_u8();

    if first >> 6 == 0b11 {
        return read_encoded_int(first & 0x3F, buf);
    }

    let len = read_length_after(first, buf)?;
    let len = usize::try_from(len).unwrap_or(usize::MAX);
    ensure(&*buf, len, "string contents")?;
    Ok(buf.copy_to_bytes(len))
}

fn read_encoded_int(selector: u8, buf: &mut impl Buf) -> Result<Bytes, DecodeError> {
    let value = match selector {
        ENC_INT8 => {
            ensure(&*buf, 1, "8-bit integer string")?;
            i64::from(buf.get_i8())
        }
        ENC_INT16 => {
            ensure(&*buf, 2, "16-bit integer string")?;
            i64::from(buf.get_i16_le())
        }
        ENC_INT32 => {
            ensure(&*buf, 4, "32-bit integer string")?;
            i64::from(buf.get_i32_le())
        }
        // 3 is LZF compression
        other => return Err(DecodeError::UnsupportedStringEncoding(other)),
    };
    Ok(Bytes::from(value.to_string()))
}

/// Writes `data` in the length-prefixed form.
pub fn write_string(data: &[u8], out: &mut impl BufMut) {
    write_length(data.len() as u64, out);
    out.put_slice(data);
}
