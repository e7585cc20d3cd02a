//! Buffer-level RESP parsing.
//!
//! Every parser returns `Ok(None)` when the buffer does not yet hold a whole
//! frame, so the caller can read more bytes and try again, and
//! `Ok(Some((value, consumed)))` once it does.

use crate::error::RespError;
use crate::types::resp::RespValue;
use crate::types::Request;

/// Largest bulk string accepted, same as the reference server.
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;
/// Largest number of elements accepted in one request.
pub const MAX_MULTIBULK_LEN: i64 = 1024 * 1024;
/// Longest header line scanned before giving up on finding its CRLF.
const MAX_LINE_LEN: usize = 64 * 1024;

type Parsed<T> = Result<Option<(T, usize)>, RespError>;

/// How far into a partially received request parsing got, so the next
/// attempt starts at the first unfinished element.
#[derive(Debug, Default)]
pub struct RequestProgress {
    count: usize,
    parts: Vec<String>,
    pos: usize,
}

/// Parses one client request: an array of bulk strings.
pub fn parse_request(buf: &[u8]) -> Parsed<Request> {
    parse_request_from(buf, &mut RequestProgress::default())
}

/// Like [`parse_request`], but keeps finished elements in `progress` when the
/// buffer ends mid-request. `buf` must keep its start between calls; the
/// progress is reset once a request is returned.
pub fn parse_request_from(buf: &[u8], progress: &mut RequestProgress) -> Parsed<Request> {
    if progress.pos == 0 {
        let Some(&first) = buf.first() else {
            return Ok(None);
        };
        if first != b'*' {
            return Err(RespError::UnexpectedByte {
                expected: "'*'",
                found: first as char,
            });
        }
        let Some((line, pos)) = read_line(buf, 1)? else {
            return Ok(None);
        };
        let count = parse_number(line, "multibulk")?;
        if count < 1 {
            return Err(RespError::EmptyCommand);
        }
        if count > MAX_MULTIBULK_LEN {
            return Err(RespError::InvalidLength {
                kind: "multibulk",
                value: count.to_string(),
            });
        }
        progress.count = count as usize;
        progress.parts = Vec::with_capacity(progress.count.min(64));
        progress.pos = pos;
    }

    while progress.parts.len() < progress.count {
        let Some(&prefix) = buf.get(progress.pos) else {
            return Ok(None);
        };
        if prefix != b'$' {
            return Err(RespError::UnexpectedByte {
                expected: "'$'",
                found: prefix as char,
            });
        }
        let Some((data, next)) = parse_bulk_body(buf, progress.pos)? else {
            return Ok(None);
        };
        let Some(data) = data else {
            return Err(RespError::InvalidLength {
                kind: "bulk",
                value: "-1".into(),
            });
        };
        progress.parts.push(String::from_utf8_lossy(data).into_owned());
        progress.pos = next;
    }

    let RequestProgress { parts, pos, .. } = std::mem::take(progress);
    let mut parts = parts.into_iter();
    let name = parts.next().unwrap_or_default();
    Ok(Some((Request::new(name, parts.collect()), pos)))
}

/// Parses any RESP value, as sent back by a peer.
pub fn parse_msg(buf: &[u8]) -> Parsed<RespValue> {
    let Some(&first) = buf.first() else {
        return Ok(None);
    };
    match first {
        b'+' => parse_simple(buf),
        b'-' => parse_error(buf),
        b':' => parse_int(buf),
        b'$' => parse_bulk(buf),
        b'*' => parse_array(buf),
        other => Err(RespError::UnexpectedByte {
            expected: "a RESP type byte",
            found: other as char,
        }),
    }
}

/// Function used to parse a simple string acc to the RESP conventions
pub fn parse_simple(buf: &[u8]) -> Parsed<RespValue> {
    Ok(read_line(buf, 1)?.map(|(line, used)| {
        (
            RespValue::SimpleString(String::from_utf8_lossy(line).into_owned()),
            used,
        )
    }))
}

pub fn parse_error(buf: &[u8]) -> Parsed<RespValue> {
    Ok(read_line(buf, 1)?.map(|(line, used)| {
        (
            RespValue::SimpleError(String::from_utf8_lossy(line).into_owned()),
            used,
        )
    }))
}

/// Function used to parse an integer and return a RespValue
pub fn parse_int(buf: &[u8]) -> Parsed<RespValue> {
    let Some((line, used)) = read_line(buf, 1)? else {
        return Ok(None);
    };
    Ok(Some((RespValue::Integer(parse_number(line, "integer")?), used)))
}

/// Function used to parse a bulk string in the RESP format.
pub fn parse_bulk(buf: &[u8]) -> Parsed<RespValue> {
    Ok(parse_bulk_body(buf, 0)?.map(|(data, used)| {
        let value = match data {
            Some(data) => RespValue::BulkString(String::from_utf8_lossy(data).into_owned()),
            None => RespValue::NullBulkString,
        };
        (value, used)
    }))
}

/// Function used to parse an array in the RESP format.
pub fn parse_array(buf: &[u8]) -> Parsed<RespValue> {
    let Some((line, mut consumed)) = read_line(buf, 1)? else {
        return Ok(None);
    };
    let count = parse_number(line, "multibulk")?;
    if count < 0 {
        return Ok(Some((RespValue::NullBulkString, consumed)));
    }
    if count > MAX_MULTIBULK_LEN {
        return Err(RespError::InvalidLength {
            kind: "multibulk",
            value: count.to_string(),
        });
    }

    let mut items = Vec::with_capacity((count as usize).min(64));
    for _ in 0..count {
        let Some((item, used)) = parse_msg(&buf[consumed..])? else {
            return Ok(None);
        };
        consumed += used;
        items.push(item);
    }
    Ok(Some((RespValue::Array(items), consumed)))
}

/// Parses `$<len>\r\n<data>\r\n` starting at `start`. `None` data is the null bulk string.
fn parse_bulk_body(buf: &[u8], start: usize) -> Parsed<Option<&[u8]>> {
    let Some((line, body)) = read_line(buf, start + 1)? else {
        return Ok(None);
    };
    let len = parse_number(line, "bulk")?;
    if len == -1 {
        return Ok(Some((None, body)));
    }
    if len < 0 {
        return Err(RespError::InvalidLength {
            kind: "bulk",
            value: len.to_string(),
        });
    }
    if len > MAX_BULK_LEN {
        return Err(RespError::BulkTooLarge(len));
    }

    let end = body + len as usize;
    if buf.len() < end + 2 {
        return Ok(None);
    }
    if &buf[end..end + 2] != b"\r\n" {
        return Err(RespError::BulkLengthMismatch(len as usize));
    }
    Ok(Some((Some(&buf[body..end]), end + 2)))
}

/// Returns the line starting at `start` without its CRLF, and the offset just past it.
fn read_line(buf: &[u8], start: usize) -> Parsed<&[u8]> {
    let rest = buf.get(start..).unwrap_or_default();
    let Some(newline) = rest.iter().position(|&b| b == b'\n') else {
        if rest.len() > MAX_LINE_LEN {
            return Err(RespError::LineTooLong);
        }
        return Ok(None);
    };
    if newline == 0 || rest[newline - 1] != b'\r' {
        return Err(RespError::MissingCrlf);
    }
    Ok(Some((&rest[..newline - 1], start + newline + 1)))
}

fn parse_number(line: &[u8], kind: &'static str) -> Result<i64, RespError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| RespError::InvalidLength {
            kind,
            value: String::from_utf8_lossy(line).into_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(buf: &[u8]) -> (Request, usize) {
        parse_request(buf).unwrap().expect("complete frame")
    }

    #[test]
    fn decodes_echo_request() {
        let frame = b"*2\r\n$4\r\necho\r\n$3\r\nfoo\r\n";
        let (req, used) = request(frame);
        assert_eq!(req, Request::new("echo", vec!["foo".into()]));
        assert_eq!(used, frame.len());
    }

    #[test]
    fn resumes_after_finished_elements() {
        let frame = b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$5\r\nvalue\r\n";
        let mut progress = RequestProgress::default();

        assert!(parse_request_from(&frame[..2], &mut progress).unwrap().is_none());
        assert_eq!(progress.pos, 0);
        assert!(parse_request_from(&frame[..20], &mut progress).unwrap().is_none());
        assert_eq!(progress.parts, vec!["SET", "k"]);
        assert_eq!(progress.pos, 20);
        assert!(parse_request_from(&frame[..24], &mut progress).unwrap().is_none());
        assert_eq!(progress.parts.len(), 2);

        let (req, used) = parse_request_from(frame, &mut progress).unwrap().unwrap();
        assert_eq!(req, Request::new("SET", vec!["k".into(), "value".into()]));
        assert_eq!(used, frame.len());
        assert!(progress.parts.is_empty());
        assert_eq!(progress.pos, 0);
    }

    #[test]
    fn leaves_pipelined_bytes_alone() {
        let frame = b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPI";
        let (req, used) = request(frame);
        assert_eq!(req.command(), "PING");
        assert_eq!(used, 14);
        assert!(parse_request(&frame[used..]).unwrap().is_none());
    }

    #[test]
    fn partial_frames_need_more_bytes() {
        let frame = b"*2\r\n$4\r\necho\r\n$3\r\nfoo\r\n";
        for cut in 0..frame.len() {
            assert!(
                parse_request(&frame[..cut]).unwrap().is_none(),
                "prefix of {cut} bytes parsed as a whole frame"
            );
        }
    }

    #[test]
    fn request_must_be_an_array() {
        assert!(matches!(
            parse_request(b"+PING\r\n"),
            Err(RespError::UnexpectedByte { found: '+', .. })
        ));
        assert!(matches!(
            parse_request(b"*1\r\n:1\r\n"),
            Err(RespError::UnexpectedByte { found: ':', .. })
        ));
    }

    #[test]
    fn rejects_bad_counts() {
        assert!(matches!(
            parse_request(b"*x\r\n"),
            Err(RespError::InvalidLength { kind: "multibulk", .. })
        ));
        assert!(matches!(
            parse_request(b"*0\r\n"),
            Err(RespError::EmptyCommand)
        ));
        assert!(matches!(
            parse_request(b"*1\r\n$abc\r\n"),
            Err(RespError::InvalidLength { kind: "bulk", .. })
        ));
    }

    #[test]
    fn rejects_bare_newlines() {
        assert!(matches!(
            parse_request(b"*1\n$4\r\nPING\r\n"),
            Err(RespError::MissingCrlf)
        ));
    }

    #[test]
    fn rejects_bulk_length_mismatch() {
        assert!(matches!(
            parse_request(b"*1\r\n$2\r\nPING\r\n"),
            Err(RespError::BulkLengthMismatch(2))
        ));
    }

    #[test]
    fn rejects_oversized_bulk() {
        assert!(matches!(
            parse_request(b"*1\r\n$999999999999\r\n"),
            Err(RespError::BulkTooLarge(_))
        ));
    }

    #[test]
    fn parses_replies() {
        assert_eq!(
            parse_msg(b"+FULLRESYNC abcxyz 0\r\n").unwrap(),
            Some((RespValue::SimpleString("FULLRESYNC abcxyz 0".into()), 22))
        );
        assert_eq!(
            parse_msg(b"-ERR nope\r\n").unwrap(),
            Some((RespValue::SimpleError("ERR nope".into()), 11))
        );
        assert_eq!(
            parse_msg(b":42\r\n").unwrap(),
            Some((RespValue::Integer(42), 5))
        );
        assert_eq!(
            parse_msg(b"$-1\r\n").unwrap(),
            Some((RespValue::NullBulkString, 5))
        );
        assert_eq!(
            parse_msg(b"*2\r\n$3\r\ndir\r\n$4\r\n/tmp\r\n").unwrap(),
            Some((
                RespValue::Array(vec![
                    RespValue::BulkString("dir".into()),
                    RespValue::BulkString("/tmp".into()),
                ]),
                23
            ))
        );
        assert!(parse_msg(b"$5\r\nhel").unwrap().is_none());
    }
}
