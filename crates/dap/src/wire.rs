// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DAP wire framing.
//!
//! Each message is `Content-Length: <N>\r\n` (plus any other headers)
//! followed by a blank line and N UTF-8 bytes of JSON. Unknown headers are
//! ignored. In lenient mode a malformed header section is skipped up to the
//! next blank line and reading continues; in strict mode it fails the
//! connection.

use crate::error::DapError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

/// Upper bound on a single message body. Frames above this are a protocol
/// violation regardless of framing mode.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Write one framed message.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), DapError> {
    if payload.len() > MAX_BODY_BYTES {
        return Err(DapError::Frame(format!(
            "outgoing body of {} bytes exceeds {} byte cap",
            payload.len(),
            MAX_BODY_BYTES
        )));
    }
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed message body. Returns `Ok(None)` on clean EOF.
pub async fn read_frame<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    strict: bool,
) -> Result<Option<Vec<u8>>, DapError> {
    loop {
        let mut content_length: Option<usize> = None;
        let mut malformed: Option<String> = None;

        // Header section: lines until the blank separator.
        loop {
            let line = match read_header_line(reader).await? {
                Some(line) => line,
                None => return Ok(None),
            };
            if line.is_empty() {
                break;
            }
            match line.split_once(':') {
                Some((name, value)) if name.trim().eq_ignore_ascii_case("content-length") => {
                    match value.trim().parse::<usize>() {
                        Ok(n) => content_length = Some(n),
                        Err(_) => {
                            malformed = Some(format!("unparseable Content-Length: {:?}", value));
                        }
                    }
                }
                Some(_) => {} // unknown header, ignored
                None => {
                    malformed = Some(format!("header line without colon: {:?}", line));
                }
            }
        }

        if let Some(reason) = malformed {
            if strict {
                return Err(DapError::Frame(reason));
            }
            warn!(reason, "skipping malformed DAP header section");
            continue;
        }

        let len = match content_length {
            Some(len) => len,
            None => {
                let reason = "header section without Content-Length".to_string();
                if strict {
                    return Err(DapError::Frame(reason));
                }
                warn!(reason, "skipping malformed DAP header section");
                continue;
            }
        };
        if len > MAX_BODY_BYTES {
            return Err(DapError::Frame(format!(
                "body of {} bytes exceeds {} byte cap",
                len, MAX_BODY_BYTES
            )));
        }

        let mut body = vec![0u8; len];
        match reader.read_exact(&mut body).await {
            Ok(_) => return Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(DapError::Connection("stream closed mid-body".to_string()));
            }
            Err(e) => return Err(DapError::Io(e)),
        }
    }
}

/// Read one header line, without its terminator. `Ok(None)` means EOF before
/// any byte of the line arrived.
async fn read_header_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> Result<Option<String>, DapError> {
    let mut raw = Vec::new();
    let n = reader.read_until(b'\n', &mut raw).await?;
    if n == 0 {
        return Ok(None);
    }
    while matches!(raw.last(), Some(b'\n') | Some(b'\r')) {
        raw.pop();
    }
    String::from_utf8(raw)
        .map(Some)
        .map_err(|_| DapError::Frame("non-UTF-8 header line".to_string()))
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
