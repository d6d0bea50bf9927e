/*!
 * Output Capture
 * Long-lived readers turning a child's byte streams into log lines
 */

use crate::core::limits::MAX_LOG_LINE_BYTES;
use crate::core::UnitId;
use crate::logs::{LogBuffer, LogLevel};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Spawn a reader forwarding each line of `stream` to the unit's log
///
/// The reader ends at EOF, on a read error, or once the unit's log
/// sequence has been discarded.
pub fn spawn_reader<R>(stream: R, id: UnitId, level: LogLevel, logs: LogBuffer) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::with_capacity(256);

        loop {
            match read_bounded_line(&mut reader, &mut buf).await {
                Ok(None) => break,
                Ok(Some(truncated)) => {
                    // Lossy so one bad byte does not end the stream
                    let decoded = String::from_utf8_lossy(&buf);
                    let mut line = decoded.trim_end().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    if truncated {
                        line.push('…');
                    }

                    mirror(&id, level, &line);
                    if !logs.append(&id, level, line) {
                        break;
                    }
                }
                Err(e) => {
                    warn!(unit_id = %id, error = %e, "Output stream read failed");
                    break;
                }
            }
        }
    })
}

/// Read one line of at most `MAX_LOG_LINE_BYTES` into `buf`
///
/// Returns `None` at EOF, otherwise whether the line was cut. The rest of
/// a cut line is read and discarded in bounded chunks.
async fn read_bounded_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<bool>>
where
    R: AsyncBufRead + Unpin,
{
    let limit = MAX_LOG_LINE_BYTES as u64;

    buf.clear();
    if (&mut *reader).take(limit).read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    if buf.ends_with(b"\n") || buf.len() < MAX_LOG_LINE_BYTES {
        return Ok(Some(false));
    }

    let mut rest = Vec::new();
    loop {
        rest.clear();
        let n = (&mut *reader).take(limit).read_until(b'\n', &mut rest).await?;
        if n == 0 || rest.ends_with(b"\n") {
            return Ok(Some(true));
        }
    }
}

/// Echo a unit's line into the supervisor's own log, tagged with its origin
fn mirror(id: &UnitId, level: LogLevel, line: &str) {
    match level {
        LogLevel::Error => warn!(target: "unit_output", unit_id = %id, "{}", line),
        _ => info!(target: "unit_output", unit_id = %id, "{}", line),
    }
}
