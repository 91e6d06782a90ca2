//! The engine's read loop.
//!
//! Reads one command per line, executes it to completion, writes one
//! response line, and only then reads the next line.  The loop ends on
//! `shutdown` (after acknowledging it) or when the input closes.
//!
//! Malformed input never stops the loop:
//!
//! - a line with a recoverable `id` (unknown `type`, bad payload) is answered
//!   with an `error` response carrying that id;
//! - a line with no recoverable id is logged to stderr and skipped, since
//!   there is nothing to correlate an answer with.

use std::io::{self, BufRead, Write};

use tracing::{debug, info, warn};
use touch_core::{decode_command, encode_response, CommandKind, Response};

use crate::application::engine::Engine;

/// Why [`serve`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeExit {
    /// A `shutdown` command was acknowledged.
    Shutdown,
    /// The input reached end-of-file.
    EndOfInput,
}

/// Runs the read/execute/reply loop until shutdown or end of input.
///
/// # Errors
///
/// Returns an error only when reading input or writing a response fails;
/// command failures are reported in-band as `error` responses.
pub fn serve<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    engine: &mut Engine,
) -> io::Result<ServeExit> {
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        debug!(%line, "received");

        let (response, stop) = match decode_command(line) {
            Ok(cmd) => {
                let stop = matches!(cmd.kind, CommandKind::Shutdown);
                (engine.handle(&cmd), stop)
            }
            Err(err) => match err.command_id() {
                Some(id) => {
                    warn!(%id, "rejecting command: {err}");
                    (Response::error(id, err.to_string()), false)
                }
                None => {
                    warn!("skipping malformed line: {err}");
                    continue;
                }
            },
        };

        write_response(&mut output, &response)?;
        if stop {
            info!("shutdown acknowledged, leaving read loop");
            return Ok(ServeExit::Shutdown);
        }
    }

    info!("input closed, leaving read loop");
    Ok(ServeExit::EndOfInput)
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    let line = encode_response(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    debug!(line = line.trim_end(), "sending");
    output.write_all(line.as_bytes())?;
    output.flush()
}
