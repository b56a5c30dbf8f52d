//! Reading child process pipes.
//!
//! Output is either streamed to the log line by line, or captured whole when
//! it is data the caller needs (and must not be logged, like a pull secret).

use std::io::{BufRead, BufReader, Read};

use strum::Display;

/// Output stream of a child process.
#[derive(Clone, Copy, Display)]
#[strum(serialize_all = "lowercase")]
pub(super) enum StreamType {
    Stdout,
    Stderr,
}

/// Extracts a human-readable message from a thread panic.
pub(super) fn panic_message(err: &(dyn std::any::Any + Send)) -> &str {
    err.downcast_ref::<&str>()
        .copied()
        .or_else(|| err.downcast_ref::<String>().map(|s| s.as_str()))
        .unwrap_or("unknown panic")
}

/// Streams a pipe to the log until EOF.
///
/// stdout goes to INFO and stderr to WARN, so `oc` progress and warnings
/// stay visible while a step runs. Read errors end streaming without failing
/// the command; the exit status decides success.
pub(super) fn read_pipe_to_log<R: Read>(pipe: Option<R>, stream_type: StreamType) {
    let Some(pipe) = pipe else {
        tracing::error!(stream = %stream_type, "pipe was None (unexpected: Stdio::piped() was set)");
        return;
    };

    let mut reader = BufReader::new(pipe);
    let mut line_buf = Vec::new();
    loop {
        line_buf.clear();
        match reader.read_until(b'\n', &mut line_buf) {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line_buf);
                let line = text.trim_end_matches(['\n', '\r']);
                match stream_type {
                    StreamType::Stdout => tracing::info!(stream = %stream_type, "{}", line),
                    StreamType::Stderr => tracing::warn!(stream = %stream_type, "{}", line),
                }
            }
            Err(e) => {
                tracing::error!(stream = %stream_type, error = %e, "I/O error, stopping read");
                break;
            }
        }
    }
}

/// Reads a pipe to the end and returns its bytes.
///
/// A `None` pipe or an I/O error yields whatever was read so far.
pub(super) fn read_pipe_to_vec<R: Read>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    let Some(mut pipe) = pipe else {
        tracing::error!("stdout pipe was None (unexpected: Stdio::piped() was set)");
        return buf;
    };
    if let Err(e) = pipe.read_to_end(&mut buf) {
        tracing::error!(stream = %StreamType::Stdout, error = %e, "I/O error while capturing output");
    }
    buf
}
