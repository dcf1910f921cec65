//! Output drains for launched children.
//!
//! The managed process (and the relay in front of it) may emit non-UTF8
//! bytes. `BufReader::lines()` would stop the drain on the first invalid
//! sequence and let the pipe fill up, so lines are read as bytes and
//! decoded lossily.

use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Shared append-only output file for stdout and stderr.
pub type OutputSink = Arc<Mutex<File>>;

/// Drain `stream` line by line into `tracing` and, if given, `sink`.
///
/// Resolves to the number of lines read.
pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    pid: u32,
    stream_type: &'static str,
    sink: Option<OutputSink>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);
        let mut lines = 0usize;
        let mut sink = sink;

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(trim_line_ending(&buf));
                    debug!(pid = %pid, %stream_type, "{}", line);
                    lines += 1;

                    if let Some(file) = &sink {
                        let mut file = file.lock().await;
                        let written = match file.write_all(line.as_bytes()).await {
                            Ok(()) => file.write_all(b"\n").await,
                            Err(e) => Err(e),
                        };
                        if let Err(e) = written {
                            // Keep draining even if the file is gone
                            warn!(pid = %pid, error = %e, "Failed to write process output, continuing without file");
                            drop(file);
                            sink = None;
                        }
                    }
                }
                Err(e) => {
                    debug!(pid = %pid, %stream_type, error = %e, "Output drain stopped on read error");
                    break;
                }
            }
        }

        if let Some(file) = &sink {
            let _ = file.lock().await.flush().await;
        }
        debug!(pid = %pid, %stream_type, lines, "Output drain finished");
        lines
    })
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
