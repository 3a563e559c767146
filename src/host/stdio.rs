//! Stdin/stdout JSON bridge for the host command channel.
//!
//! Reads newline-delimited JSON `CommandEnvelope` messages from stdin,
//! dispatches them through the `HostServer` router, and writes
//! `ResponseEnvelope` and `EventEnvelope` messages as newline-delimited
//! JSON to stdout.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use super::channel::{HostClient, command_channel};
use super::contract::{CommandEnvelope, ResponseEnvelope};
use super::handler::MemoryHostHandler;
use crate::error::{Result, VolumaError};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;

/// Default request channel capacity for the stdio bridge.
const REQUEST_CAPACITY: usize = 64;

/// Default event broadcast channel capacity for the stdio bridge.
const EVENT_CAPACITY: usize = 128;

/// Run the stdin/stdout JSON bridge until stdin closes.
///
/// Three concurrent tasks cooperate:
///
/// 1. **Reader** -- reads newline-delimited JSON from stdin, dispatches each
///    `CommandEnvelope` through the host client, and writes the resulting
///    `ResponseEnvelope` to stdout.
/// 2. **Event forwarder** -- receives broadcast `EventEnvelope` messages and
///    writes them as JSON lines to stdout.
/// 3. **Server** -- runs the `HostServer` router loop.
///
/// A malformed input line produces an error envelope, never a crash.
pub async fn run_stdio_bridge<H: MemoryHostHandler>(handler: H) -> Result<()> {
    let (client, server) = command_channel(REQUEST_CAPACITY, EVENT_CAPACITY, handler);

    let stdout = tokio::io::stdout();
    let writer = Arc::new(Mutex::new(BufWriter::new(stdout)));

    let server_handle = tokio::spawn(async move {
        server.run().await;
    });

    let event_writer = Arc::clone(&writer);
    let mut event_rx = client.subscribe_events();
    let event_handle = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(envelope) => match serde_json::to_string(&envelope) {
                    Ok(json) => {
                        let mut w = event_writer.lock().await;
                        if let Err(e) = write_line(&mut w, &json).await {
                            tracing::warn!(error = %e, "event write failed; stopping forwarder");
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "event serialization failed; skipping");
                    }
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event forwarder lagged; events dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // The reader runs on the current task so its exit drives shutdown: when
    // it drops the client, the request channel closes and the server exits.
    let reader_result = run_reader(client, Arc::clone(&writer)).await;

    event_handle.abort();
    let _ = event_handle.await;
    let _ = server_handle.await;

    reader_result
}

/// Read stdin line-by-line, dispatch each command, and write responses.
async fn run_reader(
    client: HostClient,
    writer: Arc<Mutex<BufWriter<tokio::io::Stdout>>>,
) -> Result<()> {
    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| VolumaError::Channel(format!("failed to read from stdin: {e}")))?;

        // EOF
        if bytes_read == 0 {
            tracing::info!("stdin closed (EOF); shutting down stdio bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<CommandEnvelope>(trimmed) {
            Ok(envelope) => {
                let request_id = envelope.request_id.clone();
                match client.send(envelope).await {
                    Ok(response) => response,
                    Err(e) => ResponseEnvelope::error(request_id, e.to_string()),
                }
            }
            Err(e) => ResponseEnvelope::error("unknown", format!("malformed command envelope: {e}")),
        };

        let json = serde_json::to_string(&response)
            .map_err(|e| VolumaError::Channel(format!("cannot serialize response: {e}")))?;
        let mut w = writer.lock().await;
        write_line(&mut w, &json).await?;
    }

    Ok(())
}

async fn write_line(writer: &mut BufWriter<tokio::io::Stdout>, json: &str) -> Result<()> {
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
