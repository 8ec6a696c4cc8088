//! Newline-delimited JSON transport for the upstream client.
//!
//! Each message is one UTF-8 JSON value on its own line. Blank lines are
//! skipped, undecodable lines are logged and skipped, and end of input ends
//! the loop cleanly.

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::dispatcher::Dispatcher;
use crate::error::Result;

/// Serialize a message as one framed line, newline included.
pub fn encode_line<T: Serialize>(message: &T) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Write one framed message and flush it.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let line = encode_line(message)?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Serve the dispatcher over a pair of byte streams until end of input.
///
/// Messages are handled one at a time, in arrival order.
pub async fn serve<R, W>(dispatcher: &Dispatcher, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    tracing::info!(
        server = %dispatcher.server_info().name,
        tools = dispatcher.registry().len(),
        "serving MCP over stdio"
    );

    let mut buf = Vec::new();
    loop {
        buf.clear();
        let bytes_read = reader.read_until(b'\n', &mut buf).await?;
        if bytes_read == 0 {
            tracing::info!("EOF received, shutting down");
            return Ok(());
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                tracing::warn!(error = %e, "skipping line that is not UTF-8");
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        tracing::trace!(json = %line, "received message");

        match dispatcher.handle_line(line).await {
            Ok(Some(response)) => write_message(&mut writer, &response).await?,
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "failed to parse message"),
        }
    }
}

/// Serve the dispatcher on the process's stdin and stdout.
pub async fn serve_stdio(dispatcher: &Dispatcher) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(dispatcher, stdin, stdout).await
}
