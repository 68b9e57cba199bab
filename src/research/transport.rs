//! Newline-delimited JSON transport for `ResearchService`
//!
//! One request per input line, one response per output line. Requests run
//! concurrently, so replies come back in completion order; hosts pair them by
//! `requestId`.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::service::ResearchService;

/// Encoded responses waiting for the writer
const RESPONSE_QUEUE_DEPTH: usize = 64;

impl ResearchService {
    /// Answer requests read from `reader` until it closes
    ///
    /// Each line is handled in its own task, so a `GET_RESULT` is answered
    /// while the run it names is still harvesting. Returns after every
    /// request read so far has been answered and flushed.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<String>(RESPONSE_QUEUE_DEPTH);
        let writer_task = tokio::spawn(write_responses(rx, writer));

        let mut lines = reader.lines();
        let mut in_flight = JoinSet::new();

        let read_outcome = loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };
            if line.trim().is_empty() {
                continue;
            }

            let service = self.clone();
            let tx = tx.clone();
            in_flight.spawn(async move {
                let response = service.handle_json(&line).await;
                let encoded = match serde_json::to_string(&response) {
                    Ok(encoded) => encoded,
                    Err(e) => {
                        warn!("[{}] Unencodable response: {}", response.request_id, e);
                        return;
                    }
                };
                if tx.send(encoded).await.is_err() {
                    warn!("[{}] Output closed; reply dropped", response.request_id);
                }
            });

            while let Some(finished) = in_flight.try_join_next() {
                if let Err(e) = finished {
                    warn!("Request task panicked: {}", e);
                }
            }
        };

        debug!("Input closed with {} requests in flight", in_flight.len());
        while let Some(finished) = in_flight.join_next().await {
            if let Err(e) = finished {
                warn!("Request task panicked: {}", e);
            }
        }

        drop(tx);
        let written = writer_task.await.map_err(std::io::Error::other)?;
        info!("All requests answered");
        read_outcome.and(written)
    }
}

async fn write_responses<W>(mut rx: mpsc::Receiver<String>, mut writer: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(mut encoded) = rx.recv().await {
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
