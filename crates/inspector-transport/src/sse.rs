//! Legacy two-endpoint SSE transport: `POST {base}` for outbound frames,
//! `GET {base}/sse` for the long-lived inbound event stream, with
//! auto-reconnect on transient network failure.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use parking_lot::Mutex as SyncMutex;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{TransportError, TransportResult};
use crate::traits::{RetryPolicy, Transport, TransportEvent, TransportHandle};

#[derive(Clone, Debug)]
pub struct SseConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub retry_policy: RetryPolicy,
}

impl SseConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            retry_policy: RetryPolicy::default(),
        }
    }
}

pub struct SseTransport {
    config: SseConfig,
    client: Client,
    cancel: Option<CancellationToken>,
    /// Inbound endpoint, discovered from the stream's initial `endpoint`
    /// event and shared with the writer side via `Arc<SyncMutex<_>>` since
    /// reads happen from the outbound send path, not across an `.await`.
    message_endpoint: Arc<SyncMutex<Option<String>>>,
}

impl SseTransport {
    pub fn new(config: SseConfig) -> TransportResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self {
            config,
            client,
            cancel: None,
            message_endpoint: Arc::new(SyncMutex::new(None)),
        })
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn open(&mut self) -> TransportResult<TransportHandle> {
        if self.cancel.is_some() {
            return Err(TransportError::AlreadyOpen);
        }

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Bytes>();
        let (events_tx, events_rx) = mpsc::unbounded_channel::<TransportEvent>();
        let cancel = CancellationToken::new();

        let sse_url = format!("{}/sse", self.config.base_url.trim_end_matches('/'));
        let post_url = self.config.base_url.clone();
        let client = self.client.clone();
        let auth_token = self.config.auth_token.clone();
        let retry_policy = self.config.retry_policy.clone();
        let message_endpoint = self.message_endpoint.clone();

        let read_cancel = cancel.clone();
        let read_events = events_tx.clone();
        let read_client = client.clone();
        let read_auth_token = auth_token.clone();
        let read_message_endpoint = message_endpoint.clone();
        tokio::spawn(async move {
            let mut attempt = 0u32;
            loop {
                if read_cancel.is_cancelled() {
                    return;
                }
                if attempt > 0 {
                    match retry_policy.delay(attempt - 1) {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => {
                            let _ = read_events.send(TransportEvent::Closed {
                                reason: Some(format!(
                                    "exceeded reconnect attempts for {sse_url}"
                                )),
                            });
                            return;
                        }
                    }
                }

                let mut request = read_client.get(&sse_url);
                if let Some(token) = &read_auth_token {
                    request = request.bearer_auth(token);
                }

                let response = match request.send().await {
                    Ok(response) if response.status().is_success() => response,
                    Ok(response) => {
                        warn!(status = %response.status(), "sse endpoint returned non-success");
                        attempt += 1;
                        continue;
                    }
                    Err(err) => {
                        warn!(error = %err, "sse connection attempt failed");
                        attempt += 1;
                        continue;
                    }
                };

                attempt = 0;
                let mut stream = response.bytes_stream().eventsource();

                loop {
                    tokio::select! {
                        _ = read_cancel.cancelled() => return,
                        next = stream.next() => {
                            match next {
                                Some(Ok(event)) => {
                                    if event.event == "endpoint" {
                                        *read_message_endpoint.lock() = Some(event.data);
                                        continue;
                                    }
                                    if read_events
                                        .send(TransportEvent::Frame(Bytes::from(event.data)))
                                        .is_err()
                                    {
                                        return;
                                    }
                                }
                                Some(Err(err)) => {
                                    warn!(error = %err, "sse stream error, reconnecting");
                                    attempt = 1;
                                    break;
                                }
                                None => {
                                    attempt = 1;
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        });

        let write_cancel = cancel.clone();
        let write_events = events_tx;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = write_cancel.cancelled() => return,
                    frame = outbound_rx.recv() => {
                        let Some(frame) = frame else { return };
                        let target = message_endpoint.lock().clone().unwrap_or_else(|| post_url.clone());
                        let mut request = client.post(&target).body(frame);
                        if let Some(token) = &auth_token {
                            request = request.bearer_auth(token);
                        }
                        if let Err(err) = request.send().await {
                            let _ = write_events.send(TransportEvent::Closed {
                                reason: Some(format!("post to {target} failed: {err}")),
                            });
                            return;
                        }
                    }
                }
            }
        });

        self.cancel = Some(cancel);
        Ok(TransportHandle::new(outbound_tx, events_rx))
    }

    async fn close(&mut self) -> TransportResult<()> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        Ok(())
    }
}
