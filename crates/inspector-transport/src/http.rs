//! Streamable HTTP transport: a single MCP endpoint. Each outbound frame is
//! a `POST`; the response is either one JSON frame or an SSE stream of
//! frames. Session id and `Last-Event-ID` resumption headers carry the
//! server-assigned state across reconnects.

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
pub struct StreamableHttpConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub protocol_version: String,
    pub retry_policy: RetryPolicy,
}

impl StreamableHttpConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            protocol_version: inspector_protocol::PROTOCOL_VERSION.to_string(),
            retry_policy: RetryPolicy::default(),
        }
    }
}

#[derive(Default)]
struct ResumeState {
    session_id: Option<String>,
    last_event_id: Option<String>,
}

pub struct StreamableHttpTransport {
    config: StreamableHttpConfig,
    client: Client,
    cancel: Option<CancellationToken>,
    resume: Arc<SyncMutex<ResumeState>>,
}

impl StreamableHttpTransport {
    pub fn new(config: StreamableHttpConfig) -> TransportResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self {
            config,
            client,
            cancel: None,
            resume: Arc::new(SyncMutex::new(ResumeState::default())),
        })
    }
}

async fn send_one_frame(
    client: &Client,
    config: &StreamableHttpConfig,
    resume: &Arc<SyncMutex<ResumeState>>,
    frame: Bytes,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> TransportResult<()> {
    let (session_id, last_event_id) = {
        let state = resume.lock();
        (state.session_id.clone(), state.last_event_id.clone())
    };

    let mut request = client
        .post(&config.url)
        .header("Accept", "application/json, text/event-stream")
        .header("Content-Type", "application/json")
        .header("MCP-Protocol-Version", &config.protocol_version)
        .body(frame);

    if let Some(token) = &config.auth_token {
        request = request.bearer_auth(token);
    }
    if let Some(sid) = &session_id {
        request = request.header("Mcp-Session-Id", sid);
    }
    if let Some(last_id) = &last_event_id {
        request = request.header("Last-Event-ID", last_id);
    }

    let response = request
        .send()
        .await
        .map_err(|e| TransportError::Http(e.to_string()))?;

    if let Some(sid) = response
        .headers()
        .get("Mcp-Session-Id")
        .and_then(|v| v.to_str().ok())
    {
        resume.lock().session_id = Some(sid.to_string());
    }

    if response.status() == reqwest::StatusCode::ACCEPTED {
        return Ok(());
    }
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(TransportError::HttpStatus { status, body });
    }

    let content_type = response
        .headers()
        .get("Content-Type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if content_type.contains("text/event-stream") {
        let mut stream = response.bytes_stream().eventsource();
        while let Some(event) = stream.next().await {
            match event {
                Ok(event) => {
                    if !event.id.is_empty() {
                        resume.lock().last_event_id = Some(event.id.clone());
                    }
                    if events
                        .send(TransportEvent::Frame(Bytes::from(event.data)))
                        .is_err()
                    {
                        return Ok(());
                    }
                }
                Err(err) => {
                    warn!(error = %err, "streamable http sse frame dropped");
                    break;
                }
            }
        }
    } else {
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let _ = events.send(TransportEvent::Frame(body));
    }

    Ok(())
}

#[async_trait]
impl Transport for StreamableHttpTransport {
    async fn open(&mut self) -> TransportResult<TransportHandle> {
        if self.cancel.is_some() {
            return Err(TransportError::AlreadyOpen);
        }

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Bytes>();
        let (events_tx, events_rx) = mpsc::unbounded_channel::<TransportEvent>();
        let cancel = CancellationToken::new();

        let client = self.client.clone();
        let config = self.config.clone();
        let resume = self.resume.clone();
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            let mut attempt = 0u32;
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => return,
                    frame = outbound_rx.recv() => {
                        let Some(frame) = frame else { return };
                        match send_one_frame(&client, &config, &resume, frame, &events_tx).await {
                            Ok(()) => attempt = 0,
                            Err(err) => {
                                attempt += 1;
                                match config.retry_policy.delay(attempt - 1) {
                                    Some(delay) => {
                                        warn!(error = %err, ?delay, "streamable http request failed, retrying");
                                        tokio::time::sleep(delay).await;
                                    }
                                    None => {
                                        let _ = events_tx.send(TransportEvent::Closed {
                                            reason: Some(err.to_string()),
                                        });
                                        return;
                                    }
                                }
                            }
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
