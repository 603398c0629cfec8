//! The session dispatch loop (§4.3, §5).
//!
//! One `tokio` task owns this actor for the life of a session: it is the
//! sole consumer of the transport's event stream, the sole allocator of
//! outbound request ids, and the place every inbound frame is decoded.
//! [`crate::InspectorClient`] talks to it over a command channel for
//! anything that needs a round trip; synchronous reads and fire-and-forget
//! sends (responding to a pending sample, publishing new roots) go straight
//! through the shared state and transport handle instead, since neither
//! needs the actor's mediation — see `client.rs`.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use inspector_protocol::jsonrpc::{
    decode, encode, JsonRpcErrorObject, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, JsonRpcResponsePayload, JsonRpcVersion,
};
use inspector_protocol::types::{
    CallToolResult, ClientCapabilities, ElicitRequestParams, ElicitationCapabilities,
    GetTaskPayloadResult, GetTaskResult, Implementation, InitializeRequest, InitializeResult,
    ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult, ListRootsResult,
    ListToolsResult, LoggingMessageNotification, ProgressNotification,
    ResourceUpdatedNotification, RootsCapabilities, SamplingCapabilities, TaskStatus,
    TaskStatusNotification,
};
use inspector_protocol::PROTOCOL_VERSION;
use inspector_transport::{Transport, TransportEvent, TransportHandle};
use inspector_types::{ErrorKind, InspectorError, MessageId};

use crate::config::SessionConfig;
use crate::event::{
    FetchEntry, InspectorEvent, MessageDirection, MessageEntry, ProgressUpdate, StderrEntry,
};
use crate::history::now_ms;
use crate::registry::{PendingRequest, ReplyTarget, RequestRegistry};
use crate::reverse::{PendingElicitation, PendingSample};
use crate::shared::Shared;
use crate::tasks::TaskUpdateMode;

/// Messages `InspectorClient` sends the actor. `Call` is the one workhorse
/// every round-trip operation in `client.rs` is built on; the `Resync*`
/// variants are self-addressed (§5: "does so on a separate tokio::spawn'd
/// task so it does not re-enter the dispatcher") rather than caller-issued.
pub(crate) enum Command {
    Connect(oneshot::Sender<Result<(), InspectorError>>),
    Disconnect(oneshot::Sender<()>),
    Call {
        method: String,
        params: Option<Value>,
        timeout: Option<Duration>,
        cancel: Option<CancellationToken>,
        reply: oneshot::Sender<Result<Value, InspectorError>>,
    },
    ResyncTools,
    ResyncResources,
    ResyncPrompts,
}

const TICK_INTERVAL: Duration = Duration::from_millis(100);

enum LoopEvent {
    Command(Option<Command>),
    Transport(Option<TransportEvent>),
    Stderr(Option<String>),
    Tick,
}

pub(crate) struct SessionActor<T: Transport> {
    transport: T,
    handle_slot: Arc<RwLock<Option<Arc<TransportHandle>>>>,
    shared: Arc<RwLock<Shared>>,
    events: broadcast::Sender<InspectorEvent>,
    config: SessionConfig,
    command_tx: mpsc::UnboundedSender<Command>,
    registry: RequestRegistry,
    next_id: i64,
    messages_dirty: bool,
    fetch_dirty: bool,
    stderr_dirty: bool,
    stderr_rx: Option<mpsc::UnboundedReceiver<String>>,
}

impl<T: Transport> SessionActor<T> {
    pub(crate) fn new(
        transport: T,
        handle_slot: Arc<RwLock<Option<Arc<TransportHandle>>>>,
        shared: Arc<RwLock<Shared>>,
        events: broadcast::Sender<InspectorEvent>,
        config: SessionConfig,
        command_tx: mpsc::UnboundedSender<Command>,
        stderr_rx: Option<mpsc::UnboundedReceiver<String>>,
    ) -> Self {
        Self {
            transport,
            handle_slot,
            shared,
            events,
            config,
            command_tx,
            registry: RequestRegistry::default(),
            next_id: 0,
            messages_dirty: false,
            fetch_dirty: false,
            stderr_dirty: false,
            stderr_rx,
        }
    }

    pub(crate) async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<Command>) {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        loop {
            // Clone the handle slot into a loop-local binding so the
            // transport-event future borrows that local, not `self` — the
            // other two branches' handlers need `&mut self`, and a future
            // borrowing a field of `self` directly would keep that borrow
            // alive for the whole `select!`, conflicting with them.
            let handle_slot = self.handle_slot.clone();
            let outcome = tokio::select! {
                command = command_rx.recv() => LoopEvent::Command(command),
                event = Self::recv_transport_event(&handle_slot) => LoopEvent::Transport(event),
                line = Self::recv_stderr_line(&mut self.stderr_rx) => LoopEvent::Stderr(line),
                _ = ticker.tick() => LoopEvent::Tick,
            };
            match outcome {
                LoopEvent::Command(Some(command)) => self.handle_command(command).await,
                LoopEvent::Command(None) => break,
                LoopEvent::Transport(Some(TransportEvent::Frame(bytes))) => self.handle_frame(&bytes),
                LoopEvent::Transport(Some(TransportEvent::Closed { reason })) => {
                    self.handle_closed(reason).await
                }
                LoopEvent::Transport(None) => {}
                LoopEvent::Stderr(Some(line)) => self.record_stderr_line(line),
                LoopEvent::Stderr(None) => self.stderr_rx = None,
                LoopEvent::Tick => self.on_tick(),
            }
        }
    }

    async fn recv_transport_event(
        handle_slot: &Arc<RwLock<Option<Arc<TransportHandle>>>>,
    ) -> Option<TransportEvent> {
        let handle = handle_slot.read().clone();
        match handle {
            Some(handle) => handle.recv_event().await,
            None => std::future::pending().await,
        }
    }

    /// Drains the optional stderr channel. `None` here means "no sink was
    /// configured, or it already closed" — either way the branch should
    /// never win the `select!` again, so it parks forever instead of
    /// returning `None` and retriggering a tight loop.
    async fn recv_stderr_line(rx: &mut Option<mpsc::UnboundedReceiver<String>>) -> Option<String> {
        match rx {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }

    fn record_stderr_line(&mut self, line: String) {
        self.shared
            .write()
            .histories
            .stderr
            .push(StderrEntry { line, timestamp_ms: now_ms() });
        self.stderr_dirty = true;
    }

    // -- command handling --

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect(reply) => self.handle_connect(reply).await,
            Command::Disconnect(reply) => {
                self.teardown(true).await;
                let _ = reply.send(());
            }
            Command::Call {
                method,
                params,
                timeout,
                cancel,
                reply,
            } => {
                let timeout = timeout.unwrap_or(self.config.default_request_timeout);
                self.send_request(&method, params, timeout, cancel, ReplyTarget::External(reply));
            }
            Command::ResyncTools => {
                let timeout = self.config.default_request_timeout;
                self.send_request("tools/list", None, timeout, None, ReplyTarget::ResyncTools);
            }
            Command::ResyncResources => {
                let timeout = self.config.default_request_timeout;
                self.send_request(
                    "resources/list",
                    None,
                    timeout,
                    None,
                    ReplyTarget::ResyncResources,
                );
                self.send_request(
                    "resources/templates/list",
                    None,
                    timeout,
                    None,
                    ReplyTarget::ResyncResourceTemplates,
                );
            }
            Command::ResyncPrompts => {
                let timeout = self.config.default_request_timeout;
                self.send_request("prompts/list", None, timeout, None, ReplyTarget::ResyncPrompts);
            }
        }
    }

    async fn handle_connect(&mut self, reply: oneshot::Sender<Result<(), InspectorError>>) {
        if self.handle_slot.read().is_some() {
            let _ = reply.send(Ok(()));
            return;
        }
        self.shared.write().histories.reset();
        let handle = match self.transport.open().await {
            Ok(handle) => Arc::new(handle),
            Err(e) => {
                let _ = reply.send(Err(InspectorError::transport(e.to_string())));
                return;
            }
        };
        *self.handle_slot.write() = Some(handle);

        let capabilities = ClientCapabilities {
            roots: Some(RootsCapabilities { list_changed: Some(true) }),
            sampling: self
                .config
                .sampling_enabled
                .then(|| SamplingCapabilities::default()),
            elicitation: (self.config.elicitation_form_enabled
                || self.config.elicitation_url_enabled)
                .then(|| ElicitationCapabilities::default()),
        };
        let init_request = InitializeRequest {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities,
            client_info: Implementation {
                name: self.config.client_name.clone(),
                version: self.config.client_version.clone(),
                title: None,
            },
        };
        let params = match serde_json::to_value(&init_request) {
            Ok(value) => Some(value),
            Err(e) => {
                let _ = reply.send(Err(InspectorError::protocol_encoding(e.to_string())));
                return;
            }
        };
        let timeout = self.config.default_request_timeout;
        self.send_request("initialize", params, timeout, None, ReplyTarget::Initialize(reply));
    }

    async fn handle_closed(&mut self, reason: Option<String>) {
        tracing::warn!(?reason, "transport closed");
        self.teardown(false).await;
    }

    /// Disconnect semantics (§5): cancel outstanding requests, reject
    /// pending reverse-capability records, cancel active tasks, close the
    /// transport, and clear everything but history.
    async fn teardown(&mut self, close_transport: bool) {
        for (_, pending) in self.registry.drain_all() {
            self.fail_pending(pending, InspectorError::connection_closed());
        }

        let (samples, elicitations, cancelled_task_ids) = {
            let mut shared = self.shared.write();
            let samples: Vec<PendingSample> =
                shared.pending_samples.drain(..).filter(|s| !s.resolved).collect();
            let elicitations: Vec<PendingElicitation> = shared
                .pending_elicitations
                .drain(..)
                .filter(|e| !e.resolved)
                .collect();
            let now = now_ms();
            let mut cancelled = Vec::new();
            for (task_id, task) in shared.tasks.iter_mut() {
                if !task.status.is_terminal() {
                    task.transition(TaskStatus::Cancelled, Some("connection closed".into()), now);
                    task.settle(Err(InspectorError::connection_closed()));
                    cancelled.push(task_id.clone());
                }
            }
            shared.clear_session_state();
            (samples, elicitations, cancelled)
        };

        for sample in samples {
            self.send_error_response(sample.wire_id, JsonRpcErrorObject::internal("connection closed"));
        }
        for elicitation in elicitations {
            self.send_error_response(
                elicitation.wire_id,
                JsonRpcErrorObject::internal("connection closed"),
            );
        }
        for task_id in cancelled_task_ids {
            let _ = self
                .events
                .send(InspectorEvent::TaskStatusChanged { task_id, status: TaskStatus::Cancelled });
        }

        if close_transport {
            let _ = self.transport.close().await;
        }
        *self.handle_slot.write() = None;
        let _ = self.events.send(InspectorEvent::Disconnected);
    }

    fn fail_pending(&mut self, pending: PendingRequest, err: InspectorError) {
        match pending.target {
            ReplyTarget::External(tx) => {
                let _ = tx.send(Err(err));
            }
            ReplyTarget::Initialize(tx) => {
                let _ = tx.send(Err(err));
            }
            ReplyTarget::TaskPoll(_)
            | ReplyTarget::TaskResult(_)
            | ReplyTarget::ResyncTools
            | ReplyTarget::ResyncResources
            | ReplyTarget::ResyncResourceTemplates
            | ReplyTarget::ResyncPrompts => {
                tracing::debug!(method = %pending.method, "dropping internal request on teardown");
            }
        }
    }

    // -- outbound framing --

    fn send_request(
        &mut self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
        cancel: Option<CancellationToken>,
        target: ReplyTarget,
    ) {
        let handle_slot = self.handle_slot.read().clone();
        let handle = match handle_slot {
            Some(handle) => handle,
            None => {
                self.fail_pending(
                    PendingRequest {
                        target,
                        method: method.to_string(),
                        started_at_ms: now_ms(),
                        timeout_ms: timeout.as_millis() as u64,
                        cancel,
                    },
                    InspectorError::not_connected(),
                );
                return;
            }
        };
        let id = MessageId::Number(self.next_id);
        self.next_id += 1;
        let request = JsonRpcRequest {
            jsonrpc: JsonRpcVersion,
            id: id.clone(),
            method: method.to_string(),
            params,
        };
        let payload = serde_json::to_value(&request).unwrap_or(Value::Null);
        let bytes = match encode(&JsonRpcMessage::Request(request)) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.fail_pending(
                    PendingRequest {
                        target,
                        method: method.to_string(),
                        started_at_ms: now_ms(),
                        timeout_ms: timeout.as_millis() as u64,
                        cancel,
                    },
                    e,
                );
                return;
            }
        };
        if let Err(e) = handle.send(Bytes::from(bytes)) {
            self.fail_pending(
                PendingRequest {
                    target,
                    method: method.to_string(),
                    started_at_ms: now_ms(),
                    timeout_ms: timeout.as_millis() as u64,
                    cancel,
                },
                InspectorError::transport(e.to_string()),
            );
            return;
        }
        self.record_message(MessageDirection::Outbound, Some(method.to_string()), Some(id.clone()), payload);
        self.registry.insert(
            id,
            PendingRequest {
                target,
                method: method.to_string(),
                started_at_ms: now_ms(),
                timeout_ms: timeout.as_millis() as u64,
                cancel,
            },
        );
    }

    fn send_notification(&mut self, method: &str, params: Option<Value>) {
        let handle = match self.handle_slot.read().clone() {
            Some(handle) => handle,
            None => return,
        };
        let notification = JsonRpcNotification {
            jsonrpc: JsonRpcVersion,
            method: method.to_string(),
            params,
        };
        let payload = serde_json::to_value(&notification).unwrap_or(Value::Null);
        if let Ok(bytes) = encode(&JsonRpcMessage::Notification(notification)) {
            let _ = handle.send(Bytes::from(bytes));
            self.record_message(MessageDirection::Outbound, Some(method.to_string()), None, payload);
        }
    }

    fn send_response_value(&mut self, id: MessageId, result: Value) {
        let handle = match self.handle_slot.read().clone() {
            Some(handle) => handle,
            None => return,
        };
        let response = JsonRpcResponse::success(id.clone(), result.clone());
        if let Ok(bytes) = encode(&JsonRpcMessage::Response(response)) {
            let _ = handle.send(Bytes::from(bytes));
            self.record_message(MessageDirection::Outbound, None, Some(id), result);
        }
    }

    fn send_error_response(&mut self, id: MessageId, error: JsonRpcErrorObject) {
        let handle = match self.handle_slot.read().clone() {
            Some(handle) => handle,
            None => return,
        };
        let payload = serde_json::to_value(&error).unwrap_or(Value::Null);
        let response = JsonRpcResponse::error(id.clone(), error);
        if let Ok(bytes) = encode(&JsonRpcMessage::Response(response)) {
            let _ = handle.send(Bytes::from(bytes));
            self.record_message(MessageDirection::Outbound, None, Some(id), payload);
        }
    }

    fn record_message(
        &mut self,
        direction: MessageDirection,
        method: Option<String>,
        id: Option<MessageId>,
        payload: Value,
    ) {
        {
            let mut shared = self.shared.write();
            shared.histories.messages.push(MessageEntry {
                direction,
                method,
                id,
                payload,
                timestamp_ms: now_ms(),
            });
        }
        self.messages_dirty = true;
    }

    fn spawn_resync(&self, command: Command) {
        let tx = self.command_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(command);
        });
    }

    // -- inbound frames --

    fn handle_frame(&mut self, bytes: &Bytes) {
        match decode(bytes) {
            Ok(JsonRpcMessage::Response(response)) => {
                let payload = serde_json::to_value(&response).unwrap_or(Value::Null);
                self.record_message(MessageDirection::Inbound, None, Some(response.id.clone()), payload);
                self.handle_response(response);
            }
            Ok(JsonRpcMessage::Notification(notification)) => {
                let payload = serde_json::to_value(&notification).unwrap_or(Value::Null);
                self.record_message(
                    MessageDirection::Inbound,
                    Some(notification.method.clone()),
                    None,
                    payload,
                );
                self.handle_notification(notification);
            }
            Ok(JsonRpcMessage::Request(request)) => {
                let payload = serde_json::to_value(&request).unwrap_or(Value::Null);
                self.record_message(
                    MessageDirection::Inbound,
                    Some(request.method.clone()),
                    Some(request.id.clone()),
                    payload,
                );
                self.handle_inbound_request(request);
            }
            Err(e) => tracing::warn!(error = %e, "dropping malformed inbound frame"),
        }
    }

    fn handle_response(&mut self, response: JsonRpcResponse) {
        let id = response.id.clone();
        let Some(pending) = self.registry.remove(&id) else {
            tracing::debug!(%id, "dropping unmatched response");
            return;
        };
        let duration_ms = now_ms().saturating_sub(pending.started_at_ms);
        let ok = matches!(response.payload, JsonRpcResponsePayload::Success { .. });
        {
            let mut shared = self.shared.write();
            shared.histories.fetch.push(FetchEntry {
                method: pending.method.clone(),
                duration_ms,
                ok,
                timestamp_ms: now_ms(),
            });
        }
        self.fetch_dirty = true;

        let outcome: Result<Value, InspectorError> = match response.payload {
            JsonRpcResponsePayload::Success { result } => Ok(result),
            JsonRpcResponsePayload::Error { error } => Err(map_jsonrpc_error(error)),
        };

        match pending.target {
            ReplyTarget::External(tx) => {
                let _ = tx.send(outcome);
            }
            ReplyTarget::Initialize(tx) => self.finish_initialize(outcome, tx),
            ReplyTarget::TaskPoll(task_id) => self.handle_task_poll_result(task_id, outcome),
            ReplyTarget::TaskResult(task_id) => self.handle_task_result(task_id, outcome),
            ReplyTarget::ResyncTools => self.handle_resync_tools(outcome),
            ReplyTarget::ResyncResources => self.handle_resync_resources(outcome),
            ReplyTarget::ResyncResourceTemplates => self.handle_resync_resource_templates(outcome),
            ReplyTarget::ResyncPrompts => self.handle_resync_prompts(outcome),
        }
    }

    fn finish_initialize(
        &mut self,
        outcome: Result<Value, InspectorError>,
        reply: oneshot::Sender<Result<(), InspectorError>>,
    ) {
        let value = match outcome {
            Ok(value) => value,
            Err(e) => {
                let _ = reply.send(Err(e));
                return;
            }
        };
        match serde_json::from_value::<InitializeResult>(value) {
            Ok(init) => {
                {
                    let mut shared = self.shared.write();
                    shared.server_capabilities = Some(init.capabilities);
                    shared.server_info = Some(init.server_info);
                    shared.connected = true;
                }
                self.send_notification("notifications/initialized", None);
                let _ = reply.send(Ok(()));
            }
            Err(e) => {
                let _ = reply.send(Err(InspectorError::protocol_decoding(e.to_string())));
            }
        }
    }

    fn handle_resync_tools(&mut self, outcome: Result<Value, InspectorError>) {
        let Ok(value) = outcome else { return };
        let Ok(parsed) = serde_json::from_value::<ListToolsResult>(value) else { return };
        self.shared.write().reconcile_tools(parsed.tools);
        let _ = self.events.send(InspectorEvent::ToolsChanged);
    }

    fn handle_resync_resources(&mut self, outcome: Result<Value, InspectorError>) {
        let Ok(value) = outcome else { return };
        let Ok(parsed) = serde_json::from_value::<ListResourcesResult>(value) else { return };
        let mut shared = self.shared.write();
        let templates = shared.resource_templates();
        shared.reconcile_resources(parsed.resources, templates);
        drop(shared);
        let _ = self.events.send(InspectorEvent::ResourcesChanged);
    }

    fn handle_resync_resource_templates(&mut self, outcome: Result<Value, InspectorError>) {
        let Ok(value) = outcome else { return };
        let Ok(parsed) = serde_json::from_value::<ListResourceTemplatesResult>(value) else {
            return;
        };
        let mut shared = self.shared.write();
        let resources = shared.resources();
        shared.reconcile_resources(resources, parsed.resource_templates);
        drop(shared);
        let _ = self.events.send(InspectorEvent::ResourcesChanged);
    }

    fn handle_resync_prompts(&mut self, outcome: Result<Value, InspectorError>) {
        let Ok(value) = outcome else { return };
        let Ok(parsed) = serde_json::from_value::<ListPromptsResult>(value) else { return };
        self.shared.write().reconcile_prompts(parsed.prompts);
        let _ = self.events.send(InspectorEvent::PromptsChanged);
    }

    fn handle_task_poll_result(&mut self, task_id: String, outcome: Result<Value, InspectorError>) {
        let Ok(value) = outcome else { return };
        let Ok(parsed) = serde_json::from_value::<GetTaskResult>(value) else { return };
        let now = now_ms();
        let became_terminal = {
            let mut shared = self.shared.write();
            match shared.tasks.get_mut(&task_id) {
                Some(task) => {
                    task.transition(parsed.task.status, parsed.task.status_message.clone(), now)
                }
                None => return,
            }
        };
        let _ = self.events.send(InspectorEvent::TaskStatusChanged {
            task_id: task_id.clone(),
            status: parsed.task.status,
        });
        if became_terminal {
            self.finish_task(task_id, parsed.task.status);
        }
    }

    fn handle_task_result(&mut self, task_id: String, outcome: Result<Value, InspectorError>) {
        let result: Result<CallToolResult, InspectorError> = match outcome {
            Ok(value) => serde_json::from_value::<GetTaskPayloadResult>(value)
                .map_err(|e| InspectorError::protocol_decoding(e.to_string()))
                .and_then(|payload| {
                    serde_json::from_value::<CallToolResult>(payload.result)
                        .map_err(|e| InspectorError::protocol_decoding(e.to_string()))
                }),
            Err(e) => Err(e),
        };
        {
            let mut shared = self.shared.write();
            if let Some(task) = shared.tasks.get_mut(&task_id) {
                task.settle(result.clone());
            }
        }
        if let Ok(call_result) = result {
            let _ = self
                .events
                .send(InspectorEvent::TaskCompleted { task_id, result: Box::new(call_result) });
        }
    }

    /// Entering `completed` still needs the payload fetched via
    /// `tasks/result` (§4.6); `failed`/`cancelled` carry no payload and
    /// settle their waiters directly with an error.
    fn finish_task(&mut self, task_id: String, status: TaskStatus) {
        if status == TaskStatus::Completed {
            let timeout = self.config.default_request_timeout;
            self.send_request(
                "tasks/result",
                Some(json!({ "taskId": task_id })),
                timeout,
                None,
                ReplyTarget::TaskResult(task_id),
            );
        } else {
            let mut shared = self.shared.write();
            if let Some(task) = shared.tasks.get_mut(&task_id) {
                task.settle(Err(InspectorError::cancelled(format!("task {status:?}"))));
            }
        }
    }

    fn handle_notification(&mut self, notification: JsonRpcNotification) {
        let raw = notification.params.clone().unwrap_or(Value::Null);
        match notification.method.as_str() {
            "notifications/progress" => self.handle_progress(raw),
            "notifications/resources/updated" => self.handle_resource_updated(raw),
            "notifications/tools/list_changed" => self.spawn_resync(Command::ResyncTools),
            "notifications/resources/list_changed" => self.spawn_resync(Command::ResyncResources),
            "notifications/prompts/list_changed" => self.spawn_resync(Command::ResyncPrompts),
            "notifications/roots/list_changed" => {}
            "notifications/message" => self.handle_log_message(raw),
            "notifications/tasks/status" => self.handle_task_status_notification(raw),
            other => {
                let _ = self.events.send(InspectorEvent::ServerNotification {
                    method: other.to_string(),
                    params: notification.params,
                });
            }
        }
    }

    fn handle_progress(&mut self, raw: Value) {
        let Ok(progress) = serde_json::from_value::<ProgressNotification>(raw) else { return };
        let related_task_id = progress
            .meta
            .as_ref()
            .and_then(|meta| meta.related_task.as_ref())
            .map(|related| related.task_id.clone());
        if let Some(task_id) = &related_task_id {
            let mut shared = self.shared.write();
            if let Some(task) = shared.tasks.get_mut(task_id) {
                task.last_updated_at_ms = now_ms();
            }
        }
        let _ = self.events.send(InspectorEvent::Progress(ProgressUpdate {
            progress: progress.progress,
            total: progress.total,
            message: None,
            related_task_id,
        }));
    }

    fn handle_resource_updated(&mut self, raw: Value) {
        let Ok(updated) = serde_json::from_value::<ResourceUpdatedNotification>(raw) else {
            return;
        };
        let invalidated = {
            let mut shared = self.shared.write();
            if shared.subscriptions().contains(&updated.uri) {
                shared.invalidate_resource(&updated.uri);
                true
            } else {
                false
            }
        };
        if invalidated {
            let _ = self.events.send(InspectorEvent::ResourceUpdated { uri: updated.uri });
        }
    }

    fn handle_log_message(&mut self, raw: Value) {
        let Ok(log) = serde_json::from_value::<LoggingMessageNotification>(raw) else { return };
        let _ = self.events.send(InspectorEvent::LogMessage {
            level: log.level,
            data: log.data,
            logger: log.logger,
        });
    }

    fn handle_task_status_notification(&mut self, raw: Value) {
        let Ok(notification) = serde_json::from_value::<TaskStatusNotification>(raw) else {
            return;
        };
        let now = now_ms();
        let became_terminal = {
            let mut shared = self.shared.write();
            match shared.tasks.get_mut(&notification.task_id) {
                Some(task) => task.transition(
                    notification.status,
                    notification.status_message.clone(),
                    now,
                ),
                None => return,
            }
        };
        let _ = self.events.send(InspectorEvent::TaskStatusChanged {
            task_id: notification.task_id.clone(),
            status: notification.status,
        });
        if became_terminal {
            self.finish_task(notification.task_id, notification.status);
        }
    }

    fn handle_inbound_request(&mut self, request: JsonRpcRequest) {
        let JsonRpcRequest { id, method, params, .. } = request;
        match method.as_str() {
            "sampling/createMessage" => self.handle_sampling_request(id, method, params),
            "elicitation/create" => self.handle_elicitation_request(id, method, params),
            "roots/list" => {
                let roots = self.shared.read().roots();
                let value = serde_json::to_value(ListRootsResult { roots }).unwrap_or(Value::Null);
                self.send_response_value(id, value);
            }
            _ => self.send_error_response(id, JsonRpcErrorObject::method_not_found(&method)),
        }
    }

    fn handle_sampling_request(&mut self, id: MessageId, method: String, params: Option<Value>) {
        if !self.config.sampling_enabled {
            self.send_error_response(id, JsonRpcErrorObject::method_not_found(&method));
            return;
        }
        let raw = params.unwrap_or(Value::Null);
        let related_task_id = related_task_id_from_meta(&raw);
        match serde_json::from_value(raw) {
            Ok(request) => {
                let local_id = {
                    let mut shared = self.shared.write();
                    let local_id = shared.next_pending_id;
                    shared.next_pending_id += 1;
                    shared.pending_samples.push(PendingSample {
                        id: local_id,
                        request,
                        wire_id: id,
                        related_task_id: related_task_id.clone(),
                        resolved: false,
                    });
                    local_id
                };
                if let Some(task_id) = &related_task_id {
                    self.mark_task_input_required(task_id);
                }
                let _ = self.events.send(InspectorEvent::NewPendingSample { id: local_id });
            }
            Err(e) => self.send_error_response(
                id,
                JsonRpcErrorObject {
                    code: JsonRpcErrorObject::INVALID_PARAMS,
                    message: e.to_string(),
                    data: None,
                },
            ),
        }
    }

    fn handle_elicitation_request(&mut self, id: MessageId, method: String, params: Option<Value>) {
        if !(self.config.elicitation_form_enabled || self.config.elicitation_url_enabled) {
            self.send_error_response(id, JsonRpcErrorObject::method_not_found(&method));
            return;
        }
        let raw = params.unwrap_or(Value::Null);
        let related_task_id = related_task_id_from_meta(&raw);
        match serde_json::from_value::<ElicitRequestParams>(raw) {
            Ok(params) => {
                let local_id = {
                    let mut shared = self.shared.write();
                    let local_id = shared.next_pending_id;
                    shared.next_pending_id += 1;
                    shared.pending_elicitations.push(PendingElicitation {
                        id: local_id,
                        params,
                        wire_id: id,
                        related_task_id: related_task_id.clone(),
                        resolved: false,
                    });
                    local_id
                };
                if let Some(task_id) = &related_task_id {
                    self.mark_task_input_required(task_id);
                }
                let _ = self.events.send(InspectorEvent::NewPendingElicitation { id: local_id });
            }
            Err(e) => self.send_error_response(
                id,
                JsonRpcErrorObject {
                    code: JsonRpcErrorObject::INVALID_PARAMS,
                    message: e.to_string(),
                    data: None,
                },
            ),
        }
    }

    fn mark_task_input_required(&mut self, task_id: &str) {
        let now = now_ms();
        let transitioned = {
            let mut shared = self.shared.write();
            match shared.tasks.get_mut(task_id) {
                Some(task) if task.status == TaskStatus::Working => {
                    task.transition(TaskStatus::InputRequired, None, now);
                    true
                }
                _ => false,
            }
        };
        if transitioned {
            let _ = self.events.send(InspectorEvent::TaskStatusChanged {
                task_id: task_id.to_string(),
                status: TaskStatus::InputRequired,
            });
        }
    }

    // -- periodic tick: timeouts, task polling, debounced history events --

    fn on_tick(&mut self) {
        let now = now_ms();
        self.expire_requests(now);
        self.drive_task_polling(now);
        self.flush_debounced_events();
    }

    fn expire_requests(&mut self, now: u64) {
        for id in self.registry.expired(now) {
            let Some(pending) = self.registry.remove(&id) else { continue };
            let host_cancelled = pending.cancel.as_ref().is_some_and(|c| c.is_cancelled());
            let reason = if host_cancelled { "cancelled by host" } else { "timed out" };
            self.send_notification(
                "notifications/cancelled",
                Some(json!({ "requestId": id, "reason": reason })),
            );
            let err = if host_cancelled {
                InspectorError::cancelled(reason)
            } else {
                InspectorError::timeout(format!("{} exceeded {}ms", pending.method, pending.timeout_ms))
            };
            self.fail_pending(pending, err);
        }
    }

    fn drive_task_polling(&mut self, now: u64) {
        // Fall back to polling once a server-push task has gone quiet for
        // twice its poll interval without a push updating it.
        {
            let mut shared = self.shared.write();
            for task in shared.tasks.values_mut() {
                if task.mode == TaskUpdateMode::ServerPush
                    && task.status.is_active()
                    && now.saturating_sub(task.last_updated_at_ms) >= task.poll_interval_ms.saturating_mul(2)
                {
                    task.mode = TaskUpdateMode::Polling;
                    task.next_poll_due_ms = now;
                }
            }
        }

        let due: Vec<(String, u64)> = {
            let shared = self.shared.read();
            shared
                .tasks
                .iter()
                .filter(|(_, task)| {
                    task.mode == TaskUpdateMode::Polling && task.status.is_active() && now >= task.next_poll_due_ms
                })
                .map(|(id, task)| (id.clone(), task.poll_interval_ms))
                .collect()
        };
        for (task_id, poll_interval_ms) in due {
            let timeout = self.config.default_request_timeout;
            self.send_request(
                "tasks/get",
                Some(json!({ "taskId": task_id })),
                timeout,
                None,
                ReplyTarget::TaskPoll(task_id.clone()),
            );
            let mut shared = self.shared.write();
            if let Some(task) = shared.tasks.get_mut(&task_id) {
                task.next_poll_due_ms = now + crate::tasks::TaskRecord::jittered_interval(poll_interval_ms, now);
            }
        }
    }

    fn flush_debounced_events(&mut self) {
        if self.messages_dirty {
            let _ = self.events.send(InspectorEvent::MessagesChanged);
            self.messages_dirty = false;
        }
        if self.fetch_dirty {
            let _ = self.events.send(InspectorEvent::FetchRequestsChanged);
            self.fetch_dirty = false;
        }
        if self.stderr_dirty {
            let _ = self.events.send(InspectorEvent::StderrLogsChanged);
            self.stderr_dirty = false;
        }
    }
}

fn map_jsonrpc_error(error: JsonRpcErrorObject) -> InspectorError {
    if error.code == JsonRpcErrorObject::METHOD_NOT_FOUND {
        InspectorError::method_not_found(error.message)
    } else {
        InspectorError::new(ErrorKind::Internal, error.message)
    }
}

fn related_task_id_from_meta(raw: &Value) -> Option<String> {
    raw.get("_meta")?
        .get("relatedTask")?
        .get("taskId")?
        .as_str()
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn related_task_id_from_meta_reads_nested_field() {
        let raw = json!({ "_meta": { "relatedTask": { "taskId": "task-42" } } });
        assert_eq!(related_task_id_from_meta(&raw), Some("task-42".to_string()));
    }

    #[test]
    fn related_task_id_from_meta_returns_none_when_absent() {
        assert_eq!(related_task_id_from_meta(&json!({})), None);
        assert_eq!(related_task_id_from_meta(&json!({ "_meta": {} })), None);
        assert_eq!(
            related_task_id_from_meta(&json!({ "_meta": { "relatedTask": {} } })),
            None
        );
    }

    #[test]
    fn map_jsonrpc_error_classifies_method_not_found() {
        let error = JsonRpcErrorObject::method_not_found("tools/unknown");
        let mapped = map_jsonrpc_error(error);
        assert_eq!(mapped.kind, ErrorKind::MethodNotFound);
    }

    #[test]
    fn map_jsonrpc_error_falls_back_to_internal() {
        let error = JsonRpcErrorObject {
            code: JsonRpcErrorObject::INTERNAL_ERROR,
            message: "boom".into(),
            data: None,
        };
        let mapped = map_jsonrpc_error(error);
        assert_eq!(mapped.kind, ErrorKind::Internal);
        assert!(mapped.message.contains("boom"));
    }
}
