//! The public session handle (§4.3-§4.6).
//!
//! [`InspectorClient`] is cheap to clone-by-reference (it only holds
//! `Arc`s and channel senders) and carries no generic transport parameter:
//! once [`InspectorClient::connect`] hands the transport to the actor task,
//! every typed operation here talks to that task over `command_tx`, or —
//! for operations that need no round trip — reads and writes the shared
//! state and the wire directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use inspector_protocol::jsonrpc::{
    encode, JsonRpcErrorObject, JsonRpcMessage, JsonRpcNotification, JsonRpcResponse,
    JsonRpcVersion,
};
use inspector_protocol::types::{
    CallToolRequest, CallToolResult, CancelTaskRequest, CancelTaskResult, CompleteRequestParams,
    CompleteResult, CompletionData, CreateMessageResult, CreateTaskResult, ElicitResult,
    GetPromptRequest, GetPromptResult, GetTaskRequest, GetTaskResult, Implementation, ListPromptsRequest,
    ListPromptsResult, ListResourceTemplatesRequest, ListResourceTemplatesResult,
    ListResourcesRequest, ListResourcesResult, ListTasksRequest, ListTasksResult, ListToolsRequest,
    ListToolsResult, LogLevel, Prompt, PromptInput, ReadResourceRequest, ReadResourceResult,
    Resource, ResourceTemplate, Root, ServerCapabilities, SetLevelRequest, SubscribeRequest, Task,
    TaskMetadata, TaskStatus, TaskSupport, Tool, UnsubscribeRequest, Uri,
};
use inspector_transport::{Transport, TransportHandle};
use inspector_types::{ErrorKind, InspectorError};

use crate::actor::{Command, SessionActor};
use crate::config::SessionBuilder;
use crate::event::{FetchEntry, InspectorEvent, MessageDirection, MessageEntry, StderrEntry};
use crate::history::{now_ms, Histories};
use crate::reverse::{PendingElicitation, PendingSample, StaticRootsProvider};
use crate::shared::{Shared, ToolCacheEntry};
use crate::tasks::TaskRecord;

/// Generous enough that a slow observer doesn't make a fast one miss
/// events; `broadcast` drops the oldest entry for a lagging receiver
/// rather than blocking the actor.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A connected (or disconnected, post-`disconnect`) MCP session.
///
/// Cloning shares the same underlying session — every clone observes the
/// same catalogs, caches, and event stream.
#[derive(Clone)]
pub struct InspectorClient {
    command_tx: mpsc::UnboundedSender<Command>,
    shared: Arc<RwLock<Shared>>,
    events: broadcast::Sender<InspectorEvent>,
    handle_slot: Arc<RwLock<Option<Arc<TransportHandle>>>>,
    static_roots: Option<Arc<StaticRootsProvider>>,
    default_poll_interval_ms: u64,
}

impl InspectorClient {
    /// Builds a session from `builder`, spawns its actor task, and performs
    /// the `initialize` handshake. Returns once the session is usable.
    pub async fn connect<T: Transport + 'static>(
        builder: SessionBuilder<T>,
    ) -> Result<Self, InspectorError> {
        let (transport, config, roots_provider, static_roots, stderr_rx) = builder.into_parts();
        let histories = Histories::new(
            config.message_history_capacity,
            config.stderr_history_capacity,
            config.fetch_history_capacity,
        );
        let shared = Arc::new(RwLock::new(Shared::new(roots_provider, histories)));
        let handle_slot = Arc::new(RwLock::new(None));
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let default_poll_interval_ms = config.task_poll_interval.as_millis() as u64;

        let actor = SessionActor::new(
            transport,
            handle_slot.clone(),
            shared.clone(),
            events_tx.clone(),
            config,
            command_tx.clone(),
            stderr_rx,
        );
        tokio::spawn(actor.run(command_rx));

        let client = Self {
            command_tx,
            shared,
            events: events_tx,
            handle_slot,
            static_roots,
            default_poll_interval_ms,
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        client
            .command_tx
            .send(Command::Connect(reply_tx))
            .map_err(|_| InspectorError::connection_closed())?;
        reply_rx.await.map_err(|_| InspectorError::connection_closed())??;
        Ok(client)
    }

    /// Tears the session down: fails every outstanding request and pending
    /// reverse-capability record, cancels active tasks, closes the
    /// transport. The client handle remains valid but every call to it
    /// will fail with `NotConnected` until a fresh session is built.
    pub async fn disconnect(&self) {
        let (tx, rx) = oneshot::channel();
        if self.command_tx.send(Command::Disconnect(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InspectorEvent> {
        self.events.subscribe()
    }

    // -- the one generic round trip every typed operation builds on --

    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, InspectorError> {
        self.call_with(method, params, None, None).await
    }

    async fn call_with(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Option<Duration>,
        cancel: Option<CancellationToken>,
    ) -> Result<Value, InspectorError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(Command::Call {
                method: method.to_string(),
                params,
                timeout,
                cancel,
                reply,
            })
            .map_err(|_| InspectorError::connection_closed())?;
        rx.await.map_err(|_| InspectorError::connection_closed())?
    }

    /// Escape hatch for methods this client has no typed wrapper for.
    pub async fn call_raw(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Option<Duration>,
        cancel: Option<CancellationToken>,
    ) -> Result<Value, InspectorError> {
        self.call_with(method, params, timeout, cancel).await
    }

    fn decode<R: serde::de::DeserializeOwned>(value: Value) -> Result<R, InspectorError> {
        serde_json::from_value(value).map_err(|e| InspectorError::protocol_decoding(e.to_string()))
    }

    fn encode<P: serde::Serialize>(params: P) -> Option<Value> {
        serde_json::to_value(params).ok()
    }

    // -- tools --

    pub async fn list_tools(&self, cursor: Option<String>) -> Result<ListToolsResult, InspectorError> {
        let page = self.fetch_tools_page(cursor).await?;
        self.shared.write().reconcile_tools(page.tools.clone());
        Ok(page)
    }

    pub async fn list_all_tools(&self) -> Result<Vec<Tool>, InspectorError> {
        let mut cursor = None;
        let mut all = Vec::new();
        loop {
            let page = self.fetch_tools_page(cursor).await?;
            all.extend(page.tools);
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }
        self.shared.write().reconcile_tools(all.clone());
        Ok(all)
    }

    async fn fetch_tools_page(&self, cursor: Option<String>) -> Result<ListToolsResult, InspectorError> {
        let params = Self::encode(ListToolsRequest { cursor });
        let value = self.call("tools/list", params).await?;
        Self::decode(value)
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<HashMap<String, Value>>,
    ) -> Result<CallToolResult, InspectorError> {
        let task_support = self
            .shared
            .read()
            .tools()
            .iter()
            .find(|t| t.name == name)
            .map(Tool::task_support)
            .unwrap_or(TaskSupport::Forbidden);
        if task_support == TaskSupport::Required {
            return Err(InspectorError::task_required(name));
        }
        let params = Self::encode(CallToolRequest {
            name: name.to_string(),
            arguments,
            task: None,
        });
        let value = self.call("tools/call", params).await?;
        let result: CallToolResult = Self::decode(value)?;
        self.cache_tool_result(name, &result);
        Ok(result)
    }

    /// Calls a tool that may run as a task (§4.6): if the server answers
    /// with a task handle instead of an immediate result, this resolves
    /// once the task reaches a terminal state rather than on the first
    /// round trip.
    pub async fn call_tool_stream(
        &self,
        name: &str,
        arguments: Option<HashMap<String, Value>>,
    ) -> Result<CallToolResult, InspectorError> {
        let params = Self::encode(CallToolRequest {
            name: name.to_string(),
            arguments,
            task: Some(TaskMetadata { ttl: None }),
        });
        let value = self.call("tools/call", params).await?;
        if let Ok(created) = serde_json::from_value::<CreateTaskResult>(value.clone()) {
            let task_id = created.task.task_id;
            let (tx, rx) = oneshot::channel();
            {
                let mut shared = self.shared.write();
                let mut record = TaskRecord::new(task_id.clone(), now_ms(), self.default_poll_interval_ms);
                record.waiters.push(tx);
                shared.tasks.insert(task_id.clone(), record);
            }
            let _ = self.events.send(InspectorEvent::TaskCreated { task_id });
            return rx.await.map_err(|_| InspectorError::connection_closed())?;
        }
        let result: CallToolResult = Self::decode(value)?;
        self.cache_tool_result(name, &result);
        Ok(result)
    }

    fn cache_tool_result(&self, name: &str, result: &CallToolResult) {
        self.shared.write().store_tool_result(
            name.to_string(),
            ToolCacheEntry {
                result: result.clone(),
                is_error: result.is_error.unwrap_or(false),
                timestamp_ms: now_ms(),
            },
        );
    }

    // -- resources --

    pub async fn list_resources(
        &self,
        cursor: Option<String>,
    ) -> Result<ListResourcesResult, InspectorError> {
        let page = self.fetch_resources_page(cursor).await?;
        let mut shared = self.shared.write();
        let templates = shared.resource_templates();
        shared.reconcile_resources(page.resources.clone(), templates);
        drop(shared);
        Ok(page)
    }

    pub async fn list_all_resources(&self) -> Result<Vec<Resource>, InspectorError> {
        let mut cursor = None;
        let mut all = Vec::new();
        loop {
            let page = self.fetch_resources_page(cursor).await?;
            all.extend(page.resources);
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }
        let mut shared = self.shared.write();
        let templates = shared.resource_templates();
        shared.reconcile_resources(all.clone(), templates);
        drop(shared);
        Ok(all)
    }

    async fn fetch_resources_page(
        &self,
        cursor: Option<String>,
    ) -> Result<ListResourcesResult, InspectorError> {
        let params = Self::encode(ListResourcesRequest { cursor });
        let value = self.call("resources/list", params).await?;
        Self::decode(value)
    }

    pub async fn list_resource_templates(
        &self,
        cursor: Option<String>,
    ) -> Result<ListResourceTemplatesResult, InspectorError> {
        let page = self.fetch_resource_templates_page(cursor).await?;
        let mut shared = self.shared.write();
        let resources = shared.resources();
        shared.reconcile_resources(resources, page.resource_templates.clone());
        drop(shared);
        Ok(page)
    }

    pub async fn list_all_resource_templates(&self) -> Result<Vec<ResourceTemplate>, InspectorError> {
        let mut cursor = None;
        let mut all = Vec::new();
        loop {
            let page = self.fetch_resource_templates_page(cursor).await?;
            all.extend(page.resource_templates);
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }
        let mut shared = self.shared.write();
        let resources = shared.resources();
        shared.reconcile_resources(resources, all.clone());
        drop(shared);
        Ok(all)
    }

    async fn fetch_resource_templates_page(
        &self,
        cursor: Option<String>,
    ) -> Result<ListResourceTemplatesResult, InspectorError> {
        let params = Self::encode(ListResourceTemplatesRequest { cursor });
        let value = self.call("resources/templates/list", params).await?;
        Self::decode(value)
    }

    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, InspectorError> {
        if let Some(cached) = self.shared.read().cached_resource(uri) {
            return Ok(cached.result);
        }
        let params = Self::encode(ReadResourceRequest { uri: uri.to_string() });
        let value = self.call("resources/read", params).await?;
        let result: ReadResourceResult = Self::decode(value)?;
        self.shared.write().store_resource(uri.to_string(), result.clone(), now_ms());
        let _ = self.events.send(InspectorEvent::ResourceContentChanged { uri: uri.to_string() });
        Ok(result)
    }

    /// Expands `uri_template`'s `{var}` placeholders with `variables`,
    /// reads the resulting resource, and caches it keyed by the template
    /// pattern rather than the expanded URI (§4.4: templates have their
    /// own cache distinct from concrete resources).
    pub async fn read_resource_from_template(
        &self,
        uri_template: &str,
        variables: &HashMap<String, String>,
    ) -> Result<ReadResourceResult, InspectorError> {
        if let Some(cached) = self.shared.read().cached_template(uri_template) {
            return Ok(cached.result);
        }
        let uri = expand_uri_template(uri_template, variables);
        let params = Self::encode(ReadResourceRequest { uri });
        let value = self.call("resources/read", params).await?;
        let result: ReadResourceResult = Self::decode(value)?;
        self.shared
            .write()
            .store_template(uri_template.to_string(), result.clone(), now_ms());
        Ok(result)
    }

    pub async fn subscribe_to_resource(&self, uri: &str) -> Result<(), InspectorError> {
        let supported = self
            .shared
            .read()
            .server_capabilities()
            .and_then(|c| c.resources)
            .and_then(|r| r.subscribe)
            .unwrap_or(false);
        if !supported {
            return Err(InspectorError::capability_unsupported("resources.subscribe"));
        }
        let params = Self::encode(SubscribeRequest { uri: uri.to_string() });
        self.call("resources/subscribe", params).await?;
        self.shared.write().subscriptions.insert(uri.to_string());
        let _ = self.events.send(InspectorEvent::ResourceSubscriptionsChanged);
        Ok(())
    }

    pub async fn unsubscribe_from_resource(&self, uri: &str) -> Result<(), InspectorError> {
        let params = Self::encode(UnsubscribeRequest { uri: uri.to_string() });
        self.call("resources/unsubscribe", params).await?;
        self.shared.write().subscriptions.remove(uri);
        let _ = self.events.send(InspectorEvent::ResourceSubscriptionsChanged);
        Ok(())
    }

    // -- prompts --

    pub async fn list_prompts(&self, cursor: Option<String>) -> Result<ListPromptsResult, InspectorError> {
        let page = self.fetch_prompts_page(cursor).await?;
        self.shared.write().reconcile_prompts(page.prompts.clone());
        Ok(page)
    }

    pub async fn list_all_prompts(&self) -> Result<Vec<Prompt>, InspectorError> {
        let mut cursor = None;
        let mut all = Vec::new();
        loop {
            let page = self.fetch_prompts_page(cursor).await?;
            all.extend(page.prompts);
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }
        self.shared.write().reconcile_prompts(all.clone());
        Ok(all)
    }

    async fn fetch_prompts_page(&self, cursor: Option<String>) -> Result<ListPromptsResult, InspectorError> {
        let params = Self::encode(ListPromptsRequest { cursor });
        let value = self.call("prompts/list", params).await?;
        Self::decode(value)
    }

    /// Cached only for argument-less fetches: the cache is keyed by prompt
    /// name alone, so a call carrying `arguments` always round-trips.
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<PromptInput>,
    ) -> Result<GetPromptResult, InspectorError> {
        if arguments.is_none() {
            if let Some(cached) = self.shared.read().cached_prompt(name) {
                return Ok(cached);
            }
        }
        let params = Self::encode(GetPromptRequest {
            name: name.to_string(),
            arguments: arguments.clone(),
        });
        let value = self.call("prompts/get", params).await?;
        let result: GetPromptResult = Self::decode(value)?;
        if arguments.is_none() {
            self.shared.write().store_prompt(name.to_string(), result.clone());
        }
        Ok(result)
    }

    // -- completion --

    pub async fn get_completions(
        &self,
        request: CompleteRequestParams,
    ) -> Result<CompleteResult, InspectorError> {
        let empty = || CompleteResult {
            completion: CompletionData { values: Vec::new(), total: Some(0), has_more: Some(false) },
        };
        if self.shared.read().completion_negative.contains(&request) {
            return Ok(empty());
        }
        let params = Self::encode(&request);
        match self.call("completion/complete", params).await {
            Ok(value) => Self::decode(value),
            Err(err) if err.kind == ErrorKind::MethodNotFound => {
                self.shared.write().completion_negative.insert(request);
                Ok(empty())
            }
            Err(err) => Err(err),
        }
    }

    // -- logging --

    pub async fn set_log_level(&self, level: LogLevel) -> Result<(), InspectorError> {
        let supported = self.shared.read().server_capabilities().and_then(|c| c.logging).is_some();
        if !supported {
            return Err(InspectorError::capability_unsupported("logging"));
        }
        let params = Self::encode(SetLevelRequest { level });
        self.call("logging/setLevel", params).await?;
        Ok(())
    }

    // -- tasks --

    pub async fn list_tasks(&self, cursor: Option<String>) -> Result<ListTasksResult, InspectorError> {
        let params = Self::encode(ListTasksRequest { cursor });
        let value = self.call("tasks/list", params).await?;
        Self::decode(value)
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task, InspectorError> {
        let params = Self::encode(GetTaskRequest { task_id: task_id.to_string() });
        let value = self.call("tasks/get", params).await?;
        let result: GetTaskResult = Self::decode(value)?;
        Ok(result.task)
    }

    pub async fn cancel_task(&self, task_id: &str) -> Result<Task, InspectorError> {
        let params = Self::encode(CancelTaskRequest { task_id: task_id.to_string() });
        let value = self.call("tasks/cancel", params).await?;
        let result: CancelTaskResult = Self::decode(value)?;
        Ok(result.task)
    }

    // -- reverse capabilities: answered directly, no actor round trip --

    pub fn respond_to_sample(&self, id: u64, result: CreateMessageResult) -> Result<(), InspectorError> {
        let wire_id = self.take_pending_sample(id)?;
        let value = Self::encode(&result).ok_or_else(|| InspectorError::protocol_encoding("sample result"))?;
        self.send_frame(JsonRpcMessage::Response(JsonRpcResponse::success(wire_id, value)));
        Ok(())
    }

    pub fn cancel_sample(&self, id: u64) -> Result<(), InspectorError> {
        let wire_id = self.take_pending_sample(id)?;
        self.send_frame(JsonRpcMessage::Response(JsonRpcResponse::error(
            wire_id,
            JsonRpcErrorObject::internal("sampling request declined by host"),
        )));
        Ok(())
    }

    fn take_pending_sample(&self, id: u64) -> Result<inspector_types::MessageId, InspectorError> {
        let mut shared = self.shared.write();
        let sample = shared
            .pending_samples
            .iter_mut()
            .find(|s| s.id == id && !s.resolved)
            .ok_or_else(|| InspectorError::invalid_argument("unknown or already-resolved sample"))?;
        sample.resolved = true;
        Ok(sample.wire_id.clone())
    }

    pub fn respond_to_elicitation(&self, id: u64, result: ElicitResult) -> Result<(), InspectorError> {
        let wire_id = self.take_pending_elicitation(id)?;
        let value = Self::encode(&result).ok_or_else(|| InspectorError::protocol_encoding("elicit result"))?;
        self.send_frame(JsonRpcMessage::Response(JsonRpcResponse::success(wire_id, value)));
        Ok(())
    }

    pub fn cancel_elicitation(&self, id: u64) -> Result<(), InspectorError> {
        let wire_id = self.take_pending_elicitation(id)?;
        self.send_frame(JsonRpcMessage::Response(JsonRpcResponse::error(
            wire_id,
            JsonRpcErrorObject::internal("elicitation declined by host"),
        )));
        Ok(())
    }

    fn take_pending_elicitation(&self, id: u64) -> Result<inspector_types::MessageId, InspectorError> {
        let mut shared = self.shared.write();
        let elicitation = shared
            .pending_elicitations
            .iter_mut()
            .find(|e| e.id == id && !e.resolved)
            .ok_or_else(|| InspectorError::invalid_argument("unknown or already-resolved elicitation"))?;
        elicitation.resolved = true;
        Ok(elicitation.wire_id.clone())
    }

    /// Replaces the built-in roots provider's list and announces the
    /// change. Returns an error if a host-supplied [`crate::reverse::RootsProvider`]
    /// is installed instead — it owns its own update path.
    pub fn set_roots(&self, roots: Vec<Root>) -> Result<(), InspectorError> {
        let provider = self.static_roots.as_ref().ok_or_else(|| {
            InspectorError::invalid_argument("a custom roots provider is installed; update it directly")
        })?;
        provider.set(roots);
        self.send_frame(JsonRpcMessage::Notification(JsonRpcNotification {
            jsonrpc: JsonRpcVersion,
            method: "notifications/roots/list_changed".to_string(),
            params: None,
        }));
        Ok(())
    }

    fn send_frame(&self, message: JsonRpcMessage) {
        let Some(handle) = self.handle_slot.read().clone() else { return };
        let payload = serde_json::to_value(&message).unwrap_or(Value::Null);
        let Ok(bytes) = encode(&message) else { return };
        if handle.send(bytes.into()).is_err() {
            return;
        }
        let (method, id) = match &message {
            JsonRpcMessage::Response(r) => (None, Some(r.id.clone())),
            JsonRpcMessage::Notification(n) => (Some(n.method.clone()), None),
            JsonRpcMessage::Request(r) => (Some(r.method.clone()), Some(r.id.clone())),
        };
        self.shared.write().histories.messages.push(MessageEntry {
            direction: MessageDirection::Outbound,
            method,
            id,
            payload,
            timestamp_ms: now_ms(),
        });
    }

    // -- misc --

    pub async fn ping(&self) -> Result<(), InspectorError> {
        self.call("ping", None).await?;
        Ok(())
    }

    // -- synchronous snapshot getters --

    pub fn tools(&self) -> Vec<Tool> {
        self.shared.read().tools()
    }

    pub fn resources(&self) -> Vec<Resource> {
        self.shared.read().resources()
    }

    pub fn resource_templates(&self) -> Vec<ResourceTemplate> {
        self.shared.read().resource_templates()
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.shared.read().prompts()
    }

    pub fn subscriptions(&self) -> Vec<Uri> {
        self.shared.read().subscriptions()
    }

    pub fn pending_samples(&self) -> Vec<PendingSample> {
        self.shared.read().pending_samples()
    }

    pub fn pending_elicitations(&self) -> Vec<PendingElicitation> {
        self.shared.read().pending_elicitations()
    }

    pub fn roots(&self) -> Vec<Root> {
        self.shared.read().roots()
    }

    pub fn task_status(&self, task_id: &str) -> Option<(TaskStatus, Option<String>)> {
        self.shared.read().task(task_id)
    }

    pub fn active_task_ids(&self) -> Vec<String> {
        self.shared.read().active_task_ids()
    }

    pub fn server_capabilities(&self) -> Option<ServerCapabilities> {
        self.shared.read().server_capabilities()
    }

    pub fn server_info(&self) -> Option<Implementation> {
        self.shared.read().server_info()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.read().is_connected()
    }

    pub fn messages(&self) -> Vec<MessageEntry> {
        self.shared.read().messages()
    }

    pub fn stderr_lines(&self) -> Vec<StderrEntry> {
        self.shared.read().stderr_lines()
    }

    pub fn fetch_history(&self) -> Vec<FetchEntry> {
        self.shared.read().fetch_history()
    }
}

fn expand_uri_template(template: &str, variables: &HashMap<String, String>) -> String {
    let mut expanded = template.to_string();
    for (key, value) in variables {
        expanded = expanded.replace(&format!("{{{key}}}"), value);
    }
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_uri_template_substitutes_all_placeholders() {
        let mut vars = HashMap::new();
        vars.insert("owner".to_string(), "octocat".to_string());
        vars.insert("repo".to_string(), "hello-world".to_string());

        let expanded = expand_uri_template("repo://{owner}/{repo}/issues", &vars);

        assert_eq!(expanded, "repo://octocat/hello-world/issues");
    }

    #[test]
    fn expand_uri_template_leaves_unmatched_placeholders_untouched() {
        let vars = HashMap::new();
        let expanded = expand_uri_template("repo://{owner}/issues", &vars);
        assert_eq!(expanded, "repo://{owner}/issues");
    }

    #[test]
    fn expand_uri_template_ignores_extra_variables() {
        let mut vars = HashMap::new();
        vars.insert("owner".to_string(), "octocat".to_string());
        vars.insert("unused".to_string(), "value".to_string());

        let expanded = expand_uri_template("repo://{owner}", &vars);

        assert_eq!(expanded, "repo://octocat");
    }
}
