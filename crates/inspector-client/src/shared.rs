//! The synchronous session snapshot (§4.4, §5).
//!
//! Everything a host can read without sending a frame lives here, behind one
//! `parking_lot::RwLock` that is never held across an `.await`. The actor is
//! the only writer; [`crate::InspectorClient`]'s getters are the readers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use inspector_protocol::types::{
    CallToolResult, CompleteRequestParams, GetPromptResult, Implementation, Prompt,
    ReadResourceResult, Resource, ResourceTemplate, ServerCapabilities, Tool, Uri,
};

use crate::event::{FetchEntry, MessageEntry, StderrEntry};
use crate::history::Histories;
use crate::reverse::{PendingElicitation, PendingSample, RootsProvider};
use crate::tasks::TaskRecord;

#[derive(Debug, Clone)]
pub struct ToolCacheEntry {
    pub result: CallToolResult,
    pub is_error: bool,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone)]
pub struct TimestampedResource {
    pub result: ReadResourceResult,
    pub timestamp_ms: u64,
}

pub struct Shared {
    pub(crate) connected: bool,
    pub(crate) server_capabilities: Option<ServerCapabilities>,
    pub(crate) server_info: Option<Implementation>,

    pub(crate) tools: Vec<Tool>,
    pub(crate) resources: Vec<Resource>,
    pub(crate) resource_templates: Vec<ResourceTemplate>,
    pub(crate) prompts: Vec<Prompt>,

    resource_cache: HashMap<Uri, TimestampedResource>,
    template_cache: HashMap<String, TimestampedResource>,
    prompt_cache: HashMap<String, GetPromptResult>,
    tool_cache: HashMap<String, ToolCacheEntry>,

    pub(crate) subscriptions: HashSet<Uri>,
    pub(crate) completion_negative: HashSet<CompleteRequestParams>,

    pub(crate) pending_samples: Vec<PendingSample>,
    pub(crate) pending_elicitations: Vec<PendingElicitation>,
    pub(crate) next_pending_id: u64,

    pub(crate) roots_provider: Arc<dyn RootsProvider>,
    pub(crate) tasks: HashMap<String, TaskRecord>,

    pub(crate) histories: Histories,
}

impl Shared {
    pub(crate) fn new(roots_provider: Arc<dyn RootsProvider>, histories: Histories) -> Self {
        Self {
            connected: false,
            server_capabilities: None,
            server_info: None,
            tools: Vec::new(),
            resources: Vec::new(),
            resource_templates: Vec::new(),
            prompts: Vec::new(),
            resource_cache: HashMap::new(),
            template_cache: HashMap::new(),
            prompt_cache: HashMap::new(),
            tool_cache: HashMap::new(),
            subscriptions: HashSet::new(),
            completion_negative: HashSet::new(),
            pending_samples: Vec::new(),
            pending_elicitations: Vec::new(),
            next_pending_id: 1,
            roots_provider,
            tasks: HashMap::new(),
            histories,
        }
    }

    // -- catalog reconciliation (§4.4: "set difference old keys - new keys") --

    pub(crate) fn reconcile_tools(&mut self, new: Vec<Tool>) {
        let new_keys: HashSet<&str> = new.iter().map(|t| t.name.as_str()).collect();
        self.tool_cache.retain(|name, _| new_keys.contains(name.as_str()));
        self.tools = new;
    }

    pub(crate) fn reconcile_resources(
        &mut self,
        resources: Vec<Resource>,
        templates: Vec<ResourceTemplate>,
    ) {
        let new_uris: HashSet<&str> = resources.iter().map(|r| r.uri.as_str()).collect();
        self.resource_cache.retain(|uri, _| new_uris.contains(uri.as_str()));
        let new_templates: HashSet<&str> =
            templates.iter().map(|t| t.uri_template.as_str()).collect();
        self.template_cache.retain(|key, _| new_templates.contains(key.as_str()));
        self.resources = resources;
        self.resource_templates = templates;
    }

    pub(crate) fn reconcile_prompts(&mut self, new: Vec<Prompt>) {
        let new_keys: HashSet<&str> = new.iter().map(|p| p.name.as_str()).collect();
        self.prompt_cache.retain(|name, _| new_keys.contains(name.as_str()));
        self.prompts = new;
    }

    // -- content cache writes (§4.4) --

    pub(crate) fn store_resource(&mut self, uri: Uri, result: ReadResourceResult, now_ms: u64) {
        self.resource_cache.insert(uri, TimestampedResource { result, timestamp_ms: now_ms });
    }

    pub(crate) fn invalidate_resource(&mut self, uri: &str) {
        self.resource_cache.remove(uri);
    }

    pub(crate) fn store_template(&mut self, pattern: String, result: ReadResourceResult, now_ms: u64) {
        self.template_cache.insert(pattern, TimestampedResource { result, timestamp_ms: now_ms });
    }

    pub(crate) fn store_prompt(&mut self, name: String, result: GetPromptResult) {
        self.prompt_cache.insert(name, result);
    }

    pub(crate) fn store_tool_result(&mut self, name: String, entry: ToolCacheEntry) {
        self.tool_cache.insert(name, entry);
    }

    // -- snapshot getters, synchronous and non-suspending (§5) --

    pub fn tools(&self) -> Vec<Tool> {
        self.tools.clone()
    }

    pub fn resources(&self) -> Vec<Resource> {
        self.resources.clone()
    }

    pub fn resource_templates(&self) -> Vec<ResourceTemplate> {
        self.resource_templates.clone()
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.clone()
    }

    pub fn cached_resource(&self, uri: &str) -> Option<TimestampedResource> {
        self.resource_cache.get(uri).cloned()
    }

    pub fn cached_template(&self, pattern: &str) -> Option<TimestampedResource> {
        self.template_cache.get(pattern).cloned()
    }

    pub fn cached_prompt(&self, name: &str) -> Option<GetPromptResult> {
        self.prompt_cache.get(name).cloned()
    }

    pub fn cached_tool_result(&self, name: &str) -> Option<ToolCacheEntry> {
        self.tool_cache.get(name).cloned()
    }

    pub fn subscriptions(&self) -> Vec<Uri> {
        self.subscriptions.iter().cloned().collect()
    }

    pub fn pending_samples(&self) -> Vec<PendingSample> {
        self.pending_samples.clone()
    }

    pub fn pending_elicitations(&self) -> Vec<PendingElicitation> {
        self.pending_elicitations.clone()
    }

    pub fn roots(&self) -> Vec<inspector_protocol::types::Root> {
        self.roots_provider.list()
    }

    pub fn task(&self, task_id: &str) -> Option<(
        inspector_protocol::types::TaskStatus,
        Option<String>,
    )> {
        self.tasks.get(task_id).map(|t| (t.status, t.status_message.clone()))
    }

    pub fn active_task_ids(&self) -> Vec<String> {
        self.tasks
            .values()
            .filter(|t| t.status.is_active())
            .map(|t| t.task_id.clone())
            .collect()
    }

    pub fn server_capabilities(&self) -> Option<ServerCapabilities> {
        self.server_capabilities.clone()
    }

    pub fn server_info(&self) -> Option<Implementation> {
        self.server_info.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn messages(&self) -> Vec<MessageEntry> {
        self.histories.messages.to_vec()
    }

    pub fn stderr_lines(&self) -> Vec<StderrEntry> {
        self.histories.stderr.to_vec()
    }

    pub fn fetch_history(&self) -> Vec<FetchEntry> {
        self.histories.fetch.to_vec()
    }

    // -- disconnect (§5): clear everything except history --

    pub(crate) fn clear_session_state(&mut self) {
        self.connected = false;
        self.server_capabilities = None;
        self.server_info = None;
        self.tools.clear();
        self.resources.clear();
        self.resource_templates.clear();
        self.prompts.clear();
        self.resource_cache.clear();
        self.template_cache.clear();
        self.prompt_cache.clear();
        self.tool_cache.clear();
        self.subscriptions.clear();
        self.completion_negative.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Histories;
    use crate::reverse::StaticRootsProvider;
    use inspector_protocol::types::ToolInputSchema;

    fn shared() -> Shared {
        Shared::new(Arc::new(StaticRootsProvider::new(Vec::new())), Histories::new(16, 16, 16))
    }

    fn tool(name: &str) -> Tool {
        Tool {
            name: name.to_string(),
            title: None,
            description: None,
            input_schema: ToolInputSchema::default(),
            output_schema: None,
            annotations: None,
            task_support: None,
        }
    }

    fn resource(uri: &str) -> Resource {
        Resource {
            name: uri.to_string(),
            title: None,
            uri: uri.to_string(),
            description: None,
            mime_type: None,
            annotations: None,
            size: None,
        }
    }

    fn tool_entry() -> ToolCacheEntry {
        ToolCacheEntry {
            result: CallToolResult { content: Vec::new(), is_error: None, structured_content: None },
            is_error: false,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn reconcile_tools_evicts_cache_entries_for_removed_tools() {
        let mut shared = shared();
        shared.reconcile_tools(vec![tool("a"), tool("b")]);
        shared.store_tool_result("a".into(), tool_entry());
        shared.store_tool_result("b".into(), tool_entry());

        shared.reconcile_tools(vec![tool("a")]);

        assert!(shared.cached_tool_result("a").is_some());
        assert!(shared.cached_tool_result("b").is_none());
        assert_eq!(shared.tools().len(), 1);
    }

    #[test]
    fn reconcile_tools_keeps_cache_for_surviving_tools() {
        let mut shared = shared();
        shared.reconcile_tools(vec![tool("a")]);
        shared.store_tool_result("a".into(), tool_entry());

        shared.reconcile_tools(vec![tool("a"), tool("b")]);

        assert!(shared.cached_tool_result("a").is_some());
        assert_eq!(shared.tools().len(), 2);
    }

    #[test]
    fn reconcile_resources_evicts_both_halves_independently() {
        let mut shared = shared();
        shared.reconcile_resources(vec![resource("file:///a"), resource("file:///b")], Vec::new());
        shared.store_resource(
            "file:///a".into(),
            ReadResourceResult { contents: Vec::new() },
            0,
        );
        shared.store_resource(
            "file:///b".into(),
            ReadResourceResult { contents: Vec::new() },
            0,
        );

        shared.reconcile_resources(vec![resource("file:///a")], Vec::new());

        assert!(shared.cached_resource("file:///a").is_some());
        assert!(shared.cached_resource("file:///b").is_none());
        assert_eq!(shared.resources().len(), 1);
    }

    #[test]
    fn active_task_ids_excludes_terminal_tasks() {
        use crate::tasks::TaskRecord;
        use inspector_protocol::types::TaskStatus;

        let mut shared = shared();
        let mut working = TaskRecord::new("t1".into(), 0, 1000);
        working.transition(TaskStatus::Working, None, 0);
        let mut done = TaskRecord::new("t2".into(), 0, 1000);
        done.transition(TaskStatus::Completed, None, 0);
        shared.tasks.insert("t1".into(), working);
        shared.tasks.insert("t2".into(), done);

        let active = shared.active_task_ids();
        assert_eq!(active, vec!["t1".to_string()]);
    }

    #[test]
    fn clear_session_state_drops_catalogs_but_keeps_history() {
        let mut shared = shared();
        shared.reconcile_tools(vec![tool("a")]);
        shared.connected = true;
        shared.histories.messages.push(MessageEntry {
            direction: crate::event::MessageDirection::Outbound,
            method: Some("ping".into()),
            id: None,
            payload: serde_json::Value::Null,
            timestamp_ms: 0,
        });

        shared.clear_session_state();

        assert!(!shared.is_connected());
        assert!(shared.tools().is_empty());
        assert_eq!(shared.messages().len(), 1);
    }
}
