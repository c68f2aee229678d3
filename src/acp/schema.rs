//! ACP method names and parameter / result types.
//!
//! Field names are camelCase on the wire. Every request parameter type
//! implements [`Params`], which lists the fields that must be present so
//! validation can report all of the missing ones in a single error.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version this crate speaks.
pub const PROTOCOL_VERSION: u16 = 1;

/// Methods the agent side accepts.
pub mod agent_method {
    /// `initialize` request.
    pub const INITIALIZE: &str = "initialize";
    /// `session/new` request.
    pub const SESSION_NEW: &str = "session/new";
    /// `session/load` request; only routed when the agent supports it.
    pub const SESSION_LOAD: &str = "session/load";
    /// `authenticate` request.
    pub const AUTHENTICATE: &str = "authenticate";
    /// `session/prompt` request.
    pub const SESSION_PROMPT: &str = "session/prompt";
    /// `session/cancel` notification.
    pub const SESSION_CANCEL: &str = "session/cancel";
}

/// Methods the client side accepts.
pub mod client_method {
    /// `session/update` notification.
    pub const SESSION_UPDATE: &str = "session/update";
    /// `session/request_permission` request.
    pub const SESSION_REQUEST_PERMISSION: &str = "session/request_permission";
    /// `fs/read_text_file` request.
    pub const FS_READ_TEXT_FILE: &str = "fs/read_text_file";
    /// `fs/write_text_file` request.
    pub const FS_WRITE_TEXT_FILE: &str = "fs/write_text_file";
}

/// Inbound parameter type with a known set of required fields.
pub trait Params: DeserializeOwned {
    /// Wire names of the fields that must be present.
    const REQUIRED: &'static [&'static str];
}

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Capabilities ──────────────────────────────────────────────────────────────

/// File-system operations the client offers to the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemCapability {
    /// Client answers `fs/read_text_file`.
    #[serde(default)]
    pub read_text_file: bool,
    /// Client answers `fs/write_text_file`.
    #[serde(default)]
    pub write_text_file: bool,
}

/// Capabilities advertised by the client in `initialize`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCapabilities {
    /// File-system access.
    #[serde(default)]
    pub fs: FileSystemCapability,
}

/// Content kinds the agent accepts in prompts beyond plain text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptCapabilities {
    /// Image blocks.
    #[serde(default)]
    pub image: bool,
    /// Audio blocks.
    #[serde(default)]
    pub audio: bool,
    /// Embedded resource blocks.
    #[serde(default)]
    pub embedded_context: bool,
}

/// Capabilities advertised by the agent in its `initialize` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Agent answers `session/load`.
    #[serde(default)]
    pub load_session: bool,
    /// Prompt content support.
    #[serde(default)]
    pub prompt_capabilities: PromptCapabilities,
}

/// An authentication method the agent supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthMethod {
    /// Identifier passed back in `authenticate`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ── initialize ────────────────────────────────────────────────────────────────

/// `initialize` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    /// Latest protocol version the client supports.
    pub protocol_version: u16,
    /// Client capabilities.
    #[serde(default)]
    pub client_capabilities: ClientCapabilities,
}

impl Params for InitializeRequest {
    const REQUIRED: &'static [&'static str] = &["protocolVersion"];
}

/// `initialize` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResponse {
    /// Negotiated protocol version.
    pub protocol_version: u16,
    /// Agent capabilities.
    #[serde(default)]
    pub agent_capabilities: AgentCapabilities,
    /// Supported authentication methods.
    #[serde(default)]
    pub auth_methods: Vec<AuthMethod>,
}

// ── sessions ──────────────────────────────────────────────────────────────────

/// Environment variable passed to an MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVariable {
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: String,
}

/// An MCP server the agent should connect to for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServer {
    /// Display name.
    pub name: String,
    /// Executable to launch.
    pub command: PathBuf,
    /// Command-line arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment for the process.
    #[serde(default)]
    pub env: Vec<EnvVariable>,
}

/// `session/new` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionRequest {
    /// Working directory for the session.
    pub cwd: PathBuf,
    /// MCP servers to attach.
    pub mcp_servers: Vec<McpServer>,
}

impl Params for NewSessionRequest {
    const REQUIRED: &'static [&'static str] = &["cwd", "mcpServers"];
}

/// `session/new` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionResponse {
    /// Identifier of the created session.
    pub session_id: SessionId,
}

/// `session/load` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSessionRequest {
    /// Session to resume.
    pub session_id: SessionId,
    /// Working directory for the session.
    pub cwd: PathBuf,
    /// MCP servers to attach.
    pub mcp_servers: Vec<McpServer>,
}

impl Params for LoadSessionRequest {
    const REQUIRED: &'static [&'static str] = &["sessionId", "cwd", "mcpServers"];
}

/// `authenticate` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest {
    /// One of the ids advertised in [`InitializeResponse::auth_methods`].
    pub method_id: String,
}

impl Params for AuthenticateRequest {
    const REQUIRED: &'static [&'static str] = &["methodId"];
}

// ── prompt ────────────────────────────────────────────────────────────────────

/// Plain text content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    /// The text.
    pub text: String,
}

/// Base64-encoded binary content (image or audio).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryContent {
    /// Base64 payload.
    pub data: String,
    /// MIME type of the payload.
    pub mime_type: String,
}

/// Link to a resource the agent can fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLink {
    /// Resource URI.
    pub uri: String,
    /// Display name.
    pub name: String,
    /// MIME type, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Embedded resource contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedResource {
    /// Resource body, passed through untouched.
    pub resource: Value,
}

/// One block of prompt or message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text.
    Text(TextContent),
    /// Image.
    Image(BinaryContent),
    /// Audio.
    Audio(BinaryContent),
    /// Resource link.
    ResourceLink(ResourceLink),
    /// Embedded resource.
    Resource(EmbeddedResource),
}

impl ContentBlock {
    /// Shorthand for a text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextContent { text: text.into() })
    }
}

/// `session/prompt` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRequest {
    /// Target session.
    pub session_id: SessionId,
    /// User prompt content.
    pub prompt: Vec<ContentBlock>,
}

impl Params for PromptRequest {
    const REQUIRED: &'static [&'static str] = &["sessionId", "prompt"];
}

/// Why the agent stopped processing a prompt turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The turn finished normally.
    EndTurn,
    /// Token limit reached.
    MaxTokens,
    /// Model request limit for the turn reached.
    MaxTurnRequests,
    /// The agent refused to continue.
    Refusal,
    /// The client cancelled the turn.
    Cancelled,
}

/// `session/prompt` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptResponse {
    /// Why the turn ended.
    pub stop_reason: StopReason,
}

/// `session/cancel` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelNotification {
    /// Session whose turn should stop.
    pub session_id: SessionId,
}

impl Params for CancelNotification {
    const REQUIRED: &'static [&'static str] = &["sessionId"];
}

// ── session updates ───────────────────────────────────────────────────────────

/// Category of a tool call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Reading files or data.
    Read,
    /// Modifying files or content.
    Edit,
    /// Removing files or data.
    Delete,
    /// Moving or renaming files.
    Move,
    /// Searching for information.
    Search,
    /// Running commands or code.
    Execute,
    /// Internal reasoning.
    Think,
    /// Retrieving external data.
    Fetch,
    /// Anything else.
    #[default]
    Other,
}

/// Execution state of a tool call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    /// Not started yet.
    #[default]
    Pending,
    /// Running.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

/// File location a tool call is working on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallLocation {
    /// File path.
    pub path: PathBuf,
    /// Line number, when relevant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

/// A new tool call reported by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    /// Identifier unique within the session.
    pub tool_call_id: String,
    /// Human-readable title.
    pub title: String,
    /// Category.
    #[serde(default)]
    pub kind: ToolKind,
    /// Execution state.
    #[serde(default)]
    pub status: ToolCallStatus,
    /// Produced content, passed through untouched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Value>,
    /// Affected file locations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ToolCallLocation>,
    /// Raw tool input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_input: Option<Value>,
}

/// Partial update to an existing tool call. Absent fields are unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallUpdate {
    /// Tool call being updated.
    pub tool_call_id: String,
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ToolKind>,
    /// New state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ToolCallStatus>,
    /// Replacement content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Value>>,
    /// Replacement locations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<ToolCallLocation>>,
    /// Raw tool input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_input: Option<Value>,
}

/// Priority of a plan entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanEntryPriority {
    /// High.
    High,
    /// Medium.
    Medium,
    /// Low.
    Low,
}

/// State of a plan entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanEntryStatus {
    /// Not started.
    Pending,
    /// Being worked on.
    InProgress,
    /// Done.
    Completed,
}

/// One step of the agent's plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Description of the step.
    pub content: String,
    /// Priority.
    pub priority: PlanEntryPriority,
    /// State.
    pub status: PlanEntryStatus,
}

/// The agent's current plan, sent in full on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan steps in order.
    pub entries: Vec<PlanEntry>,
}

/// Progress streamed from agent to client during a prompt turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sessionUpdate", rename_all = "snake_case")]
pub enum SessionUpdate {
    /// Echo of user content (e.g. while replaying a loaded session).
    UserMessageChunk {
        /// Content chunk.
        content: ContentBlock,
    },
    /// Agent output.
    AgentMessageChunk {
        /// Content chunk.
        content: ContentBlock,
    },
    /// Agent reasoning.
    AgentThoughtChunk {
        /// Content chunk.
        content: ContentBlock,
    },
    /// A new tool call.
    ToolCall(ToolCall),
    /// Change to an existing tool call.
    ToolCallUpdate(ToolCallUpdate),
    /// Updated plan.
    Plan(Plan),
}

/// `session/update` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionNotification {
    /// Session the update belongs to.
    pub session_id: SessionId,
    /// The update.
    pub update: SessionUpdate,
}

impl Params for SessionNotification {
    const REQUIRED: &'static [&'static str] = &["sessionId", "update"];
}

// ── permissions ───────────────────────────────────────────────────────────────

/// How broadly a permission option applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionOptionKind {
    /// Allow this call only.
    AllowOnce,
    /// Allow this and future calls of the same kind.
    AllowAlways,
    /// Reject this call only.
    RejectOnce,
    /// Reject this and future calls of the same kind.
    RejectAlways,
}

/// One choice offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionOption {
    /// Identifier returned when chosen.
    pub option_id: String,
    /// Label shown to the user.
    pub name: String,
    /// Scope of the choice.
    pub kind: PermissionOptionKind,
}

/// `session/request_permission` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPermissionRequest {
    /// Session the tool call belongs to.
    pub session_id: SessionId,
    /// The tool call needing permission.
    pub tool_call: ToolCallUpdate,
    /// Choices to present.
    pub options: Vec<PermissionOption>,
}

impl Params for RequestPermissionRequest {
    const REQUIRED: &'static [&'static str] = &["sessionId", "toolCall", "options"];
}

/// The user's answer to a permission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RequestPermissionOutcome {
    /// The prompt turn was cancelled before the user answered.
    Cancelled,
    /// The user picked an option.
    #[serde(rename_all = "camelCase")]
    Selected {
        /// The chosen [`PermissionOption::option_id`].
        option_id: String,
    },
}

/// `session/request_permission` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPermissionResponse {
    /// The answer.
    pub outcome: RequestPermissionOutcome,
}

// ── file system ───────────────────────────────────────────────────────────────

/// `fs/read_text_file` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadTextFileRequest {
    /// Requesting session.
    pub session_id: SessionId,
    /// Absolute file path.
    pub path: PathBuf,
    /// 1-based first line to read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Maximum number of lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl Params for ReadTextFileRequest {
    const REQUIRED: &'static [&'static str] = &["sessionId", "path"];
}

/// `fs/read_text_file` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadTextFileResponse {
    /// File contents.
    pub content: String,
}

/// `fs/write_text_file` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteTextFileRequest {
    /// Requesting session.
    pub session_id: SessionId,
    /// Absolute file path.
    pub path: PathBuf,
    /// Full new contents.
    pub content: String,
}

impl Params for WriteTextFileRequest {
    const REQUIRED: &'static [&'static str] = &["sessionId", "path", "content"];
}
