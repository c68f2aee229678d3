//! Agent side of an ACP connection.
//!
//! # Inbound methods
//!
//! | Method           | Kind         | Routed to                    |
//! |------------------|--------------|------------------------------|
//! | `initialize`     | request      | [`Agent::initialize`]        |
//! | `session/new`    | request      | [`Agent::new_session`]       |
//! | `session/load`   | request      | [`Agent::load_session`] (*)  |
//! | `authenticate`   | request      | [`Agent::authenticate`]      |
//! | `session/prompt` | request      | [`Agent::prompt`]            |
//! | `session/cancel` | notification | [`Agent::cancel`]            |
//!
//! (*) only present in the table when [`Agent::supports_load_session`]
//! returns `true`; otherwise the call fails with `Method not found`.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;

use crate::acp::schema::{
    agent_method, client_method, AuthenticateRequest, CancelNotification, InitializeRequest,
    InitializeResponse, LoadSessionRequest, NewSessionRequest, NewSessionResponse, PromptRequest,
    PromptResponse, ReadTextFileRequest, ReadTextFileResponse, RequestPermissionRequest,
    RequestPermissionResponse, SessionNotification, WriteTextFileRequest,
};
use crate::acp::table::{MethodTable, RoleDispatcher};
use crate::acp::{call, call_unit, notify, AcpFuture, Client};
use crate::config::TransportConfig;
use crate::rpc::connection::Connection;
use crate::rpc::error::RequestError;
use crate::Result;

/// Capability set an agent implements.
///
/// Return a [`RequestError`] to answer with that exact error; anything else
/// can be converted with `?` through `From<AppError>`.
pub trait Agent: Send + Sync + 'static {
    /// Negotiate protocol version and capabilities.
    fn initialize(&self, params: InitializeRequest) -> AcpFuture<'_, InitializeResponse>;

    /// Create a new session.
    fn new_session(&self, params: NewSessionRequest) -> AcpFuture<'_, NewSessionResponse>;

    /// Whether `session/load` is offered. Checked once, when the method
    /// table is built.
    fn supports_load_session(&self) -> bool {
        false
    }

    /// Resume an existing session.
    fn load_session(&self, params: LoadSessionRequest) -> AcpFuture<'_, ()> {
        let _ = params;
        Box::pin(async {
            Err(RequestError::method_not_found(Some(
                agent_method::SESSION_LOAD.to_owned(),
            )))
        })
    }

    /// Authenticate with one of the advertised methods.
    fn authenticate(&self, params: AuthenticateRequest) -> AcpFuture<'_, ()>;

    /// Run one prompt turn.
    fn prompt(&self, params: PromptRequest) -> AcpFuture<'_, PromptResponse>;

    /// Stop the running prompt turn of a session.
    fn cancel(&self, params: CancelNotification) -> AcpFuture<'_, ()>;
}

/// Build the agent-role method table for `agent`.
#[must_use]
pub fn agent_method_table<A: Agent>(agent: &A) -> MethodTable<A> {
    let table = MethodTable::new()
        .route(agent_method::INITIALIZE, |agent: Arc<A>, params: InitializeRequest| async move {
            agent.initialize(params).await
        })
        .route(agent_method::SESSION_NEW, |agent: Arc<A>, params: NewSessionRequest| async move {
            agent.new_session(params).await
        })
        .route(agent_method::AUTHENTICATE, |agent: Arc<A>, params: AuthenticateRequest| async move {
            agent.authenticate(params).await
        })
        .route(agent_method::SESSION_PROMPT, |agent: Arc<A>, params: PromptRequest| async move {
            agent.prompt(params).await
        })
        .route(agent_method::SESSION_CANCEL, |agent: Arc<A>, params: CancelNotification| async move {
            agent.cancel(params).await
        });

    if agent.supports_load_session() {
        table.route(agent_method::SESSION_LOAD, |agent: Arc<A>, params: LoadSessionRequest| async move {
            agent.load_session(params).await
        })
    } else {
        table
    }
}

/// Agent end of a connection; talks to the remote client.
#[derive(Debug, Clone)]
pub struct AgentSideConnection {
    conn: Connection,
}

impl AgentSideConnection {
    /// Connect an agent to a client over `outgoing` / `incoming`.
    ///
    /// `to_agent` receives this connection before any frame is read, so the
    /// agent can keep it for calls back into the client. The returned task
    /// drives the read loop; see [`Connection::serve`].
    pub fn new<A, F, W, R>(
        to_agent: F,
        outgoing: W,
        incoming: R,
        config: TransportConfig,
    ) -> (Self, JoinHandle<Result<()>>)
    where
        A: Agent,
        F: FnOnce(Self) -> A,
        W: AsyncWrite + Unpin + Send + 'static,
        R: AsyncRead + Unpin + Send + 'static,
    {
        let conn = Connection::new(outgoing, config);
        let this = Self { conn: conn.clone() };

        let agent = Arc::new(to_agent(this.clone()));
        let table = agent_method_table(agent.as_ref());
        let io = conn.serve(incoming, Arc::new(RoleDispatcher::new(agent, table)));

        (this, io)
    }

    /// The underlying connection.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Client for AgentSideConnection {
    fn request_permission(
        &self,
        params: RequestPermissionRequest,
    ) -> AcpFuture<'_, RequestPermissionResponse> {
        Box::pin(async move {
            call(&self.conn, client_method::SESSION_REQUEST_PERMISSION, &params)
                .await
                .map_err(RequestError::from)
        })
    }

    /// Stream new content to the client. Completes once queued.
    fn session_update(&self, params: SessionNotification) -> AcpFuture<'_, ()> {
        Box::pin(async move {
            notify(&self.conn, client_method::SESSION_UPDATE, &params).map_err(RequestError::from)
        })
    }

    fn write_text_file(&self, params: WriteTextFileRequest) -> AcpFuture<'_, ()> {
        Box::pin(async move {
            call_unit(&self.conn, client_method::FS_WRITE_TEXT_FILE, &params)
                .await
                .map_err(RequestError::from)
        })
    }

    fn read_text_file(&self, params: ReadTextFileRequest) -> AcpFuture<'_, ReadTextFileResponse> {
        Box::pin(async move {
            call(&self.conn, client_method::FS_READ_TEXT_FILE, &params)
                .await
                .map_err(RequestError::from)
        })
    }
}
