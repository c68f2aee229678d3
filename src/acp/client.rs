//! Client side of an ACP connection.
//!
//! # Inbound methods
//!
//! | Method                       | Kind         | Routed to                       |
//! |------------------------------|--------------|---------------------------------|
//! | `session/update`             | notification | [`Client::session_update`]      |
//! | `session/request_permission` | request      | [`Client::request_permission`]  |
//! | `fs/read_text_file`          | request      | [`Client::read_text_file`]      |
//! | `fs/write_text_file`         | request      | [`Client::write_text_file`]     |

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
use crate::acp::{call, call_unit, notify, AcpFuture, Agent};
use crate::config::TransportConfig;
use crate::rpc::connection::Connection;
use crate::rpc::error::RequestError;
use crate::Result;

/// Capability set a client (editor) implements.
pub trait Client: Send + Sync + 'static {
    /// Ask the user whether a tool call may run.
    fn request_permission(
        &self,
        params: RequestPermissionRequest,
    ) -> AcpFuture<'_, RequestPermissionResponse>;

    /// Receive streamed session progress.
    fn session_update(&self, params: SessionNotification) -> AcpFuture<'_, ()>;

    /// Write a text file on the agent's behalf.
    fn write_text_file(&self, params: WriteTextFileRequest) -> AcpFuture<'_, ()>;

    /// Read a text file on the agent's behalf.
    fn read_text_file(&self, params: ReadTextFileRequest) -> AcpFuture<'_, ReadTextFileResponse>;
}

/// Build the client-role method table.
#[must_use]
pub fn client_method_table<C: Client>() -> MethodTable<C> {
    MethodTable::new()
        .route(
            client_method::SESSION_UPDATE,
            |client: Arc<C>, params: SessionNotification| async move {
                client.session_update(params).await
            },
        )
        .route(
            client_method::SESSION_REQUEST_PERMISSION,
            |client: Arc<C>, params: RequestPermissionRequest| async move {
                client.request_permission(params).await
            },
        )
        .route(
            client_method::FS_READ_TEXT_FILE,
            |client: Arc<C>, params: ReadTextFileRequest| async move {
                client.read_text_file(params).await
            },
        )
        .route(
            client_method::FS_WRITE_TEXT_FILE,
            |client: Arc<C>, params: WriteTextFileRequest| async move {
                client.write_text_file(params).await
            },
        )
}

/// Client end of a connection; talks to the remote agent.
#[derive(Debug, Clone)]
pub struct ClientSideConnection {
    conn: Connection,
}

impl ClientSideConnection {
    /// Connect a client to an agent over `outgoing` / `incoming`.
    ///
    /// `to_client` receives this connection before any frame is read. The
    /// returned task drives the read loop; see [`Connection::serve`].
    pub fn new<C, F, W, R>(
        to_client: F,
        outgoing: W,
        incoming: R,
        config: TransportConfig,
    ) -> (Self, JoinHandle<Result<()>>)
    where
        C: Client,
        F: FnOnce(Self) -> C,
        W: AsyncWrite + Unpin + Send + 'static,
        R: AsyncRead + Unpin + Send + 'static,
    {
        let conn = Connection::new(outgoing, config);
        let this = Self { conn: conn.clone() };

        let client = Arc::new(to_client(this.clone()));
        let io = conn.serve(
            incoming,
            Arc::new(RoleDispatcher::new(client, client_method_table())),
        );

        (this, io)
    }

    /// The underlying connection.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Agent for ClientSideConnection {
    fn initialize(&self, params: InitializeRequest) -> AcpFuture<'_, InitializeResponse> {
        Box::pin(async move {
            call(&self.conn, agent_method::INITIALIZE, &params)
                .await
                .map_err(RequestError::from)
        })
    }

    fn new_session(&self, params: NewSessionRequest) -> AcpFuture<'_, NewSessionResponse> {
        Box::pin(async move {
            call(&self.conn, agent_method::SESSION_NEW, &params)
                .await
                .map_err(RequestError::from)
        })
    }

    /// The remote agent decides; an agent without support answers
    /// `Method not found`.
    fn supports_load_session(&self) -> bool {
        true
    }

    fn load_session(&self, params: LoadSessionRequest) -> AcpFuture<'_, ()> {
        Box::pin(async move {
            call_unit(&self.conn, agent_method::SESSION_LOAD, &params)
                .await
                .map_err(RequestError::from)
        })
    }

    fn authenticate(&self, params: AuthenticateRequest) -> AcpFuture<'_, ()> {
        Box::pin(async move {
            call_unit(&self.conn, agent_method::AUTHENTICATE, &params)
                .await
                .map_err(RequestError::from)
        })
    }

    fn prompt(&self, params: PromptRequest) -> AcpFuture<'_, PromptResponse> {
        Box::pin(async move {
            call(&self.conn, agent_method::SESSION_PROMPT, &params)
                .await
                .map_err(RequestError::from)
        })
    }

    /// Completes once queued.
    fn cancel(&self, params: CancelNotification) -> AcpFuture<'_, ()> {
        Box::pin(async move {
            notify(&self.conn, agent_method::SESSION_CANCEL, &params).map_err(RequestError::from)
        })
    }
}
