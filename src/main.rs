#![forbid(unsafe_code)]

//! `acp-echo-agent` — minimal ACP agent served over stdio.
//!
//! Echoes every text block of a prompt back to the client as agent message
//! chunks. Useful for exercising an editor's ACP integration end to end.
//! Logs go to stderr; stdout carries the protocol.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use acp_wire::acp::schema::{
    AgentCapabilities, AuthenticateRequest, CancelNotification, ContentBlock, InitializeRequest,
    InitializeResponse, NewSessionRequest, NewSessionResponse, PromptRequest, PromptResponse,
    SessionId, SessionNotification, SessionUpdate, StopReason, PROTOCOL_VERSION,
};
use acp_wire::acp::{AcpFuture, Agent, AgentSideConnection, Client};
use acp_wire::{AppError, RequestError, Result, TransportConfig};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "acp-echo-agent", about = "Echo agent over ACP stdio", version, long_about = None)]
struct Cli {
    /// Path to an optional TOML transport configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    let config = match &args.config {
        Some(path) => TransportConfig::load_from_path(path)?,
        None => TransportConfig::default(),
    };
    info!(?config, "acp-echo-agent bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Io(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(config))
}

async fn run(config: TransportConfig) -> Result<()> {
    let (_conn, io) = AgentSideConnection::new(
        EchoAgent::new,
        tokio::io::stdout(),
        tokio::io::stdin(),
        config,
    );

    io.await
        .map_err(|err| AppError::Io(format!("read loop task failed: {err}")))??;
    info!("client disconnected; shutting down");
    Ok(())
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}

// ── Echo agent ────────────────────────────────────────────────────────────────

/// Agent that streams each prompt text block back to the client.
struct EchoAgent {
    client: AgentSideConnection,
    /// Cancellation token of the turn currently running in each session.
    turns: Mutex<HashMap<SessionId, CancellationToken>>,
}

impl EchoAgent {
    fn new(client: AgentSideConnection) -> Self {
        Self {
            client,
            turns: Mutex::new(HashMap::new()),
        }
    }
}

impl Agent for EchoAgent {
    fn initialize(&self, params: InitializeRequest) -> AcpFuture<'_, InitializeResponse> {
        Box::pin(async move {
            debug!(client_version = params.protocol_version, "echo agent: initialize");
            Ok(InitializeResponse {
                protocol_version: PROTOCOL_VERSION.min(params.protocol_version),
                agent_capabilities: AgentCapabilities::default(),
                auth_methods: Vec::new(),
            })
        })
    }

    fn new_session(&self, params: NewSessionRequest) -> AcpFuture<'_, NewSessionResponse> {
        Box::pin(async move {
            let session_id = SessionId(uuid::Uuid::new_v4().to_string());
            self.turns
                .lock()
                .await
                .insert(session_id.clone(), CancellationToken::new());
            info!(%session_id, cwd = %params.cwd.display(), "echo agent: session created");
            Ok(NewSessionResponse { session_id })
        })
    }

    fn authenticate(&self, params: AuthenticateRequest) -> AcpFuture<'_, ()> {
        Box::pin(async move {
            Err(RequestError::auth_required(Some(format!(
                "unknown auth method `{}`",
                params.method_id
            ))))
        })
    }

    fn prompt(&self, params: PromptRequest) -> AcpFuture<'_, PromptResponse> {
        Box::pin(async move {
            let turn = CancellationToken::new();
            {
                let mut turns = self.turns.lock().await;
                let Some(slot) = turns.get_mut(&params.session_id) else {
                    return Err(RequestError::invalid_params(Some(format!(
                        "unknown session `{}`",
                        params.session_id
                    ))));
                };
                *slot = turn.clone();
            }

            for block in params.prompt {
                if turn.is_cancelled() {
                    return Ok(PromptResponse {
                        stop_reason: StopReason::Cancelled,
                    });
                }
                if let ContentBlock::Text(_) = &block {
                    self.client
                        .session_update(SessionNotification {
                            session_id: params.session_id.clone(),
                            update: SessionUpdate::AgentMessageChunk { content: block },
                        })
                        .await?;
                }
            }

            let stop_reason = if turn.is_cancelled() {
                StopReason::Cancelled
            } else {
                StopReason::EndTurn
            };
            Ok(PromptResponse { stop_reason })
        })
    }

    fn cancel(&self, params: CancelNotification) -> AcpFuture<'_, ()> {
        Box::pin(async move {
            if let Some(turn) = self.turns.lock().await.get(&params.session_id) {
                turn.cancel();
                debug!(session_id = %params.session_id, "echo agent: turn cancelled");
            }
            Ok(())
        })
    }
}
