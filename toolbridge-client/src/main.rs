//! toolbridge - bridge client for the agent operator console
//!
//! Connects to the console backend, serves the script panel's tool and logs
//! what the agent reports until interrupted.

use toolbridge_client::{
    load_config, load_config_from, BridgeSession, ConnectionState, ScriptPanel,
};
use toolbridge_utils::{init_logging_with_config, Result};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    init_logging_with_config(args.log_config())?;
    tracing::info!("toolbridge starting");
    tracing::debug!("CLI args: {:?}", args);

    match run_app(args).await {
        Ok(()) => {
            tracing::info!("toolbridge exiting normally");
            Ok(())
        }
        Err(e) => {
            tracing::error!("toolbridge error: {}", e);
            Err(e)
        }
    }
}

async fn run_app(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config(),
    };
    args.apply(&mut config);

    let mut session = BridgeSession::new(config)?;
    let mut panel = ScriptPanel::new();
    panel.mount(session.registry())?;

    session.connect().await?;
    tracing::info!(endpoint = %session.endpoint(), tools = ?session.registry().names(), "Serving tools");

    let finished = session.finished();
    let mut connection = session.subscribe_connection();
    let mut status = session.state().subscribe_agent_status();
    let mut memory = session.state().subscribe_memory();
    let mut tools = session.state().subscribe_tools_version();
    let mut script = panel.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
            _ = finished.cancelled() => {
                tracing::warn!("Bridge closed");
                break;
            }
            Ok(()) = connection.changed() => {
                let state = *connection.borrow_and_update();
                match state {
                    ConnectionState::Open => tracing::info!("Bridge open"),
                    other => tracing::info!(state = %other, "Bridge state changed"),
                }
            }
            Ok(()) = status.changed() => {
                let current = status.borrow_and_update().clone();
                tracing::info!(state = %current.state, details = ?current.details, "Agent status");
            }
            Ok(()) = memory.changed() => {
                let messages = memory
                    .borrow_and_update()
                    .as_ref()
                    .and_then(|m| m.get("messages"))
                    .and_then(|m| m.as_array())
                    .map(Vec::len);
                tracing::info!(?messages, "Transcript updated");
            }
            Ok(()) = tools.changed() => {
                let version = *tools.borrow_and_update();
                tracing::info!(version, "Backend tools changed");
            }
            Ok(()) = script.changed() => {
                let code = script.borrow_and_update().code.clone();
                tracing::info!(len = code.len(), "Script updated");
                println!("{}", code);
            }
        }
    }

    panel.unmount();
    session.teardown().await;
    Ok(())
}
