//! Command-line interface.
//!
//! ```text
//! opsbot serve [--host H] [--port P] [--db-path F]
//! opsbot repl  [-m MESSAGE] [--user U] [--db-path F]
//! opsbot doctor
//! ```

mod doctor;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

pub use self::doctor::run_doctor_command;

use crate::agent::Dispatcher;
use crate::channels::repl::ReplChannel;
use crate::channels::slack::{SlackClient, SlackServer, SlackState, start_server};
use crate::cluster::{Kubectl, Locator};
use crate::config::Config;
use crate::db::{BindingStore, LibSqlBindingStore};

#[derive(Parser, Debug)]
#[command(name = "opsbot")]
#[command(about = "Chat bot for looking up logs and pod details of Kubernetes apps")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Serve the Slack Events API webhook
    Serve {
        /// Bind host (default: HTTP_HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (default: HTTP_PORT or 3000)
        #[arg(long)]
        port: Option<u16>,

        /// libSQL database file (default: OPSBOT_DB_PATH or ~/.opsbot/opsbot.db)
        #[arg(long)]
        db_path: Option<PathBuf>,
    },

    /// Talk to the bot from the terminal
    Repl {
        /// Single message mode: send one message, print the reply and exit
        #[arg(short, long)]
        message: Option<String>,

        /// Sender identity (default: OPSBOT_REPL_USER, then $USER)
        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        db_path: Option<PathBuf>,
    },

    /// Check credentials, the database and the cluster CLI
    Doctor,
}

/// Open the store, run the schema and wire the command table.
pub async fn build_dispatcher(config: &Config) -> crate::Result<Arc<Dispatcher>> {
    let store = LibSqlBindingStore::new_local(&config.database.path).await?;
    store.init_schema().await?;
    tracing::debug!(path = %config.database.path.display(), "binding store ready");

    let kubectl = Kubectl::from_config(&config.cluster);
    let locator = Locator::new(Arc::new(kubectl)).with_policy(config.cluster.multiple_matches);

    Ok(Arc::new(Dispatcher::new(Arc::new(store), locator)))
}

/// Wire the dispatcher to Slack and start the webhook on `addr`.
pub async fn start_slack(config: &Config, addr: SocketAddr) -> crate::Result<SlackServer> {
    let slack = config.channels.require_slack()?;
    let dispatcher = build_dispatcher(config).await?;
    let state = Arc::new(SlackState::new(
        dispatcher,
        Arc::new(SlackClient::new(slack)),
        slack.signing_secret.clone(),
    ));
    Ok(start_server(addr, state).await?)
}

pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    db_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = Config::from_env()?.with_db_path(db_path);

    let host = host.unwrap_or_else(|| config.channels.http.host.clone());
    let port = port.unwrap_or(config.channels.http.port);
    let addr: SocketAddr = tokio::net::lookup_host((host.as_str(), port))
        .await
        .with_context(|| format!("resolving {host}:{port}"))?
        .next()
        .with_context(|| format!("{host}:{port} did not resolve to an address"))?;

    let server = start_slack(&config, addr).await?;
    tracing::info!("opsbot ready; Slack events at http://{}/slack/events", server.addr());

    tokio::signal::ctrl_c().await?;
    server.shutdown().await;
    Ok(())
}

pub async fn run_repl(
    message: Option<String>,
    user: Option<String>,
    db_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = Config::from_env()?.with_db_path(db_path);
    let user = user.unwrap_or_else(|| config.channels.repl.user_id.clone());
    let dispatcher = build_dispatcher(&config).await?;

    let mut channel = ReplChannel::new(user);
    if let Some(message) = message {
        channel = channel.with_message(message);
    }
    channel.run(dispatcher).await?;
    Ok(())
}
