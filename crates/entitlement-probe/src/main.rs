//! entitlement-probe
//!
//! Runs the client-side checkout and plan reconciliation flow from a
//! terminal, against a live billing API. Useful for watching how long a
//! webhook takes to land after a test-mode checkout.
//!
//! ```text
//! entitlement-probe checkout
//! entitlement-probe return --url "http://localhost:3000/pricing?success=true"
//! entitlement-probe status
//! ```

mod handlers;
mod state;

use std::rc::Rc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use entitlement_client::{ApiConfig, BillingApi};
use entitlement_core::{MemorySession, ReconcileConfig};

use crate::state::ProbeState;

#[derive(Parser, Debug)]
#[command(name = "entitlement-probe", version, about = "Checkout and plan reconciliation probe")]
struct Cli {
    /// Bearer token of the signed-in user (omit for an anonymous session)
    #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Billing API base URL
    #[arg(long, env = "ENTITLEMENT_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile once, as on page load
    Status,

    /// Simulate arriving on the post-checkout return URL
    Return {
        /// Full return URL, e.g. `http://localhost:3000/pricing?success=true`
        #[arg(long)]
        url: String,
    },

    /// Start a checkout and print the hosted payment URL
    Checkout,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load environment before clap reads env-backed args
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let api_config = match cli.api_url {
        Some(url) => ApiConfig::new(url),
        None => ApiConfig::from_env().context("set --api-url or ENTITLEMENT_API_URL")?,
    };
    let api = BillingApi::from_config(&api_config)?;

    let session = cli
        .token
        .as_deref()
        .map_or_else(MemorySession::anonymous, MemorySession::with_token);

    let reconcile = ReconcileConfig::from_env();
    reconcile.validate()?;

    tracing::info!(
        api = %api_config.api_url,
        max_attempts = reconcile.max_attempts,
        delay_ms = reconcile.retry_delay_ms,
        worst_case = ?reconcile.worst_case(),
        "entitlement-probe starting"
    );

    let state = ProbeState {
        session: Rc::new(session),
        api: Rc::new(api),
        reconcile,
    };

    match cli.command {
        Command::Status => {
            handlers::status(&state).await?;
        }
        Command::Return { url } => {
            handlers::return_from(&state, &url).await?;
        }
        Command::Checkout => {
            let launch = handlers::checkout(&state).await?;
            tracing::info!(principal = %launch.principal, url = %launch.url, "Checkout session created");
        }
    }

    Ok(())
}
