//! Command Handlers

use std::rc::Rc;

use anyhow::Context;
use entitlement_core::{
    CheckoutLaunch, CheckoutLauncher, CheckoutReturn, EntitlementError, EntitlementReconciler,
    LauncherConfig, Settlement, TokioDelay,
};

use crate::state::{LogNavigator, LogNotifier, ProbeState, log_transition};

type ProbeReconciler =
    EntitlementReconciler<Rc<entitlement_core::MemorySession>, Rc<entitlement_client::BillingApi>, TokioDelay>;

fn reconciler(state: &ProbeState) -> anyhow::Result<ProbeReconciler> {
    let reconciler = EntitlementReconciler::new(
        Rc::clone(&state.session),
        Rc::clone(&state.api),
        TokioDelay,
        state.reconcile.clone(),
    )
    .context("invalid reconcile config")?
    .with_notifier(LogNotifier);

    reconciler.subscribe(log_transition);
    Ok(reconciler)
}

/// Run the mount-time reconciliation once
pub async fn status(state: &ProbeState) -> anyhow::Result<Settlement> {
    let reconciler = reconciler(state)?;
    let settlement = run_until_interrupted(&reconciler, reconciler.on_mount()).await?;
    report(&settlement);
    Ok(settlement)
}

/// Simulate landing on `return_url` after checkout: the mount trigger and the
/// redirect trigger race exactly as they do in a browser tab
pub async fn return_from(state: &ProbeState, return_url: &str) -> anyhow::Result<Settlement> {
    let signal = CheckoutReturn::from_url(return_url)?;
    tracing::info!(?signal, "Parsed return URL");

    let reconciler = reconciler(state)?;
    let both = async {
        let (mount, redirect) = tokio::join!(reconciler.on_mount(), reconciler.on_return(signal));
        redirect.unwrap_or(mount)
    };

    let settlement = run_until_interrupted(&reconciler, both).await?;
    report(&settlement);
    Ok(settlement)
}

/// Create a checkout session and print where the browser would go
pub async fn checkout(state: &ProbeState) -> anyhow::Result<CheckoutLaunch> {
    let navigator = LogNavigator::default();
    let launcher = CheckoutLauncher::new(
        Rc::clone(&state.session),
        Rc::clone(&state.api),
        &navigator,
        LauncherConfig::default(),
    );

    match launcher.start_checkout().await {
        Ok(launch) => Ok(launch),
        Err(EntitlementError::Unauthenticated) => {
            launcher.redirect_to_login()?;
            anyhow::bail!(
                "{} Sign in at {}",
                EntitlementError::Unauthenticated.user_message(),
                navigator.target().unwrap_or_default()
            )
        }
        Err(e) => Err(anyhow::Error::new(e).context("checkout could not be started")),
    }
}

/// Drive `session` to completion, tearing the reconciler down on Ctrl-C
async fn run_until_interrupted<F>(reconciler: &ProbeReconciler, session: F) -> anyhow::Result<Settlement>
where
    F: std::future::Future<Output = Settlement>,
{
    let session = reconciler.abortable(session);

    tokio::select! {
        result = session => result.context("reconciliation aborted"),
        _ = tokio::signal::ctrl_c() => {
            reconciler.teardown();
            anyhow::bail!("interrupted")
        }
    }
}

fn report(settlement: &Settlement) {
    if let Some(exhausted) = settlement.exhaustion() {
        tracing::debug!(error = %exhausted, "No paid plan observed");
    }
    tracing::info!(
        state = %settlement.state,
        attempts = settlement.attempts,
        reason = ?settlement.reason,
        "Reconciliation settled"
    );
}
