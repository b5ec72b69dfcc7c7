use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crmsync_core::{
    config::Config,
    inbound::InboundEvent,
    integrations::IntegrationRegistry,
    pipeline::{InboundHandler, InboundOutcome},
    reconciler::{Reconciler, ReconcilerDeps},
    store::MemoryStore,
};
use crmsync_rpc::HttpRpcBridge;

/// Reads newline-delimited inbound events on stdin and reconciles each one.
#[tokio::main]
async fn main() -> Result<(), crmsync_core::Error> {
    crmsync_core::logging::init("crmsync")?;

    let cfg = Config::load()?;

    let integrations = Arc::new(IntegrationRegistry::load(&cfg.integrations_file)?);
    if integrations.is_empty() {
        warn!(file = %cfg.integrations_file.display(), "no integrations configured");
    }

    let store = Arc::new(match &cfg.store_file {
        Some(path) => MemoryStore::load_snapshot(path).await?,
        None => MemoryStore::new(),
    });
    let rpc = Arc::new(HttpRpcBridge::new(
        cfg.rpc_url.clone(),
        cfg.rpc_token.clone(),
        cfg.rpc_timeout,
    )?);

    let reconciler = Arc::new(Reconciler::new(
        ReconcilerDeps {
            integrations,
            customers: store.clone(),
            conversations: store.clone(),
            messages: store.clone(),
            rpc,
        },
        cfg.reconcile_options(),
    ));
    let handler = InboundHandler::new(reconciler);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received; stopping after current event");
                cancel.cancel();
            }
        });
    }

    info!(
        rpc_url = %cfg.rpc_url,
        batch_policy = ?cfg.batch_policy,
        serialize_by_key = cfg.serialize_by_key,
        "crmsync started; reading events from stdin"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut handled = 0usize;
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let event = match InboundEvent::parse(&line) {
            Ok(ev) => ev,
            Err(e) => {
                warn!(error = %e, "skipping malformed event line");
                continue;
            }
        };

        match handler.handle(&event).await {
            Ok(InboundOutcome::Ignored) => {}
            Ok(InboundOutcome::Reconciled { .. }) => handled += 1,
            Err(e) => error!(instance_id = %event.instance_id, error = %e, "failed to reconcile event"),
        }

        if let Some(path) = &cfg.store_file {
            if let Err(e) = store.save_snapshot(path).await {
                error!(file = %path.display(), error = %e, "failed to save store snapshot");
            }
        }
    }

    info!(handled, "crmsync stopped");
    Ok(())
}
