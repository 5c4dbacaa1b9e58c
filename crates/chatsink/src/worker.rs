//! Worker process entry point.
//!
//! A worker re-derives its bucket from the shared configuration (the
//! distributor is deterministic), builds one provider per account, and runs
//! them under a [`WorkerSupervisor`] until completion or a stop signal.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use chatsink_core::{
    config::Settings, distributor::distribute, provider::Provider, sink::UpdateSink,
    supervisor::WorkerSupervisor,
};
use chatsink_redis::RedisSink;

use crate::{factory, shutdown};

pub async fn run(settings: &Settings, index: usize) -> Result<()> {
    let assignment = distribute(settings.accounts.clone(), settings.workers)
        .into_iter()
        .find(|a| a.index == index)
        .with_context(|| format!("worker index {index} has no assignment"))?;

    info!(
        worker = index,
        accounts = assignment.accounts.len(),
        "worker starting"
    );

    let sink: Arc<dyn UpdateSink> = Arc::new(
        RedisSink::connect(&settings.redis_url)
            .await
            .context("failed to connect to the publish sink")?,
    );

    // Construction failure aborts the worker before any provider starts.
    let mut providers: Vec<Arc<dyn Provider>> = Vec::with_capacity(assignment.accounts.len());
    for account in &assignment.accounts {
        let provider = factory::create_for(
            account.platform,
            &account.stream_key,
            &account.token,
            Arc::clone(&sink),
        )
        .with_context(|| format!("failed to build provider for {:?}", account.stream_key))?;
        providers.push(provider);
    }

    let stop = CancellationToken::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if shutdown::wait_for_shutdown_signal().await.is_ok() {
                info!("worker received stop signal");
                stop.cancel();
            }
        });
    }

    let supervisor = WorkerSupervisor::new(providers);
    supervisor
        .run(stop)
        .await
        .context("worker supervisor failed")?;

    info!(worker = index, "worker finished");
    Ok(())
}
