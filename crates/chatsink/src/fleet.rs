//! Fleet orchestrator: one OS process per worker bucket.
//!
//! Workers are re-executions of the current binary with `--worker <index>`;
//! they inherit the environment and re-derive their bucket from it. The
//! orchestrator only drives process lifecycle: spawn, signal, wait, kill.

use std::{process::ExitStatus, time::Duration};

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use chatsink_core::{
    config::Settings,
    distributor::{distribute, WorkerAssignment},
};

use crate::shutdown;

pub struct FleetOrchestrator {
    assignments: Vec<WorkerAssignment>,
    grace: Duration,
}

struct WorkerProcess {
    index: usize,
    child: Child,
    status: Option<ExitStatus>,
}

impl WorkerProcess {
    /// Memoized wait; safe to call again after the child has been reaped.
    async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let status = self.child.wait().await?;
        self.status = Some(status);
        Ok(status)
    }

    #[cfg(unix)]
    fn request_stop(&mut self) {
        use nix::{
            sys::signal::{kill, Signal},
            unistd::Pid,
        };

        if let Some(pid) = self.child.id() {
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }
    }

    #[cfg(not(unix))]
    fn request_stop(&mut self) {
        let _ = self.child.start_kill();
    }
}

impl FleetOrchestrator {
    pub fn new(settings: &Settings) -> Self {
        Self {
            assignments: distribute(settings.accounts.clone(), settings.workers),
            grace: settings.grace,
        }
    }

    /// Blocks until every worker process has exited, whether by normal
    /// completion, signal-driven shutdown, or crash. Dead workers are not
    /// restarted or rebalanced.
    pub async fn run(&self) -> Result<()> {
        if self.assignments.is_empty() {
            info!("no accounts configured; nothing to run");
            return Ok(());
        }

        let mut children = self.spawn_workers()?;

        let signalled = {
            let drain = async {
                for worker in children.iter_mut() {
                    let result = worker.wait().await;
                    report_exit(worker.index, result);
                }
            };
            tokio::select! {
                _ = drain => false,
                _ = shutdown::wait_for_shutdown_signal() => true,
            }
        };

        if signalled {
            info!("shutdown signal received; stopping workers");
            self.stop_all(&mut children).await;
        }

        let failed = children
            .iter()
            .filter(|w| !matches!(w.status, Some(s) if s.success()))
            .count();
        if failed > 0 {
            warn!(failed, total = children.len(), "some workers did not exit cleanly");
        } else {
            info!(workers = children.len(), "all workers exited cleanly");
        }
        Ok(())
    }

    fn spawn_workers(&self) -> Result<Vec<WorkerProcess>> {
        let exe = std::env::current_exe().context("failed to resolve current executable")?;

        let mut children = Vec::with_capacity(self.assignments.len());
        for assignment in &self.assignments {
            let child = Command::new(&exe)
                .arg("--worker")
                .arg(assignment.index.to_string())
                .kill_on_drop(true)
                .spawn()
                .with_context(|| format!("failed to spawn worker {}", assignment.index))?;

            info!(
                worker = assignment.index,
                accounts = assignment.accounts.len(),
                pid = ?child.id(),
                "spawned worker process"
            );
            children.push(WorkerProcess {
                index: assignment.index,
                child,
                status: None,
            });
        }
        Ok(children)
    }

    /// Graceful stop: SIGTERM each live worker, wait up to the grace period
    /// per process, then force-kill stragglers.
    async fn stop_all(&self, children: &mut [WorkerProcess]) {
        let grace = self.grace;
        join_all(
            children
                .iter_mut()
                .filter(|w| w.status.is_none())
                .map(|w| Self::stop_worker(w, grace)),
        )
        .await;
    }

    async fn stop_worker(worker: &mut WorkerProcess, grace: Duration) {
        worker.request_stop();
        match tokio::time::timeout(grace, worker.wait()).await {
            Ok(result) => report_exit(worker.index, result),
            Err(_) => {
                warn!(worker = worker.index, "worker did not stop within grace period; killing");
                if let Err(e) = worker.child.kill().await {
                    warn!(worker = worker.index, error = %e, "failed to kill worker");
                }
                if let Ok(Some(status)) = worker.child.try_wait() {
                    worker.status = Some(status);
                }
            }
        }
    }
}

fn report_exit(index: usize, result: std::io::Result<ExitStatus>) {
    match result {
        Ok(status) if status.success() => info!(worker = index, "worker exited"),
        Ok(status) => warn!(worker = index, %status, "worker exited with failure"),
        Err(e) => warn!(worker = index, error = %e, "failed to wait for worker"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_account_list_spawns_nothing_and_returns_ok() {
        let settings = Settings {
            accounts: Vec::new(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            workers: 4,
            grace: Duration::from_secs(5),
        };
        FleetOrchestrator::new(&settings).run().await.unwrap();
    }
}
