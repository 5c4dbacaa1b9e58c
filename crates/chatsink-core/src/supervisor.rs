use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{errors::Error, provider::Provider, Result};

/// Runs all providers assigned to one worker process concurrently.
///
/// Policy is first-failure-cancels-siblings: when any provider's `start()`
/// fails, every provider in the worker is stopped (exactly once, including
/// the failed one), the remaining loops are drained, and the original
/// failure is returned. External cancellation via `shutdown` triggers the
/// same stop sequence but resolves to `Ok`.
pub struct WorkerSupervisor {
    providers: Vec<Arc<dyn Provider>>,
}

impl WorkerSupervisor {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }

    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        if self.providers.is_empty() {
            return Ok(());
        }

        info!(providers = self.providers.len(), "starting providers");
        let mut set = JoinSet::new();
        for provider in &self.providers {
            let provider = Arc::clone(provider);
            set.spawn(async move {
                let stream = provider.stream().to_string();
                let result = provider.start().await;
                (stream, result)
            });
        }

        let mut first_error = None;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutdown requested; stopping providers");
                    break;
                }
                joined = set.join_next() => {
                    match joined {
                        None => break,
                        Some(Ok((stream, Ok(())))) => {
                            info!(%stream, "provider finished");
                        }
                        Some(Ok((stream, Err(e)))) => {
                            error!(%stream, error = %e, "provider failed; stopping siblings");
                            first_error = Some(e);
                            break;
                        }
                        Some(Err(join_err)) => {
                            first_error =
                                Some(Error::Platform(format!("provider task panicked: {join_err}")));
                            break;
                        }
                    }
                }
            }
        }

        self.stop_all().await;

        // Drain loops that were still running; they terminate once stopped.
        while let Some(joined) = set.join_next().await {
            if let Ok((stream, Err(e))) = joined {
                warn!(%stream, error = %e, "provider exited with error during shutdown");
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Stop every provider once. Stop failures are logged and never abort the
    /// shutdown sequence.
    async fn stop_all(&self) {
        for provider in &self.providers {
            if let Err(e) = provider.stop().await {
                warn!(stream = provider.stream(), error = %e, "provider stop failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::config::PlatformKind;

    #[derive(Debug)]
    struct TestProvider {
        stream: String,
        fail_start: bool,
        running: CancellationToken,
        stops: AtomicUsize,
    }

    impl TestProvider {
        fn new(stream: &str, fail_start: bool) -> Arc<Self> {
            Arc::new(Self {
                stream: stream.to_string(),
                fail_start,
                running: CancellationToken::new(),
                stops: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Provider for TestProvider {
        fn platform(&self) -> PlatformKind {
            PlatformKind::Telegram
        }

        fn stream(&self) -> &str {
            &self.stream
        }

        async fn start(&self) -> Result<()> {
            if self.fail_start {
                return Err(Error::Platform("connection refused".to_string()));
            }
            self.running.cancelled().await;
            Ok(())
        }

        async fn stop(&self) -> Result<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            self.running.cancel();
            Ok(())
        }
    }

    fn as_providers(providers: &[Arc<TestProvider>]) -> Vec<Arc<dyn Provider>> {
        providers
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn Provider>)
            .collect()
    }

    #[tokio::test]
    async fn first_failure_stops_every_sibling_once_and_reraises() {
        let providers = [
            TestProvider::new("updates:a", false),
            TestProvider::new("updates:b", true),
            TestProvider::new("updates:c", false),
        ];
        let supervisor = WorkerSupervisor::new(as_providers(&providers));

        let err = supervisor.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::Platform(_)), "got {err:?}");

        for provider in &providers {
            assert_eq!(provider.stops.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn external_cancellation_stops_all_providers() {
        let providers = [
            TestProvider::new("updates:a", false),
            TestProvider::new("updates:b", false),
        ];
        let supervisor = Arc::new(WorkerSupervisor::new(as_providers(&providers)));

        let shutdown = CancellationToken::new();
        let handle = {
            let supervisor = Arc::clone(&supervisor);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { supervisor.run(shutdown).await })
        };

        tokio::task::yield_now().await;
        shutdown.cancel();

        handle.await.unwrap().unwrap();
        for provider in &providers {
            assert_eq!(provider.stops.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn empty_supervisor_completes_immediately() {
        let supervisor = WorkerSupervisor::new(Vec::new());
        supervisor.run(CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn providers_finishing_cleanly_resolve_to_ok() {
        #[derive(Debug)]
        struct OneShot(String);

        #[async_trait]
        impl Provider for OneShot {
            fn platform(&self) -> PlatformKind {
                PlatformKind::Telegram
            }
            fn stream(&self) -> &str {
                &self.0
            }
            async fn start(&self) -> Result<()> {
                Ok(())
            }
            async fn stop(&self) -> Result<()> {
                Ok(())
            }
        }

        let supervisor = WorkerSupervisor::new(vec![
            Arc::new(OneShot("updates:a".to_string())) as Arc<dyn Provider>,
            Arc::new(OneShot("updates:b".to_string())) as Arc<dyn Provider>,
        ]);
        supervisor.run(CancellationToken::new()).await.unwrap();
    }
}
