use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, interval_at};
use tracing::warn;

// Repeating background job owned by the process lifecycle.
// Started at startup, stopped and joined at shutdown.
pub struct BackgroundTask {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    // Runs `job` every `every`, first run one period from now
    pub fn spawn<F, Fut>(name: &'static str, every: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, mut stop) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            tracing::debug!(task = name, interval = ?every, "background task started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => job().await,
                    _ = stop.changed() => break,
                }
            }
        });

        Self {
            name,
            shutdown,
            handle,
        }
    }

    // Signals the task and waits for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(task = self.name, error = %e, "background task ended abnormally");
        }
    }
}
