// Shutdown signalling for the background loops (worker, health prober)

use std::time::Duration;
use tokio::sync::watch;

/// Receiving side; cheap to clone, one per background loop
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested (or the sender is gone)
    pub async fn wait(&mut self) {
        if self.is_shutdown() {
            return;
        }
        let _ = self.rx.changed().await;
    }

    /// Sleep for `duration`; true when shutdown cut the sleep short
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = self.wait() => true,
        }
    }
}

pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    /// Signal shutdown to every token; idempotent
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }
}

pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_runs_to_completion_without_signal() {
        let (_sender, mut token) = shutdown_channel();
        assert!(!token.sleep(Duration::from_secs(30)).await);
        assert!(!token.is_shutdown());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_sleep() {
        let (sender, mut token) = shutdown_channel();
        let sleeper = tokio::spawn(async move { token.sleep(Duration::from_secs(3600)).await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        sender.shutdown();

        assert!(sleeper.await.unwrap());
    }

    #[tokio::test]
    async fn test_late_token_sees_earlier_shutdown() {
        let (sender, token) = shutdown_channel();
        sender.shutdown();

        let mut late = token.clone();
        late.wait().await;
        assert!(late.is_shutdown());
    }
}
