//! Stopping the status page and watching for termination signals.

use tokio::sync::oneshot;

/// Held by the app. Firing it (or dropping it) stops the status page.
pub struct Trigger(oneshot::Sender<()>);

/// Handed to the status page server.
pub struct Stopped(oneshot::Receiver<()>);

pub fn channel() -> (Trigger, Stopped) {
    let (tx, rx) = oneshot::channel();
    (Trigger(tx), Stopped(rx))
}

impl Trigger {
    pub fn fire(self) {
        // The server may already be gone.
        let _ = self.0.send(());
    }
}

impl Stopped {
    /// Resolves once the trigger fires or is dropped.
    pub async fn wait(self) {
        let _ = self.0.await;
    }
}

/// Waits for SIGINT or SIGTERM (Unix) or Ctrl-C (elsewhere).
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => tracing::info!("received SIGINT"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("received Ctrl-C");
    }
    Ok(())
}
