use tokio::sync::mpsc;

/// A cancellable stream of payloads from one channel subscription. Dropping
/// it (or its backing task exiting) ends delivery; redelivery on reconnect
/// is not required per §4.A.
pub struct Subscription {
    rx: mpsc::Receiver<String>,
}

impl Subscription {
    pub fn new(rx: mpsc::Receiver<String>) -> Self {
        Self { rx }
    }

    /// An already-closed subscription, for degraded (backplane unreachable) paths.
    pub fn closed() -> Self {
        let (_tx, rx) = mpsc::channel(1);
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}
