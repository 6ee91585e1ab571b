use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 64;

/// Publishes paths whose rendered output went stale after a mutation.
///
/// The render layer subscribes and refreshes whatever it has cached for a
/// path. Publishing with no subscribers is not an error.
#[derive(Clone, Debug)]
pub struct Revalidator {
    tx: broadcast::Sender<String>,
}

impl Revalidator {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn revalidate(&self, path: &str) {
        let receivers = self.tx.send(path.to_owned()).unwrap_or(0);
        debug!(path, receivers, "revalidate");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl Default for Revalidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_each_path() {
        let revalidator = Revalidator::new();
        let mut rx = revalidator.subscribe();

        revalidator.revalidate("/");
        revalidator.revalidate("/tred/abc");

        assert_eq!(rx.recv().await.unwrap(), "/");
        assert_eq!(rx.recv().await.unwrap(), "/tred/abc");
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        Revalidator::new().revalidate("/");
    }
}
