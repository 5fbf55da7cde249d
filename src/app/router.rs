use crate::domain::FeedItem;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Feed of one adapter, as seen by the router.
#[derive(Debug)]
pub struct RouteFeed {
    pub route: String,
    pub tx: mpsc::Sender<FeedItem>,
}

/// Copy every item from the collector into each route's feed, in order.
///
/// A route whose adapter has stopped is dropped; the router ends when the
/// collector closes `input` or no route is left. Dropping the route senders on
/// return closes the adapters' feeds.
pub async fn run(mut input: mpsc::Receiver<FeedItem>, mut routes: Vec<RouteFeed>) {
    while let Some(item) = input.recv().await {
        let mut index = 0;
        while index < routes.len() {
            if routes[index].tx.send(item.clone()).await.is_ok() {
                index += 1;
            } else {
                let closed = routes.swap_remove(index);
                warn!("Adapter for {} stopped, no longer routing to it", closed.route);
            }
        }

        if routes.is_empty() {
            warn!("No routes left, stopping router");
            return;
        }
    }

    info!("Collector feed closed, stopping router");
}
