use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::registry::SubscriberRegistry;
use crate::pipeline::clean_items;
use crate::store::Store;

/// How far each window reaches back before the previous checkpoint.
pub const DEFAULT_COMMIT_GRACE: Duration = Duration::from_secs(5);

/// Periodically looks for newly created items of every subscribed content
/// type and fans them out through the registry.
///
/// Items are stamped before their insert commits, so each window reaches
/// back `grace` past the previous checkpoint. Ids already pushed are
/// remembered until they fall out of every window.
pub struct LivePoller {
    store: Arc<dyn Store>,
    registry: Arc<SubscriberRegistry>,
    interval: Duration,
    grace: chrono::Duration,
    seen: HashMap<String, DateTime<Utc>>,
}

impl LivePoller {
    pub fn new(store: Arc<dyn Store>, registry: Arc<SubscriberRegistry>, interval: Duration) -> Self {
        Self {
            store,
            registry,
            interval,
            grace: to_chrono(DEFAULT_COMMIT_GRACE),
            seen: HashMap::new(),
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = to_chrono(grace);
        self
    }

    /// Poll until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut checkpoint = Utc::now();
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            grace_ms = self.grace.num_milliseconds(),
            "live poller started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Utc::now();
                    self.poll_once(checkpoint, now).await;
                    checkpoint = now;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("live poller stopped");
    }

    /// Deliver items created in `(since - grace, until]` that were not pushed
    /// before. Failures for one content type are logged and do not stop the
    /// others. Returns the number of events delivered.
    pub async fn poll_once(&mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> usize {
        let floor = since - self.grace;
        let mut delivered = 0;
        for content_type in self.registry.content_types() {
            let items = match self
                .store
                .list_created_between(&content_type, floor, until)
                .await
            {
                Ok(items) => items,
                Err(err) => {
                    tracing::warn!(%err, content_type = %content_type, "live poll failed");
                    continue;
                }
            };
            let fresh: Vec<_> = items
                .into_iter()
                .filter(|item| !self.seen.contains_key(&item.content_item_id))
                .collect();
            if fresh.is_empty() {
                continue;
            }
            let stamps: Vec<_> = fresh
                .iter()
                .map(|item| (item.content_item_id.clone(), item.created_utc.unwrap_or(until)))
                .collect();

            match clean_items(self.store.as_ref(), &content_type, fresh, true).await {
                Ok(cleaned) => {
                    self.seen.extend(stamps);
                    let sent = self.registry.broadcast(&content_type, &cleaned);
                    tracing::debug!(content_type = %content_type, new_items = cleaned.len(), sent, "live items pushed");
                    delivered += sent;
                }
                Err(err) => tracing::warn!(%err, content_type = %content_type, "live poll failed"),
            }
        }

        // The next window starts at `until - grace`.
        let horizon = until - self.grace;
        self.seen.retain(|_, created| *created > horizon);

        let removed = self.registry.cleanup_disconnected();
        if removed > 0 {
            tracing::debug!(removed, "live subscribers cleaned up");
        }
        delivered
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero())
}
