//! Live query snapshots
//!
//! A lazy, restartable sequence of query results for views that re-render on
//! change. Nothing is read until the stream is first polled; the first item is
//! the current result and every later item follows a committed revision.
//! Intermediate revisions may be coalesced. The lifecycle engine never uses
//! this: it only needs one-shot queries.

use crate::error::StoreError;
use crate::query::Query;
use crate::traits::{ChangeFeed, Store};
use crate::types::Entity;
use futures::stream::{self, Stream};
use std::sync::Arc;
use tokio::sync::watch;

enum State {
    Initial,
    Watching(watch::Receiver<u64>),
    Closed,
}

/// Stream of snapshots for `query`
///
/// The stream ends after yielding a read error, or when the store's change
/// feed is dropped. Call again to restart from a fresh snapshot.
pub fn snapshots<S>(
    store: Arc<S>,
    query: Query,
) -> impl Stream<Item = Result<Vec<Entity>, StoreError>> + Send + 'static
where
    S: Store + ChangeFeed + 'static,
{
    stream::unfold(State::Initial, move |state| {
        let store = Arc::clone(&store);
        let query = query.clone();
        async move {
            let mut rx = match state {
                State::Initial => store.subscribe(),
                State::Watching(mut rx) => {
                    if rx.changed().await.is_err() {
                        return None;
                    }
                    rx
                }
                State::Closed => return None,
            };
            // Mark the current revision seen before reading so a commit that
            // lands during the read still wakes the next poll.
            let _ = *rx.borrow_and_update();

            let snapshot = store.query(&query).await;
            let next = if snapshot.is_ok() {
                State::Watching(rx)
            } else {
                State::Closed
            };
            Some((snapshot, next))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::memory::MemoryStore;
    use crate::types::{Document, EntityId};
    use futures::StreamExt;

    #[tokio::test]
    async fn first_item_is_current_result_then_follows_changes() {
        let store = Arc::new(MemoryStore::new());
        store.insert("welds", Document::new(EntityId::new("w1").unwrap()));

        let mut live = Box::pin(snapshots(Arc::clone(&store), Query::new("welds".into())));

        let first = live.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);

        store.insert("welds", Document::new(EntityId::new("w2").unwrap()));
        let second = live.next().await.unwrap().unwrap();
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn stream_is_lazy_and_restartable() {
        let store = Arc::new(MemoryStore::new());
        let live = snapshots(Arc::clone(&store), Query::new("welds".into()));
        assert!(store.stats().queries.is_empty());
        drop(live);

        store.insert("welds", Document::new(EntityId::new("w1").unwrap()));
        let mut again = Box::pin(snapshots(Arc::clone(&store), Query::new("welds".into())));
        assert_eq!(again.next().await.unwrap().unwrap().len(), 1);
        assert_eq!(store.stats().queries.len(), 1);
    }
}
