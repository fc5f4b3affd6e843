// SPDX-License-Identifier: Apache-2.0

use nccid_model::{DatasetSnapshot, DatasetVersion};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::watch;

/// A swap that would move the published version backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleSnapshot {
    pub current: DatasetVersion,
    pub rejected: DatasetVersion,
}

impl Display for StaleSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "snapshot {} is not newer than published {}",
            self.rejected, self.current
        )
    }
}

impl std::error::Error for StaleSnapshot {}

/// Holds the one published snapshot.
///
/// The value is an `Arc` in a watch channel: readers clone the `Arc` under a
/// short borrow and never observe a partially built snapshot. Until the first
/// successful swap the store is unready and `current()` returns `None`.
pub struct DatasetStore {
    tx: watch::Sender<Option<Arc<DatasetSnapshot>>>,
}

impl Default for DatasetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetStore {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    #[must_use]
    pub fn current(&self) -> Option<Arc<DatasetSnapshot>> {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.tx.borrow().is_some()
    }

    #[must_use]
    pub fn version(&self) -> Option<DatasetVersion> {
        self.tx.borrow().as_ref().map(|s| s.version())
    }

    /// Publishes `snapshot`. Versions only move forward.
    pub fn swap(&self, snapshot: Arc<DatasetSnapshot>) -> Result<(), StaleSnapshot> {
        let mut stale = None;
        self.tx.send_if_modified(|current| {
            if let Some(cur) = current.as_ref() {
                if cur.version() >= snapshot.version() {
                    stale = Some(StaleSnapshot {
                        current: cur.version(),
                        rejected: snapshot.version(),
                    });
                    return false;
                }
            }
            *current = Some(Arc::clone(&snapshot));
            true
        });
        match stale {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Receiver that wakes on every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<DatasetSnapshot>>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nccid_model::{Group, LoadSummary, Record};

    fn snap(v: u64, n: usize) -> Arc<DatasetSnapshot> {
        let records = (0..n)
            .map(|i| Record::new(format!("p{i}"), Group::Training))
            .collect();
        Arc::new(DatasetSnapshot::new(
            DatasetVersion(v),
            0,
            records,
            LoadSummary::default(),
        ))
    }

    #[test]
    fn unready_until_first_swap() {
        let store = DatasetStore::new();
        assert!(!store.is_ready());
        assert!(store.current().is_none());
        store.swap(snap(1, 2)).expect("first swap");
        assert!(store.is_ready());
        assert_eq!(store.version(), Some(DatasetVersion(1)));
    }

    #[test]
    fn swap_never_moves_version_backwards() {
        let store = DatasetStore::new();
        store.swap(snap(2, 1)).expect("v2");
        let err = store.swap(snap(1, 5)).expect_err("older");
        assert_eq!(err.current, DatasetVersion(2));
        assert!(store.swap(snap(2, 5)).is_err());
        assert_eq!(store.current().expect("current").len(), 1);
    }

    #[test]
    fn readers_keep_their_snapshot_across_swaps() {
        let store = DatasetStore::new();
        store.swap(snap(1, 3)).expect("v1");
        let held = store.current().expect("held");
        store.swap(snap(2, 7)).expect("v2");
        assert_eq!(held.version(), DatasetVersion(1));
        assert_eq!(held.len(), 3);
        assert_eq!(store.current().expect("new").len(), 7);
    }

    #[tokio::test]
    async fn subscribers_see_each_published_version() {
        let store = DatasetStore::new();
        let mut rx = store.subscribe();
        store.swap(snap(1, 1)).expect("v1");
        rx.changed().await.expect("changed");
        let seen = rx.borrow_and_update().as_ref().map(|s| s.version());
        assert_eq!(seen, Some(DatasetVersion(1)));
    }
}
