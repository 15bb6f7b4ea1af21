use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use trellis_types::{ActorId, ItemId, VersionId};

use crate::entry::{VersionEntry, VersionEvent};
use crate::error::VersionResult;
use crate::traits::VersionLog;

/// In-memory version log with one append-only stream per item.
///
/// The next sequence is derived from the stream length while the write
/// lock is held, so concurrent writers to the same item serialize through
/// the lock and can never mint a duplicate sequence.
pub struct InMemoryVersionLog {
    inner: RwLock<HashMap<ItemId, Vec<VersionEntry>>>,
}

impl InMemoryVersionLog {
    /// Create a new empty log.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Total entries across all items.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("lock poisoned")
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Returns `true` if no entry has ever been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryVersionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionLog for InMemoryVersionLog {
    fn record(
        &self,
        item: ItemId,
        author: Option<ActorId>,
        content: serde_json::Value,
        event: VersionEvent,
        metadata: Option<serde_json::Value>,
    ) -> VersionResult<VersionEntry> {
        let mut streams = self.inner.write().expect("lock poisoned");
        let stream = streams.entry(item).or_default();
        let entry = VersionEntry {
            id: VersionId::new(),
            item_id: item,
            author_id: author,
            sequence: (stream.len() + 1) as u64,
            content,
            event,
            metadata,
            created_at: Utc::now(),
        };
        stream.push(entry.clone());
        tracing::debug!(%item, sequence = entry.sequence, %event, "recorded version");
        Ok(entry)
    }

    fn list(&self, item: ItemId) -> VersionResult<Vec<VersionEntry>> {
        let streams = self.inner.read().expect("lock poisoned");
        let mut entries = streams.get(&item).cloned().unwrap_or_default();
        entries.reverse(); // streams append in sequence order
        Ok(entries)
    }

    fn entry_at(&self, item: ItemId, sequence: u64) -> VersionResult<Option<VersionEntry>> {
        if sequence == 0 {
            return Ok(None);
        }
        let streams = self.inner.read().expect("lock poisoned");
        Ok(streams
            .get(&item)
            .and_then(|s| s.get((sequence - 1) as usize))
            .cloned())
    }

    fn head(&self, item: ItemId) -> VersionResult<Option<VersionEntry>> {
        let streams = self.inner.read().expect("lock poisoned");
        Ok(streams.get(&item).and_then(|s| s.last()).cloned())
    }

    fn current_sequence(&self, item: ItemId) -> VersionResult<u64> {
        let streams = self.inner.read().expect("lock poisoned");
        Ok(streams.get(&item).map(|s| s.len() as u64).unwrap_or(0))
    }
}

impl std::fmt::Debug for InMemoryVersionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVersionLog")
            .field("entry_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VersionError;
    use crate::traits::{UserDirectory, UserProfile};

    fn content(n: u64) -> serde_json::Value {
        serde_json::json!({ "rev": n })
    }

    // -----------------------------------------------------------------------
    // Sequence assignment
    // -----------------------------------------------------------------------

    #[test]
    fn sequences_start_at_one_and_increment() {
        let log = InMemoryVersionLog::new();
        let item = ItemId::new();
        for expected in 1..=5 {
            let entry = log
                .record(item, None, content(expected), VersionEvent::Updated, None)
                .unwrap();
            assert_eq!(entry.sequence, expected);
        }
        assert_eq!(log.current_sequence(item).unwrap(), 5);
    }

    #[test]
    fn streams_are_independent_per_item() {
        let log = InMemoryVersionLog::new();
        let a = ItemId::new();
        let b = ItemId::new();
        log.record(a, None, content(1), VersionEvent::Created, None)
            .unwrap();
        let first_b = log
            .record(b, None, content(1), VersionEvent::Created, None)
            .unwrap();
        assert_eq!(first_b.sequence, 1);
    }

    #[test]
    fn concurrent_writers_never_share_a_sequence() {
        use std::sync::Arc;
        use std::thread;

        let log = Arc::new(InMemoryVersionLog::new());
        let item = ItemId::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    log.record(item, None, content(i), VersionEvent::Updated, None)
                        .unwrap()
                        .sequence
                })
            })
            .collect();
        let mut seqs: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        seqs.sort();
        assert_eq!(seqs, (1..=8).collect::<Vec<u64>>());
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    #[test]
    fn list_is_descending_by_sequence() {
        let log = InMemoryVersionLog::new();
        let item = ItemId::new();
        for n in 1..=3 {
            log.record(item, None, content(n), VersionEvent::Updated, None)
                .unwrap();
        }
        let entries = log.list(item).unwrap();
        let seqs: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![3, 2, 1]);
    }

    #[test]
    fn list_unknown_item_is_empty() {
        let log = InMemoryVersionLog::new();
        assert!(log.list(ItemId::new()).unwrap().is_empty());
    }

    #[test]
    fn entry_at_and_head() {
        let log = InMemoryVersionLog::new();
        let item = ItemId::new();
        log.record(item, None, content(1), VersionEvent::Created, None)
            .unwrap();
        log.record(item, None, content(2), VersionEvent::Updated, None)
            .unwrap();

        assert_eq!(log.entry_at(item, 1).unwrap().unwrap().content, content(1));
        assert!(log.entry_at(item, 0).unwrap().is_none());
        assert!(log.entry_at(item, 99).unwrap().is_none());
        assert_eq!(log.head(item).unwrap().unwrap().sequence, 2);
    }

    // -----------------------------------------------------------------------
    // Restore
    // -----------------------------------------------------------------------

    #[test]
    fn restore_is_additive() {
        let log = InMemoryVersionLog::new();
        let item = ItemId::new();
        let author = ActorId::new();
        log.record(item, Some(author), content(1), VersionEvent::Created, None)
            .unwrap();
        log.record(item, Some(author), content(2), VersionEvent::Updated, None)
            .unwrap();

        let restored = log.restore(item, 1, Some(author)).unwrap();
        assert_eq!(restored.sequence, 3);
        assert_eq!(restored.content, content(1));
        assert_eq!(restored.event, VersionEvent::Restored);
        assert_eq!(
            restored.metadata,
            Some(serde_json::json!({ "restoredFrom": 1 }))
        );

        // Prior entries are untouched; history grew by exactly one.
        let entries = log.list(item).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].content, content(1));
        assert_eq!(entries[2].event, VersionEvent::Created);
    }

    #[test]
    fn restore_missing_sequence_fails() {
        let log = InMemoryVersionLog::new();
        let item = ItemId::new();
        log.record(item, None, content(1), VersionEvent::Created, None)
            .unwrap();
        let err = log.restore(item, 7, None).unwrap_err();
        assert_eq!(err, VersionError::VersionNotFound { item, sequence: 7 });
    }

    // -----------------------------------------------------------------------
    // Annotated listing
    // -----------------------------------------------------------------------

    struct FixedDirectory {
        actor: ActorId,
    }

    impl UserDirectory for FixedDirectory {
        fn profile(&self, actor: ActorId) -> Option<UserProfile> {
            (actor == self.actor).then(|| UserProfile {
                name: "Ada".into(),
                image: Some("https://example.test/ada.png".into()),
            })
        }
    }

    #[test]
    fn annotated_listing_resolves_known_authors() {
        let log = InMemoryVersionLog::new();
        let item = ItemId::new();
        let known = ActorId::new();
        log.record(item, Some(known), content(1), VersionEvent::Created, None)
            .unwrap();
        log.record(item, None, content(2), VersionEvent::Moved, None)
            .unwrap();

        let dir = FixedDirectory { actor: known };
        let annotated = log.list_annotated(item, &dir).unwrap();
        assert_eq!(annotated.len(), 2);
        // Descending: the system-authored move first.
        assert_eq!(annotated[0].author_name, None);
        assert_eq!(annotated[1].author_name.as_deref(), Some("Ada"));
        assert!(annotated[1].author_image.is_some());
    }
}
