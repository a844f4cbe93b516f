// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory submission collection.
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use steward_core::{CommentId, Submission, SubmissionId};
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::traits::{Applied, Change, StoreError, StoreEvent, SubmissionStore};

/// Capacity of the change event channel. Slow subscribers skip events beyond that.
const EVENTS_CAPACITY: usize = 256;

#[derive(Clone, Debug, Default)]
pub struct InnerMemoryStore {
    submissions: Vec<Submission>,
    index: HashMap<SubmissionId, usize>,
}

impl InnerMemoryStore {
    pub fn get(&self, id: &SubmissionId) -> Option<&Submission> {
        let position = *self.index.get(id)?;
        self.submissions.get(position)
    }

    /// All submissions in load order.
    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    fn get_mut(&mut self, id: &SubmissionId) -> Option<&mut Submission> {
        let position = *self.index.get(id)?;
        self.submissions.get_mut(position)
    }
}

/// Authoritative collection of submissions kept in memory.
///
/// `MemoryStore` is cheap to clone and can be shared between tasks. Every change is applied under
/// a single write lock.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    inner: Arc<RwLock<InnerMemoryStore>>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENTS_CAPACITY);
        Self {
            inner: Arc::new(RwLock::new(InnerMemoryStore::default())),
            events,
        }
    }

    /// Obtain a read-lock on the store.
    pub fn read_store(&self) -> RwLockReadGuard<'_, InnerMemoryStore> {
        self.inner
            .read()
            .expect("acquire shared read access on store")
    }

    /// Obtain a write-lock on the store.
    pub fn write_store(&self) -> RwLockWriteGuard<'_, InnerMemoryStore> {
        self.inner
            .write()
            .expect("acquire exclusive write access on store")
    }

    /// Consistent copy of all submissions in load order.
    pub fn snapshot(&self) -> Vec<Submission> {
        self.read_store().submissions.clone()
    }

    pub fn len(&self) -> usize {
        self.read_store().submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn emit(&self, events: Vec<StoreEvent>) {
        for event in events {
            // Nobody listening is fine.
            let _ = self.events.send(event);
        }
    }

    fn apply_change(&self, change: Change) -> Result<Applied, StoreError> {
        let mut events = Vec::new();

        let applied = {
            let mut store = self.write_store();
            match change {
                Change::Replace(incoming) => replace(&mut store, incoming, true, &mut events)?,
                Change::Optimistic(incoming) => {
                    replace(&mut store, incoming, false, &mut events)?
                }
                Change::Restore { previous, failed } => {
                    restore(&mut store, previous, failed, &mut events)
                }
                Change::AppendComment(comment) => {
                    let Some(submission) = store.get_mut(&comment.submission_id) else {
                        debug!(id = %comment.submission_id, "ignore comment for unknown submission");
                        return Ok(Applied::Unknown);
                    };

                    if submission.has_comment(&comment.id) {
                        trace!(id = %comment.id, "ignore duplicate comment");
                        Applied::Duplicate
                    } else {
                        submission.last_updated = submission.last_updated.max(comment.created_at);
                        submission.comments.push(comment.clone());
                        events.push(StoreEvent::CommentAppended { comment });
                        Applied::Appended
                    }
                }
            }
        };

        self.emit(events);
        Ok(applied)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn replace(
    store: &mut InnerMemoryStore,
    incoming: Submission,
    authoritative: bool,
    events: &mut Vec<StoreEvent>,
) -> Result<Applied, StoreError> {
    incoming.check_invariants()?;

    let Some(current) = store.get_mut(&incoming.id) else {
        debug!(id = %incoming.id, "ignore update of unknown submission");
        return Ok(Applied::Unknown);
    };

    if incoming.version < current.version {
        warn!(
            id = %incoming.id,
            current = current.version,
            incoming = incoming.version,
            "drop stale submission update"
        );
        return Ok(Applied::Stale {
            current: current.version,
            incoming: incoming.version,
        });
    }

    let from = current.status;
    let mut next = incoming;

    // Union of both comment lists by id, in append order.
    let mut comments = std::mem::take(&mut current.comments);
    let known: HashSet<CommentId> = comments.iter().map(|comment| comment.id.clone()).collect();
    for comment in std::mem::take(&mut next.comments) {
        if !known.contains(&comment.id) {
            events.push(StoreEvent::CommentAppended {
                comment: comment.clone(),
            });
            comments.push(comment);
        }
    }
    next.comments = comments;
    next.last_updated = next.last_updated.max(current.last_updated);

    debug!(
        id = %next.id,
        version = next.version,
        authoritative,
        "replace submission"
    );

    events.push(StoreEvent::Replaced {
        id: next.id.clone(),
    });
    if from != next.status {
        events.push(StoreEvent::StatusChanged {
            id: next.id.clone(),
            name: next.name.clone(),
            from,
            to: next.status,
        });
    }

    *current = next;
    Ok(Applied::Replaced)
}

fn restore(
    store: &mut InnerMemoryStore,
    previous: Submission,
    failed: Submission,
    events: &mut Vec<StoreEvent>,
) -> Applied {
    let Some(current) = store.get_mut(&previous.id) else {
        return Applied::Unknown;
    };

    let id = previous.id.clone();

    // Comments appended on top of the failed record stay, only the ones the failed change
    // introduced are removed.
    let mut comments = std::mem::take(&mut current.comments);
    comments
        .retain(|comment| previous.has_comment(&comment.id) || !failed.has_comment(&comment.id));

    if same_fields(current, &failed) {
        warn!(%id, version = previous.version, "roll back failed change");
        if current.status != previous.status {
            events.push(StoreEvent::StatusChanged {
                id: id.clone(),
                name: previous.name.clone(),
                from: current.status,
                to: previous.status,
            });
        }
        let last_updated = comments
            .iter()
            .map(|comment| comment.created_at)
            .fold(previous.last_updated, |a, b| a.max(b));
        *current = previous;
        current.last_updated = last_updated;
    } else {
        warn!(%id, version = current.version, "roll back comments of failed change");
    }
    current.comments = comments;

    events.push(StoreEvent::Restored { id });
    Applied::Restored
}

/// Whether both records are equal apart from their comments and `last_updated`.
fn same_fields(current: &Submission, failed: &Submission) -> bool {
    let strip = |submission: &Submission| Submission {
        comments: Vec::new(),
        last_updated: failed.last_updated,
        ..submission.clone()
    };
    strip(current) == strip(failed)
}

impl SubmissionStore for MemoryStore {
    async fn submission(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError> {
        Ok(self.read_store().get(id).cloned())
    }

    async fn submissions(&self) -> Result<Vec<Submission>, StoreError> {
        Ok(self.snapshot())
    }

    async fn load(&self, submissions: Vec<Submission>) -> Result<usize, StoreError> {
        for submission in &submissions {
            submission.check_invariants()?;
        }

        let mut inner = InnerMemoryStore::default();
        for submission in submissions {
            match inner.index.get(&submission.id) {
                // Keep the newest record when the backend returned the same row twice.
                Some(&position) => {
                    if inner.submissions[position].version <= submission.version {
                        inner.submissions[position] = submission;
                    }
                }
                None => {
                    inner
                        .index
                        .insert(submission.id.clone(), inner.submissions.len());
                    inner.submissions.push(submission);
                }
            }
        }

        let count = inner.submissions.len();
        *self.write_store() = inner;
        debug!(count, "loaded submissions");

        self.emit(vec![StoreEvent::Loaded { count }]);
        Ok(count)
    }

    async fn apply(&self, change: Change) -> Result<Applied, StoreError> {
        self.apply_change(change)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use steward_core::{
        Actor, AssetType, Comment, CommentKind, Status, Submission, Timestamp, workflow,
    };

    use crate::traits::{Applied, Change, StoreError, StoreEvent, SubmissionStore};

    use super::MemoryStore;

    fn submission(id: &str) -> Submission {
        Submission::new(
            id,
            format!("Asset {id}"),
            AssetType::Dataset,
            "p1",
            "Analytics Team",
            Timestamp::from_secs(100),
        )
    }

    fn steward() -> Actor {
        Actor::new("u1", "Sarah Mitchell")
    }

    fn comment(submission_id: &str, at: u64) -> Comment {
        Comment::new(
            submission_id.into(),
            Actor::new("u2", "Mike Chen"),
            "Remote comment",
            CommentKind::Question,
            Timestamp::from_secs(at),
        )
    }

    #[tokio::test]
    async fn load_is_all_or_nothing() {
        let store = MemoryStore::new();
        store
            .load(vec![submission("S1"), submission("S2")])
            .await
            .unwrap();

        let mut invalid = submission("S3");
        invalid.risk_score = 150;
        let result = store.load(vec![submission("S4"), invalid]).await;
        assert_matches!(result, Err(StoreError::Invariant(_)));

        // Previous collection is still in place.
        let ids: Vec<String> = store
            .snapshot()
            .iter()
            .map(|submission| submission.id.to_string())
            .collect();
        assert_eq!(ids, vec!["S1", "S2"]);
    }

    #[tokio::test]
    async fn stale_updates_are_dropped() {
        let store = MemoryStore::new();
        store.load(vec![submission("S1")]).await.unwrap();

        let approved = workflow::approve(
            &submission("S1"),
            &steward(),
            "Looks good",
            Timestamp::from_secs(200),
        )
        .unwrap();
        assert_eq!(
            store.apply(Change::Replace(approved)).await.unwrap(),
            Applied::Replaced
        );

        // Delayed echo of the original row.
        let applied = store.apply(Change::Replace(submission("S1"))).await.unwrap();
        assert_eq!(
            applied,
            Applied::Stale {
                current: 1,
                incoming: 0
            }
        );

        let current = store.submission(&"S1".into()).await.unwrap().unwrap();
        assert_eq!(current.status, Status::Approved);
        assert_eq!(current.comments.len(), 1);
    }

    #[tokio::test]
    async fn replace_keeps_known_comments() {
        let store = MemoryStore::new();
        let mut original = submission("S1");
        original.comments.push(comment("S1", 150));
        store.load(vec![original.clone()]).await.unwrap();

        // Update events carry the row without its comments.
        let mut update = original.clone();
        update.comments.clear();
        update.status = Status::UnderReview;
        update.version = 1;
        update.last_updated = Timestamp::from_secs(120);

        let mut events = store.subscribe();
        store.apply(Change::Replace(update)).await.unwrap();

        let current = store.submission(&"S1".into()).await.unwrap().unwrap();
        assert_eq!(current.status, Status::UnderReview);
        assert_eq!(current.comments, original.comments);
        assert_eq!(current.last_updated, Timestamp::from_secs(120));

        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::Replaced { id: "S1".into() }
        );
        assert_matches!(
            events.recv().await.unwrap(),
            StoreEvent::StatusChanged {
                from: Status::Pending,
                to: Status::UnderReview,
                ..
            }
        );
    }

    #[tokio::test]
    async fn append_comment_is_idempotent() {
        let store = MemoryStore::new();
        store.load(vec![submission("S1")]).await.unwrap();

        let comment = comment("S1", 500);
        assert_eq!(
            store
                .apply(Change::AppendComment(comment.clone()))
                .await
                .unwrap(),
            Applied::Appended
        );
        assert_eq!(
            store.apply(Change::AppendComment(comment)).await.unwrap(),
            Applied::Duplicate
        );

        let current = store.submission(&"S1".into()).await.unwrap().unwrap();
        assert_eq!(current.comments.len(), 1);
        assert_eq!(current.last_updated, Timestamp::from_secs(500));
    }

    #[tokio::test]
    async fn unknown_ids_are_ignored() {
        let store = MemoryStore::new();
        store.load(vec![submission("S1")]).await.unwrap();

        assert_eq!(
            store
                .apply(Change::Replace(submission("S9")))
                .await
                .unwrap(),
            Applied::Unknown
        );
        assert_eq!(
            store
                .apply(Change::AppendComment(comment("S9", 200)))
                .await
                .unwrap(),
            Applied::Unknown
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn restore_failed_change() {
        let store = MemoryStore::new();
        let previous = submission("S1");
        store.load(vec![previous.clone()]).await.unwrap();

        let optimistic = workflow::approve(
            &previous,
            &steward(),
            "Looks good",
            Timestamp::from_secs(200),
        )
        .unwrap();
        store
            .apply(Change::Optimistic(optimistic.clone()))
            .await
            .unwrap();

        store
            .apply(Change::Restore {
                previous: previous.clone(),
                failed: optimistic,
            })
            .await
            .unwrap();

        assert_eq!(
            store.submission(&"S1".into()).await.unwrap().unwrap(),
            previous
        );
    }

    #[tokio::test]
    async fn restore_keeps_newer_remote_changes() {
        let store = MemoryStore::new();
        let previous = submission("S1");
        store.load(vec![previous.clone()]).await.unwrap();

        let optimistic = workflow::add_comment(
            &previous,
            &steward(),
            steward_core::Role::Steward,
            "Local note",
            None,
            Timestamp::from_secs(200),
        )
        .unwrap();
        store
            .apply(Change::Optimistic(optimistic.clone()))
            .await
            .unwrap();

        // Someone else started the review in the meantime.
        let mut remote = optimistic.clone();
        remote.comments.clear();
        remote.status = Status::UnderReview;
        remote.version = 2;
        store.apply(Change::Replace(remote)).await.unwrap();

        store
            .apply(Change::Restore {
                previous,
                failed: optimistic,
            })
            .await
            .unwrap();

        let current = store.submission(&"S1".into()).await.unwrap().unwrap();
        assert_eq!(current.status, Status::UnderReview);
        assert!(current.comments.is_empty());
    }

    #[tokio::test]
    async fn restore_keeps_remote_change_at_same_version() {
        let store = MemoryStore::new();
        let previous = submission("S1");
        store.load(vec![previous.clone()]).await.unwrap();

        let optimistic = workflow::add_comment(
            &previous,
            &steward(),
            steward_core::Role::Steward,
            "Local note",
            None,
            Timestamp::from_secs(200),
        )
        .unwrap();
        store
            .apply(Change::Optimistic(optimistic.clone()))
            .await
            .unwrap();

        // Another client got its approval accepted first, at the version we wanted to write.
        let remote = workflow::approve(
            &previous,
            &Actor::new("u2", "James Wilson"),
            "Approved",
            Timestamp::from_secs(150),
        )
        .unwrap();
        assert_eq!(remote.version, optimistic.version);
        store.apply(Change::Replace(remote.clone())).await.unwrap();

        store
            .apply(Change::Restore {
                previous,
                failed: optimistic,
            })
            .await
            .unwrap();

        let current = store.submission(&"S1".into()).await.unwrap().unwrap();
        assert_eq!(current.status, Status::Approved);
        assert_eq!(current.version, remote.version);
        assert_eq!(current.comments, remote.comments);
    }
}
