use super::optimistic;
use crate::client::Session;
use crate::infrastructure::NotificationApi;
use crate::types::{Notification, NotificationError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};

/// Ordered, deduplicated notification feed.
///
/// Entries are kept newest first and are unique by `id`. The store is only
/// populated through [`append`](Self::append) (pushes) and
/// [`merge`](Self::merge) (REST fetches). Read-state changes made by the user
/// go through the optimistic [`mark_read`](Self::mark_read) /
/// [`mark_all_read`](Self::mark_all_read).
///
/// Cloning is cheap; clones share the same feed.
#[derive(Clone)]
pub struct NotificationStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    feed: RwLock<Feed>,
    api: Arc<dyn NotificationApi>,
    session: RwLock<Option<Session>>,
    revision: watch::Sender<u64>,
}

#[derive(Default)]
struct Feed {
    entries: Vec<Notification>,
    /// Ids the server reported read; a failed optimistic update never unreads them
    confirmed_read: HashSet<String>,
}

impl NotificationStore {
    pub fn new(api: Arc<dyn NotificationApi>) -> Self {
        let (revision, _rx) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                feed: RwLock::new(Feed::default()),
                api,
                session: RwLock::new(None),
                revision,
            }),
        }
    }

    /// Revision counter, bumped on every change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Inserts at the head unless the id is already present
    pub async fn append(&self, notification: Notification) -> bool {
        let mut feed = self.inner.feed.write().await;
        if feed.entries.iter().any(|existing| existing.id == notification.id) {
            return false;
        }
        feed.entries.insert(0, notification);
        self.touch();
        true
    }

    /// Merges fetched entries (newest first) by id, returns how many were new.
    ///
    /// Missing entries are placed before the first local entry that is older,
    /// existing entries are left untouched.
    pub async fn merge(&self, fetched: Vec<Notification>) -> usize {
        let mut feed = self.inner.feed.write().await;
        let entries = &mut feed.entries;
        let mut added = 0;

        for notification in fetched {
            if entries.iter().any(|existing| existing.id == notification.id) {
                continue;
            }
            let position = match notification.created_at {
                Some(created_at) => entries
                    .iter()
                    .position(|existing| existing.created_at.is_some_and(|ts| ts < created_at))
                    .unwrap_or(entries.len()),
                None => entries.len(),
            };
            entries.insert(position, notification);
            added += 1;
        }

        if added > 0 {
            self.touch();
        }
        added
    }

    /// Applies a server-side read update, no REST call
    pub async fn mark_read_local(&self, id: &str) -> bool {
        let mut feed = self.inner.feed.write().await;
        let Feed {
            entries,
            confirmed_read,
        } = &mut *feed;
        let Some(entry) = entries.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        confirmed_read.insert(entry.id.clone());
        if !entry.read {
            entry.read = true;
            self.touch();
        }
        true
    }

    /// Applies a server-side bulk read update, returns how many entries changed
    pub async fn mark_all_read_local(&self) -> usize {
        let mut feed = self.inner.feed.write().await;
        let Feed {
            entries,
            confirmed_read,
        } = &mut *feed;
        let mut changed = 0;
        for entry in entries.iter_mut() {
            confirmed_read.insert(entry.id.clone());
            if !entry.read {
                entry.read = true;
                changed += 1;
            }
        }
        if changed > 0 {
            self.touch();
        }
        changed
    }

    /// Marks one notification read, optimistically.
    ///
    /// Returns `Ok(false)` for an unknown or already-read id without calling
    /// the backend. A rollback leaves the entry read when the server reported
    /// it read while the call was in flight.
    pub async fn mark_read(&self, id: &str) -> Result<bool> {
        let token = self.token().await?;
        let api = Arc::clone(&self.inner.api);

        let outcome = optimistic::apply(
            &self.inner.feed,
            |feed| {
                let entry = feed.entries.iter_mut().find(|n| n.id == id && !n.read)?;
                entry.read = true;
                self.touch();
                Some(())
            },
            || async move { api.mark_read(&token, id).await },
            |feed, ()| {
                if feed.confirmed_read.contains(id) {
                    return;
                }
                if let Some(entry) = feed.entries.iter_mut().find(|n| n.id == id) {
                    entry.read = false;
                    self.touch();
                }
            },
        )
        .await?;

        Ok(outcome.is_some())
    }

    /// Marks everything read, optimistically. Returns how many local entries changed.
    pub async fn mark_all_read(&self) -> Result<usize> {
        let token = self.token().await?;
        let api = Arc::clone(&self.inner.api);
        let mut changed = 0;

        let outcome = optimistic::apply(
            &self.inner.feed,
            |feed| {
                let unread: Vec<String> = feed
                    .entries
                    .iter_mut()
                    .filter(|n| !n.read)
                    .map(|n| {
                        n.read = true;
                        n.id.clone()
                    })
                    .collect();
                if unread.is_empty() {
                    return None;
                }
                changed = unread.len();
                self.touch();
                Some(unread)
            },
            || async move { api.mark_all_read(&token).await },
            |feed, unread| {
                let Feed {
                    entries,
                    confirmed_read,
                } = feed;
                for entry in entries
                    .iter_mut()
                    .filter(|n| unread.contains(&n.id) && !confirmed_read.contains(&n.id))
                {
                    entry.read = false;
                }
                self.touch();
            },
        )
        .await?;

        match outcome {
            Some(marked) => {
                tracing::debug!("Server marked {} notifications read", marked);
                Ok(changed)
            }
            None => Ok(0),
        }
    }

    pub async fn get(&self, id: &str) -> Option<Notification> {
        self.inner
            .feed
            .read()
            .await
            .entries
            .iter()
            .find(|n| n.id == id)
            .cloned()
    }

    /// Copy of the feed, newest first
    pub async fn snapshot(&self) -> Vec<Notification> {
        self.inner.feed.read().await.entries.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.feed.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.feed.read().await.entries.is_empty()
    }

    /// Derived from the current contents on every call
    pub async fn unread_count(&self) -> usize {
        self.inner
            .feed
            .read()
            .await
            .entries
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    /// Drops entries whose `expires_at` has passed
    pub async fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let mut feed = self.inner.feed.write().await;
        let before = feed.entries.len();
        feed.entries.retain(|n| !n.is_expired(now));
        let removed = before - feed.entries.len();
        if removed > 0 {
            let Feed {
                entries,
                confirmed_read,
            } = &mut *feed;
            confirmed_read.retain(|id| entries.iter().any(|n| &n.id == id));
            self.touch();
        }
        removed
    }

    pub async fn clear(&self) {
        let mut feed = self.inner.feed.write().await;
        feed.confirmed_read.clear();
        if !feed.entries.is_empty() {
            feed.entries.clear();
            self.touch();
        }
    }

    pub(crate) async fn bind_session(&self, session: Option<Session>) {
        *self.inner.session.write().await = session;
    }

    async fn token(&self) -> Result<String> {
        self.inner
            .session
            .read()
            .await
            .as_ref()
            .and_then(Session::token)
            .ok_or_else(|| NotificationError::Auth("no active session".to_string()))
    }

    fn touch(&self) {
        self.inner
            .revision
            .send_modify(|revision| *revision = revision.wrapping_add(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{FetchQuery, NotificationPage};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeApi {
        fail_with: Mutex<Option<NotificationError>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeApi {
        fn failing(error: NotificationError) -> Self {
            Self {
                fail_with: Mutex::new(Some(error)),
                ..Default::default()
            }
        }

        fn outcome(&self, call: String) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            match self.fail_with.lock().unwrap().take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl NotificationApi for FakeApi {
        async fn fetch_recent(&self, _token: &str, _query: FetchQuery) -> Result<NotificationPage> {
            Ok(NotificationPage::default())
        }

        async fn mark_read(&self, _token: &str, id: &str) -> Result<()> {
            self.outcome(format!("read:{id}"))
        }

        async fn mark_all_read(&self, _token: &str) -> Result<u64> {
            self.outcome("read_all".to_string()).map(|_| 2)
        }
    }

    async fn store_with(api: FakeApi) -> (NotificationStore, Arc<FakeApi>) {
        let api = Arc::new(api);
        let store = NotificationStore::new(api.clone());
        store
            .bind_session(Some(Session::with_token("7", "secret")))
            .await;
        (store, api)
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn item(id: &str, hour: u32) -> Notification {
        Notification::new(id, "title", "body").with_created_at(at(hour))
    }

    #[tokio::test]
    async fn test_append_keeps_newest_first_and_dedupes() {
        let (store, _) = store_with(FakeApi::default()).await;

        assert!(store.append(item("a", 1)).await);
        assert!(store.append(item("b", 2)).await);
        assert!(!store.append(item("a", 1)).await);

        let ids: Vec<_> = store.snapshot().await.into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_merge_inserts_only_missing_in_order() {
        let (store, _) = store_with(FakeApi::default()).await;
        store.append(item("a", 1)).await;
        store.append(item("c", 3)).await;

        let added = store
            .merge(vec![item("d", 4), item("c", 3), item("b", 2), item("a", 1)])
            .await;

        assert_eq!(added, 2);
        let ids: Vec<_> = store.snapshot().await.into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["d", "c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_merge_does_not_overwrite_local_read_state() {
        let (store, _) = store_with(FakeApi::default()).await;
        store.append(item("a", 1)).await;
        store.mark_read_local("a").await;

        store.merge(vec![item("a", 1)]).await;
        assert_eq!(store.unread_count().await, 0);
    }

    #[tokio::test]
    async fn test_mark_read_commits() {
        let (store, api) = store_with(FakeApi::default()).await;
        store.append(item("a", 1)).await;

        assert!(store.mark_read("a").await.unwrap());
        assert_eq!(store.unread_count().await, 0);
        assert_eq!(*api.calls.lock().unwrap(), vec!["read:a".to_string()]);
    }

    #[tokio::test]
    async fn test_mark_read_unknown_or_read_skips_backend() {
        let (store, api) = store_with(FakeApi::default()).await;
        store.append(item("a", 1).with_read(true)).await;

        assert!(!store.mark_read("a").await.unwrap());
        assert!(!store.mark_read("zzz").await.unwrap());
        assert!(api.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_failure_rolls_back() {
        let (store, _) = store_with(FakeApi::failing(NotificationError::Connection(
            "connection refused".to_string(),
        )))
        .await;
        store.append(item("a", 1)).await;

        assert!(store.mark_read("a").await.is_err());
        assert_eq!(store.unread_count().await, 1);
        assert!(!store.get("a").await.unwrap().read);
    }

    /// Holds `mark_read` until released, then fails with a transient error
    struct StalledApi {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl NotificationApi for StalledApi {
        async fn fetch_recent(&self, _token: &str, _query: FetchQuery) -> Result<NotificationPage> {
            Ok(NotificationPage::default())
        }

        async fn mark_read(&self, _token: &str, _id: &str) -> Result<()> {
            self.entered.notify_one();
            self.release.notified().await;
            Err(NotificationError::Timeout)
        }

        async fn mark_all_read(&self, _token: &str) -> Result<u64> {
            self.entered.notify_one();
            self.release.notified().await;
            Err(NotificationError::Timeout)
        }
    }

    async fn stalled_store() -> (NotificationStore, Arc<StalledApi>) {
        let api = Arc::new(StalledApi {
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let store = NotificationStore::new(api.clone());
        store
            .bind_session(Some(Session::with_token("7", "secret")))
            .await;
        (store, api)
    }

    #[tokio::test]
    async fn test_rollback_keeps_read_confirmed_by_server() {
        let (store, api) = stalled_store().await;
        store.append(item("a", 1)).await;

        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.mark_read("a").await }
        });
        api.entered.notified().await;

        // The server pushes the read while the REST call is still in flight
        assert!(store.mark_read_local("a").await);
        api.release.notify_one();

        assert!(pending.await.unwrap().is_err());
        assert!(store.get("a").await.unwrap().read);
    }

    #[tokio::test]
    async fn test_bulk_rollback_skips_entries_read_by_server() {
        let (store, api) = stalled_store().await;
        store.append(item("a", 1)).await;
        store.append(item("b", 2)).await;

        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.mark_all_read().await }
        });
        api.entered.notified().await;

        store.mark_read_local("b").await;
        api.release.notify_one();

        assert!(pending.await.unwrap().is_err());
        assert!(store.get("b").await.unwrap().read);
        assert!(!store.get("a").await.unwrap().read);
    }

    #[tokio::test]
    async fn test_mark_read_unauthorized_keeps_local_change() {
        let (store, _) = store_with(FakeApi::failing(NotificationError::Unauthorized)).await;
        store.append(item("a", 1)).await;

        let err = store.mark_read("a").await.unwrap_err();
        assert!(err.is_auth_failure());
        assert_eq!(store.unread_count().await, 0);
    }

    #[tokio::test]
    async fn test_mark_all_read_rollback_restores_only_changed() {
        let (store, _) = store_with(FakeApi::failing(NotificationError::Api {
            status: 500,
            message: "boom".to_string(),
        }))
        .await;
        store.append(item("a", 1).with_read(true)).await;
        store.append(item("b", 2)).await;
        store.append(item("c", 3)).await;

        assert!(store.mark_all_read().await.is_err());
        assert_eq!(store.unread_count().await, 2);
        assert!(store.get("a").await.unwrap().read);
    }

    #[tokio::test]
    async fn test_mark_all_read_reports_changed() {
        let (store, _) = store_with(FakeApi::default()).await;
        store.append(item("a", 1)).await;
        store.append(item("b", 2)).await;

        assert_eq!(store.mark_all_read().await.unwrap(), 2);
        assert_eq!(store.mark_all_read().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mutation_without_session_fails() {
        let store = NotificationStore::new(Arc::new(FakeApi::default()));
        store.append(item("a", 1)).await;

        let err = store.mark_read("a").await.unwrap_err();
        assert!(matches!(err, NotificationError::Auth(_)));
        assert_eq!(store.unread_count().await, 1);
    }

    #[tokio::test]
    async fn test_prune_expired() {
        let (store, _) = store_with(FakeApi::default()).await;
        store
            .append(item("old", 1).with_expires_at(at(2)))
            .await;
        store.append(item("fresh", 3)).await;

        assert_eq!(store.prune_expired(at(2) + Duration::minutes(1)).await, 1);
        assert!(store.get("old").await.is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_revision_bumps_on_change() {
        let (store, _) = store_with(FakeApi::default()).await;
        let mut revision = store.subscribe();

        store.append(item("a", 1)).await;
        assert!(revision.has_changed().unwrap());
        let _ = revision.borrow_and_update();

        store.append(item("a", 1)).await;
        assert!(!revision.has_changed().unwrap());
    }
}
