//! Upload consistency keeper
//!
//! Reconciles the value the device wants uploaded (`latest`) with the last
//! value the remote side confirmed (`last_uploaded`).
//!
//! # Protocol
//!
//! 1. `check` reads both values.
//! 2. A failed `latest` read skips the check; nothing is uploaded from an
//!    incomplete picture.
//! 3. A failed `last_uploaded` read counts as "never uploaded".
//! 4. Equal values are a no-op. Different values invoke `reupload(latest)`.
//! 5. The snapshot is only written when the owner reports a confirmed upload
//!    through [`subscribe_to_did_upload`](UploadConsistencyKeeper::subscribe_to_did_upload).
//!
//! A failed upload never touches the snapshot, so the next trigger detects
//! the divergence again. There is no retry loop of its own.

use std::fmt;
use std::sync::{Arc, Weak};
use tgk_event::{Dispatcher, PendingTasks, Subscribe, Subscription};
use tgk_storage::{NamedStorage, ReadableStorage, Result, Retrieve, SharedStorage, WritableStorage};

/// Callback performing the actual upload
pub type Reupload<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Outcome of one consistency check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Latest value matches the uploaded snapshot
    Consistent,
    /// Values diverged and `reupload` was invoked
    Reuploaded,
    /// Latest value could not be read, nothing was decided
    Skipped,
}

/// Keeps a remotely uploaded value consistent with a local one
pub struct UploadConsistencyKeeper<T> {
    name: Arc<str>,
    latest: Retrieve<T>,
    last_uploaded: SharedStorage<(), T>,
    reupload: Reupload<T>,
    dispatcher: Dispatcher,
    checks: PendingTasks,
    persists: PendingTasks,
}

impl<T> fmt::Debug for UploadConsistencyKeeper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadConsistencyKeeper")
            .field("name", &self.name)
            .field("latest", &self.latest.storage_name())
            .field("last_uploaded", &self.last_uploaded.storage_name())
            .finish_non_exhaustive()
    }
}

impl<T> UploadConsistencyKeeper<T>
where
    T: PartialEq + Clone + Send + Sync + 'static,
{
    /// Create keeper
    ///
    /// `last_uploaded` is usually a defaulting storage so a fresh install
    /// compares against an empty value instead of uploading it.
    #[must_use]
    pub fn new(
        name: impl Into<Arc<str>>,
        latest: Retrieve<T>,
        last_uploaded: SharedStorage<(), T>,
        dispatcher: Dispatcher,
        reupload: Reupload<T>,
    ) -> Self {
        Self {
            name: name.into(),
            latest,
            last_uploaded,
            reupload,
            dispatcher,
            checks: PendingTasks::new(),
            persists: PendingTasks::new(),
        }
    }

    /// Diagnostic name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compare `latest` with the uploaded snapshot and reupload on divergence
    ///
    /// Snapshot writes already in flight finish before the comparison, so a
    /// confirmed upload is never mistaken for a divergence.
    pub async fn check(&self) -> CheckOutcome {
        self.persists.settle().await;

        let (latest, last_uploaded) =
            tokio::join!(self.latest.retrieve(()), self.last_uploaded.retrieve(()));

        let latest = match latest {
            Ok(latest) => latest,
            Err(err) => {
                tracing::warn!(keeper = %self.name, error = %err, "cannot read latest value, skipping check");
                return CheckOutcome::Skipped;
            }
        };

        match last_uploaded {
            Ok(uploaded) if uploaded == latest => {
                tracing::debug!(keeper = %self.name, "uploaded value is up to date");
                CheckOutcome::Consistent
            }
            Ok(_) => {
                tracing::debug!(keeper = %self.name, "uploaded value diverged, reuploading");
                (self.reupload)(latest);
                CheckOutcome::Reuploaded
            }
            Err(err) => {
                tracing::debug!(keeper = %self.name, error = %err, "no uploaded snapshot, reuploading");
                (self.reupload)(latest);
                CheckOutcome::Reuploaded
            }
        }
    }

    /// Record `value` as the last confirmed upload
    ///
    /// # Errors
    /// Any error of the snapshot storage
    pub async fn persist_uploaded(&self, value: T) -> Result<()> {
        match self.last_uploaded.set(value, ()).await {
            Ok(()) => {
                tracing::debug!(keeper = %self.name, "persisted uploaded snapshot");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(keeper = %self.name, error = %err, "failed to persist uploaded snapshot");
                Err(err)
            }
        }
    }

    /// Run `check` in the background
    pub fn check_in_background(self: &Arc<Self>) {
        let keeper = Arc::clone(self);
        let handle = self.dispatcher.spawn(async move {
            keeper.check().await;
        });
        self.checks.push(handle);
    }

    /// Run a background check every time `trigger` fires
    pub fn check_listening_to(self: &Arc<Self>, trigger: &Subscribe<()>) -> Subscription {
        let keeper = Arc::downgrade(self);
        trigger.subscribe(move |()| {
            if let Some(keeper) = keeper.upgrade() {
                keeper.check_in_background();
            }
        })
    }

    /// Persist every value reported by `did_upload` as the new snapshot
    pub fn subscribe_to_did_upload(self: &Arc<Self>, did_upload: &Subscribe<T>) -> Subscription {
        let keeper: Weak<Self> = Arc::downgrade(self);
        did_upload.subscribe(move |value: &T| {
            let Some(keeper) = keeper.upgrade() else {
                return;
            };
            let value = value.clone();
            let persisting = Arc::clone(&keeper);
            let handle = keeper.dispatcher.spawn(async move {
                // failure is logged inside, the next check will reupload
                let _ = persisting.persist_uploaded(value).await;
            });
            keeper.persists.push(handle);
        })
    }

    /// Wait for background checks started so far
    pub async fn settle_checks(&self) {
        self.checks.settle().await;
    }

    /// Wait for snapshot writes started so far
    pub async fn settle_persists(&self) {
        self.persists.settle().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tgk_storage::prelude::*;

    struct Fixture {
        latest: MemoryStorage<(), Vec<u32>>,
        uploaded: MemoryStorage<(), Vec<u32>>,
        reuploads: Arc<Mutex<Vec<Vec<u32>>>>,
        keeper: Arc<UploadConsistencyKeeper<Vec<u32>>>,
    }

    fn fixture() -> Fixture {
        let latest = MemoryStorage::<(), Vec<u32>>::new();
        let uploaded = MemoryStorage::<(), Vec<u32>>::new();
        let reuploads = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reuploads);
        let keeper = Arc::new(UploadConsistencyKeeper::new(
            "test-keeper",
            latest.clone().read_only(),
            uploaded.clone().defaulting(Vec::new()).shared(),
            Dispatcher::current().unwrap(),
            Arc::new(move |value: Vec<u32>| sink.lock().push(value)),
        ));
        Fixture {
            latest,
            uploaded,
            reuploads,
            keeper,
        }
    }

    #[tokio::test]
    async fn unreadable_latest_skips() {
        let f = fixture();
        assert_eq!(f.keeper.check().await, CheckOutcome::Skipped);
        assert!(f.reuploads.lock().is_empty());
    }

    #[tokio::test]
    async fn equal_values_are_consistent() {
        let f = fixture();
        f.latest.set(Vec::new(), ()).await.unwrap();
        assert_eq!(f.keeper.check().await, CheckOutcome::Consistent);
    }

    #[tokio::test]
    async fn repeated_checks_reupload_until_confirmed() {
        let f = fixture();
        f.latest.set(vec![7], ()).await.unwrap();

        assert_eq!(f.keeper.check().await, CheckOutcome::Reuploaded);
        assert_eq!(f.keeper.check().await, CheckOutcome::Reuploaded);
        assert_eq!(*f.reuploads.lock(), vec![vec![7], vec![7]]);

        f.keeper.persist_uploaded(vec![7]).await.unwrap();
        assert_eq!(f.uploaded.retrieve(()).await.unwrap(), vec![7]);
        assert_eq!(f.keeper.check().await, CheckOutcome::Consistent);
        assert_eq!(f.reuploads.lock().len(), 2);
    }

    #[tokio::test]
    async fn missing_snapshot_without_default_reuploads() {
        let latest = DevStorage::successing(3_u8);
        let calls = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&calls);
        let keeper = UploadConsistencyKeeper::new(
            "no-default",
            latest.read_only(),
            MemoryStorage::<(), u8>::new().shared(),
            Dispatcher::current().unwrap(),
            Arc::new(move |_: u8| *sink.lock() += 1),
        );
        assert_eq!(keeper.check().await, CheckOutcome::Reuploaded);
        assert_eq!(*calls.lock(), 1);
    }

    #[tokio::test]
    async fn did_upload_persists_before_next_check() {
        let f = fixture();
        let did_upload = tgk_event::Publisher::<Vec<u32>>::new("did-upload");
        f.keeper.subscribe_to_did_upload(&did_upload.proxy());
        f.latest.set(vec![1, 2], ()).await.unwrap();

        did_upload.publish(vec![1, 2]);
        f.keeper.settle_persists().await;
        assert_eq!(f.keeper.check().await, CheckOutcome::Consistent);
        assert!(f.reuploads.lock().is_empty());
    }

    #[tokio::test]
    async fn trigger_runs_checks_in_background() {
        let f = fixture();
        let trigger = tgk_event::Publisher::<()>::new("should-check");
        f.keeper.check_listening_to(&trigger.proxy());
        f.latest.set(vec![9], ()).await.unwrap();

        trigger.publish(());
        f.keeper.settle_checks().await;
        assert_eq!(*f.reuploads.lock(), vec![vec![9]]);
    }

    proptest::proptest! {
        #[test]
        fn second_check_never_reuploads(latest in proptest::collection::vec(0_u32..100, 0..8)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let reuploads = rt.block_on(async {
                let f = fixture();
                f.latest.set(latest.clone(), ()).await.unwrap();
                let first = f.keeper.check().await;
                if first == CheckOutcome::Reuploaded {
                    f.keeper.persist_uploaded(latest).await.unwrap();
                }
                assert_eq!(f.keeper.check().await, CheckOutcome::Consistent);
                let count = f.reuploads.lock().len();
                count
            });
            proptest::prop_assert!(reuploads <= 1);
        }
    }
}
