use std::collections::HashSet;
use std::sync::Arc;
use tgk_consistency::prelude::*;
use tgk_event::prelude::*;
use tgk_storage::prelude::*;
use tgk_test_utils::{ids, init_tracing, FlakyWriter, RecordingStorage};

type Ids = HashSet<i64>;

struct Harness {
    model: LocalModel<Ids>,
    snapshot: RecordingStorage<(), Ids>,
    remote: FlakyWriter<Ids>,
    uploads: Arc<PendingTasks>,
    keeper: Arc<UploadConsistencyKeeper<Ids>>,
}

impl Harness {
    fn new(remote: FlakyWriter<Ids>) -> Self {
        init_tracing();
        let dispatcher = Dispatcher::current().unwrap();
        let model = LocalModel::new(
            MemoryStorage::<(), Ids>::new()
                .defaulting(HashSet::new())
                .shared(),
        );
        let snapshot = RecordingStorage::<(), Ids>::new("keeper-notifications-test");
        let did_upload = Publisher::<Ids>::new("did-upload");
        let uploads = Arc::new(PendingTasks::new());

        let reupload: Reupload<Ids> = {
            let (remote, did_upload, uploads, dispatcher) =
                (remote.clone(), did_upload.clone(), Arc::clone(&uploads), dispatcher.clone());
            Arc::new(move |value: Ids| {
                let (remote, did_upload) = (remote.clone(), did_upload.clone());
                uploads.push(dispatcher.spawn(async move {
                    if remote.set(value.clone(), ()).await.is_ok() {
                        did_upload.publish(value);
                    }
                }));
            })
        };

        let keeper = Arc::new(UploadConsistencyKeeper::new(
            "test-flags-keeper",
            model.access(),
            snapshot.clone().defaulting(HashSet::new()).shared(),
            dispatcher,
            reupload,
        ));
        keeper.subscribe_to_did_upload(&did_upload.proxy());

        Self {
            model,
            snapshot,
            remote,
            uploads,
            keeper,
        }
    }

    async fn check(&self) -> CheckOutcome {
        let outcome = self.keeper.check().await;
        self.uploads.settle().await;
        self.keeper.settle_persists().await;
        outcome
    }
}

#[tokio::test]
async fn test_end_to_end_favorite_reaches_snapshot() {
    let h = Harness::new(FlakyWriter::reliable());

    assert_eq!(h.check().await, CheckOutcome::Consistent);
    assert_eq!(h.remote.attempts(), 0);

    h.model.update(ids(&[7])).await.unwrap();
    assert_eq!(h.check().await, CheckOutcome::Reuploaded);
    assert_eq!(h.remote.written(), vec![ids(&[7])]);
    assert_eq!(h.snapshot.peek(&()), Some(ids(&[7])));

    assert_eq!(h.check().await, CheckOutcome::Consistent);
    assert_eq!(h.remote.attempts(), 1);
}

#[tokio::test]
async fn test_failed_upload_is_retried_on_next_trigger() {
    let h = Harness::new(FlakyWriter::failing_first(2));
    h.model.update(ids(&[7, 13])).await.unwrap();

    assert_eq!(h.check().await, CheckOutcome::Reuploaded);
    assert_eq!(h.snapshot.peek(&()), None);
    assert_eq!(h.check().await, CheckOutcome::Reuploaded);
    assert_eq!(h.snapshot.peek(&()), None);

    assert_eq!(h.check().await, CheckOutcome::Reuploaded);
    assert_eq!(h.snapshot.peek(&()), Some(ids(&[7, 13])));
    assert_eq!(h.remote.attempts(), 3);

    assert_eq!(h.check().await, CheckOutcome::Consistent);
    assert_eq!(h.remote.attempts(), 3);
}

#[tokio::test]
async fn test_newer_change_during_upload_is_reconciled_later() {
    let h = Harness::new(FlakyWriter::reliable());
    h.model.update(ids(&[1])).await.unwrap();
    assert_eq!(h.check().await, CheckOutcome::Reuploaded);

    h.model.update(ids(&[1, 2])).await.unwrap();
    assert_eq!(h.check().await, CheckOutcome::Reuploaded);
    assert_eq!(h.snapshot.peek(&()), Some(ids(&[1, 2])));
    assert_eq!(h.remote.written(), vec![ids(&[1]), ids(&[1, 2])]);
}

#[tokio::test]
async fn test_unreadable_snapshot_only_costs_extra_reuploads() {
    let h = Harness::new(FlakyWriter::reliable());
    h.model.update(ids(&[5])).await.unwrap();
    assert_eq!(h.check().await, CheckOutcome::Reuploaded);

    h.snapshot.fail_reads(StorageError::not_found("cache", &()));
    assert_eq!(h.check().await, CheckOutcome::Reuploaded);
    h.snapshot.fail_reads(StorageError::transport("cache", "purged"));
    assert_eq!(h.check().await, CheckOutcome::Reuploaded);

    h.snapshot.heal();
    assert_eq!(h.check().await, CheckOutcome::Consistent);
    assert_eq!(h.remote.attempts(), 3);
}

#[tokio::test]
async fn test_lifecycle_trigger_drives_checks() {
    let h = Harness::new(FlakyWriter::reliable());
    let lifecycle = Lifecycle::new();
    h.keeper
        .check_listening_to(&lifecycle.should_check_upload_consistency());

    h.model.update(ids(&[3])).await.unwrap();
    lifecycle.did_launch().publish(());
    h.keeper.settle_checks().await;
    h.uploads.settle().await;
    h.keeper.settle_persists().await;

    assert_eq!(h.snapshot.peek(&()), Some(ids(&[3])));
}
