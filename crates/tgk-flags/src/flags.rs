//! Flags feature wiring
//!
//! [`Flags`] ties a registry, an uploader and a consistency keeper together:
//!
//! - registry `did_update` uploads the new set
//! - uploader `did_upload` records the set as the keeper snapshot
//! - the lifecycle trigger runs a keeper check, reuploading on divergence

use crate::descriptor::FlagDescriptor;
use crate::error::Result;
use crate::registry::FlagsRegistry;
use crate::uploader::{FavoritesUpload, FlagsUploader};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tgk_consistency::{CheckOutcome, Reupload, UploadConsistencyKeeper};
use tgk_event::{Dispatcher, Subscribe, Subscription};
use tgk_storage::prelude::*;

/// One flag feature, such as favorite teams
pub struct Flags<D: FlagDescriptor> {
    registry: Arc<FlagsRegistry<D>>,
    uploader: Arc<FlagsUploader<D>>,
    keeper: Arc<UploadConsistencyKeeper<HashSet<D::Id>>>,
}

impl<D: FlagDescriptor> fmt::Debug for Flags<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flags")
            .field("registry", &self.registry)
            .field("uploader", &self.uploader)
            .field("keeper", &self.keeper)
            .finish()
    }
}

impl<D: FlagDescriptor> Flags<D> {
    /// Wire `registry` and `uploader` through a keeper with snapshot `last_uploaded`
    #[must_use]
    pub fn new(
        registry: Arc<FlagsRegistry<D>>,
        uploader: Arc<FlagsUploader<D>>,
        last_uploaded: SharedStorage<(), HashSet<D::Id>>,
        dispatcher: Dispatcher,
    ) -> Self {
        let reupload_to = Arc::downgrade(&uploader);
        let reupload: Reupload<HashSet<D::Id>> = Arc::new(move |favorites: HashSet<D::Id>| {
            if let Some(uploader) = reupload_to.upgrade() {
                uploader.upload(favorites);
            }
        });
        let keeper = UploadConsistencyKeeper::new(
            format!("keeper-notifications-{}", D::NAME),
            registry.latest(),
            last_uploaded,
            dispatcher,
            reupload,
        );
        Self {
            registry,
            uploader,
            keeper: Arc::new(keeper),
        }
    }

    /// Like [`new`](Self::new), keeping the snapshot in `keepers_disk`
    ///
    /// The snapshot lives at `keeper-notifications-<name>` and reads as the
    /// empty set until the first confirmed upload.
    ///
    /// # Errors
    /// `KeyMapping` if the descriptor name is not a valid file name
    pub fn with_keepers_storage(
        registry: Arc<FlagsRegistry<D>>,
        uploader: Arc<FlagsUploader<D>>,
        keepers_disk: FileSystemStorage,
        dispatcher: Dispatcher,
    ) -> Result<Self> {
        let last_uploaded = keepers_disk
            .map_json()
            .map_boxed_set::<D::Id>()
            .single_key(D::keeper_filename()?)
            .defaulting(HashSet::new())
            .shared();
        Ok(Self::new(registry, uploader, last_uploaded, dispatcher))
    }

    /// Run a consistency check every time `should_check` fires
    pub fn start(&self, should_check: &Subscribe<()>) -> Subscription {
        self.keeper.check_listening_to(should_check)
    }

    /// Connect registry updates to uploads and uploads to the keeper snapshot
    pub fn subscribe(&self) -> Subscription {
        let uploaded = self
            .uploader
            .did_upload()
            .map(|upload: &FavoritesUpload<D::Id>| upload.favorites.clone());
        let snapshots = self.keeper.subscribe_to_did_upload(&uploaded);
        let uploads = self.uploader.subscribe_to(&self.registry.did_update_flags());
        snapshots.and(uploads)
    }

    /// Run one consistency check now
    pub async fn check(&self) -> CheckOutcome {
        self.keeper.check().await
    }

    /// The registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<FlagsRegistry<D>> {
        &self.registry
    }

    /// The uploader
    #[inline]
    #[must_use]
    pub fn uploader(&self) -> &Arc<FlagsUploader<D>> {
        &self.uploader
    }

    /// The keeper
    #[inline]
    #[must_use]
    pub fn keeper(&self) -> &Arc<UploadConsistencyKeeper<HashSet<D::Id>>> {
        &self.keeper
    }

    /// Wait for checks, then uploads, then snapshot writes started so far
    pub async fn settle(&self) {
        self.keeper.settle_checks().await;
        self.uploader.settle().await;
        self.keeper.settle_persists().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FavoriteMatches;
    use crate::token::PushToken;
    use tgk_models::MatchId;
    use uuid::Uuid;

    struct Fixture {
        sent: MemoryStorage<(), FavoritesUpload<MatchId>>,
        snapshot: MemoryStorage<(), HashSet<MatchId>>,
        flags: Flags<FavoriteMatches>,
    }

    fn fixture() -> Fixture {
        let dispatcher = Dispatcher::current().unwrap();
        let sent = MemoryStorage::<(), FavoritesUpload<MatchId>>::new();
        let snapshot = MemoryStorage::<(), HashSet<MatchId>>::new();
        let registry = Arc::new(FlagsRegistry::<FavoriteMatches>::new(
            MemoryStorage::<(), HashSet<MatchId>>::new().shared(),
        ));
        let uploader = Arc::new(FlagsUploader::new(
            sent.clone().write_only(),
            DevStorage::successing(PushToken::new(vec![7])).read_only(),
            Arc::new(|| Some(Uuid::nil())),
            dispatcher.clone(),
        ));
        let flags = Flags::new(
            registry,
            uploader,
            snapshot.clone().defaulting(HashSet::new()).shared(),
            dispatcher,
        );
        Fixture {
            sent,
            snapshot,
            flags,
        }
    }

    #[tokio::test]
    async fn check_before_load_is_skipped() {
        let f = fixture();
        assert_eq!(f.flags.check().await, CheckOutcome::Skipped);
    }

    #[tokio::test]
    async fn update_uploads_and_records_snapshot() {
        let f = fixture();
        f.flags.registry().load().await.unwrap();
        let _wiring = f.flags.subscribe();

        f.flags.registry().update_presence(MatchId(11), true).await.unwrap();
        f.flags.settle().await;

        let expected: HashSet<MatchId> = [MatchId(11)].into_iter().collect();
        assert_eq!(f.sent.retrieve(()).await.unwrap().favorites, expected);
        assert_eq!(f.snapshot.retrieve(()).await.unwrap(), expected);
        assert_eq!(f.flags.check().await, CheckOutcome::Consistent);
    }
}
