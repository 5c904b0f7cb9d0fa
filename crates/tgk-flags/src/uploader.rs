//! Favorites uploader
//!
//! Sends the full flagged set, tagged with the device identifier and push
//! token, through a write-only storage. Confirmed uploads go to `did_upload`,
//! failures to `did_fail`. The uploader never retries on its own.

use crate::descriptor::{FlagDescriptor, FlagId};
use crate::error::FlagsError;
use crate::token::{DeviceIdentifier, PushToken};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};
use tgk_event::{Dispatcher, PendingTasks, Publisher, Subscribe, Subscription};
use tgk_mapping::prelude::*;
use tgk_storage::prelude::*;
use uuid::Uuid;

/// Body registering the flagged set for a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoritesUpload<Id: FlagId> {
    /// Device the flags belong to
    pub device_identifier: Uuid,
    /// Token notifications for these flags go to
    pub token: PushToken,
    /// Flagged ids
    pub favorites: HashSet<Id>,
}

tgk_mapping::mapping_keys! {
    /// Keys of a favorites upload body
    pub enum FavoritesUploadKeys {
        DeviceIdentifier => "device_identifier",
        Token => "token",
        Favorites => "favorites",
    }
}

impl<Id: FlagId> Mappable for FavoritesUpload<Id> {
    type Keys = FavoritesUploadKeys;

    fn in_map(_mapper: &InMapper<'_, FavoritesUploadKeys>) -> Result<Self, MappingError> {
        Err(MappingError::OutMapOnly("FavoritesUpload"))
    }

    fn out_map(&self, mapper: &mut OutMapper<FavoritesUploadKeys>) -> Result<(), MappingError> {
        let mut favorites: Vec<Id> = self.favorites.iter().copied().collect();
        favorites.sort_unstable();
        mapper.map(&self.device_identifier, FavoritesUploadKeys::DeviceIdentifier);
        mapper.map(&self.token, FavoritesUploadKeys::Token);
        mapper.map(&favorites, FavoritesUploadKeys::Favorites);
        Ok(())
    }
}

/// An upload that did not reach the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure<Id: FlagId> {
    /// Why it failed
    pub reason: FlagsError,
    /// The set that was attempted
    pub favorites: HashSet<Id>,
}

/// Uploads flagged sets of descriptor `D`
pub struct FlagsUploader<D: FlagDescriptor> {
    pusher: WriteOnlyStorage<(), FavoritesUpload<D::Id>>,
    token: Retrieve<PushToken>,
    device_identifier: DeviceIdentifier,
    dispatcher: Dispatcher,
    uploads: PendingTasks,
    did_upload: Publisher<FavoritesUpload<D::Id>>,
    did_fail: Publisher<UploadFailure<D::Id>>,
}

impl<D: FlagDescriptor> fmt::Debug for FlagsUploader<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagsUploader")
            .field("descriptor", &D::NAME)
            .field("pusher", &self.pusher.storage_name())
            .field("in_flight", &self.uploads.in_flight())
            .finish_non_exhaustive()
    }
}

impl<D: FlagDescriptor> FlagsUploader<D> {
    /// Create uploader
    #[must_use]
    pub fn new(
        pusher: WriteOnlyStorage<(), FavoritesUpload<D::Id>>,
        token: Retrieve<PushToken>,
        device_identifier: DeviceIdentifier,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            pusher,
            token,
            device_identifier,
            dispatcher,
            uploads: PendingTasks::new(),
            did_upload: Publisher::new(format!("{}.did-upload", D::NAME)),
            did_fail: Publisher::new(format!("{}.did-fail", D::NAME)),
        }
    }

    /// Serialize uploads as JSON bytes for `pusher`
    #[must_use]
    pub fn adapt(
        pusher: WriteOnlyStorage<(), Vec<u8>>,
    ) -> WriteOnlyStorage<(), FavoritesUpload<D::Id>> {
        pusher
            .map_json()
            .map_mappable::<FavoritesUpload<D::Id>>()
            .write_only()
    }

    /// Upload `favorites` in the background
    pub fn upload(&self, favorites: HashSet<D::Id>) {
        let pusher = Arc::clone(&self.pusher);
        let token = Arc::clone(&self.token);
        let device_identifier = (self.device_identifier)();
        let did_upload = self.did_upload.clone();
        let did_fail = self.did_fail.clone();

        let handle = self.dispatcher.spawn(async move {
            let attempt = async {
                let device_identifier =
                    device_identifier.ok_or(FlagsError::MissingDeviceIdentifier)?;
                let token = token.retrieve(()).await?;
                let upload = FavoritesUpload {
                    device_identifier,
                    token,
                    favorites: favorites.clone(),
                };
                pusher.set(upload.clone(), ()).await?;
                Ok::<_, FlagsError>(upload)
            };

            match attempt.await {
                Ok(upload) => {
                    tracing::debug!(
                        uploader = D::NAME,
                        count = upload.favorites.len(),
                        "favorites uploaded"
                    );
                    did_upload.publish(upload);
                }
                Err(reason) => {
                    tracing::warn!(uploader = D::NAME, error = %reason, "cannot upload favorites");
                    did_fail.publish(UploadFailure { reason, favorites });
                }
            }
        });
        self.uploads.push(handle);
    }

    /// Upload every set published by `did_update`
    pub fn subscribe_to(self: &Arc<Self>, did_update: &Subscribe<HashSet<D::Id>>) -> Subscription {
        let uploader: Weak<Self> = Arc::downgrade(self);
        did_update.subscribe(move |favorites: &HashSet<D::Id>| {
            if let Some(uploader) = uploader.upgrade() {
                uploader.upload(favorites.clone());
            }
        })
    }

    /// Confirmed uploads
    #[must_use]
    pub fn did_upload(&self) -> Subscribe<FavoritesUpload<D::Id>> {
        self.did_upload.proxy()
    }

    /// Failed uploads, for diagnostics
    #[must_use]
    pub fn did_fail(&self) -> Subscribe<UploadFailure<D::Id>> {
        self.did_fail.proxy()
    }

    /// Wait for uploads started so far
    pub async fn settle(&self) {
        self.uploads.settle().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FavoriteTeams;
    use parking_lot::Mutex;
    use serde_json::json;
    use tgk_models::TeamId;

    fn teams(ids: &[i64]) -> HashSet<TeamId> {
        ids.iter().copied().map(TeamId).collect()
    }

    #[test]
    fn favorites_are_sent_sorted() {
        let upload = FavoritesUpload {
            device_identifier: Uuid::nil(),
            token: PushToken::new(vec![0xff]),
            favorites: teams(&[9, 2, 5]),
        };
        assert_eq!(
            to_json(&upload).unwrap(),
            json!({
                "device_identifier": "00000000-0000-0000-0000-000000000000",
                "token": "ff",
                "favorites": [2, 5, 9],
            })
        );
    }

    #[tokio::test]
    async fn upload_writes_json_body() {
        let outbox = MemoryStorage::<(), Vec<u8>>::new();
        let uploader = FlagsUploader::<FavoriteTeams>::new(
            FlagsUploader::<FavoriteTeams>::adapt(outbox.clone().write_only()),
            DevStorage::successing(PushToken::new(vec![1])).read_only(),
            Arc::new(|| Some(Uuid::nil())),
            Dispatcher::current().unwrap(),
        );

        uploader.upload(teams(&[3]));
        uploader.settle().await;

        let body: serde_json::Value =
            serde_json::from_slice(&outbox.retrieve(()).await.unwrap()).unwrap();
        assert_eq!(body["favorites"], json!([3]));
        assert_eq!(body["token"], json!("01"));
    }

    #[tokio::test]
    async fn missing_token_is_reported() {
        let uploader = FlagsUploader::<FavoriteTeams>::new(
            MemoryStorage::<(), FavoritesUpload<TeamId>>::new().write_only(),
            DevStorage::failing(StorageError::not_found("token", &())).read_only(),
            Arc::new(|| Some(Uuid::nil())),
            Dispatcher::current().unwrap(),
        );
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&failures);
        uploader
            .did_fail()
            .subscribe(move |failure: &UploadFailure<TeamId>| sink.lock().push(failure.clone()));
        let uploads = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&uploads);
        uploader.did_upload().subscribe(move |_| *counter.lock() += 1);

        uploader.upload(teams(&[1, 2]));
        uploader.settle().await;

        assert_eq!(*uploads.lock(), 0);
        let failures = failures.lock();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].favorites, teams(&[1, 2]));
        assert!(matches!(&failures[0].reason, FlagsError::Storage(err) if err.is_not_found()));
    }

    #[tokio::test]
    async fn missing_device_identifier_is_reported() {
        let uploader = FlagsUploader::<FavoriteTeams>::new(
            MemoryStorage::<(), FavoritesUpload<TeamId>>::new().write_only(),
            DevStorage::successing(PushToken::new(vec![1])).read_only(),
            Arc::new(|| None),
            Dispatcher::current().unwrap(),
        );
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&failures);
        uploader
            .did_fail()
            .subscribe(move |failure: &UploadFailure<TeamId>| sink.lock().push(failure.reason.clone()));

        uploader.upload(teams(&[1]));
        uploader.settle().await;
        assert_eq!(*failures.lock(), vec![FlagsError::MissingDeviceIdentifier]);
    }
}
