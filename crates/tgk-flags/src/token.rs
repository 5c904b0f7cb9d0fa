//! Push token registration
//!
//! [`TokenUploader`] keeps the device's push token registered with the
//! notifications backend. It owns a consistency keeper comparing the current
//! token with the last one the backend accepted, so a rotated token or a
//! failed upload is sent again on the next lifecycle trigger.

use crate::error::{FlagsError, Result};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};
use tgk_consistency::{Reupload, UploadConsistencyKeeper};
use tgk_event::{Dispatcher, PendingTasks, Publisher, Subscribe, Subscription};
use tgk_mapping::prelude::*;
use tgk_storage::prelude::*;
use uuid::Uuid;

/// Name of the keeper owned by [`TokenUploader`], also its snapshot file name
pub const TOKEN_KEEPER_NAME: &str = "token-uploader-consistency-keeper";

/// Source of the device identifier, `None` while unavailable
pub type DeviceIdentifier = Arc<dyn Fn() -> Option<Uuid> + Send + Sync>;

/// Raw push notification token
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PushToken(Vec<u8>);

impl PushToken {
    /// Wrap raw token bytes
    #[inline]
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse the hex form
    ///
    /// # Errors
    /// [`FlagsError::InvalidToken`] for odd length or non-hex characters
    pub fn from_hex(text: &str) -> Result<Self> {
        hex::decode(text.trim())
            .map(Self)
            .map_err(|err| FlagsError::InvalidToken(err.to_string()))
    }

    /// Lowercase hex form, as sent to the backend
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Raw bytes
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PushToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PushToken").field(&self.to_hex()).finish()
    }
}

impl fmt::Display for PushToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl MapValue for PushToken {
    const EXPECTED: &'static str = "hex string";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().and_then(|text| Self::from_hex(text).ok())
    }

    fn to_json(&self) -> Value {
        Value::String(self.to_hex())
    }
}

tgk_mapping::mapping_keys! {
    /// Keys of a persisted push token
    pub enum PushTokenKeys {
        Token => "token",
    }
}

impl Mappable for PushToken {
    type Keys = PushTokenKeys;

    fn in_map(mapper: &InMapper<'_, PushTokenKeys>) -> Result<Self, MappingError> {
        mapper.map(PushTokenKeys::Token)
    }

    fn out_map(&self, mapper: &mut OutMapper<PushTokenKeys>) -> Result<(), MappingError> {
        mapper.map(self, PushTokenKeys::Token);
        Ok(())
    }
}

/// Body registering a token for a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUpload {
    /// Device the token belongs to
    pub device_identifier: Uuid,
    /// Token to register
    pub token: PushToken,
}

tgk_mapping::mapping_keys! {
    /// Keys of a token upload body
    pub enum TokenUploadKeys {
        DeviceIdentifier => "device_identifier",
        Token => "token",
    }
}

impl Mappable for TokenUpload {
    type Keys = TokenUploadKeys;

    fn in_map(_mapper: &InMapper<'_, TokenUploadKeys>) -> Result<Self, MappingError> {
        Err(MappingError::OutMapOnly("TokenUpload"))
    }

    fn out_map(&self, mapper: &mut OutMapper<TokenUploadKeys>) -> Result<(), MappingError> {
        mapper.map(&self.device_identifier, TokenUploadKeys::DeviceIdentifier);
        mapper.map(&self.token, TokenUploadKeys::Token);
        Ok(())
    }
}

/// Uploads the push token and keeps it consistent with the backend
pub struct TokenUploader {
    pusher: WriteOnlyStorage<(), TokenUpload>,
    device_identifier: DeviceIdentifier,
    keeper: Arc<UploadConsistencyKeeper<PushToken>>,
    dispatcher: Dispatcher,
    uploads: PendingTasks,
    did_upload: Publisher<TokenUpload>,
}

impl fmt::Debug for TokenUploader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenUploader")
            .field("pusher", &self.pusher.storage_name())
            .field("keeper", &self.keeper)
            .finish_non_exhaustive()
    }
}

impl TokenUploader {
    /// Create uploader
    ///
    /// `token` yields the current token and should fail while none is known,
    /// which makes the keeper skip. `last_uploaded` holds the snapshot of the
    /// last accepted token.
    #[must_use]
    pub fn new(
        pusher: WriteOnlyStorage<(), TokenUpload>,
        device_identifier: DeviceIdentifier,
        last_uploaded: SharedStorage<(), PushToken>,
        token: Retrieve<PushToken>,
        dispatcher: Dispatcher,
    ) -> Arc<Self> {
        let uploader = Arc::new_cyclic(|this: &Weak<Self>| {
            let this = this.clone();
            let reupload: Reupload<PushToken> = Arc::new(move |token: PushToken| {
                if let Some(uploader) = this.upgrade() {
                    uploader.upload(token);
                }
            });
            let keeper = UploadConsistencyKeeper::new(
                TOKEN_KEEPER_NAME,
                token,
                last_uploaded,
                dispatcher.clone(),
                reupload,
            );
            Self {
                pusher,
                device_identifier,
                keeper: Arc::new(keeper),
                dispatcher,
                uploads: PendingTasks::new(),
                did_upload: Publisher::new("token-uploader.did-upload"),
            }
        });

        let confirmed = uploader
            .did_upload
            .proxy()
            .map(|upload: &TokenUpload| upload.token.clone());
        let _ = uploader.keeper.subscribe_to_did_upload(&confirmed);
        uploader
    }

    /// Serialize uploads as JSON bytes for `pusher`
    #[must_use]
    pub fn adapt(pusher: WriteOnlyStorage<(), Vec<u8>>) -> WriteOnlyStorage<(), TokenUpload> {
        pusher.map_json().map_mappable::<TokenUpload>().write_only()
    }

    /// Check consistency every time `should_check` fires
    pub fn subscribe_to(&self, should_check: &Subscribe<()>) -> Subscription {
        self.keeper.check_listening_to(should_check)
    }

    /// Upload `token` in the background
    ///
    /// Without a device identifier nothing is sent; the keeper tries again on
    /// its next check.
    pub fn upload(&self, token: PushToken) {
        let Some(device_identifier) = (self.device_identifier)() else {
            tracing::warn!(keeper = TOKEN_KEEPER_NAME, "no device identifier, token not uploaded");
            return;
        };
        let upload = TokenUpload {
            device_identifier,
            token,
        };

        let pusher = Arc::clone(&self.pusher);
        let did_upload = self.did_upload.clone();
        let handle = self.dispatcher.spawn(async move {
            match pusher.set(upload.clone(), ()).await {
                Ok(()) => {
                    tracing::debug!(device = %upload.device_identifier, "token uploaded");
                    did_upload.publish(upload);
                }
                Err(err) => {
                    tracing::warn!(storage = %pusher.storage_name(), error = %err, "cannot upload token");
                }
            }
        });
        self.uploads.push(handle);
    }

    /// Confirmed uploads
    #[must_use]
    pub fn did_upload(&self) -> Subscribe<TokenUpload> {
        self.did_upload.proxy()
    }

    /// The keeper deciding when to upload
    #[inline]
    #[must_use]
    pub fn keeper(&self) -> &Arc<UploadConsistencyKeeper<PushToken>> {
        &self.keeper
    }

    /// Wait for checks, uploads and snapshot writes started so far
    pub async fn settle(&self) {
        self.keeper.settle_checks().await;
        self.uploads.settle().await;
        self.keeper.settle_persists().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn token_hex_is_lowercase_and_validated() {
        let token = PushToken::from_hex("DEADbeef").unwrap();
        assert_eq!(token.as_bytes(), &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(token.to_string(), "deadbeef");
        assert!(matches!(PushToken::from_hex("abc"), Err(FlagsError::InvalidToken(_))));
    }

    #[test]
    fn upload_body_is_out_map_only() {
        let upload = TokenUpload {
            device_identifier: Uuid::nil(),
            token: PushToken::new(vec![1, 2]),
        };
        assert_eq!(
            to_json(&upload).unwrap(),
            json!({
                "device_identifier": "00000000-0000-0000-0000-000000000000",
                "token": "0102",
            })
        );
        assert_eq!(
            from_json::<TokenUpload>(&json!({})),
            Err(MappingError::OutMapOnly("TokenUpload"))
        );
    }

    #[tokio::test]
    async fn token_is_uploaded_once_then_consistent() {
        let sent = MemoryStorage::<(), TokenUpload>::new();
        let snapshot = MemoryStorage::<(), PushToken>::new();
        let token = PushToken::new(vec![0xab]);
        let uploader = TokenUploader::new(
            sent.clone().write_only(),
            Arc::new(|| Some(Uuid::nil())),
            snapshot.clone().shared(),
            DevStorage::successing(token.clone()).read_only(),
            Dispatcher::current().unwrap(),
        );

        uploader.keeper().check().await;
        uploader.settle().await;
        assert_eq!(sent.retrieve(()).await.unwrap().token, token);
        assert_eq!(snapshot.retrieve(()).await.unwrap(), token);

        let uploads = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&uploads);
        uploader.did_upload().subscribe(move |_| *counter.lock() += 1);
        uploader.keeper().check().await;
        uploader.settle().await;
        assert_eq!(*uploads.lock(), 0);
    }

    #[tokio::test]
    async fn missing_device_identifier_skips_upload() {
        let sent = MemoryStorage::<(), TokenUpload>::new();
        let snapshot = MemoryStorage::<(), PushToken>::new();
        let uploader = TokenUploader::new(
            sent.clone().write_only(),
            Arc::new(|| None),
            snapshot.clone().shared(),
            DevStorage::successing(PushToken::new(vec![1])).read_only(),
            Dispatcher::current().unwrap(),
        );

        uploader.keeper().check().await;
        uploader.settle().await;
        assert!(sent.retrieve(()).await.unwrap_err().is_not_found());
        assert!(snapshot.retrieve(()).await.unwrap_err().is_not_found());
    }
}
