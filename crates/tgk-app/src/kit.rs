//! Composition root
//!
//! [`Kit`] builds every storage, registry, uploader and keeper once from a
//! [`KitConfig`] and hands them out to the rest of the process.
//!
//! # Disk layout
//!
//! ```text
//! data_dir/   favorite-teams.json, favorite-matches.json, unsubscribed-matches.json
//! cache_dir/  keeper-notifications-*, token-uploader-consistency-keeper, api/*.json
//! outbox_dir/ favorite-teams-upload.json, favorite-matches-upload.json, push-token-upload.json
//! ```
//!
//! The outbox stands in for the notifications backend: an upload succeeds
//! once its body is written there.

use crate::config::KitConfig;
use crate::error::Result;
use std::fmt;
use std::sync::Arc;
use tgk_event::{Dispatcher, Lifecycle, Subscription};
use tgk_flags::prelude::*;
use tgk_flags::{DeviceIdentifier, TOKEN_KEEPER_NAME};
use tgk_models::{ApiPath, MatchCompact, MatchesApi};
use tgk_storage::prelude::*;

const TOKEN_UPLOAD_FILE: &str = "push-token-upload.json";

/// Every long-lived component of the kit
pub struct Kit {
    config: KitConfig,
    lifecycle: Lifecycle,
    activity: Arc<ActivityCounter>,
    favorite_teams: Flags<FavoriteTeams>,
    favorite_matches: Flags<FavoriteMatches>,
    unsubscribed_matches: Arc<FlagsRegistry<UnsubscribedMatches>>,
    token_uploader: Arc<TokenUploader>,
    matches_api: MatchesApi,
}

impl fmt::Debug for Kit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kit")
            .field("data_dir", &self.config.data_dir)
            .field("cache_dir", &self.config.cache_dir)
            .field("outbox_dir", &self.config.outbox_dir)
            .field("activity", &self.activity.active())
            .finish_non_exhaustive()
    }
}

struct Disks {
    data: FileSystemStorage,
    keepers: FileSystemStorage,
    outbox: FileSystemStorage,
}

fn matches_filename(path: ApiPath) -> Option<Filename> {
    path.as_str()
        .strip_prefix("matches/")
        .and_then(|name| Filename::new(name).ok())
}

impl Kit {
    /// Build the kit; nothing is read from disk until [`load`](Self::load)
    ///
    /// # Errors
    /// Invalid configuration
    pub fn new(config: KitConfig, dispatcher: Dispatcher) -> Result<Self> {
        config.validate()?;
        let activity = Arc::new(ActivityCounter::new());
        let disks = Disks {
            data: FileSystemStorage::new(&config.data_dir).with_name("data"),
            keepers: FileSystemStorage::new(&config.cache_dir).with_name("keepers"),
            outbox: FileSystemStorage::new(&config.outbox_dir).with_name("outbox"),
        };
        let device = config.device_identifier;
        let device_identifier: DeviceIdentifier = Arc::new(move || device);
        let token: Retrieve<PushToken> = match config.push_token() {
            Some(token) => DevStorage::successing(token).read_only(),
            None => DevStorage::failing(StorageError::not_found("push-token", &())).read_only(),
        };

        let favorite_teams = Self::flags::<FavoriteTeams>(
            &disks,
            &activity,
            &token,
            &device_identifier,
            &dispatcher,
        )?;
        let favorite_matches = Self::flags::<FavoriteMatches>(
            &disks,
            &activity,
            &token,
            &device_identifier,
            &dispatcher,
        )?;
        let unsubscribed_matches = Arc::new(FlagsRegistry::in_directory(disks.data.clone())?);

        let token_uploader = TokenUploader::new(
            TokenUploader::adapt(
                disks
                    .outbox
                    .clone()
                    .single_key(Filename::new(TOKEN_UPLOAD_FILE)?)
                    .tracking_activity(Arc::clone(&activity) as Arc<dyn ActivityIndicator>)
                    .write_only(),
            ),
            device_identifier,
            disks
                .keepers
                .clone()
                .map_json()
                .map_mappable::<PushToken>()
                .single_key(Filename::new(TOKEN_KEEPER_NAME)?)
                .shared(),
            token,
            dispatcher,
        );

        let matches_api = Self::build_matches_api(&config, &activity);
        tracing::info!(
            data_dir = %config.data_dir.display(),
            cache_dir = %config.cache_dir.display(),
            "kit assembled"
        );

        Ok(Self {
            config,
            lifecycle: Lifecycle::new(),
            activity,
            favorite_teams,
            favorite_matches,
            unsubscribed_matches,
            token_uploader,
            matches_api,
        })
    }

    fn flags<D: FlagDescriptor>(
        disks: &Disks,
        activity: &Arc<ActivityCounter>,
        token: &Retrieve<PushToken>,
        device_identifier: &DeviceIdentifier,
        dispatcher: &Dispatcher,
    ) -> Result<Flags<D>> {
        let registry = Arc::new(FlagsRegistry::<D>::in_directory(disks.data.clone())?);
        let pusher = disks
            .outbox
            .clone()
            .single_key(Filename::new(format!("{}-upload.json", D::NAME))?)
            .tracking_activity(Arc::clone(activity) as Arc<dyn ActivityIndicator>)
            .write_only();
        let uploader = Arc::new(FlagsUploader::<D>::new(
            FlagsUploader::<D>::adapt(pusher),
            Arc::clone(token),
            Arc::clone(device_identifier),
            dispatcher.clone(),
        ));
        Ok(Flags::with_keepers_storage(
            registry,
            uploader,
            disks.keepers.clone(),
            dispatcher.clone(),
        )?)
    }

    fn build_matches_api(config: &KitConfig, activity: &Arc<ActivityCounter>) -> MatchesApi {
        let mirror: ReadOnlyStorage<Filename, Vec<u8>> = match &config.api_mirror_dir {
            Some(dir) => FileSystemStorage::new(dir.join("matches"))
                .with_name("api-mirror")
                .read_only(),
            None => DevStorage::<Vec<u8>>::failing(StorageError::not_found("api-mirror", &"unconfigured"))
                .read_only(),
        };
        let provider = FileSystemStorage::new(config.cache_dir.join("api"))
            .with_name("api-cache")
            .memory_cached_with_capacity::<Filename, Vec<u8>>(config.memory_cache_capacity)
            .backed_by(mirror)
            .try_map_keys(matches_filename)
            .tracking_activity(Arc::clone(activity) as Arc<dyn ActivityIndicator>)
            .read_only::<ApiPath, Vec<u8>>();
        MatchesApi::new(provider)
    }

    /// Read all persisted registries
    ///
    /// # Errors
    /// The first registry that fails to load; the others are still attempted
    pub async fn load(&self) -> Result<()> {
        let teams = self.favorite_teams.registry().load().await;
        let matches = self.favorite_matches.registry().load().await;
        let unsubscribed = self.unsubscribed_matches.load().await;
        teams?;
        matches?;
        unsubscribed?;
        Ok(())
    }

    /// Wire updates to uploads and lifecycle events to consistency checks
    pub fn start(&self) -> Subscription {
        let should_check = self.lifecycle.should_check_upload_consistency();
        self.favorite_teams
            .subscribe()
            .and(self.favorite_teams.start(&should_check))
            .and(self.favorite_matches.subscribe())
            .and(self.favorite_matches.start(&should_check))
            .and(self.token_uploader.subscribe_to(&should_check))
    }

    /// Announce that the process finished launching
    pub fn launch(&self) {
        self.lifecycle.did_launch().publish(());
    }

    /// Wait for every background check, upload and snapshot write started so far
    pub async fn settle(&self) {
        self.favorite_teams.settle().await;
        self.favorite_matches.settle().await;
        self.token_uploader.settle().await;
    }

    /// Whether the match or either team is a favorite
    #[must_use]
    pub fn is_favorite(&self, game: &MatchCompact) -> bool {
        let matches = self.favorite_matches.registry();
        let teams = self.favorite_teams.registry();
        game.is_favorite(|id| matches.is_present(&id), |id| teams.is_present(&id))
    }

    /// Whether notifications for the match should be delivered
    #[must_use]
    pub fn should_notify(&self, game: &MatchCompact) -> bool {
        self.is_favorite(game) && !self.unsubscribed_matches.is_present(&game.id)
    }

    /// Configuration the kit was built from
    #[inline]
    #[must_use]
    pub fn config(&self) -> &KitConfig {
        &self.config
    }

    /// Lifecycle bus
    #[inline]
    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Storage operations in flight
    #[inline]
    #[must_use]
    pub fn activity(&self) -> &Arc<ActivityCounter> {
        &self.activity
    }

    /// Favorite teams
    #[inline]
    #[must_use]
    pub fn favorite_teams(&self) -> &Flags<FavoriteTeams> {
        &self.favorite_teams
    }

    /// Favorite matches
    #[inline]
    #[must_use]
    pub fn favorite_matches(&self) -> &Flags<FavoriteMatches> {
        &self.favorite_matches
    }

    /// Matches muted despite a favorite team
    #[inline]
    #[must_use]
    pub fn unsubscribed_matches(&self) -> &Arc<FlagsRegistry<UnsubscribedMatches>> {
        &self.unsubscribed_matches
    }

    /// Push token uploader
    #[inline]
    #[must_use]
    pub fn token_uploader(&self) -> &Arc<TokenUploader> {
        &self.token_uploader
    }

    /// Matches API
    #[inline]
    #[must_use]
    pub fn matches_api(&self) -> &MatchesApi {
        &self.matches_api
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_paths_map_to_flat_file_names() {
        assert_eq!(
            matches_filename(ApiPath::new("matches/all.json")).unwrap().as_str(),
            "all.json"
        );
        assert!(matches_filename(ApiPath::new("teams/all.json")).is_none());
        assert!(matches_filename(ApiPath::new("matches/a/b.json")).is_none());
    }
}
