use crate::catalog::CatalogService;
use crate::config::BrowseConfig;
use crate::models::{CatalogEntry, FilterSpec, Station};
use crate::radio_browser::CatalogSource;
use crate::session::SessionState;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// A user action forwarded by the presentation layer.
#[derive(Debug, Clone)]
pub enum Intent {
    Play(Station),
    Stop,
    ToggleFavorite(Option<String>),
    ToggleCurrentFavorite,
    SetFilter(FilterSpec),
    SurpriseMe,
    ClearAll,
}

/// Display-only conditions raised while handling an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The station was selected but has no playable stream URL.
    NoStreamAvailable,
    /// The top list could not be obtained; nothing changed.
    CatalogUnavailable,
}

#[derive(Debug, Clone)]
pub struct IntentOutcome {
    pub state: SessionState,
    pub notice: Option<Notice>,
}

/// Owns one session's state and applies intents to it one at a time.
///
/// Every handled intent publishes the resulting state on a watch channel.
pub struct SessionController<S> {
    catalog: Arc<CatalogService<S>>,
    browse: BrowseConfig,
    filter: FilterSpec,
    state: SessionState,
    rng: StdRng,
    state_tx: watch::Sender<SessionState>,
}

impl<S: CatalogSource> SessionController<S> {
    pub fn new(catalog: Arc<CatalogService<S>>, browse: BrowseConfig) -> Self {
        let (state_tx, _) = watch::channel(SessionState::new());
        let filter = FilterSpec {
            min_bitrate_kbps: browse.default_min_bitrate_kbps,
            ..Default::default()
        };
        Self {
            catalog,
            browse,
            filter,
            state: SessionState::new(),
            rng: StdRng::from_entropy(),
            state_tx,
        }
    }

    /// Fixes the surprise-me draw sequence.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn catalog(&self) -> &Arc<CatalogService<S>> {
        &self.catalog
    }

    pub async fn handle(&mut self, intent: Intent) -> IntentOutcome {
        let notice = match intent {
            Intent::Play(station) => self.play(station),
            Intent::Stop => {
                self.state.stop();
                None
            }
            Intent::ToggleFavorite(id) => {
                self.state.toggle_favorite(id.as_deref());
                None
            }
            Intent::ToggleCurrentFavorite => {
                let id = self.state.current_station().map(|s| s.id.clone());
                self.state.toggle_favorite(id.as_deref());
                None
            }
            Intent::SetFilter(filter) => {
                self.filter = filter.normalized();
                None
            }
            Intent::SurpriseMe => self.surprise().await,
            Intent::ClearAll => {
                self.state.clear_all();
                None
            }
        };

        self.state_tx.send_replace(self.state.clone());
        IntentOutcome {
            state: self.state.clone(),
            notice,
        }
    }

    pub async fn play_station(&mut self, station: Station) -> IntentOutcome {
        self.handle(Intent::Play(station)).await
    }

    pub async fn stop(&mut self) -> IntentOutcome {
        self.handle(Intent::Stop).await
    }

    pub async fn toggle_favorite(&mut self, id: Option<String>) -> IntentOutcome {
        self.handle(Intent::ToggleFavorite(id)).await
    }

    pub async fn surprise_me(&mut self) -> IntentOutcome {
        self.handle(Intent::SurpriseMe).await
    }

    pub async fn clear_all(&mut self) -> IntentOutcome {
        self.handle(Intent::ClearAll).await
    }

    fn play(&mut self, station: Station) -> Option<Notice> {
        let playable = station.playable_url().is_some();
        info!(id = %station.id, name = %station.name, playable, "playing station");
        self.state.play_station(station);
        (!playable).then_some(Notice::NoStreamAvailable)
    }

    async fn surprise(&mut self) -> Option<Notice> {
        let top = self.catalog.top_stations(self.browse.top_limit).await;
        match top.choose(&mut self.rng).cloned() {
            Some(station) => self.play(station),
            None => {
                warn!("surprise-me skipped, top list unavailable");
                Some(Notice::CatalogUnavailable)
            }
        }
    }

    /// Top list filtered by the current quality threshold.
    pub async fn top_list(&self) -> Vec<Station> {
        self.catalog
            .browse_top(self.browse.top_limit, self.filter.min_bitrate_kbps)
            .await
    }

    /// Search results for the current filter.
    pub async fn discover(&self) -> Vec<Station> {
        self.catalog
            .discover(&self.filter, self.browse.search_limit)
            .await
    }

    pub fn favorite_stations(&self) -> Vec<Station> {
        self.catalog.resolve_favorites(self.state.favorites())
    }

    pub fn recent_history(&self) -> Vec<&Station> {
        self.state.recent_history(self.browse.recent_history)
    }

    pub async fn countries(&self) -> Vec<CatalogEntry> {
        let all = self.catalog.countries().await;
        all.iter()
            .take(self.browse.reference_list_limit)
            .cloned()
            .collect()
    }

    pub async fn languages(&self) -> Vec<CatalogEntry> {
        let all = self.catalog.languages().await;
        all.iter()
            .take(self.browse.reference_list_limit)
            .cloned()
            .collect()
    }

    pub fn refresh_catalog(&self) {
        self.catalog.refresh();
    }
}
