use crate::models::Station;
use std::collections::{BTreeSet, VecDeque};

pub const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerStatus {
    #[default]
    Stopped,
    Playing,
}

/// Per-session listening state. Lives only as long as the session.
///
/// Fields are only changed through the transition methods, which keep
/// `Playing` tied to a current station and the history within
/// [`HISTORY_LIMIT`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    current_station: Option<Station>,
    favorites: BTreeSet<String>,
    history: VecDeque<Station>,
    player_status: PlayerStatus,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_station(&self) -> Option<&Station> {
        self.current_station.as_ref()
    }

    pub fn favorites(&self) -> &BTreeSet<String> {
        &self.favorites
    }

    /// Oldest first.
    pub fn history(&self) -> &VecDeque<Station> {
        &self.history
    }

    pub fn player_status(&self) -> PlayerStatus {
        self.player_status
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.contains(id)
    }

    /// The last `n` played stations, newest first.
    pub fn recent_history(&self, n: usize) -> Vec<&Station> {
        self.history.iter().rev().take(n).collect()
    }

    pub fn play_station(&mut self, station: Station) {
        if self.history.back().map(|s| s.id.as_str()) != Some(station.id.as_str()) {
            self.history.push_back(station.clone());
            while self.history.len() > HISTORY_LIMIT {
                self.history.pop_front();
            }
        }
        self.current_station = Some(station);
        self.player_status = PlayerStatus::Playing;
    }

    pub fn stop(&mut self) {
        self.current_station = None;
        self.player_status = PlayerStatus::Stopped;
    }

    /// Adds or removes `id`. Missing or blank ids are ignored.
    pub fn toggle_favorite(&mut self, id: Option<&str>) {
        let Some(id) = id.map(str::trim).filter(|id| !id.is_empty()) else {
            return;
        };
        if !self.favorites.remove(id) {
            self.favorites.insert(id.to_string());
        }
    }

    pub fn clear_all(&mut self) {
        *self = Self::default();
    }
}
