use crate::cache::{Clock, SystemClock, TtlCache};
use crate::config::CacheConfig;
use crate::models::{CatalogEntry, FilterSpec, Station};
use crate::radio_browser::CatalogSource;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Cache key for station queries. The quality threshold is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StationQuery {
    Top {
        limit: u32,
    },
    Search {
        country: Option<String>,
        language: Option<String>,
        limit: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceList {
    Countries,
    Languages,
}

/// Cached, filtered view of a [`CatalogSource`].
pub struct CatalogService<S> {
    source: S,
    ttls: CacheConfig,
    stations: TtlCache<StationQuery, Arc<[Station]>>,
    references: TtlCache<ReferenceList, Arc<[CatalogEntry]>>,
}

impl<S: CatalogSource> CatalogService<S> {
    pub fn new(source: S, ttls: CacheConfig) -> Self {
        Self::with_clock(source, ttls, Arc::new(SystemClock))
    }

    pub fn with_clock(source: S, ttls: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            ttls,
            stations: TtlCache::new(clock.clone()),
            references: TtlCache::new(clock),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Top `limit` stations in upstream ranking order.
    pub async fn top_stations(&self, limit: u32) -> Arc<[Station]> {
        self.stations
            .get(StationQuery::Top { limit }, self.ttls.top_ttl(), || async {
                let stations = self.source.top_stations(limit).await;
                debug!(limit, count = stations.len(), "fetched top stations");
                Arc::from(stations)
            })
            .await
    }

    /// Stations matching the country/language part of `filter`.
    pub async fn search(&self, filter: &FilterSpec, limit: u32) -> Arc<[Station]> {
        let filter = filter.clone().normalized();
        let key = StationQuery::Search {
            country: filter.country.clone(),
            language: filter.language.clone(),
            limit,
        };
        self.stations
            .get(key, self.ttls.search_ttl(), || async {
                let stations = self.source.search(&filter, limit).await;
                debug!(?filter, limit, count = stations.len(), "fetched search results");
                Arc::from(stations)
            })
            .await
    }

    pub async fn countries(&self) -> Arc<[CatalogEntry]> {
        self.references
            .get(ReferenceList::Countries, self.ttls.reference_ttl(), || async {
                Arc::from(self.source.countries().await)
            })
            .await
    }

    pub async fn languages(&self) -> Arc<[CatalogEntry]> {
        self.references
            .get(ReferenceList::Languages, self.ttls.reference_ttl(), || async {
                Arc::from(self.source.languages().await)
            })
            .await
    }

    pub async fn browse_top(&self, limit: u32, min_bitrate_kbps: u32) -> Vec<Station> {
        filter_by_quality(&self.top_stations(limit).await, min_bitrate_kbps)
    }

    pub async fn discover(&self, filter: &FilterSpec, limit: u32) -> Vec<Station> {
        filter_by_quality(&self.search(filter, limit).await, filter.min_bitrate_kbps)
    }

    /// Looks up favorite ids in the station sets currently held by the cache.
    ///
    /// Ids not present in any unexpired result set are left out. Never fetches.
    pub fn resolve_favorites(&self, ids: &BTreeSet<String>) -> Vec<Station> {
        if ids.is_empty() {
            return Vec::new();
        }
        let sets = self.stations.valid_values();
        let index: HashMap<&str, &Station> = sets
            .iter()
            .flat_map(|set| set.iter())
            .map(|s| (s.id.as_str(), s))
            .collect();
        ids.iter()
            .filter_map(|id| index.get(id.as_str()).map(|s| (*s).clone()))
            .collect()
    }

    /// Drops every cached entry so the next query refetches.
    pub fn refresh(&self) {
        self.stations.clear();
        self.references.clear();
    }
}

/// Stations with `bitrate_kbps >= min_bitrate_kbps`, in input order.
pub fn filter_by_quality(stations: &[Station], min_bitrate_kbps: u32) -> Vec<Station> {
    stations
        .iter()
        .filter(|s| s.bitrate_kbps >= min_bitrate_kbps)
        .cloned()
        .collect()
}
