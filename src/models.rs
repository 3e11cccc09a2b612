use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use url::Url;

/// A station record from the directory.
///
/// Only `id` takes part in equality and hashing; every other field is display
/// data that may be stale or missing. Serializes to the same wire shape it is
/// read from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "RawStation", into = "RawStation")]
pub struct Station {
    pub id: String,
    pub name: String,
    pub country: String,
    pub language: String,
    pub bitrate_kbps: u32,
    pub codec: String,
    pub tags: String,
    pub stream_url: Option<String>,
    pub homepage: Option<String>,
    pub favicon_url: Option<String>,
}

impl PartialEq for Station {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Station {}

impl Hash for Station {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Station {
    pub fn quality(&self) -> Quality {
        Quality::from_bitrate(self.bitrate_kbps)
    }

    /// The stream URL, if present and an http(s) URL.
    pub fn playable_url(&self) -> Option<Url> {
        self.stream_url
            .as_deref()
            .and_then(|s| parse_stream_url(s).ok())
    }
}

/// Upstream wire shape of a station, as served by `/json/stations/*`.
#[derive(Debug, Serialize, Deserialize)]
struct RawStation {
    stationuuid: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    bitrate: Option<i64>,
    #[serde(default)]
    codec: Option<String>,
    #[serde(default)]
    tags: Option<String>,
    #[serde(default)]
    url_resolved: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    favicon: Option<String>,
}

impl From<RawStation> for Station {
    fn from(raw: RawStation) -> Self {
        Self {
            id: raw.stationuuid,
            name: raw.name.unwrap_or_default(),
            country: raw.country.unwrap_or_default(),
            language: raw.language.unwrap_or_default(),
            bitrate_kbps: raw
                .bitrate
                .map(|b| u32::try_from(b.max(0)).unwrap_or(u32::MAX))
                .unwrap_or(0),
            codec: raw.codec.unwrap_or_default(),
            tags: raw.tags.unwrap_or_default(),
            stream_url: non_empty(raw.url_resolved).or_else(|| non_empty(raw.url)),
            homepage: non_empty(raw.homepage),
            favicon_url: non_empty(raw.favicon),
        }
    }
}

impl From<Station> for RawStation {
    fn from(s: Station) -> Self {
        Self {
            stationuuid: s.id,
            name: Some(s.name),
            country: Some(s.country),
            language: Some(s.language),
            bitrate: Some(i64::from(s.bitrate_kbps)),
            codec: Some(s.codec),
            tags: Some(s.tags),
            url_resolved: s.stream_url,
            url: None,
            homepage: s.homepage,
            favicon: s.favicon_url,
        }
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Coarse stream quality bucket derived from the bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Poor,
    Good,
    High,
}

impl Quality {
    pub fn from_bitrate(kbps: u32) -> Self {
        if kbps < 64 {
            Quality::Poor
        } else if kbps < 128 {
            Quality::Good
        } else {
            Quality::High
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Quality::Poor => "🔴",
            Quality::Good => "🟡",
            Quality::High => "🟢",
        }
    }
}

/// Entry of the `/json/countries` and `/json/languages` reference lists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default)]
    pub stationcount: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RadioBrowserServer {
    pub name: String,
}

/// User-chosen constraints for a catalog query. Empty fields mean no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterSpec {
    pub country: Option<String>,
    pub language: Option<String>,
    pub min_bitrate_kbps: u32,
}

impl FilterSpec {
    pub fn new(country: Option<&str>, language: Option<&str>, min_bitrate_kbps: u32) -> Self {
        Self {
            country: country.map(str::to_string),
            language: language.map(str::to_string),
            min_bitrate_kbps,
        }
        .normalized()
    }

    /// Trims text fields and drops the empty ones.
    pub fn normalized(self) -> Self {
        Self {
            country: non_empty(self.country),
            language: non_empty(self.language),
            min_bitrate_kbps: self.min_bitrate_kbps,
        }
    }
}

pub(crate) fn parse_stream_url(s: &str) -> anyhow::Result<Url> {
    use anyhow::{anyhow, Context};

    let url = Url::parse(s).context("Invalid stream URL")?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow!("Unsupported stream URL scheme: {other}")),
    }
}
