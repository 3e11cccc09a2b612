use crate::config::ApiConfig;
use crate::models::{CatalogEntry, FilterSpec, RadioBrowserServer, Station};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Mirror used when server discovery is unreachable.
const FALLBACK_SERVERS: &[&str] = &["de1.api.radio-browser.info"];
const MAX_BODY_BYTES: usize = 8_000_000;

/// Read-only station directory.
///
/// Implementations never fail: an unavailable upstream yields an empty list
/// (see [`degrade_to_empty`]).
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn top_stations(&self, limit: u32) -> Vec<Station>;
    async fn countries(&self) -> Vec<CatalogEntry>;
    async fn languages(&self) -> Vec<CatalogEntry>;
    async fn search(&self, filter: &FilterSpec, limit: u32) -> Vec<Station>;
}

/// The UpstreamUnavailable policy: a failed directory call becomes an empty
/// result and a warning, never an error for the caller.
pub fn degrade_to_empty<T>(action: &str, res: Result<Vec<T>>) -> Vec<T> {
    match res {
        Ok(v) => v,
        Err(e) => {
            warn!(action, error = ?e, "radio browser unavailable, using empty result");
            Vec::new()
        }
    }
}

#[derive(Debug)]
pub struct RadioBrowserClient {
    http: reqwest::Client,
    fixed_base: Option<String>,
    discovery_base: String,
    servers: Mutex<Option<Vec<String>>>,
    last_server: Mutex<Option<String>>,
    max_attempts: usize,
    station_timeout: Duration,
    reference_timeout: Duration,
}

impl RadioBrowserClient {
    pub fn new(cfg: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&cfg.user_agent).context("Invalid User-Agent")?,
        );
        let http = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            fixed_base: cfg
                .base_url
                .as_deref()
                .map(|b| b.trim_end_matches('/').to_string()),
            discovery_base: cfg.discovery_url.trim_end_matches('/').to_string(),
            servers: Mutex::new(None),
            last_server: Mutex::new(None),
            max_attempts: cfg.max_attempts.max(1),
            station_timeout: Duration::from_secs(cfg.station_timeout_secs),
            reference_timeout: Duration::from_secs(cfg.reference_timeout_secs),
        })
    }

    pub fn last_server(&self) -> Option<String> {
        self.last_server
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub async fn discover_servers(&self) -> Result<Vec<String>> {
        let url = format!("{}/json/servers", self.discovery_base);
        let resp = self
            .http
            .get(url)
            .timeout(self.reference_timeout)
            .send()
            .await
            .context("Server discovery failed")?
            .error_for_status()
            .context("Server discovery rejected")?;
        let bytes = read_limited(resp, MAX_BODY_BYTES).await?;
        let servers: Vec<RadioBrowserServer> =
            serde_json::from_slice(&bytes).context("Invalid /json/servers response")?;
        let mut names: Vec<String> = servers.into_iter().map(|s| s.name).collect();
        names.sort();
        names.dedup();
        if names.is_empty() {
            return Err(anyhow!("Radio Browser server list was empty"));
        }
        Ok(names)
    }

    pub async fn try_top_stations(&self, limit: u32) -> Result<Vec<Station>> {
        let timeout = self.station_timeout;
        self.with_server_retry("topclick", move |base| async move {
            let url = top_stations_url(&base, limit)?;
            self.fetch_json(url, timeout).await
        })
        .await
    }

    pub async fn try_search(&self, filter: &FilterSpec, limit: u32) -> Result<Vec<Station>> {
        let timeout = self.station_timeout;
        self.with_server_retry("search", move |base| async move {
            let url = search_url(&base, filter, limit)?;
            self.fetch_json(url, timeout).await
        })
        .await
    }

    pub async fn try_reference_list(&self, kind: &'static str) -> Result<Vec<CatalogEntry>> {
        let timeout = self.reference_timeout;
        self.with_server_retry(kind, move |base| async move {
            let url = Url::parse(&format!("{base}/json/{kind}"))
                .context("Invalid Radio Browser base URL")?;
            self.fetch_json(url, timeout).await
        })
        .await
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: Url, timeout: Duration) -> Result<T> {
        debug!(%url, "GET");
        let resp = self.http.get(url).timeout(timeout).send().await?;
        debug!(status = %resp.status(), "response");
        let resp = resp.error_for_status()?;
        let bytes = read_limited(resp, MAX_BODY_BYTES).await?;
        serde_json::from_slice(&bytes).context("Invalid Radio Browser response")
    }

    /// Discovered mirror names, fetched once and kept until a whole retry
    /// round fails.
    async fn known_servers(&self) -> Vec<String> {
        let cached = self.servers.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(servers) = cached {
            return servers;
        }

        let servers = match self.discover_servers().await {
            Ok(servers) => servers,
            Err(e) => {
                warn!(error = ?e, "server discovery failed, using fallback mirrors");
                FALLBACK_SERVERS.iter().map(|s| s.to_string()).collect()
            }
        };
        *self.servers.lock().unwrap_or_else(|e| e.into_inner()) = Some(servers.clone());
        servers
    }

    fn forget_servers(&self) {
        *self.servers.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    async fn candidate_bases(&self) -> Vec<String> {
        if let Some(base) = &self.fixed_base {
            return vec![base.clone()];
        }

        let mut servers = self.known_servers().await;
        servers.shuffle(&mut rand::thread_rng());
        if let Some(last) = self.last_server() {
            if let Some(pos) = servers.iter().position(|s| *s == last) {
                servers.swap(0, pos);
            }
        }
        servers.into_iter().map(|s| format!("https://{s}")).collect()
    }

    async fn with_server_retry<F, Fut, T>(&self, action: &str, mut f: F) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let bases = self.candidate_bases().await;

        let mut last_err: Option<anyhow::Error> = None;
        for attempt in 0..self.max_attempts {
            let Some(base) = bases.get(attempt % bases.len().max(1)).cloned() else {
                break;
            };

            match f(base.clone()).await {
                Ok(v) => {
                    *self.last_server.lock().unwrap_or_else(|e| e.into_inner()) =
                        Some(base.trim_start_matches("https://").to_string());
                    return Ok(v);
                }
                Err(e) => {
                    last_err = Some(e.context(format!("{action} attempt {attempt} failed")));
                    if attempt + 1 < self.max_attempts {
                        let backoff_ms = 200u64.saturating_mul(2u64.saturating_pow(attempt as u32));
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    }
                }
            }
        }

        if self.fixed_base.is_none() {
            self.forget_servers();
        }
        Err(last_err.unwrap_or_else(|| anyhow!("{action} failed")))
    }
}

#[async_trait]
impl CatalogSource for RadioBrowserClient {
    async fn top_stations(&self, limit: u32) -> Vec<Station> {
        degrade_to_empty("topclick", self.try_top_stations(limit).await)
    }

    async fn countries(&self) -> Vec<CatalogEntry> {
        degrade_to_empty("countries", self.try_reference_list("countries").await)
    }

    async fn languages(&self) -> Vec<CatalogEntry> {
        degrade_to_empty("languages", self.try_reference_list("languages").await)
    }

    async fn search(&self, filter: &FilterSpec, limit: u32) -> Vec<Station> {
        degrade_to_empty("search", self.try_search(filter, limit).await)
    }
}

fn top_stations_url(base: &str, limit: u32) -> Result<Url> {
    let mut url = Url::parse(&format!("{base}/json/stations/topclick"))
        .context("Invalid Radio Browser base URL")?;
    url.query_pairs_mut()
        .append_pair("limit", &limit.to_string())
        .append_pair("hidebroken", "true");
    Ok(url)
}

fn search_url(base: &str, filter: &FilterSpec, limit: u32) -> Result<Url> {
    let mut url = Url::parse(&format!("{base}/json/stations/search"))
        .context("Invalid Radio Browser base URL")?;
    {
        let mut q = url.query_pairs_mut();
        q.append_pair("limit", &limit.to_string())
            .append_pair("hidebroken", "true")
            .append_pair("has_geo", "true");
        if let Some(country) = filter.country.as_deref().filter(|c| !c.trim().is_empty()) {
            q.append_pair("country", country.trim());
        }
        if let Some(language) = filter.language.as_deref().filter(|l| !l.trim().is_empty()) {
            q.append_pair("language", language.trim());
        }
    }
    Ok(url)
}

async fn read_limited(resp: reqwest::Response, limit: usize) -> Result<Vec<u8>> {
    if let Some(len) = resp.content_length() {
        if len as usize > limit {
            return Err(anyhow!("HTTP response too large ({len} bytes)"));
        }
    }

    let mut data: Vec<u8> = Vec::new();
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("HTTP body read error")?;
        if data.len().saturating_add(chunk.len()) > limit {
            return Err(anyhow!("HTTP response exceeded size limit"));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}
