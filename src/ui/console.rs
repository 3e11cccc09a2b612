use crate::controller::{Intent, IntentOutcome, Notice, SessionController};
use crate::models::{FilterSpec, Station};
use crate::radio_browser::CatalogSource;
use crate::session::{PlayerStatus, SessionState};
use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
commands:
  top                         list top stations (current quality filter)
  find                        search with the current filter
  filter [country=..] [language=..] [min=N]
  play top|find|fav|hist N    play the N-th entry of a list
  fav [top|find N]            toggle favorite (now playing if no index)
  favs | hist                 show favorites / recently played
  surprise | stop | clear     surprise me, stop, clear session
  countries | languages       reference lists
  now | refresh | help | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Top,
    Find,
    Fav,
    Hist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Top,
    Find,
    Filter(Vec<(String, String)>),
    Play(ListKind, usize),
    Favorite(Option<(ListKind, usize)>),
    Favorites,
    History,
    Surprise,
    Stop,
    Clear,
    Countries,
    Languages,
    Refresh,
    Now,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        bail!("empty command");
    };
    let rest: Vec<&str> = words.collect();
    let cmd = match (head.to_lowercase().as_str(), rest.as_slice()) {
        ("top", []) => Command::Top,
        ("find", []) => Command::Find,
        ("filter", args) => Command::Filter(parse_filter_args(args)?),
        ("play", [list, n]) => Command::Play(parse_list(list)?, parse_index(n)?),
        ("fav", []) => Command::Favorite(None),
        ("fav", [list, n]) => Command::Favorite(Some((parse_list(list)?, parse_index(n)?))),
        ("favs", []) => Command::Favorites,
        ("hist", []) => Command::History,
        ("surprise", []) => Command::Surprise,
        ("stop", []) => Command::Stop,
        ("clear", []) => Command::Clear,
        ("countries", []) => Command::Countries,
        ("languages", []) => Command::Languages,
        ("refresh", []) => Command::Refresh,
        ("now", []) => Command::Now,
        ("help" | "?", []) => Command::Help,
        ("quit" | "exit" | "q", []) => Command::Quit,
        (other, _) => bail!("unknown or malformed command: {other} (try `help`)"),
    };
    Ok(cmd)
}

/// `key=value` pairs; bare words extend the previous value, so
/// `country=United States` keeps its space.
fn parse_filter_args(args: &[&str]) -> Result<Vec<(String, String)>> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for arg in args {
        match arg.split_once('=') {
            Some((k, v)) => {
                let key = k.to_lowercase();
                if !matches!(key.as_str(), "country" | "language" | "min") {
                    bail!("unknown filter key: {k}");
                }
                pairs.push((key, v.to_string()));
            }
            None => {
                let (_, value) = pairs
                    .last_mut()
                    .ok_or_else(|| anyhow!("expected key=value, got {arg}"))?;
                value.push(' ');
                value.push_str(arg);
            }
        }
    }
    Ok(pairs)
}

fn parse_list(s: &str) -> Result<ListKind> {
    match s.to_lowercase().as_str() {
        "top" => Ok(ListKind::Top),
        "find" => Ok(ListKind::Find),
        "fav" | "favs" => Ok(ListKind::Fav),
        "hist" => Ok(ListKind::Hist),
        other => Err(anyhow!("unknown list: {other}")),
    }
}

fn parse_index(s: &str) -> Result<usize> {
    let n: usize = s.parse().with_context(|| format!("not a number: {s}"))?;
    if n == 0 {
        bail!("lists start at 1");
    }
    Ok(n)
}

fn apply_filter(mut filter: FilterSpec, pairs: &[(String, String)]) -> Result<FilterSpec> {
    for (key, value) in pairs {
        match key.as_str() {
            "country" => filter.country = Some(value.clone()),
            "language" => filter.language = Some(value.clone()),
            "min" => {
                filter.min_bitrate_kbps = value
                    .parse()
                    .with_context(|| format!("invalid min bitrate: {value}"))?
            }
            _ => {}
        }
    }
    Ok(filter.normalized())
}

/// Line-oriented front end: renders session state and lists, forwards
/// commands to the controller.
pub struct Console<S> {
    controller: SessionController<S>,
    top: Vec<Station>,
    found: Vec<Station>,
    favs: Vec<Station>,
    hist: Vec<Station>,
}

impl<S: CatalogSource> Console<S> {
    pub fn new(controller: SessionController<S>) -> Self {
        Self {
            controller,
            top: vec![],
            found: vec![],
            favs: vec![],
            hist: vec![],
        }
    }

    pub async fn run(mut self) -> Result<()> {
        println!("{HELP}");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("Read stdin")? {
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Ok(Command::Quit) => break,
                Ok(cmd) => match self.execute(cmd).await {
                    Ok(out) => println!("{out}"),
                    Err(e) => println!("error: {e}"),
                },
                Err(e) => println!("error: {e}"),
            }
        }
        Ok(())
    }

    pub async fn execute(&mut self, cmd: Command) -> Result<String> {
        let out = match cmd {
            Command::Top => {
                self.top = self.controller.top_list().await;
                let title = format!(
                    "Top stations (min {} kbps)",
                    self.controller.filter().min_bitrate_kbps
                );
                self.render_list(&title, &self.top)
            }
            Command::Find => {
                self.found = self.controller.discover().await;
                self.render_list("Discovered stations", &self.found)
            }
            Command::Filter(pairs) => {
                let filter = apply_filter(self.controller.filter().clone(), &pairs)?;
                self.controller.handle(Intent::SetFilter(filter)).await;
                render_filter(self.controller.filter())
            }
            Command::Play(kind, n) => {
                let station = self.pick(kind, n)?;
                let outcome = self.controller.handle(Intent::Play(station)).await;
                self.render_outcome(&outcome)
            }
            Command::Favorite(target) => {
                let id = match target {
                    Some((kind, n)) => Some(self.pick(kind, n)?.id),
                    None => self
                        .controller
                        .state()
                        .current_station()
                        .map(|s| s.id.clone()),
                };
                let Some(id) = id else {
                    bail!("nothing is playing");
                };
                let outcome = self.controller.handle(Intent::ToggleFavorite(Some(id.clone()))).await;
                if outcome.state.is_favorite(&id) {
                    format!("★ added ({} saved)", outcome.state.favorites().len())
                } else {
                    format!("☆ removed ({} saved)", outcome.state.favorites().len())
                }
            }
            Command::Favorites => {
                self.favs = self.controller.favorite_stations();
                let saved = self.controller.state().favorites().len();
                if saved == 0 {
                    "No favorites yet".to_string()
                } else {
                    let title = format!("Favorites ({saved} saved, {} resolvable)", self.favs.len());
                    self.render_list(&title, &self.favs)
                }
            }
            Command::History => {
                self.hist = self
                    .controller
                    .recent_history()
                    .into_iter()
                    .cloned()
                    .collect();
                self.render_list("Recently played", &self.hist)
            }
            Command::Surprise => {
                let outcome = self.controller.handle(Intent::SurpriseMe).await;
                self.render_outcome(&outcome)
            }
            Command::Stop => {
                let outcome = self.controller.handle(Intent::Stop).await;
                self.render_outcome(&outcome)
            }
            Command::Clear => {
                let outcome = self.controller.handle(Intent::ClearAll).await;
                self.favs.clear();
                self.hist.clear();
                self.render_outcome(&outcome)
            }
            Command::Countries => render_names("Countries", &self.controller.countries().await),
            Command::Languages => render_names("Languages", &self.controller.languages().await),
            Command::Refresh => {
                self.controller.refresh_catalog();
                "Catalog cache cleared".to_string()
            }
            Command::Now => render_now_playing(self.controller.state()),
            Command::Help => HELP.to_string(),
            Command::Quit => String::new(),
        };
        Ok(out)
    }

    fn pick(&self, kind: ListKind, n: usize) -> Result<Station> {
        let (list, name) = match kind {
            ListKind::Top => (&self.top, "top"),
            ListKind::Find => (&self.found, "find"),
            ListKind::Fav => (&self.favs, "favs"),
            ListKind::Hist => (&self.hist, "hist"),
        };
        n.checked_sub(1)
            .and_then(|i| list.get(i))
            .cloned()
            .ok_or_else(|| anyhow!("no entry {n} in `{name}` (list it first)"))
    }

    fn render_list(&self, title: &str, stations: &[Station]) -> String {
        if stations.is_empty() {
            return format!("{title}: no stations found");
        }
        let state = self.controller.state();
        let mut out = format!("{title}:");
        for (i, s) in stations.iter().enumerate() {
            let star = if state.is_favorite(&s.id) { "★" } else { " " };
            out.push_str(&format!("\n{:>4}. {star} {}", i + 1, station_label(s)));
        }
        out
    }

    fn render_outcome(&self, outcome: &IntentOutcome) -> String {
        let mut out = render_now_playing(&outcome.state);
        match outcome.notice {
            Some(Notice::CatalogUnavailable) => {
                out.push_str("\nStation directory unavailable, try again later")
            }
            // Already shown on the now-playing card.
            Some(Notice::NoStreamAvailable) | None => {}
        }
        out
    }
}

fn render_filter(filter: &FilterSpec) -> String {
    format!(
        "Filter: country={} language={} min={} kbps",
        filter.country.as_deref().unwrap_or("any"),
        filter.language.as_deref().unwrap_or("any"),
        filter.min_bitrate_kbps
    )
}

fn render_names(title: &str, entries: &[crate::models::CatalogEntry]) -> String {
    if entries.is_empty() {
        return format!("{title}: unavailable");
    }
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    format!("{title} ({}): {}", names.len(), names.join(", "))
}

pub fn render_now_playing(state: &SessionState) -> String {
    let Some(s) = state.current_station() else {
        return "Nothing playing. Pick a station from `top` or `find`.".to_string();
    };
    let status = match state.player_status() {
        PlayerStatus::Playing => "Now playing",
        PlayerStatus::Stopped => "Selected",
    };
    let star = if state.is_favorite(&s.id) { "★" } else { "☆" };
    let mut out = format!("{status}: {star} {}", station_label(s));
    let subtitle = station_subtitle(s);
    if !subtitle.is_empty() {
        out.push_str(&format!("\n    {subtitle}"));
    }
    match s.playable_url() {
        Some(url) => out.push_str(&format!("\n    stream: {url}")),
        None => out.push_str("\n    ❌ No stream available"),
    }
    if let Some(home) = &s.homepage {
        out.push_str(&format!("\n    homepage: {home}"));
    }
    out
}

pub fn station_label(s: &Station) -> String {
    let name = if s.name.trim().is_empty() {
        "Unknown"
    } else {
        s.name.trim()
    };
    let country = if s.country.trim().is_empty() {
        "🌍"
    } else {
        s.country.trim()
    };
    format!(
        "{} {} [{country}]",
        ellipsize_chars(name, 50),
        s.quality().marker()
    )
}

fn station_subtitle(s: &Station) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !s.language.trim().is_empty() {
        parts.push(s.language.trim().to_string());
    }
    if !s.codec.trim().is_empty() {
        parts.push(s.codec.trim().to_string());
    }
    parts.push(format!("{} kbps", s.bitrate_kbps));
    if !s.tags.trim().is_empty() {
        parts.push(ellipsize_chars(s.tags.trim(), 60));
    }
    parts.join(" · ")
}

// Simple char-based ellipsis
fn ellipsize_chars(s: &str, max_chars: usize) -> String {
    let mut it = s.chars();
    let taken: String = it.by_ref().take(max_chars).collect();
    if it.next().is_some() {
        format!("{taken}…")
    } else {
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse_command("top").unwrap(), Command::Top);
        assert_eq!(parse_command("  Surprise ").unwrap(), Command::Surprise);
        assert_eq!(parse_command("play top 3").unwrap(), Command::Play(ListKind::Top, 3));
        assert_eq!(parse_command("fav").unwrap(), Command::Favorite(None));
        assert_eq!(
            parse_command("fav hist 2").unwrap(),
            Command::Favorite(Some((ListKind::Hist, 2)))
        );
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(parse_command("").is_err());
        assert!(parse_command("play top").is_err());
        assert!(parse_command("play top 0").is_err());
        assert!(parse_command("play radio 1").is_err());
        assert!(parse_command("dance").is_err());
        assert!(parse_command("filter bitrate=5").is_err());
    }

    #[test]
    fn filter_values_may_contain_spaces() {
        let cmd = parse_command("filter country=United States min=128").unwrap();
        let Command::Filter(pairs) = cmd else {
            panic!("expected filter");
        };
        let filter = apply_filter(FilterSpec::default(), &pairs).unwrap();
        assert_eq!(filter.country.as_deref(), Some("United States"));
        assert_eq!(filter.min_bitrate_kbps, 128);
        assert_eq!(filter.language, None);
    }

    #[test]
    fn empty_filter_value_clears_constraint() {
        let start = FilterSpec::new(Some("Germany"), Some("german"), 64);
        let pairs = vec![("country".to_string(), String::new())];
        let filter = apply_filter(start, &pairs).unwrap();
        assert_eq!(filter.country, None);
        assert_eq!(filter.language.as_deref(), Some("german"));
    }

    #[test]
    fn label_shows_quality_and_country() {
        let s = Station {
            id: "x".into(),
            name: "Jazz FM".into(),
            country: "United Kingdom".into(),
            bitrate_kbps: 96,
            ..Default::default()
        };
        assert_eq!(station_label(&s), "Jazz FM 🟡 [United Kingdom]");

        let unnamed = Station {
            id: "y".into(),
            ..Default::default()
        };
        assert_eq!(station_label(&unnamed), "Unknown 🔴 [🌍]");
    }

    #[test]
    fn now_playing_flags_missing_stream() {
        let mut state = SessionState::new();
        assert!(render_now_playing(&state).starts_with("Nothing playing"));

        state.play_station(Station {
            id: "x".into(),
            name: "Silent".into(),
            ..Default::default()
        });
        let card = render_now_playing(&state);
        assert!(card.starts_with("Now playing: ☆ Silent"));
        assert!(card.contains("No stream available"));
    }

    #[tokio::test]
    async fn index_zero_is_an_error_not_a_panic() {
        use crate::catalog::tests::{station, FakeSource};
        use crate::catalog::CatalogService;
        use crate::config::{BrowseConfig, CacheConfig};
        use std::sync::Arc;

        let source = FakeSource {
            top: vec![station("a", 128)],
            ..Default::default()
        };
        let catalog = Arc::new(CatalogService::new(source, CacheConfig::default()));
        let mut console = Console::new(SessionController::new(catalog, BrowseConfig::default()));

        console.execute(Command::Top).await.unwrap();
        assert!(console.execute(Command::Play(ListKind::Top, 0)).await.is_err());
        assert!(console.execute(Command::Favorite(Some((ListKind::Top, 0)))).await.is_err());
        assert!(console.execute(Command::Play(ListKind::Top, 2)).await.is_err());

        let card = console.execute(Command::Play(ListKind::Top, 1)).await.unwrap();
        assert!(card.starts_with("Now playing:"));
    }

    #[test]
    fn ellipsizes_long_names() {
        assert_eq!(ellipsize_chars("abcdef", 3), "abc…");
        assert_eq!(ellipsize_chars("abc", 3), "abc");
    }
}
