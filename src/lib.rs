//! Catalog cache and listening-session core for the Radio Browser directory.
//!
//! [`radio_browser`] talks to the directory, [`catalog`] caches and filters
//! its answers, [`controller`] applies user intents to a [`session`].

pub mod cache;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod models;
pub mod radio_browser;
pub mod session;
pub mod ui;

pub use catalog::{filter_by_quality, CatalogService};
pub use controller::{Intent, IntentOutcome, Notice, SessionController};
pub use models::{CatalogEntry, FilterSpec, Station};
pub use radio_browser::{CatalogSource, RadioBrowserClient};
pub use session::{PlayerStatus, SessionState};
