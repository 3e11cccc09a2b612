use radiohub::config::{ApiConfig, CacheConfig};
use radiohub::{CatalogService, CatalogSource, FilterSpec, RadioBrowserClient};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(base: &str) -> RadioBrowserClient {
    let cfg = ApiConfig {
        base_url: Some(base.to_string()),
        max_attempts: 1,
        ..Default::default()
    };
    RadioBrowserClient::new(&cfg).unwrap()
}

fn stations_json() -> serde_json::Value {
    json!([
        {
            "stationuuid": "960e57c5-0601-11e8-ae97-52543be04c81",
            "name": "SWR3",
            "country": "Germany",
            "language": "german",
            "bitrate": 128,
            "codec": "MP3",
            "tags": "pop,rock",
            "url": "http://swr3.example/raw.m3u",
            "url_resolved": "https://swr3.example/live.mp3",
            "homepage": "https://www.swr3.de/",
            "favicon": "https://www.swr3.de/favicon.ico",
            "clickcount": 4000
        },
        {
            "stationuuid": "b2",
            "name": "Low Fi",
            "country": "Germany",
            "bitrate": 32,
            "url_resolved": ""
        }
    ])
}

#[tokio::test]
async fn fetches_top_stations() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json/stations/topclick"))
        .and(query_param("limit", "300"))
        .and(query_param("hidebroken", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stations_json()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let stations = client.top_stations(300).await;

    assert_eq!(stations.len(), 2);
    assert_eq!(stations[0].name, "SWR3");
    assert_eq!(stations[0].bitrate_kbps, 128);
    assert_eq!(
        stations[0].stream_url.as_deref(),
        Some("https://swr3.example/live.mp3")
    );
    assert_eq!(stations[1].stream_url, None);
}

#[tokio::test]
async fn search_sends_filter_and_geo_constraints() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json/stations/search"))
        .and(query_param("limit", "200"))
        .and(query_param("hidebroken", "true"))
        .and(query_param("has_geo", "true"))
        .and(query_param("country", "Germany"))
        .and(query_param("language", "german"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stations_json()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let filter = FilterSpec::new(Some("Germany"), Some("german"), 64);
    let stations = client.search(&filter, 200).await;

    assert_eq!(stations.len(), 2);
}

#[tokio::test]
async fn reference_lists() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json/countries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "Austria", "iso_3166_1": "AT", "stationcount": 500},
            {"name": "Germany", "iso_3166_1": "DE", "stationcount": 4000}
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/json/languages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "german", "iso_639": "de", "stationcount": 4200}
        ])))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let countries = client.countries().await;
    let languages = client.languages().await;

    assert_eq!(countries.len(), 2);
    assert_eq!(countries[1].name, "Germany");
    assert_eq!(languages[0].stationcount, 4200);
}

#[tokio::test]
async fn server_error_degrades_to_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json/stations/topclick"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    assert!(client.top_stations(300).await.is_empty());
    assert!(client.try_top_stations(300).await.is_err());
}

#[tokio::test]
async fn malformed_body_degrades_to_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json/countries"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    assert!(client.countries().await.is_empty());
}

#[tokio::test]
async fn unreachable_upstream_degrades_to_empty() {
    let client = client_for("http://127.0.0.1:9");
    let filter = FilterSpec::default();
    assert!(client.search(&filter, 10).await.is_empty());
}

#[tokio::test]
async fn service_serves_repeat_queries_from_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json/stations/search"))
        .and(query_param("country", "Germany"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stations_json()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let catalog = CatalogService::new(client_for(&mock_server.uri()), CacheConfig::default());

    let all = catalog
        .discover(&FilterSpec::new(Some("Germany"), None, 0), 200)
        .await;
    let hq = catalog
        .discover(&FilterSpec::new(Some("Germany"), None, 128), 200)
        .await;

    assert_eq!(all.len(), 2);
    assert_eq!(hq.len(), 1);
    assert_eq!(hq[0].name, "SWR3");
}

#[tokio::test]
async fn failed_fetch_is_cached_as_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json/stations/topclick"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let catalog = CatalogService::new(client_for(&mock_server.uri()), CacheConfig::default());

    assert!(catalog.top_stations(300).await.is_empty());
    assert!(catalog.top_stations(300).await.is_empty());
}
