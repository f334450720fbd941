use ratehub::core::{AppConfig, ParserConfig, RateError};
use ratehub::lookup::RateLookup;
use ratehub::store::RateStore;
use ratehub::updater::RatesUpdater;
use ratehub::{AppCommand, run_command};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::info;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const COINGECKO_BODY: &str = r#"{"bitcoin": {"usd": 50000.0}}"#;
    pub const EXCHANGERATE_BODY: &str = r#"{
        "result": "success",
        "base_code": "USD",
        "conversion_rates": {"USD": 1.0, "EUR": 0.9259259259259258}
    }"#;

    pub async fn mount_coingecko(server: &MockServer, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .and(query_param("ids", "bitcoin"))
            .and(query_param("vs_currencies", "usd"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    // Any key, so a key exported in the environment does not break the match
    pub async fn mount_exchangerate(server: &MockServer, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path_regex(r"^/v6/[^/]+/latest/USD$"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }
}

struct TestApp {
    _dir: TempDir,
    config_path: PathBuf,
    config: Arc<ParserConfig>,
}

impl TestApp {
    fn new(base_url: &str) -> Self {
        Self::with_urls(base_url, base_url, "test-key")
    }

    fn with_urls(coingecko_base: &str, exchangerate_base: &str, api_key: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config_path =
            write_config_with_urls(dir.path(), coingecko_base, exchangerate_base, Some(api_key));
        let app_config = AppConfig::load_from_path(&config_path).expect("Failed to load config");
        let config = Arc::new(ParserConfig::from_app_config(&app_config).expect("Invalid config"));
        Self {
            _dir: dir,
            config_path,
            config,
        }
    }

    fn store(&self) -> RateStore {
        RateStore::new(Arc::clone(&self.config))
    }

    fn updater(&self) -> RatesUpdater {
        RatesUpdater::new(Arc::clone(&self.config), self.store())
    }

    fn lookup(&self) -> RateLookup {
        RateLookup::new(Arc::clone(&self.config), self.store())
    }

    fn config_path(&self) -> Option<&str> {
        self.config_path.to_str()
    }
}

fn write_config(dir: &Path, base_url: &str, api_key: Option<&str>) -> PathBuf {
    write_config_with_urls(dir, base_url, base_url, api_key)
}

fn write_config_with_urls(
    dir: &Path,
    coingecko_base: &str,
    exchangerate_base: &str,
    api_key: Option<&str>,
) -> PathBuf {
    let key_line = api_key.map_or(String::new(), |k| format!("    api_key: \"{k}\"\n"));
    let yaml = format!(
        r#"
base_currency: USD
fiat_currencies: [EUR]
crypto_currencies: [BTC]
crypto_id_map:
  BTC: bitcoin
request_timeout_secs: 2
rates_ttl_seconds: 300
data_path: "{data}"
providers:
  coingecko:
    base_url: "{coingecko_base}/api/v3"
  exchangerate:
    base_url: "{exchangerate_base}/v6"
{key_line}"#,
        data = dir.join("data").display(),
    );
    let path = dir.join("config.yaml");
    fs::write(&path, yaml).expect("Failed to write config");
    path
}

#[test_log::test(tokio::test)]
async fn test_update_then_lookup_both_directions() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_coingecko(&server, 200, test_utils::COINGECKO_BODY).await;
    test_utils::mount_exchangerate(&server, 200, test_utils::EXCHANGERATE_BODY).await;
    let app = TestApp::new(&server.uri());

    let result = app.updater().run_update(None).await.unwrap();
    info!(?result, "Update finished");
    assert!(result.success);
    assert!(result.errors.is_empty());
    assert_eq!(result.rates_count, 2);
    assert_eq!(result.pairs_stored, 4);

    let table = app.lookup().current_table();
    let mut pairs: Vec<&str> = table.pairs.keys().map(String::as_str).collect();
    pairs.sort_unstable();
    assert_eq!(pairs, vec!["BTC_USD", "EUR_USD", "USD_BTC", "USD_EUR"]);
    assert_eq!(table.meta.sources_used, vec!["coingecko", "exchangerate"]);
    assert_eq!(table.meta.errors_encountered, None);

    let btc = app.lookup().get_rate("BTC", "USD").unwrap();
    assert_eq!(btc.rate, 50000.0);
    assert_eq!(btc.source, "CoinGecko");

    let usd_btc = app.lookup().get_rate("USD", "BTC").unwrap();
    assert!((usd_btc.rate - 0.00002).abs() < 1e-12);
    assert_eq!(usd_btc.source, "calculated from BTC_USD");

    let eur = app.lookup().get_rate("eur", "usd").unwrap();
    assert!((eur.rate - 1.08).abs() < 1e-9);
    assert_eq!(eur.source, "ExchangeRate-API");

    let history = app.store().load_history();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| r.timestamp == table.last_refresh.clone().unwrap()));
}

#[test_log::test(tokio::test)]
async fn test_one_provider_down_keeps_the_other() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_coingecko(&server, 200, test_utils::COINGECKO_BODY).await;
    test_utils::mount_exchangerate(&server, 500, "Internal Server Error").await;
    let app = TestApp::new(&server.uri());

    let result = app.updater().run_update(None).await.unwrap();
    assert!(result.success);
    assert_eq!(result.pairs_stored, 2);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("exchangerate"));

    let table = app.lookup().current_table();
    assert!(table.get("BTC", "USD").is_some());
    assert!(table.get("EUR", "USD").is_none());
    assert_eq!(table.meta.errors_encountered.as_ref().map(Vec::len), Some(1));

    assert!(matches!(
        app.lookup().get_rate("EUR", "USD"),
        Err(RateError::RateUnavailable { .. })
    ));
}

#[test_log::test(tokio::test)]
async fn test_all_providers_down_leaves_snapshot_untouched() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_coingecko(&server, 200, test_utils::COINGECKO_BODY).await;
    test_utils::mount_exchangerate(&server, 200, test_utils::EXCHANGERATE_BODY).await;
    let app = TestApp::new(&server.uri());
    app.updater().run_update(None).await.unwrap();
    let before = fs::read(&app.config.rates_file).unwrap();

    server.reset().await;
    test_utils::mount_coingecko(&server, 429, "Too Many Requests").await;
    test_utils::mount_exchangerate(&server, 200, r#"{"result": "error", "error-type": "invalid-key"}"#)
        .await;

    let err = app.updater().run_update(None).await.unwrap_err();
    match &err {
        RateError::AllSourcesFailed(errors) => {
            assert_eq!(errors.len(), 2);
            assert!(errors.iter().any(|e| e.contains("invalid-key")));
        }
        other => panic!("Expected all sources to fail, got {other:?}"),
    }
    assert_eq!(fs::read(&app.config.rates_file).unwrap(), before);
    assert_eq!(app.store().load_history().len(), 2);
}

#[test_log::test(tokio::test)]
async fn test_unreachable_fiat_provider_keeps_key_out_of_cache() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_coingecko(&server, 200, test_utils::COINGECKO_BODY).await;
    // Nothing listens on the discard port
    let app = TestApp::with_urls(&server.uri(), "http://127.0.0.1:9", "SECRET-KEY-123");
    let key = app.config.exchangerate_api_key.clone();

    let result = app.updater().run_update(None).await.unwrap();
    assert!(result.success);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors.iter().all(|e| !e.contains(&key)));

    let cached = fs::read_to_string(&app.config.rates_file).unwrap();
    assert!(cached.contains("errors_encountered"));
    assert!(!cached.contains(&key));
}

#[test_log::test(tokio::test)]
async fn test_single_source_update() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_coingecko(&server, 200, test_utils::COINGECKO_BODY).await;
    let app = TestApp::new(&server.uri());

    let result = app.updater().run_update(Some("coingecko")).await.unwrap();
    assert!(result.success);
    assert_eq!(result.rates_count, 1);
    assert_eq!(
        app.lookup().current_table().meta.sources_used,
        vec!["coingecko"]
    );

    let rejected = app.updater().run_update(Some("yahoo")).await.unwrap();
    assert!(!rejected.success);
    assert_eq!(rejected.errors, vec!["Unknown rate source: yahoo"]);
}

#[test_log::test(tokio::test)]
async fn test_commands_run_against_config_file() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_coingecko(&server, 200, test_utils::COINGECKO_BODY).await;
    test_utils::mount_exchangerate(&server, 200, test_utils::EXCHANGERATE_BODY).await;
    let app = TestApp::new(&server.uri());

    run_command(AppCommand::UpdateRates { source: None }, app.config_path())
        .await
        .unwrap();
    assert!(app.config.rates_file.exists());

    run_command(
        AppCommand::ShowRates {
            currency: Some("btc".to_string()),
            top: None,
        },
        app.config_path(),
    )
    .await
    .unwrap();

    run_command(
        AppCommand::GetRate {
            from: "BTC".to_string(),
            to: "USD".to_string(),
        },
        app.config_path(),
    )
    .await
    .unwrap();

    let unknown = run_command(
        AppCommand::GetRate {
            from: "XRP".to_string(),
            to: "USD".to_string(),
        },
        app.config_path(),
    )
    .await;
    assert!(unknown.unwrap_err().to_string().contains("Unknown currency 'XRP'"));
}

#[test_log::test(tokio::test)]
async fn test_failed_update_command_exits_with_error() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_coingecko(&server, 500, "boom").await;
    test_utils::mount_exchangerate(&server, 500, "boom").await;
    let app = TestApp::new(&server.uri());

    let result = run_command(AppCommand::UpdateRates { source: None }, app.config_path()).await;
    let message = result.unwrap_err().to_string();
    assert!(message.contains("All rate sources are unavailable"));
    assert!(!app.config.rates_file.exists());
}

#[test_log::test(tokio::test)]
async fn test_schedule_rejects_invalid_interval() {
    let app = TestApp::new("http://127.0.0.1:9");

    let result = run_command(
        AppCommand::Schedule {
            interval_minutes: Some(0),
        },
        app.config_path(),
    )
    .await;
    assert!(result.unwrap_err().to_string().contains("greater than zero"));

    let result = run_command(
        AppCommand::Schedule {
            interval_minutes: Some(u64::MAX),
        },
        app.config_path(),
    )
    .await;
    assert!(result.unwrap_err().to_string().contains("too large"));
}

#[test]
fn test_missing_api_key_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "http://127.0.0.1:9", None);
    let config = AppConfig::load_from_path(&path).unwrap();

    let err = ParserConfig::with_api_key(&config, None).unwrap_err();
    assert!(err.to_string().contains("EXCHANGERATE_API_KEY"));
}
