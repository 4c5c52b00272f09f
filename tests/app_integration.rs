use std::fs;
use tracing::info;

mod test_utils {
    use chrono::{Duration, Utc};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// A daily chart covering the 360 days before today, opening at 14:30 UTC.
    pub fn daily_chart_response(symbol: &str) -> String {
        let today = Utc::now().date_naive();
        let timestamps: Vec<String> = (1..=360)
            .rev()
            .map(|days| {
                (today - Duration::days(days))
                    .and_hms_opt(14, 30, 0)
                    .unwrap()
                    .and_utc()
                    .timestamp()
                    .to_string()
            })
            .collect();
        let opens: Vec<String> = (0..360).map(|i| format!("{}.5", 100 + i % 20)).collect();
        let dividend_ts = &timestamps[200];

        format!(
            r#"{{
                "chart": {{
                    "result": [{{
                        "meta": {{ "currency": "USD", "symbol": "{symbol}" }},
                        "timestamp": [{}],
                        "indicators": {{ "quote": [{{ "open": [{}] }}] }},
                        "events": {{ "dividends": {{
                            "{dividend_ts}": {{ "amount": 1.65, "date": {dividend_ts} }}
                        }} }}
                    }}],
                    "error": null
                }}
            }}"#,
            timestamps.join(", "),
            opens.join(", "),
        )
    }

    pub async fn create_mock_server(symbol: &str, status: u16, expected_calls: u64) -> MockServer {
        let mock_server = MockServer::start().await;
        let url_path = format!("/v8/finance/chart/{symbol}");

        Mock::given(method("GET"))
            .and(path(&url_path))
            .respond_with(
                ResponseTemplate::new(status).set_body_string(daily_chart_response(symbol)),
            )
            .expect(expected_calls)
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn write_config(file: &tempfile::NamedTempFile, base_url: &str, max_retry: u32) {
        let config_content = format!(
            r#"
            providers:
              yfinance:
                base_url: {base_url}
                timeout_secs: 5
            retry:
              max_retry: {max_retry}
              delay_ms: 0
            defaults:
              source: yfinance
              interval: 1d
              period: 1y
            "#
        );
        std::fs::write(file.path(), config_content).expect("Failed to write config file");
    }
}

#[test_log::test(tokio::test)]
async fn test_getter_reuses_cached_series() {
    let mock_server = test_utils::create_mock_server("IBM", 200, 1).await;
    let mut config = sharpe::config::AppConfig::default();
    config.providers.yfinance.base_url = mock_server.uri();

    let (daily, weekly, again) = tokio::task::spawn_blocking(move || {
        let mut getter = sharpe::data_getter_factory("yfinance", &config).unwrap();
        let daily = getter.get_data("IBM", "1d", "1y").unwrap();
        let weekly = getter.get_data("IBM", "1wk", "6mo").unwrap();
        let again = getter.get_data("IBM", "1d", "1y").unwrap();
        (daily, weekly, again)
    })
    .await
    .unwrap();

    info!(daily = daily.len(), weekly = weekly.len(), "Fetched series");
    assert_eq!(daily.len(), 360);
    assert!(std::sync::Arc::ptr_eq(&daily, &again));
    assert!((25..=28).contains(&weekly.len()), "weekly len {}", weekly.len());
    assert_eq!(daily.dividends().sum::<f64>(), 1.65);
    assert!(daily.prices().all(|p| !p.is_nan()));
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let mock_server = test_utils::create_mock_server("IBM", 200, 1).await;
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    test_utils::write_config(&config_file, &mock_server.uri(), 0);
    let config_path = config_file.path().to_str().unwrap().to_string();

    let args = sharpe::FetchArgs {
        symbols: vec!["IBM".to_string()],
        source: None,
        requests: vec![
            "1d:1y".parse().unwrap(),
            "1wk:1y".parse().unwrap(),
            "1mo:6mo".parse().unwrap(),
        ],
        tail: 3,
        dump_cache: true,
    };
    let result = tokio::task::spawn_blocking(move || {
        sharpe::run_command(sharpe::AppCommand::Fetch(args), Some(&config_path))
    })
    .await
    .unwrap();

    assert!(
        result.is_ok(),
        "Main function failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_default_request_from_config() {
    let mock_server = test_utils::create_mock_server("MSFT", 200, 1).await;
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    test_utils::write_config(&config_file, &mock_server.uri(), 0);
    let config_path = config_file.path().to_str().unwrap().to_string();

    let args = sharpe::FetchArgs {
        symbols: vec!["MSFT".to_string()],
        ..Default::default()
    };
    let result = tokio::task::spawn_blocking(move || {
        sharpe::run_command(sharpe::AppCommand::Fetch(args), Some(&config_path))
    })
    .await
    .unwrap();

    assert!(result.is_ok(), "Fetch failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_server_errors_exhaust_retries() {
    let mock_server = test_utils::create_mock_server("IBM", 503, 3).await;
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    test_utils::write_config(&config_file, &mock_server.uri(), 2);
    let config_path = config_file.path().to_str().unwrap().to_string();

    let args = sharpe::FetchArgs {
        symbols: vec!["IBM".to_string()],
        requests: vec!["1d:1y".parse().unwrap()],
        ..Default::default()
    };
    let result = tokio::task::spawn_blocking(move || {
        sharpe::run_command(sharpe::AppCommand::Fetch(args), Some(&config_path))
    })
    .await
    .unwrap();

    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "All 1 request(s) failed");
}

#[test_log::test]
fn test_unknown_source_is_rejected() {
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    test_utils::write_config(&config_file, "http://127.0.0.1:9", 0);

    let args = sharpe::FetchArgs {
        symbols: vec!["IBM".to_string()],
        source: Some("bloomberg".to_string()),
        ..Default::default()
    };
    let err = sharpe::run_command(
        sharpe::AppCommand::Fetch(args),
        config_file.path().to_str(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("'bloomberg' data source not in"));
}

#[test_log::test]
fn test_intervals_command() {
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    fs::write(config_file.path(), "{}").expect("Failed to write config file");

    let result = sharpe::run_command(sharpe::AppCommand::Intervals, config_file.path().to_str());
    assert!(result.is_ok(), "Intervals failed with: {:?}", result.err());
}
