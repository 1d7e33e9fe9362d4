//! Supervisor startup and shutdown against on-disk wallet records.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mm_bot::{AgentSupervisor, AppConfig, AppError, AppResult};
use mm_core::{BookLevel, OrderBookSnapshot, Price, Size};
use mm_exchange::{Exchange, MockExchange};
use mm_vault::{CredentialVault, EncryptedWalletRecord, KeySource, WalletCredential};
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Well-known development mnemonic (DO NOT use with real funds)
const TEST_SEED: &str = "test test test test test test test test test test test junk";

fn quotable_book() -> OrderBookSnapshot {
    OrderBookSnapshot::new(
        vec![BookLevel::new(Price::new(dec!(100)), Size::new(dec!(1)))],
        vec![BookLevel::new(Price::new(dec!(102)), Size::new(dec!(1)))],
    )
}

fn write_wallet(dir: &Path, file: &str, name: &str) {
    let credential = WalletCredential::new(name, "key", "secret", TEST_SEED);
    EncryptedWalletRecord::seal_with_fresh_key(&credential)
        .unwrap()
        .save(dir.join(file))
        .unwrap();
}

/// Connector handing each wallet its own scripted exchange.
fn mock_connector(
    mocks: Arc<Mutex<HashMap<String, Arc<MockExchange>>>>,
) -> impl Fn(CredentialVault) -> AppResult<Arc<dyn Exchange>> {
    move |vault| {
        let mock = Arc::new(MockExchange::new());
        mock.set_fallback_book(quotable_book());
        mocks
            .lock()
            .unwrap()
            .insert(vault.name().to_string(), mock.clone());
        Ok(mock as Arc<dyn Exchange>)
    }
}

fn config_for(dir: &Path) -> AppConfig {
    AppConfig {
        wallets_dir: dir.to_path_buf(),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn corrupt_wallet_does_not_block_others() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.json"), "{ not json").unwrap();
    write_wallet(dir.path(), "b.json", "wallet-b");

    let mocks = Arc::new(Mutex::new(HashMap::new()));
    let supervisor =
        AgentSupervisor::start_with(&config_for(dir.path()), mock_connector(mocks.clone())).unwrap();

    let report = supervisor.report().clone();
    assert_eq!(report.started, vec!["wallet-b".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].path.ends_with("a.json"));

    // wallet-b completes its first cycle (SELL lands at t = 1)
    tokio::time::sleep(Duration::from_secs(2)).await;
    let mock_b = mocks.lock().unwrap()["wallet-b"].clone();
    assert_eq!(mock_b.submitted().len(), 2);

    supervisor.shutdown();
    let summaries = supervisor.wait().await;
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].wallet, "wallet-b");
    assert_eq!(summaries[0].cycles, 1);
}

#[tokio::test(start_paused = true)]
async fn invalid_config_starts_no_agents() {
    let dir = tempfile::tempdir().unwrap();
    write_wallet(dir.path(), "wallet1.json", "wallet1");
    let config = AppConfig {
        retry_backoff_secs: 0,
        ..config_for(dir.path())
    };

    let mocks = Arc::new(Mutex::new(HashMap::new()));
    let result = AgentSupervisor::start_with(&config, mock_connector(mocks.clone()));

    assert!(matches!(result, Err(AppError::Config(_))));
    assert!(mocks.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn undecryptable_wallet_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let credential = WalletCredential::new("mismatched", "k", "s", TEST_SEED);
    let mut record = EncryptedWalletRecord::seal_with_fresh_key(&credential).unwrap();
    // Embedded key from a different record cannot decrypt these ciphertexts
    record.encryption_key = EncryptedWalletRecord::seal_with_fresh_key(&credential)
        .unwrap()
        .encryption_key;
    record.save(dir.path().join("mismatched.json")).unwrap();
    write_wallet(dir.path(), "ok.json", "ok");

    let mocks = Arc::new(Mutex::new(HashMap::new()));
    let supervisor =
        AgentSupervisor::start_with(&config_for(dir.path()), mock_connector(mocks)).unwrap();

    assert_eq!(supervisor.agent_count(), 1);
    assert_eq!(supervisor.report().failed.len(), 1);

    supervisor.shutdown();
    supervisor.wait().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_every_agent() {
    let dir = tempfile::tempdir().unwrap();
    for i in 1..=3 {
        write_wallet(dir.path(), &format!("wallet{i}.json"), &format!("wallet{i}"));
    }
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let mocks = Arc::new(Mutex::new(HashMap::new()));
    let supervisor =
        AgentSupervisor::start_with(&config_for(dir.path()), mock_connector(mocks.clone())).unwrap();
    assert_eq!(supervisor.agent_count(), 3);
    assert_eq!(mocks.lock().unwrap().len(), 3);

    tokio::time::sleep(Duration::from_secs(3)).await;
    let token = supervisor.cancellation_token();
    supervisor.shutdown();
    assert!(token.is_cancelled());

    let summaries = supervisor.wait().await;
    assert_eq!(summaries.len(), 3);

    let calls_at_stop: Vec<usize> = mocks
        .lock()
        .unwrap()
        .values()
        .map(|mock| mock.call_count())
        .collect();
    tokio::time::sleep(Duration::from_secs(30)).await;
    let calls_later: Vec<usize> = mocks
        .lock()
        .unwrap()
        .values()
        .map(|mock| mock.call_count())
        .collect();
    assert_eq!(calls_at_stop, calls_later);
}

#[tokio::test(start_paused = true)]
async fn external_key_file_opens_detached_records() {
    let dir = tempfile::tempdir().unwrap();
    let keys = tempfile::tempdir().unwrap();

    let credential = WalletCredential::new("external", "k", "s", TEST_SEED);
    let key = EncryptedWalletRecord::seal_with_fresh_key(&credential)
        .unwrap()
        .encryption_key
        .unwrap();
    EncryptedWalletRecord::seal_detached(&credential, &key)
        .unwrap()
        .save(dir.path().join("external.json"))
        .unwrap();
    let key_path = keys.path().join("wallet.key");
    std::fs::write(&key_path, &key).unwrap();

    let config = AppConfig {
        key_source: KeySource::File { path: key_path },
        ..config_for(dir.path())
    };
    let mocks = Arc::new(Mutex::new(HashMap::new()));
    let supervisor = AgentSupervisor::start_with(&config, mock_connector(mocks)).unwrap();

    assert_eq!(supervisor.report().started, vec!["external".to_string()]);
    supervisor.shutdown();
    supervisor.wait().await;
}

#[tokio::test]
async fn http_agent_signs_and_places_both_sides() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/markets/BTC_USDC/order-book"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "BUY": [{"price": "100.00", "quantity": "1"}],
            "SELL": [{"price": "102.00", "quantity": "1"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_wallet(dir.path(), "wallet1.json", "wallet1");
    let config = AppConfig {
        base_url: server.uri(),
        wallets_dir: dir.path().to_path_buf(),
        inter_order_delay_ms: 1000,
        request_timeout_secs: 5,
        ..Default::default()
    };

    let supervisor = AgentSupervisor::start(&config).unwrap();
    assert_eq!(supervisor.agent_count(), 1);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let posts = server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == "POST")
            .count();
        if posts >= 2 || tokio::time::Instant::now() > deadline {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    supervisor.shutdown();
    supervisor.wait().await;

    let requests = server.received_requests().await.unwrap();
    let posts: Vec<_> = requests
        .iter()
        .filter(|r| r.method.as_str() == "POST")
        .collect();
    assert!(posts.len() >= 2);

    let buy: serde_json::Value = serde_json::from_slice(&posts[0].body).unwrap();
    assert_eq!(buy["side"], "BUY");
    assert_eq!(buy["price"], "100.90");
    assert_eq!(buy["quantity"], "0.001000");
    assert_eq!(buy["message"], "BUY 0.001000 BTC/USDC @PRICE: 100.90");
    assert!(posts[0].headers.contains_key("x-api-signature"));

    let sell: serde_json::Value = serde_json::from_slice(&posts[1].body).unwrap();
    assert_eq!(sell["side"], "SELL");
    assert_eq!(sell["price"], "101.10");
}
