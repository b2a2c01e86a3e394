use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pricefeed_core::{Answer, RoundRecord, SignerIdentity};
use pricefeed_server::{AppConfig, AppState, CacheBackend, Collaborators, build_app};
use pricefeed_storage::{OracleError, OracleReader, OracleWriter};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

const SIGNER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

/// A single-contract oracle that advances one round per accepted update.
struct FakeOracle {
    latest: Mutex<RoundRecord>,
    owner: SignerIdentity,
    latest_calls: AtomicUsize,
    submissions: AtomicUsize,
}

impl FakeOracle {
    fn new(owner: &str) -> Arc<Self> {
        let first = RoundRecord::new(
            7,
            Answer::parse("250000000000").unwrap(),
            1_700_000_000,
            1_700_000_005,
            7,
        )
        .unwrap();
        Arc::new(Self {
            latest: Mutex::new(first),
            owner: SignerIdentity::parse(owner).unwrap(),
            latest_calls: AtomicUsize::new(0),
            submissions: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl OracleReader for FakeOracle {
    async fn latest(&self) -> Result<RoundRecord, OracleError> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.latest.lock().unwrap().clone())
    }

    async fn by_round_id(&self, round_id: u64) -> Result<RoundRecord, OracleError> {
        let latest = self.latest.lock().unwrap().clone();
        if latest.round_id == round_id {
            Ok(latest)
        } else {
            Err(OracleError::RoundNotFound { round_id })
        }
    }
}

#[async_trait]
impl OracleWriter for FakeOracle {
    async fn current_authorized_identity(&self) -> Result<SignerIdentity, OracleError> {
        Ok(self.owner.clone())
    }

    async fn submit(&self, value: &Answer) -> Result<String, OracleError> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        let mut latest = self.latest.lock().unwrap();
        let round_id = latest.round_id + 1;
        *latest = RoundRecord::new(
            round_id,
            value.clone(),
            1_700_000_100,
            1_700_000_100,
            round_id,
        )
        .unwrap();
        Ok(format!("0x{n:064x}"))
    }
}

fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.retry.base_delay_ms = 1;
    cfg.retry.max_delay_ms = 5;
    cfg.server.rate_limit_per_second = 0;
    cfg
}

async fn start_server(
    cfg: AppConfig,
    oracle: Arc<FakeOracle>,
) -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let parts = Collaborators {
        cache: Arc::new(CacheBackend::new_local()),
        store: pricefeed_db_memory::create_round_store(),
        reader: oracle.clone(),
        writer: oracle,
        signer: SignerIdentity::parse(SIGNER).unwrap(),
    };
    let app = build_app(AppState::new(parts, &cfg), &cfg.server);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

#[tokio::test]
async fn reads_go_through_the_tiers() {
    let oracle = FakeOracle::new(SIGNER);
    let (base, shutdown_tx, handle) = start_server(test_config(), oracle.clone()).await;
    let client = reqwest::Client::new();

    // First read misses cache and durable store
    let resp = client.get(format!("{base}/latestPrice")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["x-served-by"], "source");
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "roundId": 7,
            "answer": "250000000000",
            "startedAt": 1_700_000_000,
            "updatedAt": 1_700_000_005,
            "answeredInRound": 7,
        })
    );

    // Second read is served from the cache
    let resp = client.get(format!("{base}/latestPrice")).send().await.unwrap();
    assert_eq!(resp.headers()["x-served-by"], "cache");
    assert_eq!(oracle.latest_calls.load(Ordering::SeqCst), 1);

    // Round 7 was back-filled into the durable store
    let resp = client.get(format!("{base}/round/7")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["x-served-by"], "durable");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn read_errors_are_mapped_to_status_codes() {
    let (base, shutdown_tx, handle) = start_server(test_config(), FakeOracle::new(SIGNER)).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/round/abc")).send().await.unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.headers()["content-type"], "application/json");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");

    let resp = client.get(format!("{base}/round/99")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn update_price_refreshes_and_reconciles() {
    let oracle = FakeOracle::new(SIGNER);
    let (base, shutdown_tx, handle) = start_server(test_config(), oracle.clone()).await;
    let client = reqwest::Client::new();

    // Warm the cache with round 7
    let resp = client.get(format!("{base}/latestPrice")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let wide = "123456789012345678901234567890";
    let resp = client
        .post(format!("{base}/updatePrice"))
        .json(&json!({ "newAnswer": wide }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["txHash"], format!("0x{:064x}", 1));
    assert_eq!(body["roundId"], 8);
    assert_eq!(body["answer"], wide);

    // Cached "latest" was invalidated and round 8 appended to the store
    let resp = client.get(format!("{base}/latestPrice")).send().await.unwrap();
    assert_eq!(resp.headers()["x-served-by"], "durable");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["roundId"], 8);
    assert_eq!(body["answer"], wide);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn update_price_rejects_bad_input_and_foreign_signer() {
    let (base, shutdown_tx, handle) = start_server(test_config(), FakeOracle::new(SIGNER)).await;
    let client = reqwest::Client::new();

    for body in [json!({ "newAnswer": "12.5" }), json!({ "newAnswer": "" }), json!({})] {
        let resp = client
            .post(format!("{base}/updatePrice"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "body {body}");
    }

    let resp = client
        .post(format!("{base}/updatePrice"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let _ = shutdown_tx.send(());
    let _ = handle.await;

    // Contract owned by someone else
    let foreign = FakeOracle::new("0x00000000000000000000000000000000000000bb");
    let (base, shutdown_tx, handle) = start_server(test_config(), foreign.clone()).await;
    let resp = client
        .post(format!("{base}/updatePrice"))
        .json(&json!({ "newAnswer": "1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(foreign.submissions.load(Ordering::SeqCst), 0);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn health_reports_every_tier() {
    let (base, shutdown_tx, handle) = start_server(test_config(), FakeOracle::new(SIGNER)).await;

    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "status": "ok",
            "rpcConnected": true,
            "redisConnected": true,
            "postgresConnected": true,
        })
    );

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn api_key_guards_everything_but_health() {
    let mut cfg = test_config();
    cfg.server.api_key = Some("s3cret".into());
    let (base, shutdown_tx, handle) = start_server(cfg, FakeOracle::new(SIGNER)).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/latestPrice")).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(format!("{base}/latestPrice"))
        .header("x-api-key", "s3cret")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
