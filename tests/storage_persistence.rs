//! Persistence adapter behavior.
//!
//! The connect-retry contract is exercised against a local TCP listener
//! that drops every connection, so no database is needed. The
//! schema/save/read tests require a running PostgreSQL instance and are
//! `#[ignore]`-gated; run them with the usual `POSTGRES_*` environment
//! and `cargo test -- --ignored`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cryptostation::config::DatabaseConfig;
use cryptostation::storage::postgres::CONNECT_ATTEMPTS;
use cryptostation::storage::{MetricSample, MetricsStore};
use pretty_assertions::assert_eq;
use tokio::net::TcpListener;

fn config_for(host: &str, port: u16) -> DatabaseConfig {
    DatabaseConfig {
        host: host.to_string(),
        port,
        user: "postgres".to_string(),
        password: "password".to_string(),
        database: "cstm_test".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_connect_attempts_exactly_five_times_then_fails() {
    // A listener that accepts and immediately drops every connection;
    // each retry shows up as one accepted socket. Paused tokio time
    // fast-forwards the inter-attempt delays.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        loop {
            if let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(socket);
            }
        }
    });

    let result = MetricsStore::connect(&config_for("127.0.0.1", port)).await;

    assert!(result.is_err(), "connect must report failure, not panic");
    assert_eq!(accepted.load(Ordering::SeqCst), CONNECT_ATTEMPTS as usize);
}

#[tokio::test(start_paused = true)]
async fn test_connect_refused_host_fails_without_panicking() {
    // Discard port; nothing listens there.
    let result = MetricsStore::connect(&config_for("127.0.0.1", 9)).await;

    assert!(result.is_err());
}

fn live_config() -> DatabaseConfig {
    let config = cryptostation::config::Config::from_env();
    config.database
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance (POSTGRES_* environment)"]
async fn test_init_schema_is_idempotent() {
    let mut store = MetricsStore::connect(&live_config()).await.unwrap();

    store.init_schema().await.unwrap();
    store.init_schema().await.unwrap();

    store.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance (POSTGRES_* environment)"]
async fn test_save_and_read_back_newest_first() {
    let mut store = MetricsStore::connect(&live_config()).await.unwrap();
    store.init_schema().await.unwrap();

    let before = store.recent_records(10_000).await.unwrap().len();

    let sample = MetricSample {
        cpu_usage: 12.5,
        ram_usage: 40.0,
        gpu_temp: 66,
        btc_price: Some(50000.0),
        eth_price: None,
    };
    store.save(&sample).await.unwrap();

    let records = store.recent_records(10_000).await.unwrap();
    assert_eq!(records.len(), before + 1);

    // Newest first: the fresh row leads.
    let newest = &records[0];
    assert_eq!(newest.gpu_temp, 66);
    assert_eq!(newest.btc_price, Some(50000.0));
    assert_eq!(newest.eth_price, None);

    store.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance (POSTGRES_* environment)"]
async fn test_failed_save_leaves_no_partial_row() {
    use sqlx::postgres::{PgConnectOptions, PgConnection};
    use sqlx::{Connection, Executor};

    let mut store = MetricsStore::connect(&live_config()).await.unwrap();
    store.init_schema().await.unwrap();

    // Separate raw connection to sabotage the insert target; the save
    // must error out (no panic) and, once the table is back, leave no
    // partial row behind.
    let config = live_config();
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database);
    let mut saboteur = PgConnection::connect_with(&options).await.unwrap();

    let sample = MetricSample {
        cpu_usage: 1.0,
        ram_usage: 2.0,
        gpu_temp: 3,
        btc_price: None,
        eth_price: None,
    };

    saboteur
        .execute("ALTER TABLE metrics RENAME TO metrics_hidden")
        .await
        .unwrap();
    let result = store.save(&sample).await;
    saboteur
        .execute("ALTER TABLE metrics_hidden RENAME TO metrics")
        .await
        .unwrap();

    assert!(result.is_err());

    let records = store.recent_records(10_000).await.unwrap();
    assert!(
        records
            .iter()
            .all(|record| record.gpu_temp != 3 || record.cpu_usage != 1.0),
        "failed save must not leave a partial row"
    );

    saboteur.close().await.unwrap();
    store.close().await.unwrap();
}
