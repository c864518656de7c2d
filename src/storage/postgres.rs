//! PostgreSQL-backed metrics store.
//!
//! Each [`MetricsStore`] owns a single dedicated connection. The monitor
//! loop holds one for the process lifetime; the chart query opens and
//! closes its own per request. Keeping connections context-local means
//! no pool and no cross-task locking.

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Executor};
use tracing::{debug, info, instrument, warn};

use crate::config::DatabaseConfig;

use super::error::{StorageError, StorageResult};
use super::schema::{MetricRecord, MetricSample};

/// Bounded connect retry: 5 attempts, 5 seconds apart.
pub const CONNECT_ATTEMPTS: u32 = 5;
pub const CONNECT_RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

const CREATE_METRICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS metrics (
    id SERIAL PRIMARY KEY,
    timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    cpu_usage DOUBLE PRECISION,
    ram_usage DOUBLE PRECISION,
    gpu_temp INT,
    btc_price DOUBLE PRECISION,
    eth_price DOUBLE PRECISION
)
"#;

pub struct MetricsStore {
    conn: PgConnection,
}

impl MetricsStore {
    /// Connect with bounded retries.
    ///
    /// Failure after the final attempt is reported as an error, never a
    /// panic; callers are expected to continue in a degraded,
    /// non-persisting mode.
    #[instrument(skip_all, fields(host = %config.host, database = %config.database))]
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let mut last_error = String::new();
        for attempt in 1..=CONNECT_ATTEMPTS {
            match PgConnection::connect_with(&options).await {
                Ok(conn) => {
                    info!("successfully established database connection");
                    return Ok(Self { conn });
                }
                Err(e) => {
                    warn!("database connection attempt {attempt}/{CONNECT_ATTEMPTS} failed: {e}");
                    last_error = e.to_string();
                }
            }

            if attempt < CONNECT_ATTEMPTS {
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            }
        }

        Err(StorageError::ConnectionFailed(last_error))
    }

    /// Create the metrics table if it does not exist. Idempotent, safe
    /// to run on every startup.
    #[instrument(skip_all)]
    pub async fn init_schema(&mut self) -> StorageResult<()> {
        self.conn
            .execute(CREATE_METRICS_TABLE)
            .await
            .map_err(|e| StorageError::SchemaFailed(e.to_string()))?;

        info!("database schema verified");
        Ok(())
    }

    /// Persist one sample inside a transaction.
    ///
    /// On failure the transaction is rolled back (no partial row) and
    /// the error is returned for the caller to log; it must not stop
    /// subsequent cycles.
    #[instrument(skip_all)]
    pub async fn save(&mut self, sample: &MetricSample) -> StorageResult<()> {
        let mut tx = self
            .conn
            .begin()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO metrics (cpu_usage, ram_usage, gpu_temp, btc_price, eth_price)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(sample.cpu_usage)
        .bind(sample.ram_usage)
        .bind(sample.gpu_temp)
        .bind(sample.btc_price)
        .bind(sample.eth_price)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        debug!("telemetry sample persisted");
        Ok(())
    }

    /// The `limit` most recent rows, newest first.
    #[instrument(skip(self))]
    pub async fn recent_records(&mut self, limit: i64) -> StorageResult<Vec<MetricRecord>> {
        let records = sqlx::query_as::<_, MetricRecord>(
            r#"
            SELECT id, timestamp, cpu_usage, ram_usage, gpu_temp, btc_price, eth_price
            FROM metrics
            ORDER BY timestamp DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&mut self.conn)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        debug!("query returned {} records", records.len());
        Ok(records)
    }

    /// Close the connection. Dropping the store closes it as well; this
    /// exists so query-local connections can tear down explicitly.
    pub async fn close(self) -> StorageResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))
    }
}
