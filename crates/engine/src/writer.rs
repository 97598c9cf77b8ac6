use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use common::{Error, Result, SignalRecord, Sink};

/// The sink handed to pollers: enqueues records for the writer task.
/// Fire-and-forget from the caller's perspective.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<SignalRecord>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<SignalRecord>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Sink for ChannelSink {
    async fn publish(&self, record: SignalRecord) -> Result<()> {
        self.tx
            .send(record)
            .await
            .map_err(|_| Error::Other("signal sink channel closed".to_string()))
    }
}

/// Drains the sink queue: persists every record, then forwards it to
/// the live broadcast consumed by WebSocket subscribers.
///
/// This is the ONLY component that writes to the signals table. A
/// failed insert is logged and does not stop the broadcast.
pub struct SignalWriter {
    record_rx: mpsc::Receiver<SignalRecord>,
    db: SqlitePool,
    broadcast_tx: broadcast::Sender<SignalRecord>,
}

impl SignalWriter {
    pub fn new(
        record_rx: mpsc::Receiver<SignalRecord>,
        db: SqlitePool,
        broadcast_tx: broadcast::Sender<SignalRecord>,
    ) -> Self {
        Self {
            record_rx,
            db,
            broadcast_tx,
        }
    }

    /// Run the writer loop. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!("SignalWriter running");
        while let Some(record) = self.record_rx.recv().await {
            info!(
                symbol = %record.symbol,
                strategy = %record.strategy,
                side = %record.side,
                "Signal emitted"
            );

            if let Err(e) = self.persist(&record).await {
                error!(error = %e, "Failed to persist signal");
            }
            // Ignore send errors (no active subscribers)
            let _ = self.broadcast_tx.send(record);
        }
        warn!("SignalWriter: sink channel closed");
    }

    async fn persist(&self, record: &SignalRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO signals (id, symbol, strategy, side, payload, produced_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&record.id)
        .bind(&record.symbol)
        .bind(&record.strategy)
        .bind(record.side.to_string())
        .bind(record.payload.to_string())
        .bind(record.produced_at_ms)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Side;
    use serde_json::json;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::query(
            r#"
            CREATE TABLE signals (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                strategy TEXT NOT NULL,
                side TEXT NOT NULL,
                payload TEXT NOT NULL,
                produced_at_ms INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn published_records_are_persisted_and_broadcast() {
        let pool = test_pool().await;
        let (record_tx, record_rx) = mpsc::channel(8);
        let (broadcast_tx, mut broadcast_rx) = broadcast::channel(8);

        let writer = SignalWriter::new(record_rx, pool.clone(), broadcast_tx);
        let handle = tokio::spawn(writer.run());

        let sink = ChannelSink::new(record_tx);
        let record = SignalRecord::new(
            "BTCUSDT",
            "open-interest",
            Side::Short,
            json!({"signal": "close-longs"}),
            1_000,
        );
        sink.publish(record.clone()).await.unwrap();

        // The record comes out of the live broadcast...
        let forwarded = broadcast_rx.recv().await.unwrap();
        assert_eq!(forwarded.id, record.id);
        assert_eq!(forwarded.side, Side::Short);

        // ...and lands in the signals table exactly once
        sink.publish(record.clone()).await.unwrap();
        broadcast_rx.recv().await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM signals")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);

        handle.abort();
    }
}
