use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use common::{Error, Result};
use signal::wallet::{AnalysisRow, FlowRow};

const DUNE_BASE_URL: &str = "https://api.dune.com/api/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Client for the Dune on-chain analytics API. Queries are referenced
/// by their saved query id; results come back as row sets.
pub struct DuneClient {
    http: Client,
    api_key: String,
}

impl DuneClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .use_rustls_tls()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            api_key: api_key.into(),
        }
    }

    async fn rows<T: DeserializeOwned>(
        &self,
        query_id: u64,
        limit: u32,
        extra: &str,
    ) -> Result<Vec<T>> {
        let url = format!("{DUNE_BASE_URL}/query/{query_id}/results?limit={limit}{extra}");
        debug!(query_id, "polling Dune");

        let resp = self
            .http
            .get(&url)
            .header("x-dune-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Source(format!("HTTP {status}: {body}")));
        }

        let parsed: QueryResponse<T> = serde_json::from_str(&body)
            .map_err(|e| Error::Source(format!("unexpected response shape: {e}")))?;
        Ok(parsed.result.map(|r| r.rows).unwrap_or_default())
    }

    /// Directional transaction rows for a tracked wallet query.
    pub async fn wallet_flows(&self, query_id: u64, limit: u32) -> Result<Vec<FlowRow>> {
        self.rows(query_id, limit, "").await
    }

    /// Wallet addresses from the profitable-wallets leaderboard query.
    pub async fn profitable_wallets(&self, query_id: u64, limit: u32) -> Result<Vec<String>> {
        let rows: Vec<WalletRow> = self.rows(query_id, limit, "").await?;
        Ok(rows.into_iter().map(|r| r.user).collect())
    }

    /// Position analysis rows for one wallet address.
    pub async fn wallet_analysis(
        &self,
        query_id: u64,
        limit: u32,
        wallet_address: &str,
    ) -> Result<Vec<AnalysisRow>> {
        let extra = format!("&wallet_address={wallet_address}");
        self.rows(query_id, limit, &extra).await
    }
}

// ─── Dune JSON shapes ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct QueryResponse<T> {
    result: Option<ResultRows<T>>,
}

#[derive(Deserialize)]
struct ResultRows<T> {
    rows: Vec<T>,
}

#[derive(Deserialize)]
struct WalletRow {
    user: String,
}
