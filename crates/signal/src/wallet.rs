use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// One directional transaction row from the wallet analytics feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowRow {
    pub symbol: String,
    pub amount: f64,
    pub direction: String,
}

/// Aggregated buy/sell totals for one asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FlowTotals {
    pub buy_total: f64,
    pub sell_total: f64,
}

/// Group transaction rows into per-asset buy/sell totals.
/// Rows with an unknown direction are ignored. BTreeMap keeps the
/// output ordering deterministic for payload serialization.
pub fn aggregate_flows(rows: &[FlowRow]) -> BTreeMap<String, FlowTotals> {
    let mut grouped: BTreeMap<String, FlowTotals> = BTreeMap::new();
    for row in rows {
        let totals = grouped.entry(row.symbol.clone()).or_default();
        match row.direction.as_str() {
            "buy" => totals.buy_total += row.amount,
            "sell" => totals.sell_total += row.amount,
            _ => {}
        }
    }
    grouped
}

/// One row of the per-wallet position analysis feed.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRow {
    pub asset: String,
    pub token_address: String,
    #[serde(default)]
    pub token_balance: f64,
    #[serde(default)]
    pub buy: Option<f64>,
    #[serde(default)]
    pub sell: Option<f64>,
    #[serde(default)]
    pub total_pnl: Option<f64>,
}

/// A tracked-wallet position transition worth broadcasting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LedgerEvent {
    Entered {
        wallet: String,
        asset: String,
        token_address: String,
        balance: f64,
        buy_price: Option<f64>,
    },
    Exited {
        wallet: String,
        asset: String,
        token_address: String,
        sell_price: f64,
        pnl: Option<f64>,
    },
}

#[derive(Debug, Clone, Copy)]
struct Holding {
    sold: bool,
}

/// Tracks which (wallet, token) positions have already been reported.
///
/// The first sighting of a position that has not been sold yet emits
/// `Entered`; a previously held position that now shows a sell price
/// emits `Exited` once. Everything else is old news.
#[derive(Debug, Default)]
pub struct HoldingsLedger {
    positions: HashMap<(String, String), Holding>,
}

impl HoldingsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, wallet: &str, row: &AnalysisRow) -> Option<LedgerEvent> {
        let key = (wallet.to_string(), row.token_address.clone());

        match self.positions.get_mut(&key) {
            None if row.sell.is_none() => {
                self.positions.insert(key, Holding { sold: false });
                Some(LedgerEvent::Entered {
                    wallet: wallet.to_string(),
                    asset: row.asset.clone(),
                    token_address: row.token_address.clone(),
                    balance: row.token_balance,
                    buy_price: row.buy,
                })
            }
            Some(holding) if !holding.sold => {
                let sell_price = row.sell?;
                holding.sold = true;
                Some(LedgerEvent::Exited {
                    wallet: wallet.to_string(),
                    asset: row.asset.clone(),
                    token_address: row.token_address.clone(),
                    sell_price,
                    pnl: row.total_pnl,
                })
            }
            _ => None,
        }
    }
}
