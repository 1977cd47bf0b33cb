//! Builders shared by the unit tests.

use crate::fetch_markets::{CoinRecord, Snapshot};
use tempfile::TempDir;

pub fn coin(name: &str, cap: f64, price: f64, change: Option<f64>) -> CoinRecord {
    CoinRecord {
        name: name.to_string(),
        symbol: name.to_uppercase(),
        price_usd: Some(price),
        market_cap_usd: Some(cap),
        volume_24h_usd: Some(cap / 10.0),
        change_24h_pct: change,
    }
}

/// `coin0..coinN`, market cap descending, every coin with a price and a change.
pub fn snapshot_of(n: usize) -> Snapshot {
    Snapshot::new(
        (0..n)
            .map(|i| {
                coin(
                    &format!("coin{i}"),
                    (1000 - i) as f64,
                    (i + 1) as f64,
                    Some(i as f64 - 2.0),
                )
            })
            .collect(),
    )
}

pub fn scratch_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}
