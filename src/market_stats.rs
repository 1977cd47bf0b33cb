use crate::fetch_markets::{CoinRecord, Snapshot};
use std::cmp::Ordering;

pub const TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct TopCoin {
    pub name: String,
    pub market_cap_usd: Option<f64>,
}

/// Summary of one snapshot.
///
/// Every figure that cannot be computed (no prices, no 24h change values) is
/// `None` rather than a placeholder number.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub top5: Vec<TopCoin>,
    pub avg_price: Option<f64>,
    pub max_change_name: Option<String>,
    pub min_change_name: Option<String>,
}

// --- Domain Logic ---

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

/// Descending by market cap, missing caps last.
fn by_market_cap_desc(a: &CoinRecord, b: &CoinRecord) -> Ordering {
    match (present(a.market_cap_usd), present(b.market_cap_usd)) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn top_by_market_cap(records: &[CoinRecord], n: usize) -> Vec<TopCoin> {
    let mut ranked: Vec<&CoinRecord> = records.iter().collect();

    // Stable, so equal caps keep API order.
    ranked.sort_by(|a, b| by_market_cap_desc(a, b));

    ranked
        .into_iter()
        .take(n)
        .map(|r| TopCoin {
            name: r.name.clone(),
            market_cap_usd: r.market_cap_usd,
        })
        .collect()
}

/// Mean over the coins that have a price.
fn mean_price(records: &[CoinRecord]) -> Option<f64> {
    let prices: Vec<f64> = records.iter().filter_map(|r| present(r.price_usd)).collect();
    if prices.is_empty() {
        return None;
    }
    Some(prices.iter().sum::<f64>() / prices.len() as f64)
}

/// Name of the first record whose change beats every earlier one under `better`.
/// Records without a change (or with NaN) never take part.
fn extreme_change<F>(records: &[CoinRecord], better: F) -> Option<String>
where
    F: Fn(f64, f64) -> bool,
{
    let mut best: Option<(&CoinRecord, f64)> = None;

    for record in records {
        let Some(change) = present(record.change_24h_pct) else {
            continue;
        };
        match best {
            Some((_, current)) if !better(change, current) => {}
            _ => best = Some((record, change)),
        }
    }

    best.map(|(record, _)| record.name.clone())
}

/// Computes the four summary facts for a snapshot. The caller skips empty
/// snapshots; an empty one still yields a well-formed (empty) analysis.
pub fn analyze(snapshot: &Snapshot) -> Analysis {
    let records = &snapshot.records;

    Analysis {
        top5: top_by_market_cap(records, TOP_N),
        avg_price: mean_price(records),
        max_change_name: extreme_change(records, |candidate, best| candidate > best),
        min_change_name: extreme_change(records, |candidate, best| candidate < best),
    }
}
