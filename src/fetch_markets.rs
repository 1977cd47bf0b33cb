use reqwest::{Client, StatusCode, header};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to market endpoint failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("market endpoint answered with status {0}")]
    Status(StatusCode),
    #[error("market endpoint returned an unexpected body: {0}")]
    Decode(#[source] serde_json::Error),
}

// --- Data Structures ---

/// One element of the `/coins/markets` response, as sent by the API.
#[derive(Deserialize, Debug)]
struct MarketEntry {
    name: String,
    symbol: String,
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    current_price: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    market_cap: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    total_volume: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_f64_lenient")]
    price_change_percentage_24h: Option<f64>,
}

/// One coin of a snapshot. Figures the API left out stay `None`, never zero,
/// so they cannot drag the averages or the rankings.
#[derive(Debug, Clone, PartialEq)]
pub struct CoinRecord {
    pub name: String,
    pub symbol: String,
    pub price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub change_24h_pct: Option<f64>,
}

impl From<MarketEntry> for CoinRecord {
    fn from(entry: MarketEntry) -> Self {
        Self {
            name: entry.name,
            symbol: entry.symbol.to_uppercase(),
            price_usd: entry.current_price,
            market_cap_usd: entry.market_cap,
            volume_24h_usd: entry.total_volume,
            change_24h_pct: entry.price_change_percentage_24h,
        }
    }
}

/// All coin records from one fetch, in API order (market cap descending).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub records: Vec<CoinRecord>,
}

impl Snapshot {
    pub fn new(records: Vec<CoinRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// --- Lenient number parsing ---
// CoinGecko sends null for unknown figures and the occasional numeric string.

struct LenientF64Visitor;

impl<'de> Visitor<'de> for LenientF64Visitor {
    type Value = Option<f64>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a float, an integer, null, or a string representing a number")
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Some(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        if v.trim().is_empty() {
            Ok(None)
        } else {
            v.trim().parse::<f64>().map(Some).map_err(E::custom)
        }
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }
}

fn deserialize_f64_lenient<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(LenientF64Visitor)
}

// --- HTTP ---

pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .build()
}

/// Issues the single GET for one cycle and maps the body into a [`Snapshot`].
pub async fn fetch_snapshot(client: &Client, endpoint_url: &str) -> Result<Snapshot, FetchError> {
    debug!(url = endpoint_url, "requesting market data");

    let response = client
        .get(endpoint_url)
        .header(header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(FetchError::Transport)?;

    // Only a plain 200 carries a market listing.
    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchError::Status(status));
    }

    let body = response.bytes().await.map_err(FetchError::Transport)?;
    let entries: Vec<MarketEntry> = serde_json::from_slice(&body).map_err(FetchError::Decode)?;

    Ok(Snapshot::new(entries.into_iter().map(CoinRecord::from).collect()))
}

/// Same as [`fetch_snapshot`] but never fails: errors are logged and an empty
/// snapshot comes back, which the caller treats as "skip this cycle".
pub async fn fetch(client: &Client, endpoint_url: &str) -> Snapshot {
    match fetch_snapshot(client, endpoint_url).await {
        Ok(snapshot) => {
            info!(coins = snapshot.len(), "fetched market snapshot");
            snapshot
        }
        Err(e) => {
            warn!("Error fetching data from API: {}", e);
            Snapshot::default()
        }
    }
}
