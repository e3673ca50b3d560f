use std::collections::HashMap;

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://api.coingecko.com/api/v3";

/// (display symbol, price API id) pairs quoted by default.
pub const DEFAULT_ASSETS: [(&str, &str); 3] = [
    ("Bitcoin", "bitcoin"),
    ("Ethereum", "ethereum"),
    ("Litecoin", "litecoin"),
];

#[derive(Deserialize, Debug, Clone)]
struct UsdQuote {
    usd: Decimal,
}

/// Fetches session prices from a CoinGecko-style `simple/price` endpoint.
#[derive(Debug, Clone)]
pub struct PriceFeed {
    client: Client,
    endpoint: String,
}

impl PriceFeed {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// One request, no retry. On any failure the caller substitutes
    /// [`fallback_prices`] instead of aborting the session.
    pub async fn fetch(&self, assets: &[(&str, &str)]) -> Result<HashMap<String, Decimal>> {
        let ids = assets
            .iter()
            .map(|(_, id)| *id)
            .collect::<Vec<_>>()
            .join(",");
        let params = [("ids", ids.as_str()), ("vs_currencies", "usd")];
        let url = Url::parse_with_params(
            format!("{}/simple/price", self.endpoint).as_str(),
            &params,
        )
        .context("invalid price endpoint")?;
        debug!("fetching prices from {}", url);

        let response = self.client.get(url).send().await?.error_for_status()?;
        let quotes: HashMap<String, UsdQuote> = response.json().await?;

        let mut prices = HashMap::new();
        for (symbol, id) in assets {
            let quote = quotes
                .get(*id)
                .with_context(|| format!("no quote for {} in response", id))?;
            prices.insert(symbol.to_string(), quote.usd);
        }
        Ok(prices)
    }
}

/// Static prices used when the feed is unreachable.
pub fn fallback_prices() -> HashMap<String, Decimal> {
    HashMap::from([
        (String::from("Bitcoin"), dec!(50000)),
        (String::from("Ethereum"), dec!(4000)),
        (String::from("Litecoin"), dec!(300)),
    ])
}
