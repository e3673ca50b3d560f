use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::warn;

/// One quotable cryptocurrency with its session unit price in USD.
#[derive(Clone, Debug, PartialEq)]
pub struct Asset {
    pub symbol: String,
    pub price: Decimal,
}

/// Normalized form used as the lookup key for symbols and holdings.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_lowercase()
}

/// Symbol -> price lookup built once at session start.
///
/// Keys are normalized at construction time, so `price_of("bitcoin")` and
/// `price_of("Bitcoin")` hit the same entry. Prices never change for the
/// lifetime of the catalog.
#[derive(Clone, Debug, Default)]
pub struct AssetCatalog {
    assets: HashMap<String, Asset>,
}

impl AssetCatalog {
    pub fn new<I>(prices: I) -> Self
    where
        I: IntoIterator<Item = (String, Decimal)>,
    {
        let assets = prices
            .into_iter()
            .filter(|(symbol, price)| {
                if *price <= Decimal::ZERO {
                    warn!("dropping {} : non-positive price {}", symbol, price);
                    return false;
                }
                true
            })
            .map(|(symbol, price)| (normalize_symbol(&symbol), Asset { symbol, price }))
            .collect();
        Self { assets }
    }

    pub fn get(&self, symbol: &str) -> Option<&Asset> {
        self.assets.get(&normalize_symbol(symbol))
    }

    pub fn price_of(&self, symbol: &str) -> Option<Decimal> {
        self.get(symbol).map(|asset| asset.price)
    }

    /// Assets in alphabetical symbol order, for display.
    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        let mut assets: Vec<&Asset> = self.assets.values().collect();
        assets.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        assets.into_iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
