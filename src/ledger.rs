use std::collections::HashMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use colored::Colorize;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::catalog::{normalize_symbol, AssetCatalog};

/// Crypto quantities are kept at 6 decimal places, fiat amounts at 2.
pub const QUANTITY_DP: u32 = 6;
pub const FIAT_DP: u32 = 2;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Cryptocurrency {symbol} not found!")]
    UnknownAsset { symbol: String },
    #[error("Insufficient funds! ({available} available, {requested} requested)")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },
    #[error("Insufficient cryptocurrency to sell! ({held} held, {requested} requested)")]
    InsufficientHoldings { requested: Decimal, held: Decimal },
    #[error("Amount must be positive, got {amount}")]
    InvalidAmount { amount: Decimal },
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum TransactionKind {
    Buy,
    Sell,
}

/// One completed buy or sell. Never mutated or removed once appended.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TransactionRecord {
    pub kind: TransactionKind,
    pub symbol: String,
    pub quantity: Decimal,
    pub fiat_amount: Decimal,
    pub time: DateTime<Utc>,
}

impl Display for TransactionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TransactionKind::Buy => {
                write!(f, "Bought {} {} for ${}", self.quantity, self.symbol, self.fiat_amount)
            }
            TransactionKind::Sell => {
                write!(f, "Sold {} {} for ${}", self.quantity, self.symbol, self.fiat_amount)
            }
        }
    }
}

/// Read-only projection of a ledger's current state.
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioSnapshot {
    pub balance: Decimal,
    pub holdings: HashMap<String, Decimal>,
}

impl Display for PortfolioSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut symbols: Vec<&String> = self.holdings.keys().collect();
        symbols.sort();
        let mut s = vec![];
        for symbol in symbols {
            s.push(format!(
                "{}: {}",
                symbol,
                self.holdings[symbol].to_string().purple()
            ));
        }
        if s.is_empty() {
            s.push(String::from("no cryptocurrencies held"));
        }
        write!(f, "${} : {}", self.balance.to_string().yellow(), s.join(" / "))
    }
}

/// One account's fiat balance, crypto holdings, and transaction history,
/// priced against the catalog it was created with.
///
/// Buy and sell are the only mutators. Either one applies fully or fails
/// with a [`LedgerError`] leaving the state untouched; after every
/// successful operation the balance and all holdings are non-negative.
#[derive(Clone, Debug)]
pub struct Ledger {
    account_number: String,
    balance: Decimal,
    holdings: HashMap<String, Decimal>,
    history: Vec<TransactionRecord>,
    catalog: AssetCatalog,
}

impl Ledger {
    pub fn new(
        account_number: impl Into<String>,
        opening_balance: Decimal,
        catalog: AssetCatalog,
    ) -> Self {
        Self {
            account_number: account_number.into(),
            balance: opening_balance.max(Decimal::ZERO),
            holdings: HashMap::new(),
            history: vec![],
            catalog,
        }
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    /// Current quantity held for a symbol, zero if absent.
    pub fn holding(&self, symbol: &str) -> Decimal {
        self.holdings
            .get(&normalize_symbol(symbol))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Spend `fiat_amount` USD on an asset. Returns the purchased quantity,
    /// rounded to [`QUANTITY_DP`] places.
    pub fn buy(&mut self, symbol: &str, fiat_amount: Decimal) -> Result<Decimal, LedgerError> {
        if fiat_amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount { amount: fiat_amount });
        }
        let asset = self
            .catalog
            .get(symbol)
            .ok_or_else(|| LedgerError::UnknownAsset {
                symbol: symbol.to_string(),
            })?;
        if fiat_amount > self.balance {
            return Err(LedgerError::InsufficientFunds {
                requested: fiat_amount,
                available: self.balance,
            });
        }

        let quantity = (fiat_amount / asset.price).round_dp(QUANTITY_DP);
        let symbol = asset.symbol.clone();
        let key = normalize_symbol(&symbol);

        self.balance -= fiat_amount;
        *self.holdings.entry(key).or_insert(Decimal::ZERO) += quantity;
        self.history.push(TransactionRecord {
            kind: TransactionKind::Buy,
            symbol,
            quantity,
            fiat_amount,
            time: Utc::now(),
        });
        debug!("buy applied, balance now {}", self.balance);
        Ok(quantity)
    }

    /// Sell `quantity` units of an asset. Returns the fiat proceeds,
    /// rounded to [`FIAT_DP`] places.
    pub fn sell(&mut self, symbol: &str, quantity: Decimal) -> Result<Decimal, LedgerError> {
        if quantity <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount { amount: quantity });
        }
        let asset = self
            .catalog
            .get(symbol)
            .ok_or_else(|| LedgerError::UnknownAsset {
                symbol: symbol.to_string(),
            })?;
        let key = normalize_symbol(&asset.symbol);
        let held = self.holdings.get(&key).copied().unwrap_or(Decimal::ZERO);
        if quantity > held {
            return Err(LedgerError::InsufficientHoldings {
                requested: quantity,
                held,
            });
        }

        let proceeds = (quantity * asset.price).round_dp(FIAT_DP);
        let symbol = asset.symbol.clone();

        *self.holdings.entry(key).or_insert(Decimal::ZERO) -= quantity;
        self.balance += proceeds;
        self.history.push(TransactionRecord {
            kind: TransactionKind::Sell,
            symbol,
            quantity,
            fiat_amount: proceeds,
            time: Utc::now(),
        });
        debug!("sell applied, balance now {}", self.balance);
        Ok(proceeds)
    }

    /// What the current balance would buy of every catalog asset.
    ///
    /// Recomputed on every call since the balance moves between calls.
    pub fn affordable_quantities(&self) -> impl Iterator<Item = (String, Decimal)> + '_ {
        self.catalog.iter().map(|asset| {
            (
                asset.symbol.clone(),
                (self.balance / asset.price).round_dp(QUANTITY_DP),
            )
        })
    }

    /// Append-only transaction history, oldest first.
    pub fn history(&self) -> &[TransactionRecord] {
        &self.history
    }

    pub fn snapshot(&self) -> PortfolioSnapshot {
        let holdings = self
            .holdings
            .iter()
            .map(|(key, quantity)| {
                let symbol = self
                    .catalog
                    .get(key)
                    .map(|asset| asset.symbol.clone())
                    .unwrap_or_else(|| key.clone());
                (symbol, *quantity)
            })
            .collect();
        PortfolioSnapshot {
            balance: self.balance,
            holdings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn catalog() -> AssetCatalog {
        AssetCatalog::new([
            (String::from("Bitcoin"), dec!(50000)),
            (String::from("Ethereum"), dec!(4000)),
            (String::from("Litecoin"), dec!(300)),
        ])
    }

    fn ledger(balance: Decimal) -> Ledger {
        Ledger::new("ACC-1", balance, catalog())
    }

    #[test]
    fn test_buy_then_sell_restores_balance() {
        let mut ledger = ledger(dec!(1000));

        let quantity = ledger.buy("Bitcoin", dec!(500)).unwrap();
        assert_eq!(quantity, dec!(0.01));
        assert_eq!(ledger.balance(), dec!(500));
        assert_eq!(ledger.holding("Bitcoin"), dec!(0.01));

        let proceeds = ledger.sell("Bitcoin", dec!(0.01)).unwrap();
        assert_eq!(proceeds, dec!(500.00));
        assert_eq!(ledger.balance(), dec!(1000.00));
        assert_eq!(ledger.holding("Bitcoin"), dec!(0));
    }

    #[test]
    fn test_buy_arithmetic_is_exact() {
        let mut ledger = ledger(dec!(1000));
        let quantity = ledger.buy("Litecoin", dec!(100)).unwrap();
        // 100 / 300 rounded to 6 places
        assert_eq!(quantity, dec!(0.333333));
        assert_eq!(ledger.balance(), dec!(900));
        assert_eq!(ledger.holding("Litecoin"), dec!(0.333333));
    }

    #[test]
    fn test_sell_proceeds_round_to_cents() {
        let mut ledger = ledger(dec!(1000));
        ledger.buy("Litecoin", dec!(100)).unwrap();
        let proceeds = ledger.sell("Litecoin", dec!(0.333333)).unwrap();
        // 0.333333 * 300 = 99.9999 -> 100.00
        assert_eq!(proceeds, dec!(100.00));
        assert_eq!(ledger.balance(), dec!(1000.00));
    }

    #[test]
    fn test_buy_unknown_asset_leaves_state_unchanged() {
        let mut ledger = ledger(dec!(1000));
        let err = ledger.buy("Dogecoin", dec!(10)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::UnknownAsset {
                symbol: String::from("Dogecoin")
            }
        );
        assert_eq!(ledger.balance(), dec!(1000));
        assert!(ledger.history().is_empty());
        assert!(ledger.snapshot().holdings.is_empty());
    }

    #[test]
    fn test_buy_insufficient_funds() {
        let mut ledger = ledger(dec!(100));
        let err = ledger.buy("Bitcoin", dec!(150)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                requested: dec!(150),
                available: dec!(100)
            }
        );
        assert_eq!(ledger.balance(), dec!(100));
        assert!(ledger.history().is_empty());
    }

    #[test]
    fn test_sell_without_holdings() {
        let mut ledger = ledger(dec!(1000));
        let err = ledger.sell("Bitcoin", dec!(1)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientHoldings {
                requested: dec!(1),
                held: dec!(0)
            }
        );
        assert_eq!(ledger.balance(), dec!(1000));
        assert!(ledger.history().is_empty());
    }

    #[test]
    fn test_sell_more_than_held() {
        let mut ledger = ledger(dec!(1000));
        ledger.buy("Bitcoin", dec!(500)).unwrap();
        let err = ledger.sell("Bitcoin", dec!(0.02)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientHoldings {
                requested: dec!(0.02),
                held: dec!(0.01)
            }
        );
        assert_eq!(ledger.holding("Bitcoin"), dec!(0.01));
        assert_eq!(ledger.balance(), dec!(500));
        assert_eq!(ledger.history().len(), 1);
    }

    #[test]
    fn test_non_positive_amounts_are_rejected() {
        let mut ledger = ledger(dec!(1000));
        assert_eq!(
            ledger.buy("Bitcoin", dec!(0)).unwrap_err(),
            LedgerError::InvalidAmount { amount: dec!(0) }
        );
        assert_eq!(
            ledger.buy("Bitcoin", dec!(-5)).unwrap_err(),
            LedgerError::InvalidAmount { amount: dec!(-5) }
        );
        assert_eq!(
            ledger.sell("Bitcoin", dec!(0)).unwrap_err(),
            LedgerError::InvalidAmount { amount: dec!(0) }
        );
        assert!(ledger.history().is_empty());
    }

    #[test]
    fn test_symbols_match_case_insensitively() {
        let mut ledger = ledger(dec!(1000));
        ledger.buy("bitcoin", dec!(500)).unwrap();
        assert_eq!(ledger.holding("BITCOIN"), dec!(0.01));
        let proceeds = ledger.sell("BiTcOiN", dec!(0.01)).unwrap();
        assert_eq!(proceeds, dec!(500.00));
        // records carry the catalog display form
        assert!(ledger.history().iter().all(|r| r.symbol == "Bitcoin"));
    }

    #[test]
    fn test_history_grows_only_on_success() {
        let mut ledger = ledger(dec!(1000));
        assert!(ledger.history().is_empty());

        ledger.buy("Bitcoin", dec!(500)).unwrap();
        assert_eq!(ledger.history().len(), 1);

        let _ = ledger.buy("Bitcoin", dec!(5000)).unwrap_err();
        let _ = ledger.sell("Dogecoin", dec!(1)).unwrap_err();
        assert_eq!(ledger.history().len(), 1);

        ledger.sell("Bitcoin", dec!(0.005)).unwrap();
        assert_eq!(ledger.history().len(), 2);

        let kinds: Vec<TransactionKind> = ledger.history().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![TransactionKind::Buy, TransactionKind::Sell]);
    }

    #[test]
    fn test_history_records_amounts() {
        let mut ledger = ledger(dec!(1000));
        ledger.buy("Ethereum", dec!(400)).unwrap();
        let record = &ledger.history()[0];
        assert_eq!(record.kind, TransactionKind::Buy);
        assert_eq!(record.symbol, "Ethereum");
        assert_eq!(record.quantity, dec!(0.1));
        assert_eq!(record.fiat_amount, dec!(400));
    }

    #[test]
    fn test_affordable_quantities_track_balance() {
        let mut ledger = ledger(dec!(1000));
        let affordable: HashMap<String, Decimal> = ledger.affordable_quantities().collect();
        assert_eq!(affordable["Bitcoin"], dec!(0.02));
        assert_eq!(affordable["Ethereum"], dec!(0.25));

        ledger.buy("Bitcoin", dec!(500)).unwrap();
        let affordable: HashMap<String, Decimal> = ledger.affordable_quantities().collect();
        assert_eq!(affordable["Bitcoin"], dec!(0.01));
        assert_eq!(affordable["Ethereum"], dec!(0.125));
    }

    #[test]
    fn test_snapshot_reads_display_symbols() {
        let mut ledger = ledger(dec!(1000));
        ledger.buy("bitcoin", dec!(500)).unwrap();
        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.balance, dec!(500));
        assert_eq!(snapshot.holdings.get("Bitcoin"), Some(&dec!(0.01)));
    }

    #[test]
    fn test_negative_opening_balance_is_clamped() {
        let ledger = ledger(dec!(-50));
        assert_eq!(ledger.balance(), dec!(0));
    }
}
