use crate::ledger::Ledger;

/// Ledgers linked to the signed-in identity, keyed by account number.
///
/// Duplicate account numbers are accepted on add; `remove` drops every
/// ledger with a matching number.
#[derive(Clone, Debug, Default)]
pub struct AccountRegistry {
    ledgers: Vec<Ledger>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, ledger: Ledger) {
        self.ledgers.push(ledger);
    }

    pub fn remove(&mut self, account_number: &str) {
        self.ledgers
            .retain(|ledger| ledger.account_number() != account_number);
    }

    /// Linked ledgers in insertion order, for display.
    pub fn list(&self) -> impl Iterator<Item = &Ledger> {
        self.ledgers.iter()
    }

    /// First ledger with a matching account number.
    pub fn get_mut(&mut self, account_number: &str) -> Option<&mut Ledger> {
        self.ledgers
            .iter_mut()
            .find(|ledger| ledger.account_number() == account_number)
    }

    pub fn len(&self) -> usize {
        self.ledgers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AssetCatalog;
    use rust_decimal_macros::dec;

    fn ledger(account_number: &str) -> Ledger {
        let catalog = AssetCatalog::new([(String::from("Bitcoin"), dec!(50000))]);
        Ledger::new(account_number, dec!(100), catalog)
    }

    #[test]
    fn test_add_and_list_preserve_order() {
        let mut registry = AccountRegistry::new();
        registry.add(ledger("A-1"));
        registry.add(ledger("A-2"));
        let numbers: Vec<&str> = registry.list().map(|l| l.account_number()).collect();
        assert_eq!(numbers, vec!["A-1", "A-2"]);
    }

    #[test]
    fn test_duplicate_account_numbers_are_accepted() {
        let mut registry = AccountRegistry::new();
        registry.add(ledger("A-1"));
        registry.add(ledger("A-1"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_drops_all_matches() {
        let mut registry = AccountRegistry::new();
        registry.add(ledger("A-1"));
        registry.add(ledger("A-2"));
        registry.add(ledger("A-1"));
        registry.remove("A-1");
        let numbers: Vec<&str> = registry.list().map(|l| l.account_number()).collect();
        assert_eq!(numbers, vec!["A-2"]);
    }

    #[test]
    fn test_get_mut_finds_first_match() {
        let mut registry = AccountRegistry::new();
        registry.add(ledger("A-1"));
        assert!(registry.get_mut("A-1").is_some());
        assert!(registry.get_mut("A-9").is_none());
    }
}
