pub mod catalog;
pub mod feed;
pub mod identity;
pub mod ledger;
pub mod registry;
