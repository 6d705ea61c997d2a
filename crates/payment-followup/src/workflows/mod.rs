pub mod followup;
pub mod ledger;
