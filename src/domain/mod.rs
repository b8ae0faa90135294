//! Domain model: loan records, the amortization rules applied to them, and the
//! storage ports the application layer depends on.

pub mod amortization;
pub mod customer;
pub mod ledger;
pub mod loan;
pub mod money;
pub mod payment;
pub mod ports;
