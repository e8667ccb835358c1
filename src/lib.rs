//! supplynet: a supplier hierarchy ledger.
//!
//! Suppliers form a forest kept in a nested-set encoding; every structural
//! change runs as one transaction that validates, mutates and renumbers.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
