//! Core domain types and logic.

pub mod catalog;
pub mod config_validation;
pub mod error;
pub mod instrument;
pub mod ledger;
pub mod simulation;
pub mod trade;
