//! TreeHub: a marketplace connecting tree-care professionals, companies,
//! and homeowners.

pub mod config;
pub mod error;
pub mod marketplace;
pub mod telemetry;
