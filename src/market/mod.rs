//! Market data module - live price lookups for the re-verification step

pub mod rest;

pub use rest::RestMarketDataProvider;
