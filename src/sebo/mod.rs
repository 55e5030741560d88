//! Sebo module - client for the balance ledger and opportunity feed

pub mod client;
pub mod messages;

pub use client::SeboClient;
