//! Persistence module - audit trail sinks

pub mod csv_log;

pub use csv_log::CsvAuditSink;
