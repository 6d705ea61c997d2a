//! Advisory engine that decides whether, when and how to chase overdue invoices.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
