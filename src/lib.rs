//! Stateful code interpreter driven over line-delimited JSON, plus the
//! small service helpers that sit next to it.

pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod external;
pub mod handlers;
pub mod llm;
pub mod logging;
pub mod printer;
pub mod process;
