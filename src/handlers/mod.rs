//! Subcommand handlers.

pub mod analyze;
pub mod db_check;
pub mod run;
pub mod serve;
