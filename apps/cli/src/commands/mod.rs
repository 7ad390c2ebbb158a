//! Command implementations for the Kestrel CLI.

pub mod export;
pub mod predict;
pub mod prepare;
pub mod report;
pub mod run;
pub mod train;
