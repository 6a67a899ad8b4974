//! CLI subcommands

pub mod audit;
pub mod bounds;
pub mod status;
