// CLI subcommands

pub mod jurisdictions;
pub mod report;
pub mod sessions;
pub mod upload;
