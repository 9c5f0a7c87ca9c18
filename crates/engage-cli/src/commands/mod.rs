/// CLI subcommand argument definitions and implementations.
///
/// Each subcommand module owns its own `Args` struct and `execute` entry
/// point.
pub mod init;
pub mod run;
pub mod stats;
pub mod test;
pub mod tick;
