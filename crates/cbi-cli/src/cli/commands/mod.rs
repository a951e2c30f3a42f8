//! CLI command handlers, one file per command.

mod checksum;
mod process;
mod send;

pub use checksum::run_checksum;
pub use process::run_process;
pub use send::run_send;
