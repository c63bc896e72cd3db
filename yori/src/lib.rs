pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{describe_result, fuzz_options_from_matches, handle_fuzz, log_level};

// Re-export fuzz functionality from yori-core
pub use yori_core::fuzz::{FuzzOptions, ScanEventCallback, execute_fuzz};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
