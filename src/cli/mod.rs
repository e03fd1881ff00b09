mod root;
mod commands;

pub use root::Cli;
pub use commands::builtin_templates;
