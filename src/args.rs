pub mod types;
pub mod validation;

pub use types::{Args, CleanArgs};

/// # Errors
///
/// Will return `Err` if a startup script path is unreadable
pub fn args_checks() -> Result<CleanArgs, String> {
    use clap::Parser;
    Args::parse().clean()
}
