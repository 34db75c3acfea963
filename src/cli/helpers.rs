//! Shared helper functions for CLI commands

use miette::Result;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Config, Project};
use crate::fmea::FmeaError;

/// Locate the project from `--project` or the current directory
pub fn find_project(global: &GlobalOpts) -> Result<Project> {
    match &global.project {
        Some(path) => Project::discover_from(path),
        None => Project::discover(),
    }
    .map_err(|e| miette::miette!("{}", e))
}

/// Resolve `--format auto` against the configured default, then `fallback`
pub fn resolve_format(global: &GlobalOpts, config: &Config, fallback: OutputFormat) -> OutputFormat {
    match global.format {
        OutputFormat::Auto => config
            .default_format
            .as_deref()
            .and_then(|f| f.parse().ok())
            .filter(|f| *f != OutputFormat::Auto)
            .unwrap_or(fallback),
        f => f,
    }
}

/// Convert an FMEA error into a report that carries its numeric code
pub fn fmea_report(err: FmeaError) -> miette::Report {
    let code = err.code();
    miette::Report::new(err).wrap_err(format!("FMEA request failed (error code {})", code))
}

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
