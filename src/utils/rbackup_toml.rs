//! Load `.rbackup.toml` from the project directory (CLI only). Lib callers pass [`Opts`] directly.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::utils::config::PackagePaths;
use crate::{MissingDirPolicy, Opts, PhaseMode};

#[derive(Debug, Default, Deserialize)]
pub struct RbackupToml {
    #[serde(default)]
    settings: Settings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Settings {
    batch_size: Option<usize>,
    pipeline_length: Option<usize>,
    on_missing_dir: Option<MissingDirPolicy>,
    follow_links: Option<bool>,
    parallel_walk: Option<bool>,
    verbose: Option<bool>,
    retry_max_attempts: Option<u32>,
    retry_initial_delay_ms: Option<u64>,
    retry_max_delay_ms: Option<u64>,
    overlap_phases: Option<bool>,
}

/// Parse a settings document. Errors carry the TOML location.
pub fn parse_rbackup_toml(s: &str) -> Result<RbackupToml, toml::de::Error> {
    toml::from_str(s)
}

/// Load the settings file from `dir` if present. Returns None if missing, unreadable or invalid (logged).
pub fn load_rbackup_toml(dir: &Path) -> Option<RbackupToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_rbackup_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($file:expr, $opts:expr, $file_field:ident => $opts_field:ident) => {
        if let Some(v) = $file.$file_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file settings to opts (only fields present in the file). Call before applying CLI flags.
/// Zero batch size or pipeline length in the file is ignored with a warning.
pub fn apply_file_to_opts(file: &RbackupToml, opts: &mut Opts) {
    let s = &file.settings;
    match s.batch_size {
        Some(0) => log::warn!("ignoring batch_size = 0 in settings file"),
        Some(n) => opts.batch_size = n,
        None => {}
    }
    match s.pipeline_length {
        Some(0) => log::warn!("ignoring pipeline_length = 0 in settings file"),
        Some(n) => opts.pipeline_length = Some(n),
        None => {}
    }
    apply_file_opt!(s, opts, on_missing_dir => missing_dir_policy);
    apply_file_opt!(s, opts, follow_links => follow_links);
    apply_file_opt!(s, opts, parallel_walk => parallel_walk);
    apply_file_opt!(s, opts, verbose => verbose);
    if let Some(n) = s.retry_max_attempts {
        opts.retry.max_attempts = n;
    }
    if let Some(ms) = s.retry_initial_delay_ms {
        opts.retry.initial_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = s.retry_max_delay_ms {
        opts.retry.max_delay = Duration::from_millis(ms);
    }
    if let Some(overlap) = s.overlap_phases {
        opts.phase_mode = if overlap {
            PhaseMode::Overlapped
        } else {
            PhaseMode::Sequential
        };
    }
}
