use std::path::PathBuf;
use std::process::Command;

use chrono::Local;
use stats_core::BuildMeta;
use tracing::debug;

use crate::parse;
use crate::{BbError, Result};

// ─── BbClient ─────────────────────────────────────────────────────────────

/// Wrapper around the Buildbucket `bb` CLI (shipped with depot_tools).
///
/// Every call spawns `bb` once, waits for it, and inspects both streams:
/// anything on stderr is treated as a failure even when the exit code is
/// zero, because `bb` reports auth and RPC trouble there while still
/// exiting cleanly in some paths.
pub struct BbClient {
    executable: PathBuf,
}

impl BbClient {
    /// Resolve `bb` on PATH. Fails up front so a missing CLI surfaces
    /// before any network work starts.
    pub fn new() -> Result<Self> {
        let executable = which::which("bb")?;
        Ok(Self { executable })
    }

    /// Use a specific executable instead of the `bb` found on PATH.
    /// Tests inject fake scripts through this.
    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Latest successful build of a bot, via
    /// `bb ls '<bot>' -n 1 -status success -A`.
    pub fn latest_successful_build(&self, bot_name: &str) -> Result<BuildMeta> {
        let listing = self.run(&["ls", bot_name, "-n", "1", "-status", "success", "-A"])?;
        if listing.is_empty() {
            return Err(BbError::EmptyListing(bot_name.to_string()));
        }
        parse::parse_build_listing(bot_name, &listing, Local::now().date_naive())
    }

    /// Names of the ANGLE test steps of a build, via `bb get '<build>' -steps`.
    pub fn step_names(&self, build: &BuildMeta) -> Result<Vec<String>> {
        let output = self.run(&["get", &build.name, "-steps"])?;
        Ok(parse::parse_step_names(&output))
    }

    /// Raw log of one step, via `bb log '<build>' '<step>'`.
    pub fn step_log(&self, build: &BuildMeta, step_name: &str) -> Result<String> {
        self.run(&["log", &build.name, step_name])
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let command = format!("bb {}", args.first().copied().unwrap_or_default());
        debug!("running [{} {}]", self.executable.display(), args.join(" "));
        let output = Command::new(&self.executable).args(args).output()?;

        if !output.stderr.is_empty() {
            return Err(BbError::Cli {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !output.status.success() {
            return Err(BbError::Exit {
                command,
                status: output.status,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
