//! `bb-client` — blocking driver for the Buildbucket `bb` CLI.
//!
//! The `bb` tool (part of depot_tools) is the only supported way to query
//! chromium CI builds from a workstation; this crate wraps the three calls
//! the stats pipeline needs and parses their human-oriented output:
//!
//! ```text
//! bb ls '<bot>' -n 1 -status success -A   → BuildMeta (name, link, time, revisions)
//! bb get '<build>' -steps                 → names of the angle_* test steps
//! bb log '<build>' '<step>'               → raw step log for stats parsing
//! ```
//!
//! `bb` must already be authenticated (`bb auth-login`); auth failures show
//! up on stderr and are surfaced as [`BbError::Cli`].

mod client;
mod error;
mod parse;

pub use client::BbClient;
pub use error::{BbError, Result};
pub use parse::{BOT_NAME_PREFIX, BUILD_LINK_PREFIX};
