use std::collections::BTreeMap;

use crate::sheet::REQUIRED_COLUMNS;
use crate::stats::StepStats;

// ---------------------------------------------------------------------------
// Build metadata
// ---------------------------------------------------------------------------

/// Metadata for the latest successful build of one bot.
///
/// `name` is the fully-qualified build name (`chromium/ci/<bot>/<number>`)
/// used to address follow-up `bb` calls; `link` is the CI page for the
/// build. The remaining fields are best effort and stay unset when the
/// build listing did not carry them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMeta {
    pub name: String,
    pub link: String,
    pub time: Option<String>,
    pub date: Option<String>,
    pub revision: Option<String>,
    pub angle_revision: Option<String>,
}

impl BuildMeta {
    /// Value for a required column, when this build has one. Columns outside
    /// [`REQUIRED_COLUMNS`] never resolve here, so a stat that happens to
    /// share a field name cannot be shadowed.
    pub fn required_value(&self, column: &str) -> Option<&str> {
        if !REQUIRED_COLUMNS.contains(&column) {
            return None;
        }
        match column {
            "build_link" => Some(&self.link),
            "time" => self.time.as_deref(),
            "date" => self.date.as_deref(),
            "revision" => self.revision.as_deref(),
            "angle_revision" => self.angle_revision.as_deref(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Bot report
// ---------------------------------------------------------------------------

/// Everything gathered for one bot: the latest successful build and the
/// stats of every step whose log parsed cleanly. Steps whose log could not
/// be fetched or held no stats are left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotReport {
    pub bot_name: String,
    pub build: BuildMeta,
    pub steps: BTreeMap<String, StepStats>,
}
