use std::collections::BTreeMap;

use bb_client::{BbClient, BOT_NAME_PREFIX};
use stats_core::{parse_step_log, totals_mismatch, BotReport};
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// Bot roster
// ---------------------------------------------------------------------------

/// The dEQP bots whose latest successful builds feed the spreadsheet.
pub const BOT_NAMES: [&str; 13] = [
    "Win10 FYI dEQP Release (NVIDIA)",
    "Win10 FYI dEQP Release (Intel HD 630)",
    "Win7 FYI dEQP Release (AMD)",
    "Win7 FYI x64 dEQP Release (NVIDIA)",
    "Mac FYI dEQP Release Intel",
    "Mac FYI dEQP Release AMD",
    "Linux FYI dEQP Release (Intel HD 630)",
    "Linux FYI dEQP Release (NVIDIA)",
    "Android FYI dEQP Release (Nexus 5X)",
    "Android FYI 32 dEQP Vk Release (Pixel XL)",
    "Android FYI 64 dEQP Vk Release (Pixel XL)",
    "Android FYI 32 dEQP Vk Release (Pixel 2)",
    "Android FYI 64 dEQP Vk Release (Pixel 2)",
];

// ---------------------------------------------------------------------------
// Report gathering
// ---------------------------------------------------------------------------

/// Collect a report per bot. A bot whose build cannot be listed or whose
/// steps cannot be read is logged and skipped; the rest still go through.
pub fn gather_reports(bb: &BbClient, bot_names: &[&str]) -> Vec<BotReport> {
    let mut reports = Vec::new();
    for bot_name in bot_names {
        info!("parsing bot '{bot_name}'...");
        match gather_bot(bb, bot_name) {
            Ok(report) => reports.push(report),
            Err(e) => error!("{e}"),
        }
    }
    reports
}

fn gather_bot(bb: &BbClient, bot_name: &str) -> bb_client::Result<BotReport> {
    let build = bb.latest_successful_build(&format!("{BOT_NAME_PREFIX}{bot_name}"))?;
    let step_names = bb.step_names(&build)?;

    let mut steps = BTreeMap::new();
    for step_name in step_names {
        info!("parsing step '{step_name}'...");
        let log = match bb.step_log(&build, &step_name) {
            Ok(log) => log,
            Err(e) => {
                warn!("{e}");
                continue;
            }
        };
        let stats = parse_step_log(&log);
        if stats.is_empty() {
            warn!("step info empty for '{}': '{}'", build.name, step_name);
            continue;
        }
        if let Some(mismatch) = totals_mismatch(&stats) {
            warn!(
                "step info does not sum to total for '{}': '{}' | Total: {} - computed total: {}",
                build.name, step_name, mismatch.declared, mismatch.computed
            );
        }
        steps.insert(step_name, stats);
    }

    Ok(BotReport {
        bot_name: bot_name.to_string(),
        build,
        steps,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
