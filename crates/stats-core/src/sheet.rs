use std::sync::OnceLock;

use regex::Regex;

use crate::report::BuildMeta;
use crate::stats::StepStats;

// ---------------------------------------------------------------------------
// Required columns
// ---------------------------------------------------------------------------

/// Columns every sheet must carry ahead of the stat keys, in this order.
pub const REQUIRED_COLUMNS: [&str; 5] =
    ["build_link", "time", "date", "revision", "angle_revision"];

// ---------------------------------------------------------------------------
// Sheet names
// ---------------------------------------------------------------------------

/// Bot-name tokens dropped for readability in the sheet name.
const NOISE_TOKENS: [&str; 6] = ["FYI", "Release", "Vk", "dEQP", "(", ")"];

/// Frontend tokens in a test name, mapped in this order.
const FRONTEND_LABELS: [(&str, &str); 4] = [
    ("_egl_", "EGL"),
    ("_gles2_", "GLES 2.0"),
    ("_gles3_", "GLES 3.0"),
    ("_gles31_", "GLES 3.1"),
];

/// Backend tokens, mapped after the frontend. `_d3d11` has no trailing
/// underscore so both `_d3d11_` and a trailing `_d3d11` match.
const BACKEND_LABELS: [(&str, &str); 5] = [
    ("_d3d9_", "D3D9"),
    ("_d3d11", "D3D11"),
    ("_gl_", "Desktop OpenGL"),
    ("_gles_", "OpenGLES"),
    ("_vulkan_", "Vulkan"),
];

static TEST_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn test_name_re() -> &'static Regex {
    TEST_NAME_RE.get_or_init(|| Regex::new(r"angle\w*").unwrap())
}

/// Derive the sheet name for one bot/step pair.
///
/// Test names are formatted as `angle_deqp_<frontend>_<backend>_tests`; the
/// sheet name spells out the frontend and backend, then appends the bot name
/// with its noise tokens removed. The joining space is kept even when no
/// frontend or backend token matches, because existing sheets were created
/// with that exact name.
pub fn format_sheet_name(bot_name: &str, step_name: &str) -> String {
    let mut bot = bot_name.to_string();
    for token in NOISE_TOKENS {
        bot = bot.replace(token, "");
    }
    let bot = collapse_whitespace(&bot);

    let test_name = test_name_re()
        .find(step_name)
        .map_or(step_name, |m| m.as_str());

    let mut labels: Vec<&str> = Vec::new();
    for (token, label) in FRONTEND_LABELS {
        if test_name.contains(token) {
            labels.push(label);
        }
    }
    for (token, label) in BACKEND_LABELS {
        if test_name.contains(token) {
            labels.push(label);
        }
    }
    format!("{} {}", labels.join(" "), bot)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Header and row planning
// ---------------------------------------------------------------------------

/// Grow a sheet's header row so it covers the required columns and every
/// stat key in `stats`. Missing required columns are appended first, then
/// missing stat keys. Returns whether the header row changed.
pub fn merge_headers(headers: &mut Vec<String>, stats: &StepStats) -> bool {
    let mut stale = false;
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            headers.push(required.to_string());
            stale = true;
        }
    }
    for key in stats.keys() {
        if !headers.iter().any(|h| h == key) {
            headers.push(key.clone());
            stale = true;
        }
    }
    stale
}

/// Lay out one row of cell values in header order. Required columns read
/// from the build metadata, stat keys from the step stats, and any other
/// header gets a blank cell.
pub fn row_values(headers: &[String], build: &BuildMeta, stats: &StepStats) -> Vec<String> {
    headers
        .iter()
        .map(|header| {
            if let Some(value) = build.required_value(header) {
                value.to_string()
            } else if let Some(value) = stats.get(header) {
                value.to_string()
            } else {
                String::new()
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
