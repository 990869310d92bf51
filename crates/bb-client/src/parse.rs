use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use stats_core::BuildMeta;
use tracing::warn;
use url::Url;

use crate::{BbError, Result};

// ─── Constants ────────────────────────────────────────────────────────────

/// Builder namespace prefix the milo UI expects in front of every bot name.
pub const BOT_NAME_PREFIX: &str = "chromium/ci/";

/// Base of the public CI page for a build; the part of the build name after
/// [`BOT_NAME_PREFIX`] is appended as path segments.
pub const BUILD_LINK_PREFIX: &str = "https://ci.chromium.org/p/chromium/builders/ci/";

static TIME_RE: OnceLock<Regex> = OnceLock::new();

fn time_re() -> &'static Regex {
    TIME_RE.get_or_init(|| Regex::new(r"[0-9]{1,2}:[0-9]{2}:[0-9]{2}").unwrap())
}

static LINK_BASE: OnceLock<Url> = OnceLock::new();

fn link_base() -> &'static Url {
    LINK_BASE.get_or_init(|| Url::parse(BUILD_LINK_PREFIX).unwrap())
}

// ─── Build listing ────────────────────────────────────────────────────────

/// Parse the output of `bb ls <bot> -n 1 -status success -A`.
///
/// The first line carries the build name in single quotes:
///
/// ```text
/// ci.chromium.org/b/8915280275579996928 SUCCESS 'chromium/ci/Win10 FYI dEQP Release (NVIDIA)/26877'
/// ```
///
/// Later lines are scanned for the creation time (`Created ... at HH:MM:SS`),
/// the chromium revision (`"revision"`) and the ANGLE revision
/// (`got_angle_revision`); each is best effort and a repeated match
/// overwrites the earlier one. `today` supplies the `date` column because
/// the listing only reports wall-clock times.
pub(crate) fn parse_build_listing(
    bot_name: &str,
    listing: &str,
    today: NaiveDate,
) -> Result<BuildMeta> {
    if !listing.contains("SUCCESS") {
        return Err(BbError::NoSuccessfulBuild(listing.to_string()));
    }

    let mut name: Option<String> = None;
    let mut link = String::new();
    let mut time = None;
    let mut date = None;
    let mut revision = None;
    let mut angle_revision = None;

    for line in listing.lines() {
        if name.is_none() {
            let found = line
                .trim()
                .split('\'')
                .nth(1)
                .ok_or_else(|| BbError::MissingBuildName(bot_name.to_string()))?;
            link = build_link(found)?;
            name = Some(found.to_string());
        }
        if line.contains("Created") {
            let head = line.split_once(',').map_or(line, |(head, _)| head);
            match time_re().find(head) {
                Some(m) => {
                    time = Some(m.as_str().to_string());
                    date = Some(today.format("%m/%d/%y").to_string());
                }
                None => warn!("no creation time in line: '{line}'"),
            }
        }
        if line.contains("got_angle_revision") {
            if let Some(tail) = line.split(':').nth(1) {
                angle_revision = Some(alphanumeric(tail));
            }
        }
        if line.contains("\"revision\"") {
            if let Some(tail) = line.split(':').nth(1) {
                revision = Some(alphanumeric(tail));
            }
        }
    }

    let name = name.ok_or_else(|| BbError::MissingBuildName(bot_name.to_string()))?;
    Ok(BuildMeta {
        name,
        link,
        time,
        date,
        revision,
        angle_revision,
    })
}

/// CI page for a build, derived from its fully-qualified name. Spaces and
/// other reserved characters in the bot name are percent-encoded.
fn build_link(build_name: &str) -> Result<String> {
    let (_, suffix) = build_name
        .split_once(BOT_NAME_PREFIX)
        .ok_or_else(|| BbError::UnexpectedBuildName(build_name.to_string()))?;
    let mut url = link_base().clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty();
        for part in suffix.split('/') {
            segments.push(part);
        }
    }
    Ok(url.into())
}

fn alphanumeric(text: &str) -> String {
    text.chars().filter(|c| c.is_alphanumeric()).collect()
}

// ─── Step listing ─────────────────────────────────────────────────────────

/// Pull the ANGLE test step names out of `bb get <build> -steps` output.
/// Only steps whose line reads `Step "angle_...` are of interest; the name
/// is the first quoted string.
pub(crate) fn parse_step_names(output: &str) -> Vec<String> {
    let mut step_names = Vec::new();
    for line in output.lines() {
        if !line.contains("Step \"angle_") {
            continue;
        }
        if let Some(step_name) = line.split('"').nth(1) {
            step_names.push(step_name.to_string());
        }
    }
    step_names
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 6, 12).unwrap()
    }

    const LISTING: &str = "\
ci.chromium.org/b/8915280275579996928 SUCCESS   'chromium/ci/Win10 FYI dEQP Release (NVIDIA)/26877'
Created today at 12:26:39, waited 2.056319s, started at 12:26:41, ran for 1h16m48.14963s, ended at 13:43:30
Input properties:
  \"parent_got_angle_revision\": \"8cbd321cafa92ffbf0495e6d0aeb9e1a97940fee\",
  \"revision\": \"3b68405a27f1f9590f83ae07757589dba862f141\",
";

    #[test]
    fn parses_full_listing() {
        let meta = parse_build_listing("bot", LISTING, today()).unwrap();
        assert_eq!(
            meta.name,
            "chromium/ci/Win10 FYI dEQP Release (NVIDIA)/26877"
        );
        assert_eq!(
            meta.link,
            "https://ci.chromium.org/p/chromium/builders/ci/Win10%20FYI%20dEQP%20Release%20(NVIDIA)/26877"
        );
        assert_eq!(meta.time.as_deref(), Some("12:26:39"));
        assert_eq!(meta.date.as_deref(), Some("06/12/19"));
        assert_eq!(
            meta.revision.as_deref(),
            Some("3b68405a27f1f9590f83ae07757589dba862f141")
        );
        assert_eq!(
            meta.angle_revision.as_deref(),
            Some("8cbd321cafa92ffbf0495e6d0aeb9e1a97940fee")
        );
    }

    #[test]
    fn time_is_read_before_the_first_comma_only() {
        let listing = "\
x SUCCESS 'chromium/ci/Bot/1'
Created on 2019-06-12, started at 12:26:41
";
        let meta = parse_build_listing("bot", listing, today()).unwrap();
        // 12:26:41 sits after the comma, so no time (and no date) is taken.
        assert_eq!(meta.time, None);
        assert_eq!(meta.date, None);
    }

    #[test]
    fn later_revision_lines_overwrite_earlier_ones() {
        let listing = "\
x SUCCESS 'chromium/ci/Bot/1'
  \"revision\": \"aaaa\",
  \"revision\": \"bbbb\",
";
        let meta = parse_build_listing("bot", listing, today()).unwrap();
        assert_eq!(meta.revision.as_deref(), Some("bbbb"));
    }

    #[test]
    fn listing_without_success_is_rejected() {
        let listing = "ci.chromium.org/b/1 FAILURE 'chromium/ci/Bot/1'\n";
        let err = parse_build_listing("bot", listing, today()).unwrap_err();
        assert!(matches!(err, BbError::NoSuccessfulBuild(_)));
    }

    #[test]
    fn listing_without_quoted_name_is_rejected() {
        let listing = "something SUCCESS but no quoted name\n";
        let err = parse_build_listing("Win10", listing, today()).unwrap_err();
        assert!(matches!(err, BbError::MissingBuildName(_)));
    }

    #[test]
    fn build_name_outside_ci_namespace_is_rejected() {
        let listing = "x SUCCESS 'chromium/try/Bot/1'\n";
        let err = parse_build_listing("bot", listing, today()).unwrap_err();
        assert!(matches!(err, BbError::UnexpectedBuildName(_)));
    }

    #[test]
    fn step_names_filter_to_angle_steps() {
        let output = "\
Step \"bot_update\"    SUCCESS   10s
Step \"angle_deqp_egl_vulkan_tests on (nvidia-quadro-p400) GPU on Windows\"   SUCCESS   4m12s   Logs: \"stdout\"
 * [shard #0 isolated out](https://isolateserver.appspot.com/browse)
Step \"angle_deqp_gles2_d3d11_tests on Windows\"  SUCCESS  2m
Step \"compile\"  SUCCESS  20m
";
        assert_eq!(
            parse_step_names(output),
            vec![
                "angle_deqp_egl_vulkan_tests on (nvidia-quadro-p400) GPU on Windows",
                "angle_deqp_gles2_d3d11_tests on Windows",
            ]
        );
    }

    #[test]
    fn no_angle_steps_yields_empty_list() {
        assert!(parse_step_names("Step \"compile\" SUCCESS\n").is_empty());
    }
}
