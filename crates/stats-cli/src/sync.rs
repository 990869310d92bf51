use std::collections::BTreeMap;

use sheets_client::{header_range, SheetsClient, ValueRange};
use stats_core::{format_sheet_name, merge_headers, row_values, BotReport, StepStats};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Sheet entries
// ---------------------------------------------------------------------------

/// One (bot, step) pair bound to the sheet it publishes to.
struct SheetEntry<'a> {
    sheet_name: String,
    report: &'a BotReport,
    stats: &'a StepStats,
}

fn sheet_entries(reports: &[BotReport]) -> Vec<SheetEntry<'_>> {
    let mut entries = Vec::new();
    for report in reports {
        for (step_name, stats) in &report.steps {
            entries.push(SheetEntry {
                sheet_name: format_sheet_name(&report.bot_name, step_name),
                report,
                stats,
            });
        }
    }
    entries
}

// ---------------------------------------------------------------------------
// Spreadsheet update
// ---------------------------------------------------------------------------

/// Publish every gathered step to its sheet: create missing sheets, grow
/// headers to cover new stat keys, then append one row per step. A failed
/// append is logged and the remaining rows still go out; every other API
/// failure aborts the update.
pub fn update_spreadsheet(
    sheets: &SheetsClient,
    reports: &[BotReport],
) -> sheets_client::Result<()> {
    let entries = sheet_entries(reports);
    if entries.is_empty() {
        info!("no step stats to publish");
        return Ok(());
    }

    let mut sheet_names: Vec<String> = Vec::new();
    for entry in &entries {
        if !sheet_names.contains(&entry.sheet_name) {
            sheet_names.push(entry.sheet_name.clone());
        }
    }

    info!("opening spreadsheet...");
    let spreadsheet = sheets.spreadsheet()?;

    let missing: Vec<String> = sheet_names
        .iter()
        .filter(|name| !spreadsheet.has_sheet(name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        info!("creating new sheets...");
        sheets.add_sheets(&missing)?;
    }

    info!("parsing sheet headers...");
    let rows = sheets.batch_get_headers(&sheet_names)?;
    let mut headers: BTreeMap<String, Vec<String>> =
        sheet_names.iter().cloned().zip(rows).collect();

    let mut grown = Vec::new();
    for entry in &entries {
        let Some(columns) = headers.get_mut(&entry.sheet_name) else {
            continue;
        };
        if merge_headers(columns, entry.stats) {
            grown.push(ValueRange::rows(
                header_range(&entry.sheet_name),
                vec![columns.clone()],
            ));
        }
    }
    if !grown.is_empty() {
        info!("updating sheet headers...");
        sheets.batch_update_values(&grown)?;
    }

    for entry in &entries {
        let Some(columns) = headers.get(&entry.sheet_name) else {
            continue;
        };
        let row = row_values(columns, &entry.report.build, entry.stats);
        info!("appending new rows to sheet '{}'...", entry.sheet_name);
        if let Err(e) = sheets.append_row(&entry.sheet_name, &row) {
            warn!("{e}");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use sheets_client::SheetsError;
    use stats_core::{BuildMeta, StatValue};

    const BUILD_LINK: &str =
        "https://ci.chromium.org/p/chromium/builders/ci/Win10%20FYI%20dEQP%20Release%20(NVIDIA)/26877";

    fn client(server: &mockito::Server) -> SheetsClient {
        SheetsClient::with_base_url(&server.url(), "spread-1", "tok").unwrap()
    }

    fn report(step_names: &[&str]) -> BotReport {
        let mut steps = BTreeMap::new();
        for name in step_names {
            steps.insert(
                name.to_string(),
                StepStats::from([("Total", StatValue::Int(2)), ("Passed", StatValue::Int(2))]),
            );
        }
        BotReport {
            bot_name: "Win10 FYI dEQP Release (NVIDIA)".to_string(),
            build: BuildMeta {
                name: "chromium/ci/Win10 FYI dEQP Release (NVIDIA)/26877".to_string(),
                link: BUILD_LINK.to_string(),
                time: Some("12:26:39".to_string()),
                date: Some("06/12/19".to_string()),
                revision: Some("3b68405a".to_string()),
                angle_revision: Some("8cbd321c".to_string()),
            },
            steps,
        }
    }

    #[test]
    fn entries_pair_each_step_with_its_sheet() {
        let reports = vec![report(&[
            "angle_deqp_gles2_d3d11_tests on Windows",
            "angle_deqp_egl_vulkan_tests on Windows",
        ])];
        let entries = sheet_entries(&reports);
        let names: Vec<_> = entries.iter().map(|e| e.sheet_name.as_str()).collect();
        assert_eq!(names, vec!["EGL Vulkan Win10 NVIDIA", "GLES 2.0 D3D11 Win10 NVIDIA"]);
    }

    #[test]
    fn appends_rows_in_header_order_without_growing_headers() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/spread-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"sheets": [{"properties": {"title": "GLES 2.0 D3D11 Win10 NVIDIA"}}]}"#,
            )
            .create();
        server
            .mock("GET", "/spread-1/values:batchGet")
            .match_query(Matcher::UrlEncoded(
                "ranges".into(),
                "GLES 2.0 D3D11 Win10 NVIDIA!A1:Z".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"valueRanges": [{"range": "GLES 2.0 D3D11 Win10 NVIDIA!A1:Z", "values": [
                    ["build_link", "time", "date", "revision", "angle_revision", "Total", "Passed"]
                ]}]}"#,
            )
            .create();
        let append = server
            .mock("POST", "/spread-1/values/GLES%202.0%20D3D11%20Win10%20NVIDIA!A1:Z:append")
            .match_query(Matcher::Any)
            .match_body(Matcher::Json(serde_json::json!({
                "range": "GLES 2.0 D3D11 Win10 NVIDIA!A1:Z",
                "majorDimension": "ROWS",
                "values": [[
                    BUILD_LINK, "12:26:39", "06/12/19", "3b68405a", "8cbd321c", "2", "2"
                ]],
            })))
            .with_status(200)
            .with_body("{}")
            .create();

        let reports = vec![report(&["angle_deqp_gles2_d3d11_tests on Windows"])];
        update_spreadsheet(&client(&server), &reports).unwrap();
        append.assert();
    }

    #[test]
    fn creates_missing_sheet_and_writes_its_headers() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/spread-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sheets": [{"properties": {"title": "Sheet1"}}]}"#)
            .create();
        let add_sheet = server
            .mock("POST", "/spread-1:batchUpdate")
            .match_body(Matcher::Json(serde_json::json!({
                "requests": [
                    {"addSheet": {"properties": {"title": "GLES 2.0 D3D11 Win10 NVIDIA"}}}
                ]
            })))
            .with_status(200)
            .with_body("{}")
            .create();
        server
            .mock("GET", "/spread-1/values:batchGet")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"valueRanges": [{"range": "GLES 2.0 D3D11 Win10 NVIDIA!A1:Z"}]}"#)
            .create();
        let update_headers = server
            .mock("POST", "/spread-1/values:batchUpdate")
            .match_body(Matcher::Json(serde_json::json!({
                "valueInputOption": "USER_ENTERED",
                "data": [{
                    "range": "GLES 2.0 D3D11 Win10 NVIDIA!A1:Z",
                    "majorDimension": "ROWS",
                    "values": [[
                        "build_link", "time", "date", "revision", "angle_revision",
                        "Passed", "Total"
                    ]],
                }],
            })))
            .with_status(200)
            .with_body("{}")
            .create();
        let append = server
            .mock("POST", "/spread-1/values/GLES%202.0%20D3D11%20Win10%20NVIDIA!A1:Z:append")
            .match_query(Matcher::Any)
            .match_body(Matcher::Json(serde_json::json!({
                "range": "GLES 2.0 D3D11 Win10 NVIDIA!A1:Z",
                "majorDimension": "ROWS",
                "values": [[
                    BUILD_LINK, "12:26:39", "06/12/19", "3b68405a", "8cbd321c", "2", "2"
                ]],
            })))
            .with_status(200)
            .with_body("{}")
            .create();

        let reports = vec![report(&["angle_deqp_gles2_d3d11_tests on Windows"])];
        update_spreadsheet(&client(&server), &reports).unwrap();
        add_sheet.assert();
        update_headers.assert();
        append.assert();
    }

    #[test]
    fn failed_append_still_sends_the_remaining_rows() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/spread-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"sheets": [
                    {"properties": {"title": "EGL Vulkan Win10 NVIDIA"}},
                    {"properties": {"title": "GLES 2.0 D3D11 Win10 NVIDIA"}}
                ]}"#,
            )
            .create();
        server
            .mock("GET", "/spread-1/values:batchGet")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"valueRanges": [
                    {"range": "EGL Vulkan Win10 NVIDIA!A1:Z", "values": [
                        ["build_link", "time", "date", "revision", "angle_revision",
                         "Passed", "Total"]
                    ]},
                    {"range": "GLES 2.0 D3D11 Win10 NVIDIA!A1:Z", "values": [
                        ["build_link", "time", "date", "revision", "angle_revision",
                         "Passed", "Total"]
                    ]}
                ]}"#,
            )
            .create();
        let failed = server
            .mock("POST", "/spread-1/values/EGL%20Vulkan%20Win10%20NVIDIA!A1:Z:append")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("backend blew up")
            .create();
        let appended = server
            .mock("POST", "/spread-1/values/GLES%202.0%20D3D11%20Win10%20NVIDIA!A1:Z:append")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create();

        let reports = vec![report(&[
            "angle_deqp_egl_vulkan_tests on Windows",
            "angle_deqp_gles2_d3d11_tests on Windows",
        ])];
        update_spreadsheet(&client(&server), &reports).unwrap();
        failed.assert();
        appended.assert();
    }

    #[test]
    fn reports_without_steps_make_no_api_calls() {
        let server = mockito::Server::new();
        update_spreadsheet(&client(&server), &[]).unwrap();
        update_spreadsheet(&client(&server), &[report(&[])]).unwrap();
    }

    #[test]
    fn spreadsheet_failure_is_fatal() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/spread-1")
            .with_status(403)
            .with_body("forbidden")
            .create();
        let reports = vec![report(&["angle_deqp_gles2_d3d11_tests on Windows"])];
        let err = update_spreadsheet(&client(&server), &reports).unwrap_err();
        let SheetsError::Api { status, .. } = err else {
            panic!("expected Api error");
        };
        assert_eq!(status.as_u16(), 403);
    }
}
