use reqwest::blocking::{Client, Response};
use tracing::debug;
use url::Url;

use crate::types::{BatchGetResponse, Spreadsheet, ValueRange};
use crate::{Result, SheetsError};

// ─── Constants ────────────────────────────────────────────────────────────

const BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Dates paste as dates rather than raw text under this input option.
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

const INSERT_DATA_OPTION: &str = "INSERT_ROWS";

/// A1 range covering the columns a sheet can grow into.
pub fn header_range(sheet_name: &str) -> String {
    format!("{sheet_name}!A1:Z")
}

// ─── SheetsClient ─────────────────────────────────────────────────────────

/// Bearer-token client for one spreadsheet of the Sheets v4 REST API.
pub struct SheetsClient {
    http: Client,
    base_url: Url,
    spreadsheet_id: String,
    access_token: String,
}

impl SheetsClient {
    pub fn new(spreadsheet_id: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(BASE_URL, spreadsheet_id, access_token)
    }

    /// Point the client at a different endpoint; tests aim this at a local
    /// mock server.
    pub fn with_base_url(
        base_url: &str,
        spreadsheet_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            base_url: Url::parse(base_url)?,
            spreadsheet_id: spreadsheet_id.into(),
            access_token: access_token.into(),
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// `spreadsheets.get` — sheet titles only. A spreadsheet without a
    /// single sheet means the response was bogus, so that is an error.
    pub fn spreadsheet(&self) -> Result<Spreadsheet> {
        let url = self.endpoint(&[self.spreadsheet_id.as_str()]);
        debug!("calling [spreadsheets.get(spreadsheetId='{}')]", self.spreadsheet_id);
        let response = self.check(
            "spreadsheets.get",
            self.http.get(url).bearer_auth(&self.access_token).send()?,
        )?;
        let spreadsheet: Spreadsheet = response.json()?;
        if spreadsheet.sheets.is_empty() {
            return Err(SheetsError::EmptySpreadsheet(self.spreadsheet_id.clone()));
        }
        Ok(spreadsheet)
    }

    /// `spreadsheets.batchUpdate` with one addSheet request per title.
    pub fn add_sheets(&self, titles: &[String]) -> Result<()> {
        let requests: Vec<serde_json::Value> = titles
            .iter()
            .map(|title| serde_json::json!({"addSheet": {"properties": {"title": title}}}))
            .collect();
        let body = serde_json::json!({ "requests": requests });
        let url = self.endpoint(&[&format!("{}:batchUpdate", self.spreadsheet_id)]);
        debug!(
            "calling [spreadsheets.batchUpdate(spreadsheetId='{}', body={})]",
            self.spreadsheet_id, body
        );
        self.check(
            "spreadsheets.batchUpdate",
            self.http
                .post(url)
                .bearer_auth(&self.access_token)
                .json(&body)
                .send()?,
        )?;
        Ok(())
    }

    /// `spreadsheets.values.batchGet` over each sheet's header range.
    /// Returns one header row per requested sheet, in order; a sheet with
    /// no values yet yields an empty row.
    pub fn batch_get_headers(&self, sheet_names: &[String]) -> Result<Vec<Vec<String>>> {
        let mut url = self.endpoint(&[self.spreadsheet_id.as_str(), "values:batchGet"]);
        for name in sheet_names {
            url.query_pairs_mut()
                .append_pair("ranges", &header_range(name));
        }
        debug!(
            "calling [spreadsheets.values.batchGet(spreadsheetId='{}', ranges={} sheets)]",
            self.spreadsheet_id,
            sheet_names.len()
        );
        let response = self.check(
            "spreadsheets.values.batchGet",
            self.http.get(url).bearer_auth(&self.access_token).send()?,
        )?;
        let parsed: BatchGetResponse = response.json()?;
        let mut headers = Vec::with_capacity(sheet_names.len());
        for range in parsed.value_ranges {
            let first_row = range
                .values
                .and_then(|mut rows| (!rows.is_empty()).then(|| rows.remove(0)))
                .unwrap_or_default();
            headers.push(first_row);
        }
        headers.resize(sheet_names.len(), Vec::new());
        Ok(headers)
    }

    /// `spreadsheets.values.batchUpdate` writing whole ranges (header rows).
    pub fn batch_update_values(&self, data: &[ValueRange]) -> Result<()> {
        let body = serde_json::json!({
            "valueInputOption": VALUE_INPUT_OPTION,
            "data": data,
        });
        let url = self.endpoint(&[self.spreadsheet_id.as_str(), "values:batchUpdate"]);
        debug!(
            "calling [spreadsheets.values.batchUpdate(spreadsheetId='{}', body={})]",
            self.spreadsheet_id, body
        );
        self.check(
            "spreadsheets.values.batchUpdate",
            self.http
                .post(url)
                .bearer_auth(&self.access_token)
                .json(&body)
                .send()?,
        )?;
        Ok(())
    }

    /// `spreadsheets.values.append` — insert one row at the bottom of a
    /// sheet's table.
    pub fn append_row(&self, sheet_name: &str, values: &[String]) -> Result<()> {
        let range = header_range(sheet_name);
        let body = serde_json::json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [values],
        });
        let mut url = self.endpoint(&[
            self.spreadsheet_id.as_str(),
            "values",
            &format!("{range}:append"),
        ]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", VALUE_INPUT_OPTION)
            .append_pair("insertDataOption", INSERT_DATA_OPTION);
        debug!(
            "calling [spreadsheets.values.append(spreadsheetId='{}', range='{}')]",
            self.spreadsheet_id, range
        );
        self.check(
            "spreadsheets.values.append",
            self.http
                .post(url)
                .bearer_auth(&self.access_token)
                .json(&body)
                .send()?,
        )?;
        Ok(())
    }

    fn endpoint(&self, tail: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for part in tail {
                path.push(part);
            }
        }
        url
    }

    fn check(&self, context: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(SheetsError::Api {
            status,
            context: context.to_string(),
            body,
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
