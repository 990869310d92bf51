use serde::{Deserialize, Serialize};

// ─── Spreadsheet metadata ─────────────────────────────────────────────────

/// Subset of `spreadsheets.get` the sync needs: which sheets exist.
#[derive(Debug, Clone, Deserialize)]
pub struct Spreadsheet {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

impl Spreadsheet {
    pub fn has_sheet(&self, title: &str) -> bool {
        self.sheets.iter().any(|s| s.properties.title == title)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sheet {
    pub properties: SheetProperties,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetProperties {
    pub title: String,
}

// ─── Values ───────────────────────────────────────────────────────────────

/// One block of cell data, as `spreadsheets.values` endpoints exchange it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    pub range: String,
    pub major_dimension: String,
    pub values: Vec<Vec<String>>,
}

impl ValueRange {
    /// A row-major block holding the given rows.
    pub fn rows(range: impl Into<String>, values: Vec<Vec<String>>) -> Self {
        Self {
            range: range.into(),
            major_dimension: "ROWS".to_string(),
            values,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchGetResponse {
    #[serde(default)]
    pub value_ranges: Vec<BatchGetRange>,
}

/// `values` is absent entirely when the requested range is empty.
#[derive(Debug, Deserialize)]
pub(crate) struct BatchGetRange {
    #[serde(default)]
    pub values: Option<Vec<Vec<String>>>,
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spreadsheet_lists_sheet_titles() {
        let json = r#"{
            "spreadsheetId": "abc",
            "sheets": [
                {"properties": {"sheetId": 0, "title": "EGL D3D11 Win10 NVIDIA"}},
                {"properties": {"sheetId": 123, "title": " Win10 NVIDIA"}}
            ]
        }"#;
        let spreadsheet: Spreadsheet = serde_json::from_str(json).expect("parse spreadsheet");
        assert!(spreadsheet.has_sheet("EGL D3D11 Win10 NVIDIA"));
        assert!(spreadsheet.has_sheet(" Win10 NVIDIA"));
        assert!(!spreadsheet.has_sheet("Win10 NVIDIA"));
    }

    #[test]
    fn value_range_serializes_camel_case() {
        let range = ValueRange::rows("Sheet1!A1:Z", vec![vec!["a".to_string()]]);
        let json = serde_json::to_value(&range).expect("serialize");
        assert_eq!(json["majorDimension"], "ROWS");
        assert_eq!(json["range"], "Sheet1!A1:Z");
    }

    #[test]
    fn batch_get_range_tolerates_missing_values() {
        let json = r#"{"valueRanges": [{"range": "A!A1:Z"}, {"range": "B!A1:Z", "values": [["h"]]}]}"#;
        let response: BatchGetResponse = serde_json::from_str(json).expect("parse");
        assert_eq!(response.value_ranges[0].values, None);
        assert_eq!(
            response.value_ranges[1].values,
            Some(vec![vec!["h".to_string()]])
        );
    }
}
