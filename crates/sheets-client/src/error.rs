use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error(
        "missing credentials.json\n\
         Go to: https://developers.google.com/sheets/api/quickstart\n\
         Enable the Google Sheets API and download the OAuth client configuration\n\
         Save it to your auth path ({}) as credentials.json",
        .0.display()
    )]
    MissingCredentials(PathBuf),

    #[error("no authorization code in pasted reply")]
    MissingAuthCode,

    #[error("token endpoint returned {status}: {body}")]
    TokenEndpoint {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("sheets api returned {status} for {context}: {body}")]
    Api {
        status: reqwest::StatusCode,
        context: String,
        body: String,
    },

    #[error("did not open spreadsheet '{0}'")]
    EmptySpreadsheet(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, SheetsError>;
