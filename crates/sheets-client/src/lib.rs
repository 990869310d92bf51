//! `sheets-client` — the slice of the Google Sheets v4 API the stats sync
//! needs, over plain REST with a user OAuth token.
//!
//! Two halves:
//!
//! - [`Authenticator`] turns an auth directory (`credentials.json` +
//!   cached `token.json`) into a bearer token, refreshing or running the
//!   paste-the-code consent flow as needed.
//! - [`SheetsClient`] talks to one spreadsheet: read its sheet list, add
//!   sheets, read and rewrite header rows, append data rows.
//!
//! Cell values are always strings; the API is called with
//! `valueInputOption=USER_ENTERED` so dates and numbers paste the way a
//! person typing them would get.

mod auth;
mod client;
mod error;
mod types;

pub use auth::{consent_url, Authenticator, ClientSecrets, StoredToken, SPREADSHEETS_SCOPE};
pub use client::{header_range, SheetsClient};
pub use error::{Result, SheetsError};
pub use types::{Sheet, SheetProperties, Spreadsheet, ValueRange};
