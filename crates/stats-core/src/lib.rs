pub mod report;
pub mod sheet;
pub mod stats;

pub use report::{BotReport, BuildMeta};
pub use sheet::{format_sheet_name, merge_headers, row_values, REQUIRED_COLUMNS};
pub use stats::{parse_step_log, totals_mismatch, StatValue, StepStats, TotalsMismatch};
