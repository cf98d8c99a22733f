pub mod render;
pub mod summary;

pub use render::{parse_report, render, write_json_summary, write_report};
pub use summary::{build_summary, RunSummary};
