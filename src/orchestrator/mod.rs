//! Fan-out of upstream fetches and assembly of the aggregate report.

pub mod fetch;
pub mod report;

pub use fetch::{collect_step_names, fetch_all_pages, fetch_pipelines};
pub use report::{ReportGenerator, ReportRequest};
