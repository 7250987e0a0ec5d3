// Delivery metrics computed from classified deploys

pub mod change_failure_rate;
pub mod deployment_frequency;
pub mod lead_time;
pub mod mean_time_to_recovery;
pub mod types;

pub use lead_time::{collect_lead_times, LeadTimeContext};
pub use types::*;
