mod log;
mod report;
mod schedule;

pub use log::{LogEntry, Severity};
pub use report::{Report, ReportKind, ReportStatus, Source};
pub use schedule::ScheduleConfig;
