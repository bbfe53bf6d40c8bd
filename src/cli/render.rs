use crate::models::{LogEntry, Report, ReportStatus, ScheduleConfig, Severity};

fn status_label(status: ReportStatus) -> &'static str {
    match status {
        ReportStatus::Generating => "⏳ Generating...",
        ReportStatus::Completed => "✓ Completed",
        ReportStatus::Sent => "✉ Sent",
        ReportStatus::Failed => "❌ Failed",
    }
}

pub fn render_report(report: &Report) -> String {
    let mut out = format!(
        "== {} Briefing ({}) [{}] ==\n",
        report.kind.label(),
        report.date_key,
        status_label(report.status)
    );

    let body = match report.status {
        ReportStatus::Generating => "Generating report...",
        _ if report.content.is_empty() => "No content.",
        _ => report.content.as_str(),
    };
    out.push_str(body);
    out.push('\n');

    if !report.sources.is_empty() {
        out.push_str("\nSources:\n");
        for (i, source) in report.sources.iter().enumerate() {
            out.push_str(&format!("  [{}] {} <{}>\n", i + 1, source.title, source.url));
        }
    }
    out
}

pub fn render_feed(reports: &[Report]) -> String {
    if reports.is_empty() {
        return "No reports generated yet.\n".to_string();
    }
    reports
        .iter()
        .map(|report| {
            format!(
                "{} {:<7} {:<16} {}\n",
                report.created_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                report.kind.label(),
                status_label(report.status),
                report.id
            )
        })
        .collect()
}

pub fn render_log(entries: &[LogEntry]) -> String {
    if entries.is_empty() {
        return "Log is empty.\n".to_string();
    }
    entries
        .iter()
        .map(|entry| {
            let tag = match entry.severity {
                Severity::Info => "INFO",
                Severity::Success => "OK",
                Severity::Error => "ERROR",
            };
            format!(
                "{} {:<5} {}\n",
                entry.timestamp.with_timezone(&chrono::Local).format("%H:%M:%S"),
                tag,
                entry.message
            )
        })
        .collect()
}

pub fn render_status(config: &ScheduleConfig) -> String {
    let state = if config.active { "active" } else { "paused" };
    let email = config.delivery_email().unwrap_or("(none)");
    format!(
        "Schedule {}: morning {} / evening {} / email {}\n",
        state, config.morning_time, config.evening_time, email
    )
}
