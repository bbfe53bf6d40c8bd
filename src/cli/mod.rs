mod commands;
mod render;

pub use commands::{parse_command, AppAction, HELP_TEXT};
pub use render::{render_feed, render_log, render_report, render_status};
