use crate::models::ReportKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    Generate(ReportKind),
    ShowSaved(ReportKind),
    ShowCurrent,
    ShowFeed,
    ShowLog,
    ShowStatus,
    Pause,
    Resume,
    SetMorningTime(String),
    SetEveningTime(String),
    SetEmail(Option<String>),
    ShowHelp,
}

pub const HELP_TEXT: &str = "\
Commands:
  morning | evening        generate a report now
  show <morning|evening>   show today's saved report
  current                  show the current report
  feed                     list reports generated this session
  log                      show the activity log
  status                   show the schedule
  pause | resume           stop or start automatic reports
  set morning HH:mm        change the morning time
  set evening HH:mm        change the evening time
  set email <addr|none>    change the delivery address
  help                     show this help
  quit                     exit";

pub fn parse_command(line: &str) -> Option<AppAction> {
    let mut words = line.split_whitespace();
    let command = words.next()?.to_ascii_lowercase();
    let arg = words.next();
    let value = words.next();

    match (command.as_str(), arg, value) {
        ("q", None, _) | ("quit", None, _) | ("exit", None, _) => Some(AppAction::Quit),

        ("morning", None, _) | ("m", None, _) => Some(AppAction::Generate(ReportKind::Morning)),
        ("evening", None, _) | ("e", None, _) => Some(AppAction::Generate(ReportKind::Evening)),
        ("generate", Some(kind), _) => kind.parse().ok().map(AppAction::Generate),

        ("show", Some(kind), _) => kind.parse().ok().map(AppAction::ShowSaved),
        ("show", None, _) | ("current", None, _) => Some(AppAction::ShowCurrent),
        ("feed", None, _) => Some(AppAction::ShowFeed),
        ("log", None, _) => Some(AppAction::ShowLog),
        ("status", None, _) => Some(AppAction::ShowStatus),

        ("pause", None, _) => Some(AppAction::Pause),
        ("resume", None, _) => Some(AppAction::Resume),

        ("set", Some("morning"), Some(time)) => Some(AppAction::SetMorningTime(time.to_string())),
        ("set", Some("evening"), Some(time)) => Some(AppAction::SetEveningTime(time.to_string())),
        ("set", Some("email"), Some("none")) => Some(AppAction::SetEmail(None)),
        ("set", Some("email"), Some(email)) => Some(AppAction::SetEmail(Some(email.to_string()))),

        ("help", _, _) | ("?", _, _) => Some(AppAction::ShowHelp),

        _ => None,
    }
}
