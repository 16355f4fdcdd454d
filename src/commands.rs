use std::path::PathBuf;

/// One line typed into the chat REPL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Ask(String),
    Reset,
    Tip,
    Replay,
    Upload(PathBuf),
    Forget,
    Listen(PathBuf),
    Explain(bool),
    Code(bool),
    Filter(bool),
    Speak(bool),
    Stats,
    Save,
    Export(PathBuf),
    Help,
    Quit,
    Invalid(String),
}

/// `None` for a blank line. Anything not starting with `/` is a question,
/// except the bare words `exit` and `quit`.
pub fn parse(line: &str) -> Option<ReplCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return Some(ReplCommand::Quit);
    }

    let Some(command) = line.strip_prefix('/') else {
        return Some(ReplCommand::Ask(line.to_string()));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    let parsed = match name.to_ascii_lowercase().as_str() {
        "reset" | "clear" => ReplCommand::Reset,
        "tip" => ReplCommand::Tip,
        "replay" => ReplCommand::Replay,
        "upload" => with_path(arg, ReplCommand::Upload, "/upload needs a file path"),
        "forget" => ReplCommand::Forget,
        "listen" => with_path(arg, ReplCommand::Listen, "/listen needs an audio file path"),
        "explain" => with_switch(arg, ReplCommand::Explain, "/explain"),
        "code" => with_switch(arg, ReplCommand::Code, "/code"),
        "filter" => with_switch(arg, ReplCommand::Filter, "/filter"),
        "speak" => with_switch(arg, ReplCommand::Speak, "/speak"),
        "stats" => ReplCommand::Stats,
        "save" => ReplCommand::Save,
        "export" => with_path(arg, ReplCommand::Export, "/export needs an output path"),
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => ReplCommand::Invalid(format!("Unknown command /{other}. Try /help.")),
    };
    Some(parsed)
}

fn with_path(arg: &str, build: fn(PathBuf) -> ReplCommand, usage: &str) -> ReplCommand {
    if arg.is_empty() {
        ReplCommand::Invalid(usage.to_string())
    } else {
        build(PathBuf::from(arg))
    }
}

fn with_switch(arg: &str, build: fn(bool) -> ReplCommand, name: &str) -> ReplCommand {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" => build(true),
        "off" | "no" | "false" => build(false),
        _ => ReplCommand::Invalid(format!("Usage: {name} on|off")),
    }
}
