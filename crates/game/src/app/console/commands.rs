use std::collections::{HashMap, VecDeque};

use rhythm_engine::MatchPolicy;

use crate::app::admin::ConfigKey;

use super::ConsoleState;

const MAX_PENDING_ADMIN_COMMANDS: usize = 128;

pub(crate) const CONSOLE_TITLE: &str = "Moonwalk Mania";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GameAction {
    Start,
    Pause,
    Resume,
    Reset,
    Stop,
    Restart,
    Status,
    Lock,
    Unlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowGrade {
    Perfect,
    Good,
    Okay,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TuneAction {
    Show,
    Window { grade: WindowGrade, ms: f64 },
    Offset { ms: f64 },
    Combo { step: u32 },
    Policy { policy: MatchPolicy },
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DebugAction {
    State,
    Log,
    Fps,
    ClearLog,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AdminCommand {
    Status,
    Game(GameAction),
    ScoreShow,
    LevelList,
    LevelSet { level_id: u32 },
    LevelNext,
    SongList,
    SongSet { track_id: String },
    Tune(TuneAction),
    DraftShow,
    DraftSet { key: ConfigKey, value: String },
    DraftUndo,
    DraftReset,
    Publish,
    ConfigGet { key: ConfigKey },
    Announce { text: Option<String> },
    FeaturedLevel { level_id: u32 },
    FeaturedTrack { track_id: String },
    Maintenance { enabled: bool },
    Unlock { code: String },
    Lock,
    Debug(DebugAction),
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LocalAction {
    Help,
    Clear,
    Echo { text: String },
    Version,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParsedCommand {
    Local(LocalAction),
    Queueable(AdminCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CommandParseError {
    reason: String,
    usage: String,
}

impl CommandParseError {
    fn new(reason: impl Into<String>, usage: &str) -> Self {
        Self {
            reason: reason.into(),
            usage: usage.to_string(),
        }
    }
}

type ParseFn = dyn Fn(&[String]) -> Result<ParsedCommand, CommandParseError> + Send + Sync;

pub(crate) struct CommandSpec {
    name: String,
    help: String,
    arg_schema: String,
    parse: Box<ParseFn>,
}

pub(crate) struct ConsoleCommandRegistry {
    specs: Vec<CommandSpec>,
    lookup_by_lower_name: HashMap<String, usize>,
}

impl ConsoleCommandRegistry {
    pub(crate) fn new() -> Self {
        Self {
            specs: Vec::new(),
            lookup_by_lower_name: HashMap::new(),
        }
    }

    pub(crate) fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, &str, &str, fn(&[String]) -> Result<ParsedCommand, CommandParseError>); 19] = [
            ("help", "List commands", "", parse_help_command),
            ("clear", "Clear console output", "", parse_clear_command),
            ("echo", "Print text to console", "<text...>", parse_echo_command),
            ("version", "Show build version", "", parse_version_command),
            ("status", "Show run phase, level and score", "", parse_status_command),
            (
                "game",
                "Control the run",
                "<start|pause|resume|reset|stop|restart|status|lock|unlock>",
                parse_game_command,
            ),
            ("score", "Show score, streak and accuracy", "<show>", parse_score_command),
            ("level", "List or select levels", "<list|set <id:u32>|next>", parse_level_command),
            ("song", "List or select tracks", "<list|set <track_id>>", parse_song_command),
            (
                "tune",
                "Adjust live tuning",
                "<show|window <perfect|good|okay> <ms>|offset <ms>|combo <n>|policy <fifo|nearest>|reset>",
                parse_tune_command,
            ),
            (
                "config",
                "Edit draft and published global config",
                "<draft show|draft set <key> <value...>|draft undo|draft reset|publish|get <key>>",
                parse_config_command,
            ),
            ("announce", "Draft the announcement banner", "<set <text...>|clear>", parse_announce_command),
            (
                "featured",
                "Draft the featured level or track",
                "<level <id:u32>|track <track_id>>",
                parse_featured_command,
            ),
            ("maintenance", "Draft maintenance mode", "<on|off>", parse_maintenance_command),
            ("unlock", "Unlock admin commands", "<code>", parse_unlock_command),
            ("lock", "Lock admin commands", "", parse_lock_command),
            ("debug", "Inspect engine internals", "<state|log|fps|reset>", parse_debug_command),
            ("quit", "Quit app", "", parse_quit_command),
            ("exit", "Quit app", "", parse_quit_command),
        ];
        for (name, help, arg_schema, parse) in builtins {
            registry
                .register(name, help, arg_schema, parse)
                .expect("built-in command registration should not fail");
        }
        registry
    }

    pub(crate) fn register<F>(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        arg_schema: impl Into<String>,
        parse: F,
    ) -> Result<(), String>
    where
        F: Fn(&[String]) -> Result<ParsedCommand, CommandParseError> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("command name cannot be empty".to_string());
        }
        let lower = name.to_ascii_lowercase();
        if self.lookup_by_lower_name.contains_key(&lower) {
            return Err(format!("duplicate command registration: {name}"));
        }

        self.specs.push(CommandSpec {
            name,
            help: help.into(),
            arg_schema: arg_schema.into(),
            parse: Box::new(parse),
        });
        self.lookup_by_lower_name
            .insert(lower, self.specs.len() - 1);
        Ok(())
    }

    pub(crate) fn lookup(&self, input_name: &str) -> Option<&CommandSpec> {
        let lower = input_name.to_ascii_lowercase();
        let index = self.lookup_by_lower_name.get(&lower)?;
        self.specs.get(*index)
    }

    pub(crate) fn iter_specs_in_order(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.specs.iter().map(|spec| {
            (
                spec.name.as_str(),
                spec.help.as_str(),
                spec.arg_schema.as_str(),
            )
        })
    }
}

pub(crate) struct ConsoleCommandProcessor {
    registry: ConsoleCommandRegistry,
    pending_admin_commands: VecDeque<AdminCommand>,
}

impl Default for ConsoleCommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleCommandProcessor {
    pub(crate) fn new() -> Self {
        Self {
            registry: ConsoleCommandRegistry::with_builtins(),
            pending_admin_commands: VecDeque::new(),
        }
    }

    pub(crate) fn process_pending_lines(&mut self, console: &mut ConsoleState) {
        let mut lines = Vec::new();
        console.drain_pending_lines_into(&mut lines);

        for raw_line in lines {
            self.process_line(console, &raw_line);
        }
    }

    pub(crate) fn drain_pending_admin_commands_into(&mut self, out: &mut Vec<AdminCommand>) {
        out.extend(self.pending_admin_commands.drain(..));
    }

    fn process_line(&mut self, console: &mut ConsoleState, raw_line: &str) {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            return;
        }

        let tokens = match tokenize_line(trimmed) {
            Ok(tokens) => tokens,
            Err(reason) => {
                console.append_output_line(format!("error: {reason}. usage: help"));
                return;
            }
        };
        if tokens.is_empty() {
            return;
        }

        // Slash-prefixed names are accepted as aliases.
        let command_name = tokens[0].strip_prefix('/').unwrap_or(&tokens[0]);
        let args = &tokens[1..];
        let Some(spec) = self.registry.lookup(command_name) else {
            console.append_output_line(format!(
                "error: unknown command '{}'. try: help",
                command_name
            ));
            return;
        };

        match (spec.parse)(args) {
            Ok(ParsedCommand::Local(action)) => self.apply_local_action(console, action),
            Ok(ParsedCommand::Queueable(command)) => self.push_queueable(command),
            Err(error) => {
                console
                    .append_output_line(format!("error: {}. usage: {}", error.reason, error.usage));
            }
        }
    }

    fn apply_local_action(&self, console: &mut ConsoleState, action: LocalAction) {
        match action {
            LocalAction::Help => {
                for (name, help, arg_schema) in self.registry.iter_specs_in_order() {
                    let line = if arg_schema.is_empty() {
                        format!("{name} - {help}")
                    } else {
                        format!("{name} {arg_schema} - {help}")
                    };
                    console.append_output_line(line);
                }
            }
            LocalAction::Clear => {
                console.clear_output_lines();
            }
            LocalAction::Echo { text } => {
                console.append_output_line(text);
            }
            LocalAction::Version => {
                console.append_output_line(format!(
                    "{CONSOLE_TITLE} v{} · Admin Console",
                    env!("CARGO_PKG_VERSION")
                ));
            }
        }
    }

    fn push_queueable(&mut self, command: AdminCommand) {
        if self.pending_admin_commands.len() == MAX_PENDING_ADMIN_COMMANDS {
            self.pending_admin_commands.pop_front();
        }
        self.pending_admin_commands.push_back(command);
    }
}

fn tokenize_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut seen_token_content = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                seen_token_content = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if seen_token_content {
                    tokens.push(std::mem::take(&mut current));
                    seen_token_content = false;
                }
            }
            _ => {
                current.push(ch);
                seen_token_content = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    if seen_token_content {
        tokens.push(current);
    }

    Ok(tokens)
}

fn parse_help_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "help")?;
    Ok(ParsedCommand::Local(LocalAction::Help))
}

fn parse_clear_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "clear")?;
    Ok(ParsedCommand::Local(LocalAction::Clear))
}

fn parse_echo_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    if args.is_empty() {
        return Err(CommandParseError::new(
            "missing required argument <text...>",
            "echo <text...>",
        ));
    }
    Ok(ParsedCommand::Local(LocalAction::Echo {
        text: args.join(" "),
    }))
}

fn parse_version_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "version")?;
    Ok(ParsedCommand::Local(LocalAction::Version))
}

fn parse_status_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "status")?;
    Ok(ParsedCommand::Queueable(AdminCommand::Status))
}

fn parse_game_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "game <start|pause|resume|reset|stop|restart|status|lock|unlock>";
    let action = single_subcommand(args, USAGE)?;
    let action = match action.as_str() {
        "start" => GameAction::Start,
        "pause" => GameAction::Pause,
        "resume" => GameAction::Resume,
        "reset" => GameAction::Reset,
        "stop" => GameAction::Stop,
        "restart" => GameAction::Restart,
        "status" => GameAction::Status,
        "lock" => GameAction::Lock,
        "unlock" => GameAction::Unlock,
        other => {
            return Err(CommandParseError::new(
                format!("unknown game action '{other}'"),
                USAGE,
            ))
        }
    };
    Ok(ParsedCommand::Queueable(AdminCommand::Game(action)))
}

fn parse_score_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "score show";
    if args.is_empty() {
        return Ok(ParsedCommand::Queueable(AdminCommand::ScoreShow));
    }
    match single_subcommand(args, USAGE)?.as_str() {
        "show" => Ok(ParsedCommand::Queueable(AdminCommand::ScoreShow)),
        other => Err(CommandParseError::new(
            format!("unknown score action '{other}'"),
            USAGE,
        )),
    }
}

fn parse_level_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "level <list|set <id>|next>";
    let Some(action) = args.first() else {
        return Err(CommandParseError::new("missing required argument <action>", USAGE));
    };
    let command = match (action.to_ascii_lowercase().as_str(), &args[1..]) {
        ("list", []) => AdminCommand::LevelList,
        ("next", []) => AdminCommand::LevelNext,
        ("set", [raw_id]) => AdminCommand::LevelSet {
            level_id: parse_level_id(raw_id, USAGE)?,
        },
        ("set", _) => {
            return Err(CommandParseError::new(
                "expected exactly one argument <id>",
                USAGE,
            ))
        }
        ("list" | "next", _) => {
            return Err(CommandParseError::new("unexpected extra arguments", USAGE))
        }
        (other, _) => {
            return Err(CommandParseError::new(
                format!("unknown level action '{other}'"),
                USAGE,
            ))
        }
    };
    Ok(ParsedCommand::Queueable(command))
}

fn parse_song_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "song <list|set <track_id>>";
    let Some(action) = args.first() else {
        return Err(CommandParseError::new("missing required argument <action>", USAGE));
    };
    let command = match (action.to_ascii_lowercase().as_str(), &args[1..]) {
        ("list", []) => AdminCommand::SongList,
        ("set", [track_id]) => AdminCommand::SongSet {
            track_id: track_id.clone(),
        },
        ("set", _) => {
            return Err(CommandParseError::new(
                "expected exactly one argument <track_id>",
                USAGE,
            ))
        }
        ("list", _) => return Err(CommandParseError::new("unexpected extra arguments", USAGE)),
        (other, _) => {
            return Err(CommandParseError::new(
                format!("unknown song action '{other}'"),
                USAGE,
            ))
        }
    };
    Ok(ParsedCommand::Queueable(command))
}

fn parse_tune_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "tune <show|window <grade> <ms>|offset <ms>|combo <n>|policy <fifo|nearest>|reset>";
    let Some(action) = args.first() else {
        return Err(CommandParseError::new("missing required argument <action>", USAGE));
    };
    let rest = &args[1..];
    let action = match (action.to_ascii_lowercase().as_str(), rest) {
        ("show", []) => TuneAction::Show,
        ("reset", []) => TuneAction::Reset,
        ("window", [grade, ms]) => {
            let grade = match grade.to_ascii_lowercase().as_str() {
                "perfect" => WindowGrade::Perfect,
                "good" => WindowGrade::Good,
                "okay" => WindowGrade::Okay,
                _ => {
                    return Err(CommandParseError::new(
                        format!("unknown window '{grade}' (expected perfect|good|okay)"),
                        "tune window <perfect|good|okay> <ms>",
                    ))
                }
            };
            let ms = parse_finite(ms, "window ms", "tune window <perfect|good|okay> <ms>")?;
            if ms <= 0.0 {
                return Err(CommandParseError::new(
                    format!("window must be > 0 (got {ms})"),
                    "tune window <perfect|good|okay> <ms>",
                ));
            }
            TuneAction::Window { grade, ms }
        }
        ("offset", [ms]) => TuneAction::Offset {
            ms: parse_finite(ms, "offset ms", "tune offset <ms>")?,
        },
        ("combo", [step]) => {
            let step = step
                .parse::<u32>()
                .ok()
                .filter(|step| *step > 0)
                .ok_or_else(|| {
                    CommandParseError::new(
                        format!("invalid combo step '{step}' (expected u32 > 0)"),
                        "tune combo <n>",
                    )
                })?;
            TuneAction::Combo { step }
        }
        ("policy", [policy]) => {
            let policy = match policy.to_ascii_lowercase().as_str() {
                "fifo" | "strict_fifo" => MatchPolicy::StrictFifo,
                "nearest" | "nearest_in_time" => MatchPolicy::NearestInTime,
                _ => {
                    return Err(CommandParseError::new(
                        format!("unknown policy '{policy}' (expected fifo|nearest)"),
                        "tune policy <fifo|nearest>",
                    ))
                }
            };
            TuneAction::Policy { policy }
        }
        ("show" | "reset" | "window" | "offset" | "combo" | "policy", _) => {
            return Err(CommandParseError::new("wrong number of arguments", USAGE))
        }
        (other, _) => {
            return Err(CommandParseError::new(
                format!("unknown tune action '{other}'"),
                USAGE,
            ))
        }
    };
    Ok(ParsedCommand::Queueable(AdminCommand::Tune(action)))
}

fn parse_config_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "config <draft show|draft set <key> <value...>|draft undo|draft reset|publish|get <key>>";
    let lowered: Vec<String> = args
        .iter()
        .take(2)
        .map(|arg| arg.to_ascii_lowercase())
        .collect();
    let lowered: Vec<&str> = lowered.iter().map(String::as_str).collect();
    let command = match lowered.as_slice() {
        ["draft", "show"] if args.len() == 2 => AdminCommand::DraftShow,
        ["draft", "undo"] if args.len() == 2 => AdminCommand::DraftUndo,
        ["draft", "reset"] if args.len() == 2 => AdminCommand::DraftReset,
        ["draft", "set"] => {
            if args.len() < 4 {
                return Err(CommandParseError::new(
                    "expected <key> <value...>",
                    "config draft set <key> <value...>",
                ));
            }
            AdminCommand::DraftSet {
                key: parse_config_key(&args[2], "config draft set <key> <value...>")?,
                value: args[3..].join(" "),
            }
        }
        ["publish"] => AdminCommand::Publish,
        ["get", _] if args.len() == 2 => AdminCommand::ConfigGet {
            key: parse_config_key(&args[1], "config get <key>")?,
        },
        [] => return Err(CommandParseError::new("missing required argument <action>", USAGE)),
        _ => {
            return Err(CommandParseError::new(
                format!("unknown config action '{}'", args.join(" ")),
                USAGE,
            ))
        }
    };
    Ok(ParsedCommand::Queueable(command))
}

fn parse_announce_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "announce <set <text...>|clear>";
    let Some(action) = args.first() else {
        return Err(CommandParseError::new("missing required argument <action>", USAGE));
    };
    match action.to_ascii_lowercase().as_str() {
        "set" if args.len() > 1 => Ok(ParsedCommand::Queueable(AdminCommand::Announce {
            text: Some(args[1..].join(" ")),
        })),
        "set" => Err(CommandParseError::new(
            "missing required argument <text...>",
            USAGE,
        )),
        "clear" => {
            require_no_args(&args[1..], USAGE)?;
            Ok(ParsedCommand::Queueable(AdminCommand::Announce { text: None }))
        }
        other => Err(CommandParseError::new(
            format!("unknown announce action '{other}'"),
            USAGE,
        )),
    }
}

fn parse_featured_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "featured <level <id>|track <track_id>>";
    let [kind, value] = args else {
        return Err(CommandParseError::new(
            "expected <level|track> <id>",
            USAGE,
        ));
    };
    let command = match kind.to_ascii_lowercase().as_str() {
        "level" => AdminCommand::FeaturedLevel {
            level_id: parse_level_id(value, USAGE)?,
        },
        "track" => AdminCommand::FeaturedTrack {
            track_id: value.clone(),
        },
        other => {
            return Err(CommandParseError::new(
                format!("unknown featured kind '{other}' (expected level|track)"),
                USAGE,
            ))
        }
    };
    Ok(ParsedCommand::Queueable(command))
}

fn parse_maintenance_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "maintenance <on|off>";
    let enabled = match single_subcommand(args, USAGE)?.as_str() {
        "on" => true,
        "off" => false,
        other => {
            return Err(CommandParseError::new(
                format!("unknown maintenance mode '{other}' (expected on|off)"),
                USAGE,
            ))
        }
    };
    Ok(ParsedCommand::Queueable(AdminCommand::Maintenance { enabled }))
}

fn parse_unlock_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let [code] = args else {
        return Err(CommandParseError::new(
            "expected exactly one argument <code>",
            "unlock <code>",
        ));
    };
    Ok(ParsedCommand::Queueable(AdminCommand::Unlock { code: code.clone() }))
}

fn parse_lock_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "lock")?;
    Ok(ParsedCommand::Queueable(AdminCommand::Lock))
}

fn parse_debug_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "debug <state|log|fps|reset>";
    let action = match single_subcommand(args, USAGE)?.as_str() {
        "state" => DebugAction::State,
        "log" => DebugAction::Log,
        "fps" => DebugAction::Fps,
        "reset" => DebugAction::ClearLog,
        other => {
            return Err(CommandParseError::new(
                format!("unknown debug action '{other}'"),
                USAGE,
            ))
        }
    };
    Ok(ParsedCommand::Queueable(AdminCommand::Debug(action)))
}

fn parse_quit_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "quit")?;
    Ok(ParsedCommand::Queueable(AdminCommand::Quit))
}

fn single_subcommand(args: &[String], usage: &str) -> Result<String, CommandParseError> {
    match args {
        [action] => Ok(action.to_ascii_lowercase()),
        [] => Err(CommandParseError::new("missing required argument <action>", usage)),
        _ => Err(CommandParseError::new("unexpected extra arguments", usage)),
    }
}

fn parse_level_id(raw: &str, usage: &str) -> Result<u32, CommandParseError> {
    raw.parse::<u32>()
        .map_err(|_| CommandParseError::new(format!("invalid level id '{raw}' (expected u32)"), usage))
}

fn parse_finite(raw: &str, what: &str, usage: &str) -> Result<f64, CommandParseError> {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| {
            CommandParseError::new(format!("invalid {what} '{raw}' (expected finite number)"), usage)
        })
}

fn parse_config_key(raw: &str, usage: &str) -> Result<ConfigKey, CommandParseError> {
    raw.parse::<ConfigKey>()
        .map_err(|reason| CommandParseError::new(reason, usage))
}

fn require_no_args(args: &[String], usage: &str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandParseError::new("unexpected extra arguments", usage))
    }
}
