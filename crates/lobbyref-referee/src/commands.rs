//! Chat commands players and the operator type in the lobby.

use lobbyref_protocol::MpCommand;
use tokio::time::Instant;

use crate::state::{Effect, LobbyState};
use crate::votes::votes_needed;

/// A recognized `!command`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    Queue,
    Skip,
    Start,
    TimeLeft,
    HostRotation,
    DifficultyConstraint,
    DifficultyRange,
    PrintQueue,
    AutoSkip,
    Mirrors,
    Info,
    Help,
}

impl ChatCommand {
    /// Looks up a command by name or alias, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        let command = match name.to_ascii_lowercase().as_str() {
            "q" | "queue" => Self::Queue,
            "s" | "skip" => Self::Skip,
            "start" => Self::Start,
            "tl" | "timeleft" => Self::TimeLeft,
            "hr" => Self::HostRotation,
            "dc" => Self::DifficultyConstraint,
            "dcr" => Self::DifficultyRange,
            "pq" => Self::PrintQueue,
            "as" | "autoskip" => Self::AutoSkip,
            "m" | "mirrors" => Self::Mirrors,
            "info" => Self::Info,
            "help" => Self::Help,
            _ => return None,
        };
        Some(command)
    }

    /// Only the operator may change settings.
    pub fn operator_only(self) -> bool {
        matches!(
            self,
            Self::HostRotation | Self::DifficultyConstraint | Self::DifficultyRange | Self::PrintQueue
        )
    }
}

/// `on`/`off` (also `true`/`false`).
fn parse_flag(arg: &str) -> Option<bool> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "true" => Some(true),
        "off" | "false" => Some(false),
        _ => None,
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

impl LobbyState {
    pub(crate) fn run_command(
        &mut self,
        sender: &str,
        name: &str,
        args: &[String],
        now: Instant,
        out: &mut Vec<Effect>,
    ) {
        let Some(command) = ChatCommand::parse(name) else {
            tracing::debug!(%sender, command = %name, "unknown command");
            return;
        };
        if command.operator_only() && !self.is_operator(sender) {
            self.say(format!("Only the lobby operator can use !{name}."), out);
            return;
        }

        match command {
            ChatCommand::Queue => self.cmd_queue(sender, args, out),
            ChatCommand::Skip => self.cmd_skip(sender, out),
            ChatCommand::Start => self.cmd_start(sender, out),
            ChatCommand::TimeLeft => self.cmd_time_left(now, out),
            ChatCommand::HostRotation => self.cmd_host_rotation(args, out),
            ChatCommand::DifficultyConstraint => self.cmd_difficulty(args, out),
            ChatCommand::DifficultyRange => self.cmd_difficulty_range(args, out),
            ChatCommand::PrintQueue => self.cmd_print_queue(args, out),
            ChatCommand::AutoSkip => self.cmd_autoskip(sender, out),
            ChatCommand::Mirrors => self.cmd_mirrors(out),
            ChatCommand::Info => self.cmd_info(out),
            ChatCommand::Help => self.say(
                "Commands: !q, !skip, !start, !tl, !as, !m, !info. Operator: !q <names>, !hr, !dc, !dcr <min> <max>, !pq.",
                out,
            ),
        }
    }

    fn cmd_queue(&mut self, sender: &str, args: &[String], out: &mut Vec<Effect>) {
        if !args.is_empty() && self.is_operator(sender) {
            let previous = self.queue.head().map(|p| p.name.clone());
            for err in self.queue.reorder(args) {
                self.say(err.to_string(), out);
            }
            self.queue_defined = true;
            let head = self.queue.head().map(|p| p.name.clone());
            if head != previous {
                if let Some(head) = head {
                    tracing::info!(player = %head, "queue reordered, new host");
                    self.set_host(head, out);
                }
            }
        }
        self.say(self.queue_line(), out);
    }

    fn cmd_skip(&mut self, sender: &str, out: &mut Vec<Effect>) {
        if !self.queue_defined {
            self.say("The queue order is unknown. The operator must set it with !q first.", out);
            return;
        }
        if self.queue.is_head(sender) || self.is_operator(sender) {
            if !self.rotate(out) {
                self.say("Nobody else can take host.", out);
            }
            return;
        }
        if !self.config.voting.enabled || !self.queue.contains(sender) {
            return;
        }

        self.skip_votes.cast(sender);
        let players = self.queue.len();
        let threshold = self.config.voting.skip_threshold;
        if self.skip_votes.passes(players, threshold) {
            tracing::info!(votes = self.skip_votes.count(), "skip vote passed");
            self.say("Skip vote passed.", out);
            if !self.rotate(out) {
                self.skip_votes.clear();
            }
        } else {
            self.say(
                format!(
                    "Skip votes: {}/{}",
                    self.skip_votes.count(),
                    votes_needed(players, threshold)
                ),
                out,
            );
        }
    }

    fn cmd_start(&mut self, sender: &str, out: &mut Vec<Effect>) {
        if self.match_in_progress() {
            self.say("The match is already running.", out);
            return;
        }
        if self.queue.is_head(sender) || self.is_operator(sender) {
            self.mp(MpCommand::Start, out);
            return;
        }
        if !self.config.voting.enabled || !self.queue.contains(sender) {
            return;
        }

        self.start_votes.cast(sender);
        let players = self.queue.len();
        let threshold = self.config.voting.start_threshold;
        if self.start_votes.passes(players, threshold) {
            tracing::info!(votes = self.start_votes.count(), "start vote passed");
            self.start_votes.clear();
            self.mp(MpCommand::Start, out);
        } else {
            self.say(
                format!(
                    "Start votes: {}/{}",
                    self.start_votes.count(),
                    votes_needed(players, threshold)
                ),
                out,
            );
        }
    }

    fn cmd_time_left(&mut self, now: Instant, out: &mut Vec<Effect>) {
        let (Some(started), Some(beatmap)) = (self.match_started_at, self.current_beatmap.as_ref())
        else {
            self.say("No match with a known beatmap is running.", out);
            return;
        };
        if !self.match_in_progress() {
            return;
        }
        let length = std::time::Duration::from_secs(u64::from(beatmap.length_secs));
        let left = length.saturating_sub(now.saturating_duration_since(started)).as_secs();
        self.say(format!("Time left: {}m {}s", left / 60, left % 60), out);
    }

    fn cmd_host_rotation(&mut self, args: &[String], out: &mut Vec<Effect>) {
        let Some(arg) = args.first() else {
            let text = format!("Host rotation is {}.", on_off(self.config.host_rotation.enabled));
            self.say(text, out);
            return;
        };
        let Some(enable) = parse_flag(arg) else {
            self.say("Usage: !hr [on|off]", out);
            return;
        };
        if enable && !self.queue_defined {
            self.say(
                "Set the queue order with !q <names> first. Host rotation stays off.",
                out,
            );
            return;
        }
        self.config.host_rotation.enabled = enable;
        tracing::info!(enabled = enable, "host rotation toggled");
        self.say(format!("Host rotation is now {}.", on_off(enable)), out);
    }

    fn cmd_difficulty(&mut self, args: &[String], out: &mut Vec<Effect>) {
        let Some(arg) = args.first() else {
            let difficulty = &self.config.difficulty;
            let text = format!(
                "Difficulty constraint is {} ({}).",
                on_off(difficulty.enabled),
                difficulty.describe_range()
            );
            self.say(text, out);
            return;
        };
        let Some(enable) = parse_flag(arg) else {
            self.say("Usage: !dc [on|off]", out);
            return;
        };
        self.config.difficulty.enabled = enable;
        tracing::info!(enabled = enable, "difficulty constraint toggled");
        self.say(format!("Difficulty constraint is now {}.", on_off(enable)), out);
        self.rename(out);
    }

    fn cmd_difficulty_range(&mut self, args: &[String], out: &mut Vec<Effect>) {
        match args {
            [] => {
                let text = format!("Difficulty range is {}.", self.config.difficulty.describe_range());
                self.say(text, out);
            }
            [min, max] => {
                let parsed = (min.parse::<f64>(), max.parse::<f64>());
                let (Ok(min), Ok(max)) = parsed else {
                    self.say("Usage: !dcr <min> <max>", out);
                    return;
                };
                if !min.is_finite() || !max.is_finite() || min < 0.0 || max < 0.0 {
                    self.say("Usage: !dcr <min> <max>", out);
                    return;
                }
                self.config.difficulty.range = [min.min(max), min.max(max)];
                let range = self.config.difficulty.describe_range();
                tracing::info!(%range, "difficulty range changed");
                self.say(format!("Difficulty range is now {range}."), out);
                self.rename(out);
            }
            _ => self.say("Usage: !dcr <min> <max>", out),
        }
    }

    fn cmd_print_queue(&mut self, args: &[String], out: &mut Vec<Effect>) {
        let Some(arg) = args.first() else {
            let text = format!(
                "Printing the queue after matches is {}.",
                on_off(self.config.host_rotation.print_queue_on_match_end)
            );
            self.say(text, out);
            return;
        };
        let Some(enable) = parse_flag(arg) else {
            self.say("Usage: !pq [on|off]", out);
            return;
        };
        self.config.host_rotation.print_queue_on_match_end = enable;
        self.say(
            format!("Printing the queue after matches is now {}.", on_off(enable)),
            out,
        );
    }

    fn cmd_autoskip(&mut self, sender: &str, out: &mut Vec<Effect>) {
        let Some(skipping) = self.queue.toggle_autoskip(sender) else {
            return;
        };
        tracing::info!(player = %sender, autoskip = skipping, "autoskip toggled");
        let text = if skipping {
            format!("{sender} will be skipped in the host rotation.")
        } else {
            format!("{sender} is back in the host rotation.")
        };
        self.say(text, out);
    }

    fn cmd_mirrors(&mut self, out: &mut Vec<Effect>) {
        let Some(beatmap) = &self.current_beatmap else {
            self.say("No beatmap selected yet.", out);
            return;
        };
        let set = beatmap.set_id;
        let text = format!(
            "Mirrors: https://beatconnect.io/b/{set}/ | https://catboy.best/d/{set} | https://api.nerinyan.moe/d/{set}"
        );
        self.say(text, out);
    }

    fn cmd_info(&mut self, out: &mut Vec<Effect>) {
        let host = self
            .queue
            .head()
            .map(|p| p.name.as_str())
            .unwrap_or("nobody");
        let beatmap = self
            .current_beatmap
            .as_ref()
            .map(|b| format!("{} - {} [{}] ({}*)", b.artist, b.title, b.version, crate::format_stars(b.stars)))
            .unwrap_or_else(|| "none".to_string());
        let text = format!(
            "Host: {host}. Host rotation {}. Difficulty {} ({}). Beatmap: {beatmap}.",
            on_off(self.config.host_rotation.enabled),
            on_off(self.config.difficulty.enabled),
            self.config.difficulty.describe_range(),
        );
        self.say(text, out);
    }

    /// `!mp name` with the rendered lobby name, when enabled.
    fn rename(&self, out: &mut Vec<Effect>) {
        if self.config.lobby.auto_update_name {
            self.mp(MpCommand::Name(self.config.lobby_name()), out);
        }
    }
}
