//! Interactive session: a `user@site` prompt that runs `ecm` command lines
//! against one logged-in client.
//!
//! Tab completes command names, flags and router names. Line history is
//! kept in the data directory across sessions.

use std::collections::VecDeque;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use dialoguer::{Completion, History, Input};
use tracing::{debug, warn};

use ecmcli_api::Query;

use crate::cli::{Cli, Command, GlobalOpts, TosArgs, TosCommand};
use crate::commands;
use crate::error::CliError;
use crate::session::Context;

const HISTORY_MAX: usize = 1000;
const EXIT_WORDS: [&str; 2] = ["exit", "quit"];

// ── Line splitting ──────────────────────────────────────────────────

/// Split a command line into words. Single and double quotes group words;
/// a backslash escapes the next character outside single quotes.
pub fn split_line(line: &str) -> Result<Vec<String>, CliError> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"') | None, '\\') => {
                if let Some(next) = chars.next() {
                    word.push(next);
                }
                in_word = true;
            }
            (Some(_), c) => word.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            (None, c) => {
                word.push(c);
                in_word = true;
            }
        }
    }
    if quote.is_some() {
        return Err(CliError::Usage("Unterminated quote".into()));
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}

// ── Completion ──────────────────────────────────────────────────────

struct CommandCompleter {
    root: clap::Command,
    routers: Vec<String>,
}

impl CommandCompleter {
    fn new(routers: Vec<String>) -> Self {
        Self {
            root: Cli::command(),
            routers,
        }
    }

    /// Candidates for the last word, given the words before it.
    fn candidates(&self, before: &[&str], word: &str) -> Vec<String> {
        let mut cmd = &self.root;
        for w in before {
            if let Some(sub) = cmd.find_subcommand(w) {
                cmd = sub;
            }
        }
        let mut out: Vec<String> = if word.starts_with('-') {
            cmd.get_arguments()
                .filter_map(|a| a.get_long().map(|l| format!("--{l}")))
                .collect()
        } else {
            let subs: Vec<String> = cmd
                .get_subcommands()
                .filter(|s| !s.is_hide_set())
                .map(|s| s.get_name().to_owned())
                .collect();
            if subs.is_empty() && !before.is_empty() {
                self.routers.clone()
            } else if before.is_empty() {
                subs.into_iter()
                    .chain(EXIT_WORDS.iter().map(|w| (*w).to_owned()))
                    .collect()
            } else {
                subs
            }
        };
        out.retain(|c| c.starts_with(word));
        out.sort();
        out.dedup();
        out
    }
}

fn common_prefix(words: &[String]) -> &str {
    let Some(first) = words.first() else {
        return "";
    };
    let mut len = first.len();
    for w in &words[1..] {
        len = first
            .char_indices()
            .zip(w.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, a), _)| i + a.len_utf8())
            .min(len);
    }
    &first[..len]
}

impl Completion for CommandCompleter {
    fn get(&self, input: &str) -> Option<String> {
        let (head, word) = match input.rfind(char::is_whitespace) {
            Some(i) => input.split_at(i + 1),
            None => ("", input),
        };
        let before: Vec<&str> = head.split_whitespace().collect();
        let matches = self.candidates(&before, word);
        match matches.as_slice() {
            [] => None,
            [only] => Some(format!("{head}{only} ")),
            many => {
                let prefix = common_prefix(many);
                (prefix.len() > word.len()).then(|| format!("{head}{prefix}"))
            }
        }
    }
}

// ── History ─────────────────────────────────────────────────────────

/// Line history backed by a file, newest entry first.
struct FileHistory {
    path: PathBuf,
    entries: VecDeque<String>,
}

impl FileHistory {
    fn open(path: PathBuf) -> Self {
        let entries = std::fs::read_to_string(&path)
            .map(|text| text.lines().rev().take(HISTORY_MAX).map(str::to_owned).collect())
            .unwrap_or_default();
        Self { path, entries }
    }

    fn save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut text: Vec<&str> = self.entries.iter().rev().map(String::as_str).collect();
        text.push("");
        std::fs::write(&self.path, text.join("\n"))
    }
}

impl<T: ToString> History<T> for FileHistory {
    fn read(&self, pos: usize) -> Option<String> {
        self.entries.get(pos).cloned()
    }

    fn write(&mut self, val: &T) {
        let line = val.to_string();
        if line.trim().is_empty() || self.entries.front() == Some(&line) {
            return;
        }
        self.entries.push_front(line);
        self.entries.truncate(HISTORY_MAX);
        if let Err(e) = self.save() {
            warn!(path = %self.path.display(), "cannot save history: {e}");
        }
    }
}

// ── Loop ────────────────────────────────────────────────────────────

async fn router_names(ctx: &Context) -> Vec<String> {
    match ctx.client.list_routers(&[], Query::new()).await {
        Ok(routers) => routers.into_iter().map(|r| r.name).collect(),
        Err(e) => {
            debug!("router names unavailable for completion: {e}");
            Vec::new()
        }
    }
}

fn report(err: CliError) {
    eprintln!("{:?}", miette::Report::new(err));
}

/// Recover from a failed command the way an operator would.
async fn recover(ctx: &Context, err: CliError, global: &GlobalOpts) {
    match err {
        CliError::TosRequired => {
            eprintln!("You must accept the ECM terms of service to continue.");
            let accept = Command::Tos(TosArgs {
                command: Some(TosCommand::Accept { accept: false }),
            });
            if let Err(e) = commands::execute(accept, ctx, global).await {
                report(e);
            }
        }
        err if err.is_auth_failure() => {
            eprintln!("Session is no longer valid, please log in again.");
            if let Err(e) = ctx.login(None).await {
                report(e);
            }
        }
        CliError::Interrupted => eprintln!("Interrupted"),
        err => report(err),
    }
}

/// Parse and run one line. Returns `false` when the session should end.
async fn run_line(ctx: &Context, line: &str) -> bool {
    let words = match split_line(line) {
        Ok(words) => words,
        Err(e) => {
            report(e);
            return true;
        }
    };
    match words.first().map(String::as_str) {
        None => return true,
        Some(w) if EXIT_WORDS.contains(&w) => return false,
        Some(_) => {}
    }

    let argv = std::iter::once("ecm".to_owned()).chain(words);
    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return true;
        }
    };
    let Some(cmd) = cli.command else {
        return true;
    };

    let result = tokio::select! {
        result = commands::execute(cmd, ctx, &cli.global) => result,
        _ = tokio::signal::ctrl_c() => Err(CliError::Interrupted),
    };
    if let Err(err) = result {
        recover(ctx, err, &cli.global).await;
    }
    true
}

pub async fn run(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    if let Err(err) = ctx.ensure_login().await {
        if !matches!(err, CliError::TosRequired) {
            return Err(err);
        }
        recover(ctx, err, global).await;
    }
    let completer = CommandCompleter::new(router_names(ctx).await);
    let mut history = FileHistory::open(ecmcli_config::history_path());

    loop {
        let prompt = ctx.prompt_label();
        let line = tokio::task::block_in_place(|| {
            Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .completion_with(&completer)
                .history_with(&mut history)
                .interact_text()
        });
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                // EOF or a closed terminal ends the session
                debug!("prompt closed: {e}");
                eprintln!();
                return Ok(());
            }
        };
        if !run_line(ctx, &line).await {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn split(line: &str) -> Vec<String> {
        split_line(line).expect("split")
    }

    #[test]
    fn quotes_group_words() {
        assert_eq!(
            split(r#"routers edit hq --desc "front lobby" --asset-id 'A 1'"#),
            ["routers", "edit", "hq", "--desc", "front lobby", "--asset-id", "A 1"]
        );
        assert_eq!(split(r"cli hq -- echo a\ b"), ["cli", "hq", "--", "echo", "a b"]);
        assert_eq!(split(r#"remote set x --input-data '{"a": 1}'"#)[4], r#"{"a": 1}"#);
        assert_eq!(split("  "), Vec::<String>::new());
        assert_eq!(split(r#"a """#), ["a", ""]);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert!(split_line("routers 'hq").is_err());
    }

    #[test]
    fn completes_commands_and_flags() {
        let c = CommandCompleter::new(vec!["hq-1".into(), "hq-2".into(), "lab".into()]);
        assert_eq!(c.get("rout").as_deref(), Some("routers "));
        assert_eq!(c.get("routers l").as_deref(), Some("routers ls "));
        assert_eq!(c.get("reboot --fo").as_deref(), Some("reboot --force "));
        assert_eq!(c.get("reboot h").as_deref(), Some("reboot hq-"));
        assert_eq!(c.get("reboot la").as_deref(), Some("reboot lab "));
        assert_eq!(c.get("zzz"), None);
    }

    #[test]
    fn history_is_newest_first_and_persisted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history");
        let mut history = FileHistory::open(path.clone());
        History::<String>::write(&mut history, &"routers ls".to_owned());
        History::<String>::write(&mut history, &"alerts".to_owned());
        History::<String>::write(&mut history, &"alerts".to_owned());
        assert_eq!(History::<String>::read(&history, 0).as_deref(), Some("alerts"));

        let reopened = FileHistory::open(path);
        assert_eq!(History::<String>::read(&reopened, 0).as_deref(), Some("alerts"));
        assert_eq!(History::<String>::read(&reopened, 1).as_deref(), Some("routers ls"));
        assert_eq!(History::<String>::read(&reopened, 2), None);
    }
}
