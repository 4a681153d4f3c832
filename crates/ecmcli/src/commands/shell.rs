//! Interactive shell on a remote router over a csterm session.
//!
//! Keystrokes are batched (150ms idle) and sent with each poll. While the
//! router is quiet the poll timeout backs off by 50ms per round, up to
//! five minutes; any output resets it to zero.

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use futures_util::StreamExt;
use tracing::debug;

use crate::cli::{GlobalOpts, ShellArgs};
use crate::error::CliError;
use crate::session::Context;

use super::util;

const KEY_IDLE_TIMEOUT: Duration = Duration::from_millis(150);
const POLL_BACKOFF: Duration = Duration::from_millis(50);
const POLL_MAX: Duration = Duration::from_secs(300);
const CLOSE_SEQUENCE: &str = "~~";

/// Raw mode for the life of the value; restored on drop, even on error.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Bytes a key press sends to a terminal.
fn key_bytes(key: &KeyEvent) -> Option<String> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let seq = match key.code {
        KeyCode::Char(c) if ctrl && c.is_ascii_alphabetic() => {
            let letter = u8::try_from(c.to_ascii_lowercase()).ok()?;
            char::from(letter - b'a' + 1).to_string()
        }
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "\n".into(),
        KeyCode::Tab => "\t".into(),
        KeyCode::BackTab => "\x1b[Z".into(),
        KeyCode::Backspace => "\x7f".into(),
        KeyCode::Esc => "\x1b".into(),
        KeyCode::Up => "\x1b[A".into(),
        KeyCode::Down => "\x1b[B".into(),
        KeyCode::Right => "\x1b[C".into(),
        KeyCode::Left => "\x1b[D".into(),
        KeyCode::Home => "\x1b[H".into(),
        KeyCode::End => "\x1b[F".into(),
        KeyCode::Delete => "\x1b[3~".into(),
        KeyCode::PageUp => "\x1b[5~".into(),
        KeyCode::PageDown => "\x1b[6~".into(),
        _ => return None,
    };
    Some(if alt { format!("\x1b{seq}") } else { seq })
}

/// Terminal output with bare line feeds expanded for raw mode.
fn raw_output(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    let mut prev = '\0';
    for c in data.chars() {
        if c == '\n' && prev != '\r' {
            out.push('\r');
        }
        out.push(c);
        prev = c;
    }
    out
}

fn next_poll(current: Duration, got_output: bool) -> Duration {
    if got_output {
        Duration::ZERO
    } else {
        (current + POLL_BACKOFF).min(POLL_MAX)
    }
}

/// Collect keystrokes: wait up to `max_wait` for the first, then keep
/// reading until the keyboard is idle.
async fn read_keys(events: &mut EventStream, max_wait: Duration) -> Result<String, CliError> {
    let mut buf = String::new();
    let mut wait = max_wait;
    loop {
        let Ok(next) = tokio::time::timeout(wait, events.next()).await else {
            return Ok(buf);
        };
        match next {
            Some(Ok(Event::Key(key))) if key.kind != KeyEventKind::Release => {
                if let Some(bytes) = key_bytes(&key) {
                    buf.push_str(&bytes);
                    wait = KEY_IDLE_TIMEOUT;
                }
            }
            Some(Ok(Event::Paste(text))) => {
                buf.push_str(&text);
                wait = KEY_IDLE_TIMEOUT;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
            None => return Ok(buf),
        }
    }
}

async fn rsh(ctx: &Context, router_id: &str, session_id: &str) -> Result<(), CliError> {
    let mut events = EventStream::new();
    let mut stdout = io::stdout();
    let mut saved_size: Option<(u16, u16)> = None;
    let mut keys = String::from("\n");
    let mut poll = KEY_IDLE_TIMEOUT;
    loop {
        let size = terminal::size()?;
        let resize = (saved_size != Some(size)).then_some(size);
        if let Some((w, h)) = resize {
            debug!(w, h, "terminal size changed");
            saved_size = Some(size);
        }
        let data = ctx
            .client
            .csterm(session_id, router_id, &keys, resize)
            .await?;
        if !data.is_empty() {
            stdout.write_all(raw_output(&data).as_bytes())?;
            stdout.flush()?;
        }
        poll = next_poll(poll, !data.is_empty());
        keys = read_keys(&mut events, poll).await?;
        if keys.contains(CLOSE_SEQUENCE) {
            return Ok(());
        }
    }
}

pub async fn handle(ctx: &Context, args: ShellArgs, _global: &GlobalOpts) -> Result<(), CliError> {
    if !io::stdin().is_terminal() {
        return Err(CliError::Usage("shell requires an interactive terminal".into()));
    }
    let router = ctx.client.get_router(&args.router).await?;
    println!("Connecting to: {}", util::label(&router.name, &router.id));
    println!("Type {CLOSE_SEQUENCE} rapidly to close session");
    let session_id = if args.new {
        util::new_session_id()
    } else {
        util::session_id().to_owned()
    };

    let result = {
        let _raw = RawMode::enable()?;
        rsh(ctx, &router.id, &session_id).await
    };
    result?;
    eprintln!("Session Closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn control_keys_map_to_ascii() {
        assert_eq!(
            key_bytes(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)).as_deref(),
            Some("\x03")
        );
        assert_eq!(
            key_bytes(&press(KeyCode::Char('D'), KeyModifiers::CONTROL)).as_deref(),
            Some("\x04")
        );
        assert_eq!(
            key_bytes(&press(KeyCode::Up, KeyModifiers::NONE)).as_deref(),
            Some("\x1b[A")
        );
        assert_eq!(
            key_bytes(&press(KeyCode::Char('b'), KeyModifiers::ALT)).as_deref(),
            Some("\x1bb")
        );
        assert_eq!(key_bytes(&press(KeyCode::F(1), KeyModifiers::NONE)), None);
    }

    #[test]
    fn line_feeds_gain_carriage_returns() {
        assert_eq!(raw_output("a\nb\r\nc"), "a\r\nb\r\nc");
    }

    #[test]
    fn poll_backs_off_until_output() {
        let mut poll = KEY_IDLE_TIMEOUT;
        poll = next_poll(poll, false);
        assert_eq!(poll, Duration::from_millis(200));
        poll = next_poll(poll, true);
        assert_eq!(poll, Duration::ZERO);
        assert_eq!(next_poll(POLL_MAX, false), POLL_MAX);
    }
}
