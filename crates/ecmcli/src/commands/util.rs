//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use ecmcli_api::models::{Account, Router};
use ecmcli_api::{Query, glob};

use crate::error::CliError;
use crate::session::Context;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a JSON file for `--input-file` flags.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "input-file".into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Resolve router arguments (ids, names or name globs) in argument order.
///
/// No arguments means every router visible to the session.
pub async fn resolve_routers(ctx: &Context, idents: &[String]) -> Result<Vec<Router>, CliError> {
    if idents.is_empty() {
        return Ok(ctx.client.list_routers(&[], Query::new()).await?);
    }
    let mut routers: Vec<Router> = Vec::new();
    for ident in idents {
        let found = if glob::is_glob(ident) {
            let hits = ctx
                .client
                .list_routers(std::slice::from_ref(ident), Query::new())
                .await?;
            if hits.is_empty() {
                return Err(CliError::NotFound {
                    resource: "Router".into(),
                    identifier: ident.clone(),
                });
            }
            hits
        } else {
            vec![ctx.client.get_router(ident).await?]
        };
        for router in found {
            if !routers.iter().any(|r| r.id == router.id) {
                routers.push(router);
            }
        }
    }
    Ok(routers)
}

/// The account the logged-in user belongs to.
pub async fn own_account(ctx: &Context) -> Result<Account, CliError> {
    let ident = match ctx.client.ident() {
        Some(ident) => ident,
        None => ctx.client.identify().await?,
    };
    let id = ident.account_id().ok_or_else(|| CliError::NotFound {
        resource: "Account".into(),
        identifier: ident.user.username.clone(),
    })?;
    Ok(ctx.client.get_account(&id).await?)
}

/// Account URN for an `--in-account` flag, defaulting to the user's own.
pub async fn account_urn(ctx: &Context, ident: Option<&str>) -> Result<String, CliError> {
    let account = match ident {
        Some(ident) => ctx.client.get_account(ident).await?,
        None => own_account(ctx).await?,
    };
    Ok(account.resource_uri)
}

pub fn router_ids(routers: &[Router]) -> Vec<String> {
    routers.iter().map(|r| r.id.clone()).collect()
}

static SESSION_ID: LazyLock<String> = LazyLock::new(new_session_id);

/// Router terminal session id shared by every command of this process.
pub fn session_id() -> &'static str {
    &SESSION_ID
}

/// A fresh time-based terminal session id.
pub fn new_session_id() -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    (now.as_micros() / 100).to_string()
}

/// `name (id)` label.
pub fn label(name: &str, id: &str) -> String {
    format!("{name} ({id})")
}

static BREAK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*(br\s*/?|/p|/div|/li|/h[1-6])\s*>").expect("valid regex")
});
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Plain text from the HTML the service stores message bodies in.
pub fn html_to_text(html: &str) -> String {
    let text = BREAK_TAG.replace_all(html, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    htmlescape::decode_html(&text).unwrap_or_else(|_| text.into_owned())
}

/// Greedy word wrap; blank lines are kept as paragraph breaks.
pub fn wrap(text: &str, width: usize) -> String {
    let width = width.max(20);
    let mut out = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if !line.is_empty() && line.len() + 1 + word.len() > width {
                out.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        out.push(line);
    }
    out.join("\n")
}

/// Terminal width, or 80 when not attached to one.
pub fn terminal_width() -> usize {
    crossterm::terminal::size().map_or(80, |(cols, _)| usize::from(cols))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn html_is_flattened() {
        assert_eq!(
            html_to_text("<p>Hello &amp; welcome</p><p>Line<br/>two</p>"),
            "Hello & welcome\nLine\ntwo\n"
        );
    }

    #[test]
    fn wrap_breaks_on_words() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let wrapped = wrap(text, 20);
        assert!(wrapped.lines().all(|l| l.len() <= 20), "{wrapped}");
        assert_eq!(wrapped.split_whitespace().count(), 12);
    }

    #[test]
    fn wrap_keeps_blank_lines() {
        assert_eq!(wrap("a\n\nb", 40), "a\n\nb");
    }
}
