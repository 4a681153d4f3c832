//! System and user message handlers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tabled::Tabled;

use ecmcli_api::models::Message;
use ecmcli_api::record_str;

use crate::cli::{GlobalOpts, MessagesArgs, MessagesCommand};
use crate::error::CliError;
use crate::output;
use crate::session::Context;

use super::util;

/// `3days 4h ago` or `in 2h 5m`.
fn relative(ts: Option<DateTime<Utc>>) -> String {
    let Some(ts) = ts else {
        return String::new();
    };
    let now = Utc::now();
    if ts > now {
        let ahead = (ts - now).num_seconds().unsigned_abs();
        format!("in {}", output::coarse_duration(std::time::Duration::from_secs(ahead)))
    } else {
        format!("{} ago", output::time_since(ts))
    }
}

fn sender(message: &Message, usernames: &HashMap<String, String>) -> String {
    match message.kind.as_str() {
        "sys" => "[ECM]".into(),
        "usr" => message
            .user
            .as_ref()
            .and_then(|urn| usernames.get(urn))
            .cloned()
            .unwrap_or_default(),
        _ => "[UNSUPPORTED]".into(),
    }
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct MessageRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Expires")]
    expires: String,
}

impl MessageRow {
    fn new(message: &Message, usernames: &HashMap<String, String>, color: bool) -> Self {
        let emphasis = |text: String| {
            if message.is_unread() {
                output::bold(&text, color)
            } else {
                text
            }
        };
        Self {
            id: emphasis(message.handle()),
            created: emphasis(relative(message.created)),
            from: emphasis(sender(message, usernames)),
            title: emphasis(message.title.clone()),
            expires: emphasis(relative(message.expires)),
        }
    }
}

/// Usernames of the senders of user messages, by user URN.
async fn sender_names(
    ctx: &Context,
    messages: &[Message],
) -> Result<HashMap<String, String>, CliError> {
    let mut names = HashMap::new();
    for urn in messages.iter().filter_map(|m| m.user.as_deref()) {
        if !names.contains_key(urn) {
            let user = ctx.client.fetch_cached(urn).await?;
            names.insert(urn.to_owned(), record_str(&user, "username").to_owned());
        }
    }
    Ok(names)
}

fn body_text(message: &Message, width: usize) -> String {
    message
        .message
        .as_deref()
        .map(|html| util::wrap(&util::html_to_text(html), width))
        .unwrap_or_default()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: MessagesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command.unwrap_or(MessagesCommand::Ls) {
        MessagesCommand::Ls => {
            let messages = ctx.client.list_messages().await?;
            let usernames = sender_names(ctx, &messages).await?;
            let out = output::render_list(
                global.output,
                &messages,
                |m| MessageRow::new(m, &usernames, ctx.color),
                Message::handle,
            );
            output::print_paged(&out, global.quiet, global.no_pager);
            Ok(())
        }

        MessagesCommand::Read { ident } => {
            let message = ctx.client.get_message(&ident).await?;
            let created = output::format_ts(message.created);
            let mut lines = vec![
                output::bold(&format!("Created: {created}"), ctx.color),
                output::bold(&format!("Subject: {}", message.title), ctx.color),
            ];
            let body = body_text(&message, util::terminal_width());
            if !body.is_empty() {
                lines.push(body);
            }
            output::print_paged(&lines.join("\n"), global.quiet, global.no_pager);
            ctx.client.mark_message_read(&message).await?;
            Ok(())
        }
    }
}
