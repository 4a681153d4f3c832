// System/user messages and terms of service

use futures_util::TryStreamExt;
use serde_json::{Value, json};
use tracing::debug;

use crate::client::{EcmClient, decode};
use crate::error::Error;
use crate::models::Message;
use crate::query::Query;

const SYSTEM_MESSAGES: &str = "system_message";
const USER_MESSAGES: &str = "user_messages";

/// Resource holding messages of a kind (`sys` or `usr`).
fn message_resource(kind: &str) -> Option<&'static str> {
    match kind {
        "sys" => Some(SYSTEM_MESSAGES),
        "usr" => Some(USER_MESSAGES),
        _ => None,
    }
}

/// Split a `sys-12` style handle.
pub fn parse_message_handle(handle: &str) -> Result<(&str, &str), Error> {
    let invalid = || Error::Api {
        exception: "invalid_message".into(),
        message: format!("Invalid message identity: {handle}"),
        status: 400,
    };
    let (kind, id) = handle.split_once('-').ok_or_else(invalid)?;
    if message_resource(kind).is_none() || id.is_empty() {
        return Err(invalid());
    }
    Ok((kind, id))
}

impl EcmClient {
    /// System (minus the TOS) and user messages, newest first.
    pub async fn list_messages(&self) -> Result<Vec<Message>, Error> {
        let system: Vec<Value> = self
            .pager(SYSTEM_MESSAGES, Query::new().with("type__nexact", "tos"))
            .try_collect()
            .await?;
        let user: Vec<Value> = self
            .pager(USER_MESSAGES, Query::new())
            .try_collect()
            .await?;
        let mut messages = system
            .into_iter()
            .map(|mut v| {
                v["type"] = json!("sys");
                decode::<Message>(v)
            })
            .chain(user.into_iter().map(|mut v| {
                v["type"] = json!("usr");
                decode::<Message>(v)
            }))
            .collect::<Result<Vec<_>, _>>()?;
        messages.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(messages)
    }

    /// Fetch one message by handle. System messages have no detail view,
    /// so they are found by id filter.
    pub async fn get_message(&self, handle: &str) -> Result<Message, Error> {
        let (kind, id) = parse_message_handle(handle)?;
        let resource = message_resource(kind).unwrap_or(SYSTEM_MESSAGES);
        let mut record = self.get_by(&["id"], resource, id, &Query::new()).await?;
        record["type"] = json!(kind);
        decode(record)
    }

    /// Acknowledge a message: user messages are flagged read, system
    /// messages are confirmed.
    pub async fn mark_message_read(&self, message: &Message) -> Result<(), Error> {
        debug!(handle = %message.handle(), "acknowledging message");
        if message.kind == "usr" {
            if !message.is_read.unwrap_or(false) {
                self.put(
                    &format!("{USER_MESSAGES}/{}", message.id),
                    &json!({ "is_read": true }),
                    &Query::new(),
                )
                .await?;
            }
        } else if !message.confirmed.unwrap_or(false) {
            self.confirm_message(message.resource_uri.as_deref().unwrap_or_default())
                .await?;
        }
        Ok(())
    }

    async fn confirm_message(&self, uri: &str) -> Result<(), Error> {
        self.post(
            "system_message_confirm",
            &json!({ "message": uri }),
            &Query::new(),
        )
        .await?;
        Ok(())
    }

    /// The current terms of service message.
    pub async fn terms_of_service(&self) -> Result<Message, Error> {
        let data = self
            .get_value(SYSTEM_MESSAGES, &Query::new().with("type", "tos"))
            .await?;
        let first = match data {
            Value::Array(items) => items.into_iter().next(),
            Value::Null => None,
            other => Some(other),
        };
        let Some(mut tos) = first else {
            return Err(Error::not_found("messages", "tos"));
        };
        tos["type"] = json!("sys");
        decode(tos)
    }

    /// Accept the terms of service.
    pub async fn accept_tos(&self, tos: &Message) -> Result<(), Error> {
        let uri = tos.resource_uri.as_deref().unwrap_or_default();
        match self.confirm_message(uri).await {
            Err(Error::Api { message, .. }) if message.contains("already exists") => {
                Err(Error::Api {
                    exception: "already_accepted".into(),
                    message: "TOS was already accepted.".into(),
                    status: 409,
                })
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_handles_parse() {
        assert_eq!(parse_message_handle("sys-12").expect("handle"), ("sys", "12"));
        assert_eq!(parse_message_handle("usr-3").expect("handle"), ("usr", "3"));
        assert!(parse_message_handle("foo-3").is_err());
        assert!(parse_message_handle("sys").is_err());
        assert!(parse_message_handle("sys-").is_err());
    }
}
