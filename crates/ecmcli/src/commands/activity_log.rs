//! Activity log handler.
//!
//! Each log entry is rendered as a sentence. Only the activity types the
//! service documents attributes for get a real sentence; the rest are
//! shown as unsupported.

use futures_util::{StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use ecmcli_api::client::API_PREFIX;
use ecmcli_api::models::{ActivityLogEntry, ActivityType, ActorType};
use ecmcli_api::{record_id, record_str};

use crate::cli::{ActivityLogArgs, ActivityLogCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;
use crate::session::Context;

use super::util;

/// Actor label when a device changed itself.
const LOCAL_DEVICE: &str = "local-device";

#[derive(Serialize)]
struct Activity {
    #[serde(flatten)]
    entry: ActivityLogEntry,
    activity: String,
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ActivityRow {
    #[tabled(rename = "Activity")]
    activity: String,
    #[tabled(rename = "Time")]
    time: String,
}

impl From<&Activity> for ActivityRow {
    fn from(a: &Activity) -> Self {
        Self {
            activity: a.activity.clone(),
            time: output::format_ts(a.entry.created_at),
        }
    }
}

// ── Sentences ───────────────────────────────────────────────────────

fn attr<'a>(entry: &'a ActivityLogEntry, pointer: &str) -> &'a str {
    entry
        .attributes
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
}

/// `name (id)` of an attribute object, using `key` for the name.
fn attr_label(entry: &ActivityLogEntry, object: &str, key: &str) -> String {
    let id = entry
        .attributes
        .get(object)
        .map(record_id)
        .unwrap_or_default();
    util::label(attr(entry, &format!("/{object}/{key}")), &id)
}

/// Whether the entry names a separate actor that has to be looked up.
fn needs_actor(entry: &ActivityLogEntry) -> bool {
    matches!(
        entry.activity(),
        Some(ActivityType::Updated | ActivityType::Registered)
    ) && entry.attributes.get("actor") != entry.attributes.get("object")
}

/// Number of scalar settings in a nested config diff.
fn leaf_count(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.values().map(leaf_count).sum(),
        Value::Array(items) => items.iter().map(leaf_count).sum(),
        _ => 1,
    }
}

fn diff_stat(entry: &ActivityLogEntry) -> String {
    let diff = entry.attributes.pointer("/diff/target_config");
    let updates = diff.and_then(|d| d.get(0)).map_or(0, leaf_count);
    let removals = diff
        .and_then(|d| d.get(1))
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let mut stat = Vec::new();
    if updates > 0 {
        stat.push(format!("+{updates}"));
    }
    if removals > 0 {
        stat.push(format!("-{removals}"));
    }
    stat.join("/")
}

/// Sentence for one entry. `actor` labels the source of config changes
/// and registrations.
fn sentence(entry: &ActivityLogEntry, actor: &str) -> String {
    let Some(kind) = entry.activity() else {
        return format!("Unsupported [{}]", entry.activity_type);
    };
    match kind {
        ActivityType::Updated => format!(
            "Config changed by {actor} on {}: {} differences",
            attr_label(entry, "object", "name"),
            diff_stat(entry)
        ),
        ActivityType::Requested => format!(
            "{} {} of {}",
            attr_label(entry, "actor", "username"),
            attr(entry, "/operation/name"),
            attr_label(entry, "object", "name")
        ),
        ActivityType::Reported => format!(
            "{} firmware upgraded to {}",
            attr_label(entry, "actor", "name"),
            attr(entry, "/after/actual_firmware/version")
        ),
        ActivityType::LoggedIn => format!(
            "{} logged into ECM",
            attr_label(entry, "actor", "username")
        ),
        ActivityType::LoggedOut => format!(
            "{} logged out of ECM",
            attr_label(entry, "actor", "username")
        ),
        ActivityType::Registered => format!(
            "Router registered by {actor}: {}",
            attr_label(entry, "object", "name")
        ),
        ActivityType::Created
        | ActivityType::Deleted
        | ActivityType::Unregistered
        | ActivityType::Activated => format!(
            "Unsupported [{kind}]: {} {}",
            entry
                .object()
                .map_or_else(|| entry.object_type.to_string(), |o| o.to_string()),
            entry.object_id
        ),
    }
}

async fn actor_label(ctx: &Context, entry: &ActivityLogEntry) -> Result<String, CliError> {
    let resource = match entry.actor() {
        Some(ActorType::User) => "users",
        Some(ActorType::Router) => "routers",
        Some(other) => return Ok(format!("({other}) {}", entry.actor_id)),
        None => return Ok(entry.actor_id.clone()),
    };
    let record = ctx
        .client
        .fetch_cached(&format!("{API_PREFIX}/{resource}/{}/", entry.actor_id))
        .await?;
    Ok(if resource == "users" {
        format!(
            "(user) {} {} ({})",
            record_str(&record, "first_name"),
            record_str(&record, "last_name"),
            entry.actor_id
        )
    } else {
        format!("(router) {}", util::label(record_str(&record, "name"), &entry.actor_id))
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &Context,
    args: ActivityLogArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command.unwrap_or(ActivityLogCommand::Ls { limit: None }) {
        ActivityLogCommand::Ls { limit } => {
            let entries: Vec<ActivityLogEntry> = ctx
                .client
                .activity_logs()
                .take(limit.unwrap_or(usize::MAX))
                .try_collect()
                .await?;
            let mut activities = Vec::with_capacity(entries.len());
            for entry in entries {
                let actor = if needs_actor(&entry) {
                    actor_label(ctx, &entry).await?
                } else {
                    LOCAL_DEVICE.to_owned()
                };
                let activity = sentence(&entry, &actor);
                activities.push(Activity { entry, activity });
            }
            let out = output::render_list(global.output, &activities, ActivityRow::from, |a| {
                a.activity.clone()
            });
            output::print_paged(&out, global.quiet, global.no_pager);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn entry(activity_type: u8, attributes: Value) -> ActivityLogEntry {
        serde_json::from_value(json!({
            "actor_type": 2,
            "actor_id": 9,
            "object_type": 4,
            "object_id": 12,
            "activity_type": activity_type,
            "created_at": "2024-05-01T10:00:00Z",
            "attributes": attributes,
        }))
        .expect("entry")
    }

    #[test]
    fn config_change_counts_differences() {
        let e = entry(
            3,
            json!({
                "actor": {"id": 12, "name": "hq"},
                "object": {"id": 12, "name": "hq"},
                "diff": {"target_config": [
                    {"system": {"desc": "x", "ntp": {"enabled": true}}},
                    [["wan", "rules", 0]]
                ]},
            }),
        );
        assert!(!needs_actor(&e));
        assert_eq!(
            sentence(&e, LOCAL_DEVICE),
            "Config changed by local-device on hq (12): +2/-1 differences"
        );
    }

    #[test]
    fn config_change_by_user_needs_lookup() {
        let e = entry(
            3,
            json!({"actor": {"id": 9}, "object": {"id": 12, "name": "hq"}}),
        );
        assert!(needs_actor(&e));
    }

    #[test]
    fn request_login_and_logout() {
        let actor = json!({"id": 9, "username": "pat"});
        let req = entry(
            4,
            json!({
                "actor": actor,
                "operation": {"name": "reboot"},
                "object": {"id": 12, "name": "hq"},
            }),
        );
        assert_eq!(sentence(&req, ""), "pat (9) reboot of hq (12)");
        assert_eq!(
            sentence(&entry(6, json!({"actor": actor})), ""),
            "pat (9) logged into ECM"
        );
        assert_eq!(
            sentence(&entry(7, json!({"actor": actor})), ""),
            "pat (9) logged out of ECM"
        );
    }

    #[test]
    fn firmware_report_and_registration() {
        let fw = entry(
            5,
            json!({
                "actor": {"id": 12, "name": "hq"},
                "after": {"actual_firmware": {"version": "7.22.60"}},
            }),
        );
        assert_eq!(sentence(&fw, ""), "hq (12) firmware upgraded to 7.22.60");
        let reg = entry(8, json!({"actor": {"id": 12}, "object": {"id": 12, "name": "hq"}}));
        assert_eq!(
            sentence(&reg, LOCAL_DEVICE),
            "Router registered by local-device: hq (12)"
        );
    }

    #[test]
    fn other_types_are_unsupported() {
        assert_eq!(
            sentence(&entry(1, json!({})), ""),
            "Unsupported [created]: router 12"
        );
        assert_eq!(sentence(&entry(42, json!({})), ""), "Unsupported [42]");
    }
}
