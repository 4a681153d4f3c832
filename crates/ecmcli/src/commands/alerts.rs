//! Alert summary handler.

use std::io::{self, IsTerminal};

use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use indexmap::IndexMap;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tabled::Tabled;

use ecmcli_api::models::Alert;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;
use crate::session::Context;

/// Alerts of one type. The feed is newest first, so the first alert seen
/// sets `newest` and the last one sets `oldest`.
#[derive(Debug, Serialize)]
struct AlertSummary {
    alert_type: String,
    count: u64,
    newest: Option<DateTime<Utc>>,
    oldest: Option<DateTime<Utc>>,
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "Alert Type")]
    alert_type: String,
    #[tabled(rename = "Count")]
    count: u64,
    #[tabled(rename = "Most Recent")]
    newest: String,
    #[tabled(rename = "Oldest")]
    oldest: String,
}

impl From<&AlertSummary> for AlertRow {
    fn from(s: &AlertSummary) -> Self {
        let since = |ts: Option<DateTime<Utc>>| ts.map(output::time_since).unwrap_or_default();
        Self {
            alert_type: s.alert_type.clone(),
            count: s.count,
            newest: since(s.newest),
            oldest: since(s.oldest),
        }
    }
}

fn tally(summary: &mut IndexMap<String, AlertSummary>, alert: &Alert) {
    let entry = summary
        .entry(alert.alert_type.clone())
        .or_insert_with(|| AlertSummary {
            alert_type: alert.alert_type.clone(),
            count: 0,
            newest: alert.created_ts,
            oldest: alert.created_ts,
        });
    entry.count += 1;
    entry.oldest = alert.created_ts;
}

fn progress(quiet: bool) -> ProgressBar {
    if quiet || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::with_template("{spinner} Collecting new alerts: {pos:>5}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    ProgressBar::new_spinner().with_style(style)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let bar = progress(global.quiet);
    let mut summary = IndexMap::new();
    let mut alerts = std::pin::pin!(ctx.client.alerts());
    while let Some(alert) = alerts.try_next().await? {
        tally(&mut summary, &alert);
        bar.inc(1);
    }
    bar.finish_and_clear();

    let rows: Vec<AlertSummary> = summary.into_values().collect();
    let out = output::render_list(global.output, &rows, AlertRow::from, |s| {
        s.alert_type.clone()
    });
    output::print_paged(&out, global.quiet, global.no_pager);
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn alert(kind: &str, ts: &str) -> Alert {
        serde_json::from_value(json!({"alert_type": kind, "created_ts": ts})).expect("alert")
    }

    #[test]
    fn alerts_group_by_type_in_feed_order() {
        let feed = [
            alert("wan_down", "2024-03-03T00:00:00Z"),
            alert("reboot", "2024-03-02T00:00:00Z"),
            alert("wan_down", "2024-03-01T00:00:00Z"),
            alert("wan_down", "2024-02-01T00:00:00Z"),
        ];
        let mut summary = IndexMap::new();
        for a in &feed {
            tally(&mut summary, a);
        }
        let rows: Vec<&AlertSummary> = summary.values().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].alert_type, "wan_down");
        assert_eq!(rows[0].count, 3);
        assert_eq!(rows[0].newest, feed[0].created_ts);
        assert_eq!(rows[0].oldest, feed[3].created_ts);
        assert_eq!(rows[1].alert_type, "reboot");
        assert_eq!(rows[1].count, 1);
    }
}
