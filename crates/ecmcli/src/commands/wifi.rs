//! WiFi access points and site surveys.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tabled::Tabled;

use ecmcli_api::models::AccessPointSurvey;

use crate::cli::{GlobalOpts, WifiArgs, WifiCommand};
use crate::error::CliError;
use crate::output;
use crate::session::Context;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ApRow {
    #[tabled(rename = "SSID")]
    ssid: String,
    #[tabled(rename = "Manufacturer")]
    manufacturer: String,
    #[tabled(rename = "Band")]
    band: String,
    #[tabled(rename = "Auth")]
    auth: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
    #[tabled(rename = "Seen By")]
    seen_by: String,
    #[tabled(rename = "Trusted")]
    trusted: String,
}

#[derive(Tabled)]
struct ApDetailRow {
    #[tabled(rename = "SSID")]
    ssid: String,
    #[tabled(rename = "BSSID")]
    bssid: String,
    #[tabled(rename = "Manufacturer")]
    manufacturer: String,
    #[tabled(rename = "Band")]
    band: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Auth")]
    auth: String,
    #[tabled(rename = "Channel")]
    channel: String,
    #[tabled(rename = "RSSI")]
    rssi: String,
    #[tabled(rename = "First Seen")]
    first_seen: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
    #[tabled(rename = "Seen By")]
    seen_by: String,
    #[tabled(rename = "Trusted")]
    trusted: String,
}

fn text(obj: Option<&Map<String, Value>>, key: &str) -> String {
    obj.and_then(|o| o.get(key))
        .map(output::value_text)
        .unwrap_or_default()
}

fn age(obj: Option<&Map<String, Value>>, key: &str) -> String {
    obj.and_then(|o| o.get(key))
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| output::time_since(ts.with_timezone(&Utc)))
        .unwrap_or_default()
}

fn seen_by(ap: &AccessPointSurvey) -> String {
    ap.survey
        .as_ref()
        .and_then(|s| s.get("router"))
        .and_then(|r| r.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn trusted(ap: &AccessPointSurvey) -> String {
    let trusted = ap
        .trust
        .as_ref()
        .and_then(|t| t.get("trusted"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if trusted { "✓".into() } else { String::new() }
}

impl From<&AccessPointSurvey> for ApRow {
    fn from(ap: &AccessPointSurvey) -> Self {
        let wap = ap.wireless_ap.as_ref();
        let survey = ap.survey.as_ref();
        Self {
            ssid: text(wap, "ssid"),
            manufacturer: text(wap, "manufacturer"),
            band: text(survey, "band"),
            auth: text(wap, "authmode"),
            last_seen: age(survey, "updated"),
            seen_by: seen_by(ap),
            trusted: trusted(ap),
        }
    }
}

impl From<&AccessPointSurvey> for ApDetailRow {
    fn from(ap: &AccessPointSurvey) -> Self {
        let wap = ap.wireless_ap.as_ref();
        let survey = ap.survey.as_ref();
        Self {
            ssid: text(wap, "ssid"),
            bssid: text(wap, "bssid"),
            manufacturer: text(wap, "manufacturer"),
            band: text(survey, "band"),
            mode: text(wap, "mode"),
            auth: text(wap, "authmode"),
            channel: text(survey, "channel"),
            rssi: text(survey, "rssi"),
            first_seen: age(survey, "created"),
            last_seen: age(survey, "updated"),
            seen_by: seen_by(ap),
            trusted: trusted(ap),
        }
    }
}

fn bssid(ap: &AccessPointSurvey) -> String {
    text(ap.wireless_ap.as_ref(), "bssid")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: WifiArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let command = args.command.unwrap_or(WifiCommand::Aps {
        routers: Vec::new(),
        long: false,
    });
    match command {
        WifiCommand::Aps { routers, long } => {
            let ids = if routers.is_empty() {
                Vec::new()
            } else {
                util::router_ids(&util::resolve_routers(ctx, &routers).await?)
            };
            let aps = ctx.client.access_points(&ids).await?;
            let out = if long {
                output::render_list(global.output, &aps, ApDetailRow::from, bssid)
            } else {
                output::render_list(global.output, &aps, ApRow::from, bssid)
            };
            output::print_paged(&out, global.quiet, global.no_pager);
            Ok(())
        }

        WifiCommand::Survey { routers } => {
            let routers = util::resolve_routers(ctx, &routers).await?;
            ctx.client
                .start_site_survey(&util::router_ids(&routers))
                .await?;
            if !global.quiet {
                eprintln!("✓ Site survey started on {} router(s)", routers.len());
            }
            Ok(())
        }
    }
}
