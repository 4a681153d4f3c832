//! LAN clients of online routers.

use owo_colors::OwoColorize;
use tabled::Tabled;

use ecmcli_api::RouterSelection;
use ecmcli_api::resources::{LanClient, WifiLink};

use crate::cli::{ClientsArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;
use crate::session::Context;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "Router")]
    router: String,
    #[tabled(rename = "IP Addresses")]
    ips: String,
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "MAC")]
    mac: String,
}

#[derive(Tabled)]
struct ClientDetailRow {
    #[tabled(rename = "Router")]
    router: String,
    #[tabled(rename = "IP Addresses")]
    ips: String,
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "WiFi Status")]
    wifi_status: String,
    #[tabled(rename = "WiFi AP")]
    wifi_ap: String,
}

impl From<&LanClient> for ClientRow {
    fn from(c: &LanClient) -> Self {
        Self {
            router: c.router.clone(),
            ips: c.ip_addresses.join(", "),
            hostname: c.hostname.clone().unwrap_or_default(),
            mac: c.mac.clone(),
        }
    }
}

impl ClientDetailRow {
    fn new(c: &LanClient, color: bool) -> Self {
        let row = ClientRow::from(c);
        Self {
            router: row.router,
            ips: row.ips,
            hostname: row.hostname,
            mac: row.mac,
            wifi_status: c
                .wifi
                .as_ref()
                .map(|w| wifi_status(w, color))
                .unwrap_or_default(),
            wifi_ap: c.wifi.as_ref().map(wifi_ap).unwrap_or_default(),
        }
    }
}

/// Signal strength, colored from strong (bold green) to weak (bold red).
fn rssi_text(rssi: f64, color: bool) -> String {
    let text = format!("{rssi:.0} dBm");
    if !color {
        return text;
    }
    if rssi > -40.0 {
        text.green().bold().to_string()
    } else if rssi > -55.0 {
        text.green().to_string()
    } else if rssi > -65.0 {
        text.yellow().to_string()
    } else if rssi > -80.0 {
        text.red().to_string()
    } else {
        text.red().bold().to_string()
    }
}

/// `RSSI, rate, mode`, e.g. `-52 dBm, 300 Mbps, 802.11ac`.
fn wifi_status(link: &WifiLink, color: bool) -> String {
    let mut parts = Vec::new();
    if let Some(rssi) = link.rssi {
        parts.push(rssi_text(rssi, color));
    }
    if let Some(rate) = link.txrate {
        parts.push(format!("{rate} Mbps"));
    }
    if let Some(mode) = link.mode_name() {
        parts.push(mode.to_owned());
    }
    parts.join(", ")
}

/// `ssid (band Ghz)`.
fn wifi_ap(link: &WifiLink) -> String {
    let ssid = link.ssid.clone().unwrap_or_default();
    match link.band_name() {
        Some(band) => format!("{ssid} ({band} Ghz)"),
        None => ssid,
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: ClientsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let routers = if args.routers.is_empty() {
        let selection = RouterSelection {
            skip_offline: true,
            ..RouterSelection::default()
        };
        ctx.client.select_routers(&selection).await?
    } else {
        util::resolve_routers(ctx, &args.routers)
            .await?
            .into_iter()
            .filter(|r| r.is_online() && r.product_series().is_none_or(|s| s == 3))
            .collect()
    };
    if routers.is_empty() {
        return Err(CliError::Usage("No online routers found".into()));
    }
    let concurrency = args.concurrency.unwrap_or(ctx.settings.concurrency);
    let clients = ctx
        .client
        .lan_clients(&routers, args.long, concurrency)
        .await?;
    let out = if args.long {
        output::render_list(
            global.output,
            &clients,
            |c| ClientDetailRow::new(c, ctx.color),
            |c| c.mac.clone(),
        )
    } else {
        output::render_list(global.output, &clients, ClientRow::from, |c| c.mac.clone())
    };
    output::print_paged(&out, global.quiet, global.no_pager);
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn link() -> WifiLink {
        WifiLink {
            rssi: Some(-52.4),
            txrate: Some(300),
            mode: Some(4),
            ssid: Some("corp".into()),
            band: Some(1),
        }
    }

    #[test]
    fn wifi_columns_read_link() {
        assert_eq!(wifi_status(&link(), false), "-52 dBm, 300 Mbps, 802.11ac");
        assert_eq!(wifi_ap(&link()), "corp (5 Ghz)");
    }

    #[test]
    fn wired_clients_leave_wifi_columns_empty() {
        let client = LanClient {
            router: "hq".into(),
            mac: "aa:bb".into(),
            ip_addresses: vec!["10.0.0.2".into(), "fe80::2".into()],
            ..LanClient::default()
        };
        let row = ClientDetailRow::new(&client, false);
        assert_eq!(row.ips, "10.0.0.2, fe80::2");
        assert_eq!(row.wifi_status, "");
        assert_eq!(row.wifi_ap, "");
    }

    #[test]
    fn weak_signal_is_still_rendered() {
        assert_eq!(rssi_text(-85.0, false), "-85 dBm");
    }
}
