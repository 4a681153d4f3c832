// LAN client harvest
//
// Merges several status trees read from online routers into one record per
// client MAC address.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::client::EcmClient;
use crate::error::Error;
use crate::models::Router;
use crate::resources::remote::RemoteRow;

const LAN_CLIENTS: &str = "status.lan.clients";
const DHCP_LEASES: &str = "status.dhcpd.leases";
const WLAN_RADIOS: &str = "config.wlan.radio";
const WLAN_CLIENTS: &str = "status.wlan.clients";

/// A device seen on a router's LAN.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LanClient {
    pub router: String,
    pub mac: String,
    /// Addresses, shortest (IPv4) first.
    pub ip_addresses: Vec<String>,
    pub hostname: Option<String>,
    pub wifi: Option<WifiLink>,
}

/// Radio link details for a wireless client.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WifiLink {
    /// Average over the per-antenna `rssiN` readings.
    pub rssi: Option<f64>,
    pub txrate: Option<i64>,
    pub mode: Option<i64>,
    pub ssid: Option<String>,
    pub band: Option<i64>,
}

impl WifiLink {
    pub fn mode_name(&self) -> Option<&'static str> {
        Some(match self.mode? {
            0 => "802.11b",
            1 => "802.11g",
            2 => "802.11n",
            3 => "802.11n-only",
            4 => "802.11ac",
            _ => return None,
        })
    }

    pub fn band_name(&self) -> Option<&'static str> {
        Some(match self.band? {
            0 => "2.4",
            1 => "5",
            _ => return None,
        })
    }
}

impl EcmClient {
    /// Clients of the given routers. With `wifi`, wireless link details
    /// are read as well. Routers that fail to answer are skipped.
    pub async fn lan_clients(
        &self,
        routers: &[Router],
        wifi: bool,
        concurrency: usize,
    ) -> Result<Vec<LanClient>, Error> {
        let lan = self.remote_get(LAN_CLIENTS, routers, concurrency).await?;
        let leases = self.remote_get(DHCP_LEASES, routers, concurrency).await?;
        let (radios, wlan) = if wifi {
            (
                self.remote_get(WLAN_RADIOS, routers, concurrency).await?,
                self.remote_get(WLAN_CLIENTS, routers, concurrency).await?,
            )
        } else {
            (Vec::new(), Vec::new())
        };

        let mut clients = Vec::new();
        for row in &lan {
            let Some(entries) = payload(row) else {
                continue;
            };
            let id = row.router.id.as_str();
            let mut merged = merge_by_mac(&row.router.name, entries);
            apply_hostnames(&mut merged, rows_for(&leases, id));
            if let (Some(radio), Some(wireless)) = (rows_for(&radios, id), rows_for(&wlan, id)) {
                apply_wifi(&mut merged, radio, wireless);
            }
            clients.extend(merged);
        }
        Ok(clients)
    }
}

fn payload(row: &RemoteRow) -> Option<&[Value]> {
    if !row.result.success {
        return None;
    }
    row.result
        .data
        .as_ref()
        .and_then(Value::as_array)
        .map(Vec::as_slice)
}

fn rows_for<'a>(rows: &'a [RemoteRow], router_id: &str) -> Option<&'a [Value]> {
    rows.iter()
        .find(|r| r.router.id == router_id)
        .and_then(payload)
}

/// One client per MAC, collecting every address it holds.
fn merge_by_mac(router: &str, entries: &[Value]) -> Vec<LanClient> {
    let mut order: Vec<String> = Vec::new();
    let mut by_mac: HashMap<String, LanClient> = HashMap::new();
    for entry in entries {
        let Some(mac) = entry.get("mac").and_then(Value::as_str) else {
            continue;
        };
        let ip = entry.get("ip_address").and_then(Value::as_str);
        let client = by_mac.entry(mac.to_owned()).or_insert_with(|| {
            order.push(mac.to_owned());
            LanClient {
                router: router.to_owned(),
                mac: mac.to_owned(),
                ..LanClient::default()
            }
        });
        if let Some(ip) = ip {
            client.ip_addresses.push(ip.to_owned());
        }
    }
    order
        .into_iter()
        .filter_map(|mac| by_mac.remove(&mac))
        .map(|mut client| {
            client.ip_addresses.sort_by_key(String::len);
            client
        })
        .collect()
}

fn apply_hostnames(clients: &mut [LanClient], leases: Option<&[Value]>) {
    for lease in leases.unwrap_or_default() {
        let mac = lease.get("mac").and_then(Value::as_str);
        let hostname = lease.get("hostname").and_then(Value::as_str);
        if let (Some(mac), Some(hostname)) = (mac, hostname) {
            if let Some(client) = clients.iter_mut().find(|c| c.mac == mac) {
                client.hostname = Some(hostname.to_owned());
            }
        }
    }
}

fn apply_wifi(clients: &mut [LanClient], radios: &[Value], wireless: &[Value]) {
    for entry in wireless {
        let Some(mac) = entry.get("mac").and_then(Value::as_str) else {
            continue;
        };
        let Some(client) = clients.iter_mut().find(|c| c.mac == mac) else {
            continue;
        };
        let radio = entry
            .get("radio")
            .and_then(Value::as_u64)
            .and_then(|i| radios.get(usize::try_from(i).ok()?));
        let ssid = radio
            .and_then(|r| r.get("bss"))
            .and_then(Value::as_array)
            .zip(entry.get("bss").and_then(Value::as_u64))
            .and_then(|(bss, i)| bss.get(usize::try_from(i).ok()?))
            .and_then(|b| b.get("ssid"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        client.wifi = Some(WifiLink {
            rssi: average_rssi(entry),
            txrate: entry.get("txrate").and_then(Value::as_i64),
            mode: entry.get("mode").and_then(Value::as_i64),
            ssid,
            band: radio.and_then(|r| r.get("wifi_band")).and_then(Value::as_i64),
        });
    }
}

/// Mean of `rssi0`, `rssi1`, ... up to the first missing antenna.
fn average_rssi(entry: &Value) -> Option<f64> {
    let readings: Vec<f64> = (0..)
        .map_while(|i| entry.get(format!("rssi{i}")).and_then(Value::as_f64))
        .collect();
    #[allow(clippy::cast_precision_loss)]
    let count = readings.len() as f64;
    (!readings.is_empty()).then(|| readings.iter().sum::<f64>() / count)
}
