// Remote router access
//
// `remote/...` proxies to the config store, status tree and control
// endpoints on live routers. Responses are per-router results; a router
// that fails does not fail the whole call.

use futures_util::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::client::{EcmClient, decode};
use crate::error::Error;
use crate::models::{RemoteResult, Router};
use crate::query::Query;
use crate::resources::record_id;
use crate::tree::{RemotePath, expand_globs};

/// Routers queried at once during a remote fan-out.
pub const DEFAULT_REMOTE_CONCURRENCY: usize = 20;

const LEDS: &[&str] = &["LED_ATTENTION", "LED_SS_1", "LED_SS_2", "LED_SS_3", "LED_SS_4"];
const GPIO_OUTPUT: &str = "config/system/connector_gpio/output";
const WAN_BPS: &str = "status/wan/stats/bps";

/// Device selectors narrowing the routers a remote operation touches.
///
/// Selectors are ANDed unless `disjunction` is set. Only series 3 routers
/// support remote config, so others are always excluded.
#[derive(Debug, Clone, Default)]
pub struct RouterSelection {
    pub router: Option<String>,
    pub group: Option<String>,
    pub account: Option<String>,
    pub product: Option<String>,
    pub firmware: Option<String>,
    pub disjunction: bool,
    pub skip_offline: bool,
}

/// One `(dotted_path, value)` match inside a router's remote data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteHit {
    pub path: String,
    pub value: Value,
}

/// Remote result for one router, with glob matches expanded.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteRow {
    pub router: Router,
    pub result: RemoteResult,
    pub hits: Vec<RemoteHit>,
}

fn remote_resource(path: &str) -> String {
    let path = path.trim_matches(|c| c == '.' || c == '/').replace('.', "/");
    if path.is_empty() {
        "remote".to_owned()
    } else {
        format!("remote/{path}")
    }
}

fn failed_result(router_id: &str, error: &Error) -> RemoteResult {
    RemoteResult {
        id: router_id.to_owned(),
        success: false,
        data: None,
        exception: Some(error_kind(error).to_owned()),
        reason: Some(error.to_string()),
        message: None,
    }
}

fn error_kind(error: &Error) -> &'static str {
    match error {
        Error::Timeout { .. } => "timeout",
        Error::Transport(_) => "transport",
        Error::Unauthorized { .. } | Error::Authentication { .. } => "unauthorized",
        _ => "error",
    }
}

fn results_from(data: Value) -> Result<Vec<RemoteResult>, Error> {
    match data {
        Value::Array(items) => items.into_iter().map(decode).collect(),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![decode(other)?]),
    }
}

impl EcmClient {
    /// Resolve device selectors into the matching series 3 routers.
    pub async fn select_routers(&self, selection: &RouterSelection) -> Result<Vec<Router>, Error> {
        let mut filters: Vec<(String, String)> = Vec::new();
        if let Some(group) = selection.group.as_deref() {
            let hit = self
                .find_by_id_or_name("groups", group, &Query::new().with("product__series", 3))
                .await?
                .ok_or_else(|| Error::not_found("groups", group))?;
            filters.push(("group".into(), record_id(&hit)));
        }
        if let Some(router) = selection.router.as_deref() {
            let hit = self
                .find_by_id_or_name("routers", router, &Query::new().with("product__series", 3))
                .await?
                .ok_or_else(|| Error::not_found("routers", router))?;
            filters.push(("id".into(), record_id(&hit)));
        }
        if let Some(account) = selection.account.as_deref() {
            let hit = self
                .find_by_id_or_name("accounts", account, &Query::new())
                .await?
                .ok_or_else(|| Error::not_found("accounts", account))?;
            filters.push(("account".into(), record_id(&hit)));
        }
        if let Some(product) = selection.product.as_deref() {
            let hit = self
                .find_by_id_or_name("products", product, &Query::new().with("series", 3))
                .await?
                .ok_or_else(|| Error::not_found("products", product))?;
            filters.push(("product".into(), record_id(&hit)));
        }
        if let Some(firmware) = selection.firmware.as_deref() {
            filters.push(("actual_firmware.version".into(), firmware.to_owned()));
        }

        let mut query = Query::new()
            .with("product__series", 3)
            .with("expand", "product");
        if selection.disjunction && !filters.is_empty() {
            let terms: Vec<String> = filters.iter().map(|(k, v)| format!("{k}={v}")).collect();
            query.push("_or", terms.join("|"));
        } else {
            query.extend(filters);
        }
        if selection.skip_offline {
            query.push("state", "online");
        }

        let records: Vec<Value> = self.pager("routers", query).try_collect().await?;
        let routers = records
            .into_iter()
            .map(decode::<Router>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(routers
            .into_iter()
            .filter(|r| r.product_series().is_none_or(|s| s == 3))
            .collect())
    }

    /// Read a remote path from many routers concurrently.
    ///
    /// The path prefix up to the first globbed segment is fetched from the
    /// server; the remaining segments are matched against the returned data.
    pub async fn remote_get(
        &self,
        path: &str,
        routers: &[Router],
        concurrency: usize,
    ) -> Result<Vec<RemoteRow>, Error> {
        if concurrency == 0 {
            return Err(Error::Api {
                exception: "invalid_concurrency".into(),
                message: "Concurrency less than 1".into(),
                status: 400,
            });
        }
        let rpath = RemotePath::parse(path);
        let resource = remote_resource(&rpath.server_path());
        debug!(%resource, routers = routers.len(), concurrency, "remote fan-out");

        let rpath = &rpath;
        let resource = resource.as_str();
        let mut rows: Vec<(usize, RemoteRow)> = stream::iter(routers.iter().cloned().enumerate())
            .map(|(index, router)| async move {
                let result = self.remote_single(resource, &router.id).await;
                let hits = match (&result.data, result.success) {
                    (Some(data), true) => expand_globs(data, rpath)
                        .into_iter()
                        .map(|(path, value)| RemoteHit { path, value })
                        .collect(),
                    _ => Vec::new(),
                };
                (
                    index,
                    RemoteRow {
                        router,
                        result,
                        hits,
                    },
                )
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;
        rows.sort_by_key(|(index, _)| *index);
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    /// One router's remote data. Failures become a failed result.
    async fn remote_single(&self, resource: &str, router_id: &str) -> RemoteResult {
        let query = Query::new().with("id", router_id);
        let outcome = self
            .get_value(resource, &query)
            .await
            .and_then(results_from);
        match outcome {
            Ok(results) => results.into_iter().next().unwrap_or_else(|| RemoteResult {
                id: router_id.to_owned(),
                success: false,
                data: None,
                exception: Some("empty".into()),
                reason: Some("Empty API response".into()),
                message: None,
            }),
            Err(e) => {
                warn!(router_id, "remote request failed: {e}");
                failed_result(router_id, &e)
            }
        }
    }

    /// `GET remote/{path}/?id__in=...` in one call.
    pub async fn remote_fetch(&self, path: &str, router_ids: &[String]) -> Result<Vec<RemoteResult>, Error> {
        let query = Query::new().with("id__in", router_ids.join(","));
        results_from(self.get_value(&remote_resource(path), &query).await?)
    }

    /// `PUT remote/{path}/?id__in=...` with a JSON value.
    pub async fn remote_put(
        &self,
        path: &str,
        value: &Value,
        router_ids: &[String],
    ) -> Result<Vec<RemoteResult>, Error> {
        let query = Query::new().with("id__in", router_ids.join(","));
        results_from(self.put(&remote_resource(path), value, &query).await?)
    }

    /// Fire-and-forget control call (`timeout=0`), e.g. reboot or LEDs.
    pub async fn remote_control(&self, path: &str, value: &Value, router_ids: &[String]) -> Result<(), Error> {
        let query = Query::new()
            .with("id__in", router_ids.join(","))
            .with("timeout", 0);
        self.put(&remote_resource(path), value, &query).await?;
        Ok(())
    }

    /// Reboot routers.
    pub async fn reboot(&self, router_ids: &[String]) -> Result<(), Error> {
        debug!(count = router_ids.len(), "rebooting");
        self.remote_control("control/system/reboot", &json!(true), router_ids)
            .await
    }

    /// Switch the attention and signal strength LEDs on or off.
    pub async fn set_leds(&self, router_ids: &[String], on: bool) -> Result<(), Error> {
        let leds: serde_json::Map<String, Value> =
            LEDS.iter().map(|k| ((*k).to_owned(), json!(on))).collect();
        self.remote_control("control/gpio", &Value::Object(leds), router_ids)
            .await
    }

    /// Current value of the connector GPIO output pin.
    pub async fn gpio_output(&self, router_id: &str) -> Result<RemoteResult, Error> {
        self.remote_fetch(GPIO_OUTPUT, &[router_id.to_owned()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Remote {
                exception: "empty".into(),
                reason: "Empty API response".into(),
            })
    }

    pub async fn set_gpio_output(&self, router_id: &str, value: i64) -> Result<RemoteResult, Error> {
        self.remote_put(GPIO_OUTPUT, &json!(value), &[router_id.to_owned()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Remote {
                exception: "empty".into(),
                reason: "Empty API response".into(),
            })
    }

    /// WAN throughput (bytes per second) as reported by each router.
    pub async fn wan_bps(&self, router_ids: &[String]) -> Result<Vec<RemoteResult>, Error> {
        self.remote_fetch(WAN_BPS, router_ids).await
    }

    /// Run a router CLI command through a csterm session.
    pub async fn cli_command(
        &self,
        session_id: &str,
        router_ids: &[String],
        command: &str,
    ) -> Result<Vec<RemoteResult>, Error> {
        let path = format!("control/csterm/ecmcli-{session_id}/k");
        self.remote_put(&path, &json!(format!("{command}\n")), router_ids)
            .await
    }

    /// Send keystrokes to a csterm session; resizes when `size` is given.
    ///
    /// Returns the terminal output produced since the last call.
    pub async fn csterm(
        &self,
        session_id: &str,
        router_id: &str,
        keys: &str,
        size: Option<(u16, u16)>,
    ) -> Result<String, Error> {
        let ids = [router_id.to_owned()];
        let base = format!("control/csterm/ecmcli-{session_id}");
        let results = match size {
            Some((w, h)) => {
                self.remote_put(&base, &json!({ "w": w, "h": h, "k": keys }), &ids)
                    .await?
            }
            None => self.remote_put(&format!("{base}/k"), &json!(keys), &ids).await?,
        };
        let result = results
            .into_iter()
            .next()
            .ok_or_else(|| Error::Remote {
                exception: "empty".into(),
                reason: "Empty API response".into(),
            })?;
        if !result.success {
            return Err(Error::Remote {
                exception: result.exception.clone().unwrap_or_default(),
                reason: result.reason.clone().or(result.message.clone()).unwrap_or_default(),
            });
        }
        let output = match (size, result.data) {
            (Some(_), Some(data)) => data.get("k").and_then(Value::as_str).map(str::to_owned),
            (None, Some(Value::String(s))) => Some(s),
            _ => None,
        };
        Ok(output.unwrap_or_default())
    }
}
