// ECM resource endpoints
//
// Each submodule adds inherent methods on `EcmClient` for one resource
// family. Lookups shared by all of them live here.

mod accounts;
mod activity;
mod alerts;
mod apps;
mod authorizations;
mod clients;
mod features;
mod firmware;
mod groups;
mod logs;
mod messages;
mod remote;
mod routers;
mod settings;
mod users;
mod wifi;

pub use accounts::AccountCounts;
pub use apps::AppIdent;
pub use authorizations::{AuthorizationFilter, Beneficiary};
pub use clients::{LanClient, WifiLink};
pub use messages::parse_message_handle;
pub use remote::{DEFAULT_REMOTE_CONCURRENCY, RemoteHit, RemoteRow, RouterSelection};

use futures_util::{StreamExt, pin_mut};
use serde_json::Value;
use tracing::debug;

use crate::client::EcmClient;
use crate::error::Error;
use crate::glob::GlobFilter;
use crate::query::Query;

impl EcmClient {
    /// First record whose field matches `criteria`, trying each selector
    /// field in turn.
    pub async fn find_by(
        &self,
        selectors: &[&str],
        resource: &str,
        criteria: &str,
        query: &Query,
    ) -> Result<Option<Value>, Error> {
        for field in selectors {
            let glob = GlobFilter::new(field, criteria);
            let mut q = query.clone();
            q.extend(glob.filters().iter().cloned());
            debug!(resource, field, criteria, "lookup");
            let records = self.pager(resource, q);
            pin_mut!(records);
            while let Some(record) = records.next().await {
                let record = record?;
                if glob.test(&record) {
                    return Ok(Some(record));
                }
            }
        }
        Ok(None)
    }

    /// Like [`find_by`](Self::find_by) but a miss is an error.
    pub async fn get_by(
        &self,
        selectors: &[&str],
        resource: &str,
        criteria: &str,
        query: &Query,
    ) -> Result<Value, Error> {
        self.find_by(selectors, resource, criteria, query)
            .await?
            .ok_or_else(|| Error::not_found(resource, criteria))
    }

    /// Look a record up by id (when numeric) and then by name.
    pub async fn get_by_id_or_name(&self, resource: &str, ident: &str) -> Result<Value, Error> {
        self.get_by(id_or_name_selectors(ident), resource, ident, &Query::new())
            .await
    }

    /// Optional variant of [`get_by_id_or_name`](Self::get_by_id_or_name)
    /// with extra filters.
    pub async fn find_by_id_or_name(
        &self,
        resource: &str,
        ident: &str,
        query: &Query,
    ) -> Result<Option<Value>, Error> {
        self.find_by(id_or_name_selectors(ident), resource, ident, query)
            .await
    }

    /// Case-insensitive substring search over several fields.
    pub async fn search(
        &self,
        resource: &str,
        fields: &[&str],
        criteria: &str,
        query: Query,
    ) -> Result<Vec<Value>, Error> {
        let needle = criteria.to_lowercase();
        let records = self.pager(resource, query);
        pin_mut!(records);
        let mut hits = Vec::new();
        while let Some(record) = records.next().await {
            let record = record?;
            let matched = fields.iter().any(|field| {
                record
                    .get(*field)
                    .and_then(Value::as_str)
                    .is_some_and(|v| v.to_lowercase().contains(&needle))
            });
            if matched {
                hits.push(record);
            }
        }
        Ok(hits)
    }
}

fn id_or_name_selectors(ident: &str) -> &'static [&'static str] {
    if !ident.is_empty() && ident.chars().all(|c| c.is_ascii_digit()) {
        &["id", "name"]
    } else {
        &["name"]
    }
}

/// String id of a record (`"id"` may be a number or a string).
pub fn record_id(record: &Value) -> String {
    match record.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// String field of a record, empty when missing.
pub fn record_str<'a>(record: &'a Value, field: &str) -> &'a str {
    record.get(field).and_then(Value::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numeric_idents_try_id_first() {
        assert_eq!(id_or_name_selectors("1234"), &["id", "name"]);
        assert_eq!(id_or_name_selectors("hq-1"), &["name"]);
        assert_eq!(id_or_name_selectors(""), &["name"]);
    }

    #[test]
    fn record_helpers_read_ids() {
        assert_eq!(record_id(&json!({"id": 5})), "5");
        assert_eq!(record_id(&json!({"id": "6"})), "6");
        assert_eq!(record_str(&json!({"name": "hq"}), "name"), "hq");
        assert_eq!(record_str(&json!({}), "name"), "");
    }
}
