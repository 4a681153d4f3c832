// Router endpoints

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::client::{EcmClient, decode};
use crate::error::Error;
use crate::models::Router;
use crate::query::Query;

impl EcmClient {
    /// Routers whose names match any of the glob patterns (all routers when
    /// none are given).
    pub async fn list_routers(&self, patterns: &[String], query: Query) -> Result<Vec<Router>, Error> {
        use futures_util::TryStreamExt;
        let records: Vec<Value> = if patterns.is_empty() {
            self.pager("routers", query).try_collect().await?
        } else {
            self.glob_pager("routers", "name", patterns, query)
                .try_collect()
                .await?
        };
        records.into_iter().map(decode).collect()
    }

    /// One router by id or name.
    pub async fn get_router(&self, ident: &str) -> Result<Router, Error> {
        decode(self.get_by_id_or_name("routers", ident).await?)
    }

    /// Update editable router attributes (`name`, `desc`, `asset_id`,
    /// `custom1`, `custom2`).
    pub async fn edit_router(&self, id: &str, changes: &Map<String, Value>) -> Result<(), Error> {
        debug!(id, ?changes, "editing router");
        self.put(&format!("routers/{id}"), changes, &Query::new())
            .await?;
        Ok(())
    }

    /// Move a router into another account (by account URN).
    pub async fn move_router(&self, id: &str, account_urn: &str) -> Result<(), Error> {
        self.put(
            &format!("routers/{id}"),
            &json!({ "account": account_urn }),
            &Query::new(),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_router(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting router");
        self.delete(&format!("routers/{id}"), &Query::new()).await?;
        Ok(())
    }

    /// Assign a router to a group (by group URN), or unassign with `None`.
    pub async fn assign_router_group(&self, id: &str, group_urn: Option<&str>) -> Result<(), Error> {
        self.put(
            &format!("routers/{id}"),
            &json!({ "group": group_urn }),
            &Query::new(),
        )
        .await?;
        Ok(())
    }
}
