// Router log endpoints

use futures_util::TryStreamExt;
use serde_json::Value;

use crate::client::{EcmClient, decode};
use crate::error::Error;
use crate::models::LogEntry;
use crate::query::Query;

impl EcmClient {
    /// The log buffer of one router.
    pub async fn router_logs(&self, router_id: &str) -> Result<Vec<LogEntry>, Error> {
        let path = format!("logs/{router_id}");
        let records: Vec<Value> = self.pager(&path, Query::new()).try_collect().await?;
        records.into_iter().map(decode).collect()
    }
}
