// Account and group settings bindings

use futures_util::TryStreamExt;
use serde_json::Value;

use crate::client::{EcmClient, decode};
use crate::error::Error;
use crate::models::SettingBinding;
use crate::query::Query;

impl EcmClient {
    /// Settings bound at a `settings_bindings` URN, with the setting expanded.
    pub async fn settings_bindings(&self, urn: &str) -> Result<Vec<SettingBinding>, Error> {
        let query = Query::new().with("expand", "setting");
        let records: Vec<Value> = self.pager(urn, query).try_collect().await?;
        records.into_iter().map(decode).collect()
    }
}
