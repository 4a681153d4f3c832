// Group endpoints

use futures_util::TryStreamExt;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::client::{EcmClient, decode};
use crate::error::Error;
use crate::models::Group;
use crate::query::Query;

impl EcmClient {
    /// All groups with their sync/online/offline statistics.
    pub async fn list_groups(&self) -> Result<Vec<Group>, Error> {
        let query = Query::new().with("expand", "statistics,product,target_firmware");
        let records: Vec<Value> = self.pager("groups", query).try_collect().await?;
        records.into_iter().map(decode).collect()
    }

    pub async fn get_group(&self, ident: &str) -> Result<Group, Error> {
        decode(self.get_by_id_or_name("groups", ident).await?)
    }

    /// Create a group for one product running one target firmware.
    pub async fn create_group(
        &self,
        name: &str,
        product_urn: &str,
        firmware_urn: &str,
        account_urn: Option<&str>,
    ) -> Result<Value, Error> {
        let mut body = json!({
            "name": name,
            "product": product_urn,
            "target_firmware": firmware_urn,
        });
        if let Some(account) = account_urn {
            body["account"] = json!(account);
        }
        debug!(name, "creating group");
        self.post("groups", &body, &Query::new()).await
    }

    pub async fn edit_group(&self, id: &str, changes: &Map<String, Value>) -> Result<(), Error> {
        debug!(id, ?changes, "editing group");
        self.put(&format!("groups/{id}"), changes, &Query::new())
            .await?;
        Ok(())
    }

    pub async fn delete_group(&self, id: &str) -> Result<(), Error> {
        debug!(id, "deleting group");
        self.delete(&format!("groups/{id}"), &Query::new()).await?;
        Ok(())
    }

    /// Product by id or name (e.g. `MBR1400`).
    pub async fn get_product(&self, ident: &str) -> Result<Value, Error> {
        self.get_by_id_or_name("products", ident).await
    }
}
