// Firmware endpoints

use futures_util::TryStreamExt;
use serde_json::Value;

use crate::client::{EcmClient, decode};
use crate::error::Error;
use crate::models::Firmware;
use crate::query::Query;

impl EcmClient {
    /// Firmware versions known to ECM.
    pub async fn list_firmwares(&self) -> Result<Vec<Firmware>, Error> {
        let query = Query::new().with("expand", "product");
        let records: Vec<Value> = self.pager("firmwares", query).try_collect().await?;
        records.into_iter().map(decode).collect()
    }

    /// The firmware record for one product/version pair.
    pub async fn find_firmware(&self, product: &str, version: &str) -> Result<Firmware, Error> {
        let query = Query::new()
            .with("product.name", product)
            .with("version", version);
        let data = self.get_value("firmwares", &query).await?;
        let first = match data {
            Value::Array(items) => items.into_iter().next(),
            Value::Null => None,
            other => Some(other),
        };
        let Some(first) = first else {
            return Err(Error::not_found("firmwares", &format!("{product} v{version}")));
        };
        decode(first)
    }

    /// Config store definition (dtd) of a firmware.
    pub async fn firmware_dtd(&self, firmware: &Firmware) -> Result<Value, Error> {
        let Some(urn) = firmware.dtd.as_deref() else {
            return Err(Error::not_found("dtds", &firmware.version));
        };
        self.fetch_cached(urn).await
    }
}
