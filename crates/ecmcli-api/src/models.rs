// ECM API response types
//
// Every v1 endpoint wraps its payload in `{ success, data, meta }`.
// Remote objects are modelled only as far as the CLI reads them; the rest
// lands in `extra`. Fields use `#[serde(default)]` liberally because the
// service omits nulls inconsistently across resources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum::{Display, FromRepr};

// ── Envelope ─────────────────────────────────────────────────────────

/// Standard ECM response envelope.
///
/// ```json
/// { "success": true, "data": [...], "meta": { "limit": 20, "next": null, ... } }
/// ```
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub meta: Option<Meta>,
    #[serde(default)]
    pub exception: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_code: Option<Value>,
}

fn default_true() -> bool {
    true
}

/// Paging metadata.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Meta {
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

/// One page of a list resource.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: Meta,
}

/// ECM ids arrive as strings on most resources and as numbers on a few.
pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!("unexpected id: {other}"))),
    }
}

/// Sub-resources are either a URN string or an expanded object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Related {
    Urn(String),
    Expanded(Map<String, Value>),
}

impl Related {
    /// URN of the related resource, if not expanded.
    pub fn urn(&self) -> Option<&str> {
        match self {
            Self::Urn(urn) => Some(urn),
            Self::Expanded(obj) => obj.get("resource_uri").and_then(Value::as_str),
        }
    }

    /// A field of the expanded object.
    pub fn field(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Urn(_) => None,
            Self::Expanded(obj) => obj.get(key),
        }
    }

    /// A string field of the expanded object.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    /// Id of the related resource: the expanded `id`, else the last URN
    /// segment.
    pub fn id(&self) -> Option<String> {
        match self {
            Self::Expanded(obj) => obj.get("id").map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            Self::Urn(urn) => urn
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|id| !id.is_empty())
                .map(str::to_owned),
        }
    }
}

// ── Identity ─────────────────────────────────────────────────────────

/// Response of `GET login/`: who we are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ident {
    pub user: IdentUser,
    #[serde(default)]
    pub account: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentUser {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl Ident {
    /// The account id of the logged-in user.
    pub fn account_id(&self) -> Option<String> {
        match self.account.as_ref()? {
            Value::Object(obj) => obj.get("id").map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            Value::String(urn) => urn
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .map(str::to_owned),
            _ => None,
        }
    }
}

// ── Routers ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Router {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub state_ts: Option<DateTime<Utc>>,
    #[serde(default)]
    pub create_ts: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub config_status: Option<String>,
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub custom1: Option<String>,
    #[serde(default)]
    pub custom2: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub quarantined: Option<bool>,
    #[serde(default)]
    pub account: Option<Related>,
    #[serde(default)]
    pub group: Option<Related>,
    #[serde(default)]
    pub product: Option<Related>,
    #[serde(default)]
    pub actual_firmware: Option<Related>,
    #[serde(default)]
    pub last_known_location: Option<Related>,
    #[serde(default)]
    pub featurebindings: Option<Related>,
    #[serde(default)]
    pub resource_uri: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Router {
    pub fn is_online(&self) -> bool {
        self.state.as_deref() == Some("online")
    }

    /// Product series, when the product is expanded. Remote config only
    /// works on series 3 devices.
    pub fn product_series(&self) -> Option<i64> {
        self.product
            .as_ref()
            .and_then(|p| p.field("series"))
            .and_then(Value::as_i64)
    }
}

// ── Accounts ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Parent account URN.
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub resource_uri: String,
    #[serde(default)]
    pub routers: Option<String>,
    #[serde(default)]
    pub groups: Option<String>,
    #[serde(default)]
    pub user_profiles: Option<String>,
    #[serde(default)]
    pub subaccounts: Option<String>,
    #[serde(default)]
    pub settings_bindings: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Groups ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub statistics: Option<GroupStatistics>,
    #[serde(default)]
    pub product: Option<Related>,
    #[serde(default)]
    pub target_firmware: Option<Related>,
    #[serde(default)]
    pub settings_bindings: Option<String>,
    #[serde(default)]
    pub resource_uri: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupStatistics {
    #[serde(default)]
    pub synched_count: u64,
    #[serde(default)]
    pub online_count: u64,
    #[serde(default)]
    pub offline_count: u64,
}

// ── Users ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub resource_uri: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

// ── Firmware ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Firmware {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub built_at: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub dtd: Option<String>,
    #[serde(default)]
    pub product: Option<Related>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Logs & alerts ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default)]
    pub levelname: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub message: String,
}

impl LogEntry {
    /// Timestamp rendered for display and ordering (epoch seconds or ISO text).
    pub fn timestamp_text(&self) -> String {
        match &self.timestamp {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Numeric timestamp for ordering; ISO strings sort lexically instead.
    pub fn timestamp_key(&self) -> (f64, String) {
        (
            self.timestamp.as_f64().unwrap_or_default(),
            self.timestamp_text(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub alert_type: String,
    #[serde(default)]
    pub created_ts: Option<DateTime<Utc>>,
    #[serde(default)]
    pub router: Option<Related>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Activity log ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[repr(u8)]
#[strum(serialize_all = "snake_case")]
pub enum ActorType {
    System = 1,
    User = 2,
    ApiKey = 3,
    Router = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[repr(u8)]
pub enum ActivityType {
    #[strum(serialize = "created")]
    Created = 1,
    #[strum(serialize = "deleted")]
    Deleted = 2,
    #[strum(serialize = "updated")]
    Updated = 3,
    #[strum(serialize = "requested")]
    Requested = 4,
    #[strum(serialize = "reported")]
    Reported = 5,
    #[strum(serialize = "logged in")]
    LoggedIn = 6,
    #[strum(serialize = "logged out")]
    LoggedOut = 7,
    #[strum(serialize = "registered")]
    Registered = 8,
    #[strum(serialize = "unregistered")]
    Unregistered = 9,
    #[strum(serialize = "activated")]
    Activated = 10,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[repr(u8)]
#[strum(serialize_all = "snake_case")]
pub enum ObjectType {
    Account = 1,
    User = 2,
    Group = 3,
    Router = 4,
    Schedule = 5,
    Task = 7,
    ApiKey = 8,
    NetDevice = 9,
    Notifier = 10,
    FeatureBinding = 11,
    Authorization = 12,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    #[serde(default)]
    pub actor_type: u8,
    #[serde(default, deserialize_with = "id_string")]
    pub actor_id: String,
    #[serde(default)]
    pub object_type: u8,
    #[serde(default, deserialize_with = "id_string")]
    pub object_id: String,
    #[serde(default)]
    pub activity_type: u8,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attributes: Value,
}

impl ActivityLogEntry {
    pub fn actor(&self) -> Option<ActorType> {
        ActorType::from_repr(self.actor_type)
    }

    pub fn activity(&self) -> Option<ActivityType> {
        ActivityType::from_repr(self.activity_type)
    }

    pub fn object(&self) -> Option<ObjectType> {
        ObjectType::from_repr(self.object_type)
    }
}

// ── Messages ─────────────────────────────────────────────────────────

/// A system or user message. `kind` is `sys` or `usr`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    /// Sender URN (user messages only).
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub is_read: Option<bool>,
    #[serde(default)]
    pub confirmed: Option<bool>,
    #[serde(default)]
    pub resource_uri: Option<String>,
}

impl Message {
    /// `sys-12` / `usr-34` style handle used on the command line.
    pub fn handle(&self) -> String {
        format!("{}-{}", self.kind, self.id)
    }

    pub fn is_unread(&self) -> bool {
        !self.is_read.unwrap_or(false) && !self.confirmed.unwrap_or(false)
    }
}

// ── Remote ───────────────────────────────────────────────────────────

/// Per-router result of a `remote/...` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteResult {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub exception: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RemoteResult {
    /// Failure summary, `exception (reason)`.
    pub fn failure(&self) -> String {
        let exception = self.exception.as_deref().unwrap_or("error");
        match self.reason.as_deref().or(self.message.as_deref()) {
            Some(reason) => format!("{exception} ({reason})"),
            None => exception.to_owned(),
        }
    }
}

// ── WiFi ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessPointSurvey {
    #[serde(default)]
    pub wireless_ap: Option<Map<String, Value>>,
    #[serde(default)]
    pub survey: Option<Map<String, Value>>,
    #[serde(default)]
    pub trust: Option<Map<String, Value>>,
}

// ── Settings ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingBinding {
    #[serde(default)]
    pub setting: Option<Map<String, Value>>,
    #[serde(default)]
    pub value: Value,
}

impl SettingBinding {
    pub fn name(&self) -> &str {
        self.setting
            .as_ref()
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

// ── Features ─────────────────────────────────────────────────────────

/// An account's binding to a feature, e.g. a collaboration or add-on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureBinding {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub tos_accepted: bool,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub account: Option<Related>,
    #[serde(default)]
    pub feature: Option<Related>,
    /// URN of the bound routers collection.
    #[serde(default)]
    pub routers: Option<String>,
    #[serde(default)]
    pub resource_uri: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureBinding {
    /// Display name of the feature: its title, else its name.
    pub fn feature_name(&self) -> String {
        let feature = self.feature.as_ref();
        feature
            .and_then(|f| f.str_field("title"))
            .filter(|t| !t.is_empty())
            .or_else(|| feature.and_then(|f| f.str_field("name")))
            .unwrap_or_default()
            .to_owned()
    }
}

// ── Authorizations ───────────────────────────────────────────────────

/// Grants a user or security token a role on an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authorization {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub cascade: bool,
    #[serde(default)]
    pub user: Option<Related>,
    #[serde(default)]
    pub securitytoken: Option<Related>,
    #[serde(default)]
    pub role: Option<Related>,
    #[serde(default)]
    pub account: Option<Related>,
    #[serde(default)]
    pub resource_uri: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub resource_uri: Option<String>,
}

/// One `operation` (HTTP method) allowed on one API `subject`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub operation: String,
}

// ── Router apps ──────────────────────────────────────────────────────

/// An uploaded router SDK application version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppVersion {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub major_version: u32,
    #[serde(default)]
    pub minor_version: u32,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub state_details: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub app: Option<Related>,
    #[serde(default)]
    pub account: Option<Related>,
    #[serde(default)]
    pub groups: Option<Value>,
    /// URN of the routers running this version.
    #[serde(default)]
    pub routers: Option<String>,
    #[serde(default)]
    pub resource_uri: Option<String>,
}

impl AppVersion {
    /// `name:major.minor` identifier.
    pub fn ident(&self) -> String {
        let name = self
            .app
            .as_ref()
            .and_then(|a| a.str_field("name"))
            .unwrap_or_default();
        format!("{name}:{}.{}", self.major_version, self.minor_version)
    }
}

/// An app version installed on a group of routers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppDeploy {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub group: Option<Related>,
    #[serde(default)]
    pub app_version: Option<Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn router_accepts_numeric_id_and_expanded_product() {
        let router: Router = serde_json::from_value(json!({
            "id": 42,
            "name": "hq",
            "state": "online",
            "product": {"name": "MBR1400", "series": 3},
            "account": "/api/v1/accounts/7/"
        }))
        .expect("router");
        assert_eq!(router.id, "42");
        assert!(router.is_online());
        assert_eq!(router.product_series(), Some(3));
        assert_eq!(
            router.account.as_ref().and_then(Related::urn),
            Some("/api/v1/accounts/7/")
        );
    }

    #[test]
    fn ident_account_id_from_urn_or_object() {
        let by_urn: Ident = serde_json::from_value(json!({
            "user": {"id": "1", "username": "bob"},
            "account": "/api/v1/accounts/55/"
        }))
        .expect("ident");
        assert_eq!(by_urn.account_id().as_deref(), Some("55"));

        let by_obj: Ident = serde_json::from_value(json!({
            "user": {"id": "1", "username": "bob"},
            "account": {"id": 56, "name": "root"}
        }))
        .expect("ident");
        assert_eq!(by_obj.account_id().as_deref(), Some("56"));
    }

    #[test]
    fn activity_enums_render() {
        assert_eq!(ActivityType::LoggedIn.to_string(), "logged in");
        assert_eq!(ObjectType::FeatureBinding.to_string(), "feature_binding");
        assert_eq!(ActorType::from_repr(3), Some(ActorType::ApiKey));
        assert_eq!(ObjectType::from_repr(6), None);
    }

    #[test]
    fn related_id_from_urn_or_object() {
        assert_eq!(
            Related::Urn("/api/v1/users/12/".into()).id().as_deref(),
            Some("12")
        );
        let obj: Related = serde_json::from_value(json!({"id": 5})).expect("related");
        assert_eq!(obj.id().as_deref(), Some("5"));
    }

    #[test]
    fn feature_name_prefers_title() {
        let binding: FeatureBinding = serde_json::from_value(json!({
            "id": 3,
            "feature": {"name": "ipsec_vpn", "title": ""},
            "routers": "/api/v1/featurebindings/3/routers/"
        }))
        .expect("binding");
        assert_eq!(binding.feature_name(), "ipsec_vpn");
        assert!(!binding.enabled);
    }

    #[test]
    fn app_version_ident() {
        let app: AppVersion = serde_json::from_value(json!({
            "id": "8",
            "major_version": 1,
            "minor_version": 12,
            "state": "ready",
            "app": {"id": "2", "name": "hello"}
        }))
        .expect("app");
        assert_eq!(app.ident(), "hello:1.12");
    }

    #[test]
    fn remote_failure_summary() {
        let res: RemoteResult = serde_json::from_value(json!({
            "id": "9", "success": false, "exception": "timeout", "reason": "device offline"
        }))
        .expect("remote");
        assert_eq!(res.failure(), "timeout (device offline)");
    }
}
