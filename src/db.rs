use std::collections::HashMap;

use aws_config::{defaults, BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::{
    error::SdkError,
    operation::{put_item::PutItemError, update_item::UpdateItemError},
    types::AttributeValue,
    Client,
};

use crate::config::{AppConfig, TableConfig};

pub type Item = HashMap<String, AttributeValue>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("conditional check failed")]
    Conflict,
    #[error("malformed item: {0}")]
    Malformed(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// DynamoDB handle shared by the per-entity repos.
#[derive(Clone)]
pub struct Db {
    pub client: Client,
    pub tables: TableConfig,
}

impl Db {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let mut loader = defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws.region.clone()));
        if let (Some(key), Some(secret)) = (
            config.aws.access_key_id.clone(),
            config.aws.secret_access_key.clone(),
        ) {
            loader = loader.credentials_provider(Credentials::new(key, secret, None, None, "static"));
        }
        let shared = loader.load().await;
        Ok(Self {
            client: Client::new(&shared),
            tables: config.tables.clone(),
        })
    }

    /// Handle with static credentials and a local endpoint; never sends
    /// anything unless a test actually calls `.send()`.
    pub fn fake() -> Self {
        let conf = aws_sdk_dynamodb::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "static"))
            .endpoint_url("http://localhost:8000")
            .build();
        Self {
            client: Client::from_conf(conf),
            tables: TableConfig {
                users: "Users".into(),
                forms: "JLPTForms".into(),
                payments: "Payments".into(),
                documents: "Documents".into(),
                global: "GlobalData".into(),
            },
        }
    }

    /// Create-or-update with the store's conditional-write check.
    ///
    /// `expected_version = None` requires the key to not exist yet;
    /// `Some(v)` requires the stored `version` to still equal `v`. A failed
    /// check surfaces as `DbError::Conflict` (409 at the handler).
    pub async fn put_versioned(
        &self,
        table: &str,
        key_attr: &str,
        item: Item,
        expected_version: Option<i64>,
    ) -> Result<(), DbError> {
        let mut req = self
            .client
            .put_item()
            .table_name(table)
            .set_item(Some(item));
        req = match expected_version {
            None => req.condition_expression(format!("attribute_not_exists({key_attr})")),
            Some(v) => req
                .condition_expression("version = :expected")
                .expression_attribute_values(":expected", n(v)),
        };
        req.send().await.map_err(put_err)?;
        Ok(())
    }
}

pub fn put_err(e: SdkError<PutItemError>) -> DbError {
    match e.into_service_error() {
        PutItemError::ConditionalCheckFailedException(_) => DbError::Conflict,
        other => DbError::Other(anyhow::Error::new(other)),
    }
}

/// Conditional failure on an `attribute_exists` update means the record is
/// gone, not that it conflicted.
pub fn update_err(entity: &'static str, e: SdkError<UpdateItemError>) -> DbError {
    match e.into_service_error() {
        UpdateItemError::ConditionalCheckFailedException(_) => DbError::NotFound(entity),
        other => DbError::Other(anyhow::Error::new(other)),
    }
}

// ---- attribute construction ----

pub fn s(v: impl Into<String>) -> AttributeValue {
    AttributeValue::S(v.into())
}

pub fn n(v: i64) -> AttributeValue {
    AttributeValue::N(v.to_string())
}

pub fn bool_attr(v: bool) -> AttributeValue {
    AttributeValue::Bool(v)
}

// ---- attribute extraction ----

pub fn get_s(item: &Item, key: &str) -> Result<String, DbError> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| DbError::Malformed(format!("missing string attribute `{key}`")))
}

pub fn get_opt_s(item: &Item, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_s().ok()).cloned()
}

pub fn get_n(item: &Item, key: &str) -> Result<i64, DbError> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or_else(|| DbError::Malformed(format!("missing number attribute `{key}`")))
}

pub fn get_opt_n(item: &Item, key: &str) -> Option<i64> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|v| v.parse::<i64>().ok())
}

pub fn get_bool(item: &Item, key: &str) -> Result<bool, DbError> {
    item.get(key)
        .and_then(|v| v.as_bool().ok())
        .copied()
        .ok_or_else(|| DbError::Malformed(format!("missing bool attribute `{key}`")))
}

/// Parse a JSON document stored as a string attribute.
pub fn get_json(item: &Item, key: &str) -> Result<serde_json::Value, DbError> {
    let raw = get_s(item, key)?;
    serde_json::from_str(&raw)
        .map_err(|e| DbError::Malformed(format!("attribute `{key}` is not valid JSON: {e}")))
}

pub fn now_ts() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Item {
        let mut item = Item::new();
        item.insert("name".into(), s("Hana"));
        item.insert("version".into(), n(3));
        item.insert("verified".into(), bool_attr(true));
        item.insert("payload".into(), s(r#"{"testLevel":"2"}"#));
        item
    }

    #[test]
    fn getters_read_back_what_was_written() {
        let item = sample();
        assert_eq!(get_s(&item, "name").unwrap(), "Hana");
        assert_eq!(get_n(&item, "version").unwrap(), 3);
        assert!(get_bool(&item, "verified").unwrap());
        assert_eq!(get_json(&item, "payload").unwrap()["testLevel"], "2");
    }

    #[test]
    fn missing_attribute_is_malformed() {
        let item = sample();
        let err = get_s(&item, "email").unwrap_err();
        assert!(err.to_string().contains("email"));
    }

    #[test]
    fn optional_getters_return_none() {
        let item = sample();
        assert_eq!(get_opt_s(&item, "email"), None);
        assert_eq!(get_opt_n(&item, "otpExpires"), None);
        assert_eq!(get_opt_n(&item, "version"), Some(3));
    }

    #[test]
    fn non_numeric_attribute_is_rejected() {
        let item = sample();
        assert!(get_n(&item, "name").is_err());
    }
}
