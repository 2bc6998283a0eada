use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use uuid::Uuid;

use crate::db::{get_json, get_n, get_opt_n, get_s, n, now_ts, s, Db, DbError, Item};

#[derive(Debug, Clone)]
pub struct FormRecord {
    pub id: Uuid,
    pub version: i64,
    pub fields: serde_json::Value,
    pub created_at: i64,
    pub updated_at: i64,
}

impl FormRecord {
    /// Record as returned to clients: the form fields plus the envelope of
    /// id/version/timestamps the save protocol works with.
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = self.fields.clone();
        if let Some(obj) = value.as_object_mut() {
            obj.insert("id".into(), serde_json::json!(self.id));
            obj.insert("version".into(), serde_json::json!(self.version));
            obj.insert("createdAt".into(), serde_json::json!(self.created_at));
            obj.insert("updatedAt".into(), serde_json::json!(self.updated_at));
        }
        value
    }
}

/// Stringified copy of a field that may arrive as a string or a number.
fn field_copy(fields: &serde_json::Value, key: &str) -> String {
    match fields.get(key) {
        Some(serde_json::Value::String(v)) => v.clone(),
        Some(serde_json::Value::Number(v)) => v.to_string(),
        _ => String::new(),
    }
}

pub fn form_to_item(record: &FormRecord) -> Result<Item, DbError> {
    let payload = serde_json::to_string(&record.fields)
        .map_err(|e| DbError::Malformed(format!("form fields not serializable: {e}")))?;
    let mut item = Item::new();
    item.insert("id".into(), s(record.id.to_string()));
    item.insert("version".into(), n(record.version));
    // Copies used by the export scan filters.
    item.insert("testLevel".into(), s(field_copy(&record.fields, "testLevel")));
    item.insert("country".into(), s(field_copy(&record.fields, "country")));
    item.insert("payload".into(), s(payload));
    item.insert("createdAt".into(), n(record.created_at));
    item.insert("updatedAt".into(), n(record.updated_at));
    Ok(item)
}

pub fn item_to_form(item: &Item) -> Result<FormRecord, DbError> {
    let id = get_s(item, "id")?
        .parse::<Uuid>()
        .map_err(|e| DbError::Malformed(format!("form id is not a uuid: {e}")))?;
    Ok(FormRecord {
        id,
        version: get_n(item, "version")?,
        fields: get_json(item, "payload")?,
        created_at: get_opt_n(item, "createdAt").unwrap_or_default(),
        updated_at: get_opt_n(item, "updatedAt").unwrap_or_default(),
    })
}

pub async fn get(db: &Db, id: Uuid, consistent: bool) -> Result<Option<FormRecord>, DbError> {
    let result = db
        .client
        .get_item()
        .table_name(&db.tables.forms)
        .key("id", s(id.to_string()))
        .consistent_read(consistent)
        .send()
        .await
        .map_err(|e| DbError::Other(anyhow::Error::new(e.into_service_error())))?;
    match result.item {
        Some(item) => Ok(Some(item_to_form(&item)?)),
        None => Ok(None),
    }
}

/// First write of a record: version 1, fails if the id already exists.
pub async fn put_new(db: &Db, fields: serde_json::Value) -> Result<FormRecord, DbError> {
    let now = now_ts();
    let record = FormRecord {
        id: Uuid::new_v4(),
        version: 1,
        fields,
        created_at: now,
        updated_at: now,
    };
    let table = db.tables.forms.clone();
    db.put_versioned(&table, "id", form_to_item(&record)?, None)
        .await?;
    Ok(record)
}

/// Rewrite of an existing record; the caller has already bumped `version`
/// and the store checks it still equals `version - 1`.
pub async fn put_update(db: &Db, record: &FormRecord) -> Result<(), DbError> {
    let table = db.tables.forms.clone();
    db.put_versioned(
        &table,
        "id",
        form_to_item(record)?,
        Some(record.version - 1),
    )
    .await
}

pub async fn scan(
    db: &Db,
    test_level: Option<&str>,
    country: Option<&str>,
) -> Result<Vec<FormRecord>, DbError> {
    let mut filters: Vec<&str> = Vec::new();
    let mut values: HashMap<String, AttributeValue> = HashMap::new();
    if let Some(level) = test_level {
        filters.push("testLevel = :testLevel");
        values.insert(":testLevel".into(), s(level));
    }
    if let Some(country) = country {
        filters.push("country = :country");
        values.insert(":country".into(), s(country));
    }

    let mut records = Vec::new();
    let mut start_key: Option<Item> = None;
    loop {
        let mut req = db
            .client
            .scan()
            .table_name(&db.tables.forms)
            .set_exclusive_start_key(start_key.take());
        if !filters.is_empty() {
            req = req
                .filter_expression(filters.join(" AND "))
                .set_expression_attribute_values(Some(values.clone()));
        }
        let result = req
            .send()
            .await
            .map_err(|e| DbError::Other(anyhow::Error::new(e.into_service_error())))?;
        for item in result.items.unwrap_or_default() {
            records.push(item_to_form(&item)?);
        }
        start_key = result.last_evaluated_key;
        if start_key.is_none() {
            break;
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_roundtrip_preserves_fields_and_version() {
        let record = FormRecord {
            id: Uuid::new_v4(),
            version: 4,
            fields: json!({"testLevel": "2", "country": "India", "firstName": "Hana"}),
            created_at: 1_800_000_000,
            updated_at: 1_800_000_100,
        };
        let back = item_to_form(&form_to_item(&record).unwrap()).unwrap();
        assert_eq!(back.id, record.id);
        assert_eq!(back.version, 4);
        assert_eq!(back.fields["firstName"], "Hana");
        assert_eq!(back.updated_at, 1_800_000_100);
    }

    #[test]
    fn numeric_test_level_still_gets_a_filter_copy() {
        let record = FormRecord {
            id: Uuid::new_v4(),
            version: 1,
            fields: json!({"testLevel": 3}),
            created_at: 0,
            updated_at: 0,
        };
        let item = form_to_item(&record).unwrap();
        assert_eq!(item["testLevel"].as_s().unwrap(), "3");
    }

    #[test]
    fn record_json_carries_the_save_envelope() {
        let record = FormRecord {
            id: Uuid::new_v4(),
            version: 2,
            fields: json!({"testLevel": "1"}),
            created_at: 10,
            updated_at: 20,
        };
        let value = record.to_json();
        assert_eq!(value["version"], 2);
        assert_eq!(value["createdAt"], 10);
        assert_eq!(value["testLevel"], "1");
    }
}
