use crate::db::{get_json, get_n, get_opt_n, get_s, n, now_ts, s, Db, DbError, Item};

/// Stored payment, keyed by the gateway's payment id and versioned the same
/// way form drafts are.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub pid: String,
    pub version: i64,
    pub fields: serde_json::Value,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PaymentRecord {
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = self.fields.clone();
        if let Some(obj) = value.as_object_mut() {
            obj.insert("pid".into(), serde_json::json!(self.pid));
            obj.insert("version".into(), serde_json::json!(self.version));
            obj.insert("createdAt".into(), serde_json::json!(self.created_at));
            obj.insert("updatedAt".into(), serde_json::json!(self.updated_at));
        }
        value
    }
}

pub fn payment_to_item(record: &PaymentRecord) -> Result<Item, DbError> {
    let payload = serde_json::to_string(&record.fields)
        .map_err(|e| DbError::Malformed(format!("payment fields not serializable: {e}")))?;
    let mut item = Item::new();
    item.insert("pid".into(), s(&record.pid));
    item.insert("version".into(), n(record.version));
    item.insert("payload".into(), s(payload));
    item.insert("createdAt".into(), n(record.created_at));
    item.insert("updatedAt".into(), n(record.updated_at));
    Ok(item)
}

pub fn item_to_payment(item: &Item) -> Result<PaymentRecord, DbError> {
    Ok(PaymentRecord {
        pid: get_s(item, "pid")?,
        version: get_n(item, "version")?,
        fields: get_json(item, "payload")?,
        created_at: get_opt_n(item, "createdAt").unwrap_or_default(),
        updated_at: get_opt_n(item, "updatedAt").unwrap_or_default(),
    })
}

pub async fn get(db: &Db, pid: &str, consistent: bool) -> Result<Option<PaymentRecord>, DbError> {
    let result = db
        .client
        .get_item()
        .table_name(&db.tables.payments)
        .key("pid", s(pid))
        .consistent_read(consistent)
        .send()
        .await
        .map_err(|e| DbError::Other(anyhow::Error::new(e.into_service_error())))?;
    match result.item {
        Some(item) => Ok(Some(item_to_payment(&item)?)),
        None => Ok(None),
    }
}

pub async fn put_new(db: &Db, pid: String, fields: serde_json::Value) -> Result<PaymentRecord, DbError> {
    let now = now_ts();
    let record = PaymentRecord {
        pid,
        version: 1,
        fields,
        created_at: now,
        updated_at: now,
    };
    let table = db.tables.payments.clone();
    db.put_versioned(&table, "pid", payment_to_item(&record)?, None)
        .await?;
    Ok(record)
}

pub async fn put_update(db: &Db, record: &PaymentRecord) -> Result<(), DbError> {
    let table = db.tables.payments.clone();
    db.put_versioned(
        &table,
        "pid",
        payment_to_item(record)?,
        Some(record.version - 1),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_roundtrip() {
        let record = PaymentRecord {
            pid: "pay_abc123".into(),
            version: 2,
            fields: json!({"orderId": "order_xyz", "amount": 170000}),
            created_at: 100,
            updated_at: 200,
        };
        let back = item_to_payment(&payment_to_item(&record).unwrap()).unwrap();
        assert_eq!(back.pid, "pay_abc123");
        assert_eq!(back.version, 2);
        assert_eq!(back.fields["amount"], 170000);
    }
}
