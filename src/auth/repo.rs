use std::collections::HashMap;

use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use uuid::Uuid;

use crate::db::{
    bool_attr, get_bool, get_opt_n, get_opt_s, get_s, n, now_ts, s, update_err, Db, DbError, Item,
};

pub const EMAIL_INDEX: &str = "EmailIndex";

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub password_hash: String,
    pub email_verified: bool,
    pub otp: Option<String>,
    pub otp_expires: Option<i64>,
    pub reset_token: Option<String>,
    pub reset_token_expires: Option<i64>,
    pub role: String,
    pub created_at: i64,
    pub updated_at: i64,
}

pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub password_hash: String,
    pub otp: String,
    pub otp_expires: i64,
    pub role: String,
}

/// Allow-listed profile mutation. Update expressions are built from this
/// struct only, never from raw request keys. `Some(None)` on a clearable
/// field issues a REMOVE.
#[derive(Debug, Default)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub password_hash: Option<String>,
    pub email_verified: Option<bool>,
    pub otp: Option<Option<String>>,
    pub otp_expires: Option<Option<i64>>,
    pub reset_token: Option<Option<String>>,
    pub reset_token_expires: Option<Option<i64>>,
}

impl UserUpdate {
    pub fn expression(&self, now: i64) -> (String, HashMap<String, AttributeValue>) {
        let mut sets: Vec<(&str, AttributeValue)> = vec![("updatedAt", n(now))];
        let mut removes: Vec<&str> = Vec::new();

        if let Some(v) = &self.full_name {
            sets.push(("fullName", s(v.clone())));
        }
        if let Some(v) = &self.phone_number {
            sets.push(("phoneNumber", s(v.clone())));
        }
        if let Some(v) = &self.password_hash {
            sets.push(("password", s(v.clone())));
        }
        if let Some(v) = self.email_verified {
            sets.push(("emailVerified", bool_attr(v)));
        }
        match &self.otp {
            Some(Some(v)) => sets.push(("otp", s(v.clone()))),
            Some(None) => removes.push("otp"),
            None => {}
        }
        match self.otp_expires {
            Some(Some(v)) => sets.push(("otpExpires", n(v))),
            Some(None) => removes.push("otpExpires"),
            None => {}
        }
        match &self.reset_token {
            Some(Some(v)) => sets.push(("resetToken", s(v.clone()))),
            Some(None) => removes.push("resetToken"),
            None => {}
        }
        match self.reset_token_expires {
            Some(Some(v)) => sets.push(("resetTokenExpires", n(v))),
            Some(None) => removes.push("resetTokenExpires"),
            None => {}
        }

        let mut values = HashMap::new();
        let set_clauses: Vec<String> = sets
            .into_iter()
            .map(|(name, value)| {
                values.insert(format!(":{name}"), value);
                format!("{name} = :{name}")
            })
            .collect();

        let mut expr = format!("SET {}", set_clauses.join(", "));
        if !removes.is_empty() {
            expr.push_str(&format!(" REMOVE {}", removes.join(", ")));
        }
        (expr, values)
    }
}

pub fn user_to_item(user: &UserRecord) -> Item {
    let mut item = Item::new();
    item.insert("userId".into(), s(user.user_id.to_string()));
    item.insert("fullName".into(), s(user.full_name.clone()));
    item.insert("email".into(), s(user.email.clone()));
    item.insert("phoneNumber".into(), s(user.phone_number.clone()));
    item.insert("password".into(), s(user.password_hash.clone()));
    item.insert("emailVerified".into(), bool_attr(user.email_verified));
    if let Some(otp) = &user.otp {
        item.insert("otp".into(), s(otp.clone()));
    }
    if let Some(exp) = user.otp_expires {
        item.insert("otpExpires".into(), n(exp));
    }
    if let Some(token) = &user.reset_token {
        item.insert("resetToken".into(), s(token.clone()));
    }
    if let Some(exp) = user.reset_token_expires {
        item.insert("resetTokenExpires".into(), n(exp));
    }
    item.insert("role".into(), s(user.role.clone()));
    item.insert("createdAt".into(), n(user.created_at));
    item.insert("updatedAt".into(), n(user.updated_at));
    item
}

pub fn item_to_user(item: &Item) -> Result<UserRecord, DbError> {
    let user_id = get_s(item, "userId")?
        .parse::<Uuid>()
        .map_err(|e| DbError::Malformed(format!("userId is not a uuid: {e}")))?;
    Ok(UserRecord {
        user_id,
        full_name: get_s(item, "fullName")?,
        email: get_s(item, "email")?,
        phone_number: get_s(item, "phoneNumber")?,
        password_hash: get_s(item, "password")?,
        email_verified: get_bool(item, "emailVerified")?,
        otp: get_opt_s(item, "otp"),
        otp_expires: get_opt_n(item, "otpExpires"),
        reset_token: get_opt_s(item, "resetToken"),
        reset_token_expires: get_opt_n(item, "resetTokenExpires"),
        role: get_opt_s(item, "role").unwrap_or_else(|| "student".into()),
        created_at: get_opt_n(item, "createdAt").unwrap_or_default(),
        updated_at: get_opt_n(item, "updatedAt").unwrap_or_default(),
    })
}

pub async fn create(db: &Db, new: NewUser) -> Result<UserRecord, DbError> {
    let now = now_ts();
    let user = UserRecord {
        user_id: Uuid::new_v4(),
        full_name: new.full_name,
        email: new.email.to_lowercase(),
        phone_number: new.phone_number,
        password_hash: new.password_hash,
        email_verified: false,
        otp: Some(new.otp),
        otp_expires: Some(new.otp_expires),
        reset_token: None,
        reset_token_expires: None,
        role: new.role,
        created_at: now,
        updated_at: now,
    };
    db.client
        .put_item()
        .table_name(&db.tables.users)
        .set_item(Some(user_to_item(&user)))
        .condition_expression("attribute_not_exists(userId)")
        .send()
        .await
        .map_err(crate::db::put_err)?;
    Ok(user)
}

pub async fn find_by_email(db: &Db, email: &str) -> Result<Option<UserRecord>, DbError> {
    let result = db
        .client
        .query()
        .table_name(&db.tables.users)
        .index_name(EMAIL_INDEX)
        .key_condition_expression("email = :email")
        .expression_attribute_values(":email", s(email.to_lowercase()))
        .limit(1)
        .send()
        .await
        .map_err(|e| DbError::Other(anyhow::Error::new(e.into_service_error())))?;
    match result.items.unwrap_or_default().first() {
        Some(item) => Ok(Some(item_to_user(item)?)),
        None => Ok(None),
    }
}

pub async fn find_by_id(db: &Db, user_id: Uuid) -> Result<Option<UserRecord>, DbError> {
    let result = db
        .client
        .get_item()
        .table_name(&db.tables.users)
        .key("userId", s(user_id.to_string()))
        .send()
        .await
        .map_err(|e| DbError::Other(anyhow::Error::new(e.into_service_error())))?;
    match result.item {
        Some(item) => Ok(Some(item_to_user(&item)?)),
        None => Ok(None),
    }
}

pub async fn update(db: &Db, user_id: Uuid, update: UserUpdate) -> Result<UserRecord, DbError> {
    let (expr, values) = update.expression(now_ts());
    let result = db
        .client
        .update_item()
        .table_name(&db.tables.users)
        .key("userId", s(user_id.to_string()))
        .update_expression(expr)
        .set_expression_attribute_values(Some(values))
        .condition_expression("attribute_exists(userId)")
        .return_values(ReturnValue::AllNew)
        .send()
        .await
        .map_err(|e| update_err("User", e))?;
    let item = result
        .attributes
        .ok_or_else(|| DbError::Malformed("update returned no attributes".into()))?;
    item_to_user(&item)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> UserRecord {
        UserRecord {
            user_id: Uuid::new_v4(),
            full_name: "Hana Sato".into(),
            email: "hana@example.com".into(),
            phone_number: "+91 98765 43210".into(),
            password_hash: "$argon2id$fake".into(),
            email_verified: false,
            otp: Some("042917".into()),
            otp_expires: Some(1_900_000_000),
            reset_token: None,
            reset_token_expires: None,
            role: "student".into(),
            created_at: 1_800_000_000,
            updated_at: 1_800_000_000,
        }
    }

    #[test]
    fn item_roundtrip_preserves_all_fields() {
        let user = sample_user();
        let back = item_to_user(&user_to_item(&user)).expect("roundtrip");
        assert_eq!(back.user_id, user.user_id);
        assert_eq!(back.email, user.email);
        assert_eq!(back.otp, user.otp);
        assert_eq!(back.otp_expires, user.otp_expires);
        assert_eq!(back.reset_token, None);
        assert!(!back.email_verified);
    }

    #[test]
    fn update_expression_always_stamps_updated_at() {
        let (expr, values) = UserUpdate::default().expression(1_850_000_000);
        assert_eq!(expr, "SET updatedAt = :updatedAt");
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn otp_verification_clears_via_remove() {
        let update = UserUpdate {
            email_verified: Some(true),
            otp: Some(None),
            otp_expires: Some(None),
            ..Default::default()
        };
        let (expr, values) = update.expression(1_850_000_000);
        assert!(expr.contains("emailVerified = :emailVerified"));
        assert!(expr.contains("REMOVE otp, otpExpires"));
        assert!(!values.contains_key(":otp"));
    }

    #[test]
    fn expression_never_contains_unlisted_fields() {
        let update = UserUpdate {
            full_name: Some("New Name".into()),
            reset_token: Some(Some("tok".into())),
            reset_token_expires: Some(Some(1_850_003_600)),
            ..Default::default()
        };
        let (expr, _) = update.expression(1_850_000_000);
        // The allow-list has no way to touch email, role or userId.
        assert!(!expr.contains("email ="));
        assert!(!expr.contains("role"));
        assert!(!expr.contains("userId"));
        assert!(expr.contains("fullName = :fullName"));
        assert!(expr.contains("resetToken = :resetToken"));
    }
}
