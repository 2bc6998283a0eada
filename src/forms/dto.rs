use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registration form submission. Every field defaults so that missing
/// required fields surface as accumulated validation errors, not a decode
/// failure; fields the validator does not care about ride along in `extra`.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitFormRequest {
    pub test_level: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub gender: String,
    pub native_language: String,
    pub passcode: String,
    pub dob: String,
    pub address1: String,
    pub address2: String,
    pub country: String,
    pub pincode: String,
    pub agree_terms: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedForm {
    pub submission_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SavedForm {
    pub id: Uuid,
    pub version: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    pub test_level: Option<String>,
    pub country: Option<String>,
}
