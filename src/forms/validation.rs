use lazy_static::lazy_static;
use regex::Regex;

use crate::forms::dto::SubmitFormRequest;

lazy_static! {
    static ref NAME_RE: Regex = Regex::new(r"^[a-zA-Z]+$").unwrap();
    static ref PASSCODE_RE: Regex = Regex::new(r"^\d{8}$").unwrap();
}

pub fn validate_submission(form: &SubmitFormRequest) -> Vec<String> {
    let mut errors = Vec::new();

    if !NAME_RE.is_match(&form.first_name) {
        errors.push("Invalid firstName".to_string());
    }
    if !NAME_RE.is_match(&form.last_name) {
        errors.push("Invalid lastName".to_string());
    }
    if !form.middle_name.is_empty() && !NAME_RE.is_match(&form.middle_name) {
        errors.push("Invalid middleName".to_string());
    }
    if !PASSCODE_RE.is_match(&form.passcode) {
        errors.push("Invalid passcode".to_string());
    }
    if form.test_level.is_empty() {
        errors.push("testLevel is required".to_string());
    }
    if form.gender.is_empty() {
        errors.push("gender is required".to_string());
    }
    if form.native_language.is_empty() {
        errors.push("nativeLanguage is required".to_string());
    }
    if form.dob.is_empty() {
        errors.push("dob is required".to_string());
    }
    if form.address1.is_empty() {
        errors.push("address1 is required".to_string());
    }
    if form.address2.is_empty() {
        errors.push("address2 is required".to_string());
    }
    if form.country.is_empty() {
        errors.push("country is required".to_string());
    }
    if form.pincode.is_empty() {
        errors.push("pincode is required".to_string());
    }
    if !form.agree_terms {
        errors.push("Terms must be agreed to".to_string());
    }

    errors
}

/// The versioned save only insists on a test level; everything else may be
/// filled in across saves.
pub fn validate_save(body: &serde_json::Value) -> Vec<String> {
    let mut errors = Vec::new();
    let has_level = body
        .get("testLevel")
        .map(|v| !v.is_null() && v.as_str().map(|s| !s.is_empty()).unwrap_or(true))
        .unwrap_or(false);
    if !has_level {
        errors.push("testLevel is required".to_string());
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_form() -> SubmitFormRequest {
        serde_json::from_value(json!({
            "testLevel": "2",
            "firstName": "Hana",
            "middleName": "",
            "lastName": "Sato",
            "gender": "female",
            "nativeLanguage": "Marathi",
            "passcode": "12345678",
            "dob": "1999-08-07",
            "address1": "12 Hill Road",
            "address2": "Bandra West",
            "country": "India",
            "pincode": "400050",
            "agreeTerms": true
        }))
        .unwrap()
    }

    #[test]
    fn complete_form_is_valid() {
        assert!(validate_submission(&complete_form()).is_empty());
    }

    #[test]
    fn non_alphabetic_names_are_rejected() {
        let mut form = complete_form();
        form.first_name = "Hana3".into();
        form.middle_name = "X-Y".into();
        let errors = validate_submission(&form);
        assert!(errors.contains(&"Invalid firstName".to_string()));
        assert!(errors.contains(&"Invalid middleName".to_string()));
    }

    #[test]
    fn passcode_must_be_eight_digits() {
        let mut form = complete_form();
        form.passcode = "1234".into();
        assert!(validate_submission(&form).contains(&"Invalid passcode".to_string()));
        form.passcode = "1234567a".into();
        assert!(validate_submission(&form).contains(&"Invalid passcode".to_string()));
    }

    #[test]
    fn empty_form_reports_every_missing_field() {
        let errors = validate_submission(&SubmitFormRequest::default());
        assert!(errors.contains(&"testLevel is required".to_string()));
        assert!(errors.contains(&"Terms must be agreed to".to_string()));
        assert!(errors.len() >= 10);
    }

    #[test]
    fn save_requires_test_level() {
        assert!(validate_save(&json!({})).len() == 1);
        assert!(validate_save(&json!({"testLevel": ""})).len() == 1);
        assert!(validate_save(&json!({"testLevel": "3"})).is_empty());
        assert!(validate_save(&json!({"testLevel": 3})).is_empty());
    }
}
