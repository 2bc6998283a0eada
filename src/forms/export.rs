use csv::{QuoteStyle, WriterBuilder};
use time::{format_description::FormatItem, macros::format_description, Date};

use crate::forms::repo::FormRecord;

const DATE_FORMAT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// Recipient groups in the fixed order the registrar's sheet expects them.
const COMMUNICATION_GROUPS: [&str; 6] = [
    "teacher",
    "friends",
    "family",
    "supervisor",
    "colleagues",
    "customers",
];

fn text(fields: &serde_json::Value, key: &str) -> String {
    match fields.get(key) {
        Some(serde_json::Value::String(v)) => v.clone(),
        Some(serde_json::Value::Number(v)) => v.to_string(),
        Some(serde_json::Value::Bool(v)) => v.to_string(),
        _ => String::new(),
    }
}

fn text_or(fields: &serde_json::Value, key: &str, default: &str) -> String {
    let value = text(fields, key);
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn gender_code(fields: &serde_json::Value) -> String {
    match text(fields, "gender").as_str() {
        "male" | "M" => "M".into(),
        "female" | "F" => "F".into(),
        _ => "N".into(),
    }
}

/// Applicant name as a single upper-cased field.
fn full_name(fields: &serde_json::Value) -> String {
    let parts = [
        text(fields, "firstName"),
        text(fields, "middleName"),
        text(fields, "lastName"),
    ];
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Date of birth split into year / zero-padded month / zero-padded day.
/// Unparseable input leaves all three columns blank, never faults a row.
fn dob_columns(fields: &serde_json::Value) -> (String, String, String) {
    let raw = text(fields, "dob");
    let head = raw.get(..10).unwrap_or(raw.as_str());
    match Date::parse(head, DATE_FORMAT) {
        Ok(date) => (
            date.year().to_string(),
            format!("{:02}", u8::from(date.month())),
            format!("{:02}", date.day()),
        ),
        Err(_) => (String::new(), String::new(), String::new()),
    }
}

/// Media contact selections packed into a fixed 9-character field. The
/// stored value is a list of outlet positions (numbers or numeric strings);
/// a selected position emits its own digit, everything else a space.
fn media_contacts(fields: &serde_json::Value) -> String {
    let empty = Vec::new();
    let selected = fields
        .get("mediaContacts")
        .and_then(|v| v.as_array())
        .unwrap_or(&empty);
    let picked = |position: u64| {
        selected.iter().any(|v| match v {
            serde_json::Value::Number(v) => v.as_u64() == Some(position),
            serde_json::Value::String(v) => v.parse::<u64>().ok() == Some(position),
            _ => false,
        })
    };
    (1..=9)
        .map(|position| {
            if picked(position) {
                char::from_digit(position as u32, 10).unwrap_or(' ')
            } else {
                ' '
            }
        })
        .collect()
}

/// Five-character skill code for one recipient group: speaking, listening,
/// reading, writing each emit their position digit; the fifth slot is '5'
/// when no skill at all is marked. A group the applicant never answered
/// becomes five spaces.
fn communication_code(fields: &serde_json::Value, group: &str) -> String {
    let answers = match fields.get("communication").and_then(|c| c.get(group)) {
        Some(serde_json::Value::Object(map)) => map,
        _ => return " ".repeat(5),
    };
    const SKILLS: [(&str, char); 4] = [
        ("speaking", '1'),
        ("listening", '2'),
        ("reading", '3'),
        ("writing", '4'),
    ];
    let mut code = String::with_capacity(5);
    let mut any = false;
    for (skill, digit) in SKILLS {
        let on = answers.get(skill).and_then(|v| v.as_bool()).unwrap_or(false);
        any |= on;
        code.push(if on { digit } else { ' ' });
    }
    code.push(if any { ' ' } else { '5' });
    code
}

/// Past attempts sorted by exam level and padded to five entries. A record
/// with fewer answers exports blank columns rather than faulting.
fn sorted_attempts(fields: &serde_json::Value) -> Vec<serde_json::Value> {
    let mut attempts = fields
        .get("attempts")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    attempts.sort_by_key(|a| a.get("level").and_then(|l| l.as_i64()).unwrap_or(i64::MAX));
    attempts
}

/// Attempt count for one slot: an empty answer means zero, a missing slot
/// stays blank.
fn attempt_column(attempts: &[serde_json::Value], index: usize) -> String {
    match attempts.get(index).and_then(|a| a.get("attempts")) {
        Some(serde_json::Value::String(v)) if v.is_empty() => "0".into(),
        Some(serde_json::Value::String(v)) => v.clone(),
        Some(serde_json::Value::Number(v)) => v.to_string(),
        _ => String::new(),
    }
}

fn pass_column(attempts: &[serde_json::Value], index: usize) -> String {
    let raw = attempts
        .get(index)
        .and_then(|a| match a.get("result") {
            Some(serde_json::Value::String(v)) => Some(v.clone()),
            Some(serde_json::Value::Number(v)) => Some(v.to_string()),
            _ => None,
        })
        .unwrap_or_default();
    match raw.as_str() {
        "pass" | "1" => "1".into(),
        "fail" | "2" => "2".into(),
        _ => " ".into(),
    }
}

/// One registration shaped into the registrar's fixed 33-column row.
pub fn shape_row(record: &FormRecord) -> Vec<String> {
    let fields = &record.fields;
    let level = text(fields, "testLevel");
    let (dob_year, dob_month, dob_day) = dob_columns(fields);
    let attempts = sorted_attempts(fields);

    let mut row = vec![
        level.clone(),
        text_or(fields, "regtime", "24B"),
        text_or(fields, "regSiteCode", "3010201"),
        level,
        text(fields, "regSeq"),
        full_name(fields),
        gender_code(fields),
        dob_year,
        dob_month,
        dob_day,
        text(fields, "passcode"),
        text(fields, "nativeLanguage"),
        text(fields, "learningPlace"),
        text(fields, "examReason"),
        text(fields, "occupation"),
        text_or(fields, "occupationalDetails", " "),
        media_contacts(fields),
    ];
    for group in COMMUNICATION_GROUPS {
        row.push(communication_code(fields, group));
    }
    for slot in 0..5 {
        row.push(attempt_column(&attempts, slot));
    }
    for slot in 0..5 {
        row.push(pass_column(&attempts, slot));
    }
    row
}

/// Render a set of registrations as the registrar's exchange CSV: no header
/// row, every field quoted, rows ordered by numeric exam level. Sequence
/// numbers restart at 1 within the file.
pub fn render_csv(mut records: Vec<FormRecord>) -> anyhow::Result<String> {
    records.sort_by_key(|r| {
        text(&r.fields, "testLevel")
            .parse::<i64>()
            .unwrap_or(i64::MAX)
    });

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());
    for record in &records {
        writer.write_record(shape_row(record))?;
    }
    let bytes = writer.into_inner()?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn record(fields: serde_json::Value) -> FormRecord {
        FormRecord {
            id: Uuid::new_v4(),
            version: 1,
            fields,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn row_has_the_fixed_column_count() {
        let row = shape_row(&record(json!({})));
        assert_eq!(row.len(), 33);
    }

    #[test]
    fn shapes_a_complete_registration() {
        let row = shape_row(&record(json!({
            "testLevel": "2",
            "regSeq": "00042",
            "firstName": "Hana",
            "lastName": "Sato",
            "gender": "female",
            "dob": "1998-04-07T00:00:00.000Z",
            "passcode": "12345678",
            "mediaContacts": ["1", "5"],
            "communication": {
                "teacher": {"speaking": true, "reading": true},
                "family": {"speaking": false, "listening": false, "reading": false, "writing": false}
            },
            "attempts": [
                {"level": 2, "attempts": "", "result": "fail"},
                {"level": 1, "attempts": "2", "result": "pass"},
                {"level": 3, "attempts": 1, "result": ""},
                {"level": 4, "attempts": "1", "result": "fail"},
                {"level": 5, "attempts": "3", "result": "pass"}
            ]
        })));
        assert_eq!(row[0], "2");
        assert_eq!(row[1], "24B");
        assert_eq!(row[4], "00042");
        assert_eq!(row[5], "HANA SATO");
        assert_eq!(row[6], "F");
        assert_eq!(&row[7..10], ["1998", "04", "07"]);
        assert_eq!(row[16], "1   5    ");
        // teacher group: speaking + reading
        assert_eq!(row[17], "1 3  ");
        // family group: every skill false
        assert_eq!(row[19], "    5");
        // supervisor group never answered
        assert_eq!(row[20], "     ");
        // attempts sorted by level before filling the slots
        assert_eq!(row[23], "2"); // level 1
        assert_eq!(row[24], "0"); // level 2: empty string -> 0
        assert_eq!(row[25], "1"); // level 3: numeric answer
        assert_eq!(row[28], "1"); // level 1 result pass
        assert_eq!(row[29], "2"); // level 2 result fail
        assert_eq!(row[30], " "); // level 3 result blank
    }

    #[test]
    fn media_digits_match_their_positions() {
        let row = shape_row(&record(json!({"mediaContacts": [6]})));
        assert_eq!(row[16], "     6   ");
        let row = shape_row(&record(json!({"mediaContacts": ["2", "9"]})));
        assert_eq!(row[16], " 2      9");
    }

    #[test]
    fn stored_gender_literals_are_accepted() {
        assert_eq!(shape_row(&record(json!({"gender": "M"})))[6], "M");
        assert_eq!(shape_row(&record(json!({"gender": "F"})))[6], "F");
        assert_eq!(shape_row(&record(json!({"gender": "other"})))[6], "N");
    }

    #[test]
    fn missing_reg_seq_exports_blank() {
        let row = shape_row(&record(json!({"testLevel": "1"})));
        assert_eq!(row[4], "");
    }

    #[test]
    fn short_attempt_lists_pad_the_remaining_slots() {
        let row = shape_row(&record(json!({
            "attempts": [{"level": 1, "attempts": "2", "result": "pass"}]
        })));
        assert_eq!(row[23], "2");
        assert_eq!(&row[24..28], ["", "", "", ""]);
        assert_eq!(row[28], "1");
        assert_eq!(&row[29..33], [" ", " ", " ", " "]);
    }

    #[test]
    fn malformed_dob_leaves_blank_columns() {
        let row = shape_row(&record(json!({"dob": "not-a-date"})));
        assert_eq!(&row[7..10], ["", "", ""]);
    }

    #[test]
    fn csv_sorts_by_numeric_level_and_quotes_everything() {
        let csv = render_csv(vec![
            record(json!({"testLevel": "3", "firstName": "Ken"})),
            record(json!({"testLevel": "1", "firstName": "Aoi"})),
        ])
        .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("\"1\","));
        assert!(lines[1].starts_with("\"3\","));
        assert!(lines[0].contains("\"AOI\""));
    }
}
