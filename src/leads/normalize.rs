//! Raw sheet rows → canonical [`Lead`] records.
//!
//! Header cells in the sheet drift ("name ", "Phone Number", "user_id"),
//! so every raw key is reduced with [`normalize_key`] and looked up in
//! [`FIELD_ALIASES`]. Normalization never fails: a row that is missing
//! everything still becomes a lead with default fields, so the visible
//! count always matches the sheet.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::types::{IdSource, Lead, LeadStatus, RawRecord};

pub const UNKNOWN_NAME: &str = "Unknown Name";
pub const UNKNOWN_GYM: &str = "Unknown Gym";

/// Canonical lead fields that can be read from a raw row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadField {
    Id,
    Name,
    Phone,
    Gym,
    Status,
    CreatedAt,
}

/// Accepted raw-key variants per field, already in [`normalize_key`] form.
pub const FIELD_ALIASES: &[(LeadField, &[&str])] = &[
    (LeadField::Id, &["userid", "id", "leadid"]),
    (LeadField::Name, &["name", "fullname", "leadname"]),
    (
        LeadField::Phone,
        &["phonenumber", "phone", "phoneno", "mobile", "contactnumber"],
    ),
    (LeadField::Gym, &["gymname", "gym"]),
    (LeadField::Status, &["status", "leadstatus"]),
    (
        LeadField::CreatedAt,
        &["createdat", "timestamp", "dateadded", "added"],
    ),
];

/// Reduce a header cell to lowercase ASCII alphanumerics.
///
/// Example: " Phone Number " → "phonenumber", "user_id" → "userid"
pub fn normalize_key(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Which canonical field a raw key maps to, if any.
pub fn resolve_field(raw_key: &str) -> Option<LeadField> {
    let key = normalize_key(raw_key);
    if key.is_empty() {
        return None;
    }
    FIELD_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&key.as_str()))
        .map(|(field, _)| *field)
}

/// Strip everything but digits; group exactly ten digits as `DDD-DDD-DDDD`.
pub fn format_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..])
    } else {
        digits
    }
}

/// Parse a sheet timestamp. Naive values are taken as UTC.
pub fn parse_created_at(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|ndt| Utc.from_utc_datetime(&ndt));
        }
    }
    None
}

/// Render a cell as trimmed text. Arrays, objects, null and blanks are absent.
fn cell_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Canonical field values pulled from one row. First non-blank value per
/// field wins, in the row's key order.
#[derive(Debug, Default)]
struct Cells {
    id: Option<String>,
    name: Option<String>,
    phone: Option<String>,
    gym: Option<String>,
    status: Option<String>,
    created_at: Option<String>,
}

impl Cells {
    fn slot(&mut self, field: LeadField) -> &mut Option<String> {
        match field {
            LeadField::Id => &mut self.id,
            LeadField::Name => &mut self.name,
            LeadField::Phone => &mut self.phone,
            LeadField::Gym => &mut self.gym,
            LeadField::Status => &mut self.status,
            LeadField::CreatedAt => &mut self.created_at,
        }
    }

    fn collect(raw: &RawRecord) -> Self {
        let mut cells = Cells::default();
        for (key, value) in raw {
            let Some(field) = resolve_field(key) else {
                continue;
            };
            let slot = cells.slot(field);
            if slot.is_none() {
                *slot = cell_text(value);
            }
        }
        cells
    }
}

/// Normalize one row. `position` is the row's 0-based index in the fetched
/// array and only feeds the fallback id.
pub fn normalize_record(raw: &RawRecord, position: usize) -> Lead {
    let cells = Cells::collect(raw);

    let (id, id_source) = match cells.id {
        Some(id) => (id, IdSource::Source),
        None => (format!("row-{}", position + 1), IdSource::Positional),
    };

    Lead {
        id,
        id_source,
        name: cells.name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        phone_number: cells.phone.as_deref().map(format_phone).unwrap_or_default(),
        gym_name: cells.gym.unwrap_or_else(|| UNKNOWN_GYM.to_string()),
        status: LeadStatus::parse_lenient(cells.status.as_deref()),
        created_at: cells.created_at.as_deref().and_then(parse_created_at),
    }
}

/// Normalize a whole fetch. Output has the same length and order as input.
pub fn normalize(raw: &[RawRecord]) -> Vec<Lead> {
    raw.iter()
        .enumerate()
        .map(|(position, record)| normalize_record(record, position))
        .collect()
}
