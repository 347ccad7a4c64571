use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::history::{FieldValue, Snapshot};
use crate::util::text::normalize_key;

/// Semantic type of a stage form field, used both to render an input and
/// to parse/validate the submitted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Money,
}

/// A field the destination stage requires before a transition commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFormField {
    /// Human label ("Precio", "Fecha de entrega").
    pub title: String,
    pub kind: FieldKind,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl StageFormField {
    pub fn new(title: &str, kind: FieldKind) -> Self {
        StageFormField {
            title: title.to_string(),
            kind,
            required: true,
        }
    }

    /// Storage key for this field's value in a history snapshot.
    pub fn key(&self) -> String {
        normalize_key(&self.title)
    }
}

/// Error raised by local form validation, before any store call.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("required field missing: {0}")]
    MissingField(String),
    #[error("field {field}: expected a number, got {raw:?}")]
    NotANumber { field: String, raw: String },
    #[error("field {field}: expected a date (YYYY-MM-DD), got {raw:?}")]
    NotADate { field: String, raw: String },
}

/// Parse a raw input string for a field into a snapshot value.
///
/// Empty input on an optional field yields `None` (the key is omitted
/// from the snapshot).
pub fn parse_value(field: &StageFormField, raw: &str) -> Result<Option<FieldValue>, FormError> {
    let raw = raw.trim();
    if raw.is_empty() {
        if field.required {
            return Err(FormError::MissingField(field.title.clone()));
        }
        return Ok(None);
    }
    match field.kind {
        FieldKind::Text => Ok(Some(FieldValue::Text(raw.to_string()))),
        FieldKind::Number | FieldKind::Money => {
            let n: i64 = raw
                .replace(['.', ','], "")
                .parse()
                .map_err(|_| FormError::NotANumber {
                    field: field.title.clone(),
                    raw: raw.to_string(),
                })?;
            Ok(Some(FieldValue::Number(n)))
        }
        FieldKind::Date => {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| FormError::NotADate {
                field: field.title.clone(),
                raw: raw.to_string(),
            })?;
            Ok(Some(FieldValue::Text(raw.to_string())))
        }
    }
}

/// Check that every required field has a value in the snapshot.
pub fn validate(fields: &[StageFormField], values: &Snapshot) -> Result<(), FormError> {
    for field in fields {
        if field.required && !values.contains_key(&field.key()) {
            return Err(FormError::MissingField(field.title.clone()));
        }
    }
    Ok(())
}

/// The money field of a form, if it has one. A transition form's money
/// field is pre-seeded with the entity's current amount so the operator
/// edits rather than re-enters it.
pub fn money_field(fields: &[StageFormField]) -> Option<&StageFormField> {
    fields.iter().find(|f| f.kind == FieldKind::Money)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn key_is_normalized_from_title() {
        let field = StageFormField::new("Precio", FieldKind::Money);
        assert_eq!(field.key(), "precio");
        let field = StageFormField::new("Fecha de visita técnica", FieldKind::Date);
        assert_eq!(field.key(), "fecha_de_visita_tecnica");
    }

    #[test]
    fn parse_money_strips_separators() {
        let field = StageFormField::new("Precio", FieldKind::Money);
        assert_eq!(
            parse_value(&field, "120.000").unwrap(),
            Some(FieldValue::Number(120_000))
        );
        assert_eq!(
            parse_value(&field, "120,000").unwrap(),
            Some(FieldValue::Number(120_000))
        );
    }

    #[test]
    fn parse_rejects_garbage_number() {
        let field = StageFormField::new("Precio", FieldKind::Money);
        assert!(parse_value(&field, "abc").is_err());
    }

    #[test]
    fn parse_empty_required_is_missing() {
        let field = StageFormField::new("Precio", FieldKind::Money);
        assert!(matches!(
            parse_value(&field, "  "),
            Err(FormError::MissingField(_))
        ));
    }

    #[test]
    fn parse_empty_optional_is_omitted() {
        let mut field = StageFormField::new("Nota", FieldKind::Text);
        field.required = false;
        assert_eq!(parse_value(&field, "").unwrap(), None);
    }

    #[test]
    fn parse_date_validates_format() {
        let field = StageFormField::new("Fecha", FieldKind::Date);
        assert_eq!(
            parse_value(&field, "2026-08-07").unwrap(),
            Some(FieldValue::Text("2026-08-07".into()))
        );
        assert!(parse_value(&field, "07/08/2026").is_err());
    }

    #[test]
    fn validate_flags_missing_required() {
        let fields = vec![StageFormField::new("Precio", FieldKind::Money)];
        let values = Snapshot::new();
        assert!(matches!(
            validate(&fields, &values),
            Err(FormError::MissingField(_))
        ));
    }

    #[test]
    fn validate_accepts_complete_snapshot() {
        let fields = vec![StageFormField::new("Precio", FieldKind::Money)];
        let mut values = Snapshot::new();
        values.insert("precio".into(), FieldValue::Number(100));
        assert!(validate(&fields, &values).is_ok());
    }

    #[test]
    fn money_field_found() {
        let fields = vec![
            StageFormField::new("Nota", FieldKind::Text),
            StageFormField::new("Precio", FieldKind::Money),
        ];
        assert_eq!(money_field(&fields).unwrap().title, "Precio");
    }
}
