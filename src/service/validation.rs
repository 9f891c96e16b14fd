//! Request-body validation against entity definitions.

use crate::error::{AppError, FieldViolation};
use crate::model::EntityDef;
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a full body (create, replace): every required field must be
    /// present and non-null, every present field must be declared and a
    /// string, and the identity field is not writable.
    pub fn validate_full(entity: &EntityDef, body: &Map<String, Value>) -> Result<(), AppError> {
        let mut violations = Vec::new();
        for field in entity.required_fields() {
            match body.get(field.name) {
                None | Some(Value::Null) => violations.push(FieldViolation {
                    field: field.name.to_string(),
                    message: "is required".into(),
                }),
                Some(_) => {}
            }
        }
        violations.extend(Self::shape_violations(entity, body));
        if violations.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(violations))
        }
    }

    /// Validate a partial body (patch): only the fields present are checked.
    /// Required-ness is not enforced for missing fields.
    pub fn validate_partial(entity: &EntityDef, body: &Map<String, Value>) -> Result<(), AppError> {
        let violations = Self::shape_violations(entity, body);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(violations))
        }
    }

    fn shape_violations(entity: &EntityDef, body: &Map<String, Value>) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        for (name, value) in body {
            if name == entity.id_field {
                violations.push(FieldViolation {
                    field: name.clone(),
                    message: "is generated and cannot be set".into(),
                });
                continue;
            }
            match entity.field(name) {
                None => violations.push(FieldViolation {
                    field: name.clone(),
                    message: format!("is not a property of {}", entity.name),
                }),
                Some(_) => {
                    if !value.is_string() && !value.is_null() {
                        violations.push(FieldViolation {
                            field: name.clone(),
                            message: "must be a string".into(),
                        });
                    }
                }
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BIO, EXPERIENCE};
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn full_bio() -> Map<String, Value> {
        body(json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "linkedInUrl": "https://linkedin.com/in/ada",
            "curriculumVitae": "https://example.com/cv.pdf"
        }))
    }

    #[test]
    fn full_body_passes() {
        assert!(RequestValidator::validate_full(&BIO, &full_bio()).is_ok());
    }

    #[test]
    fn missing_required_fields_are_all_reported() {
        let err = RequestValidator::validate_full(&BIO, &body(json!({"firstName": "Ada"})))
            .unwrap_err();
        match err {
            AppError::Validation { details, .. } => {
                let fields: Vec<_> = details.iter().map(|v| v.field.as_str()).collect();
                assert_eq!(
                    fields,
                    vec!["lastName", "email", "linkedInUrl", "curriculumVitae"]
                );
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn null_does_not_satisfy_required() {
        let mut bio = full_bio();
        bio.insert("email".into(), Value::Null);
        assert!(RequestValidator::validate_full(&BIO, &bio).is_err());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut bio = full_bio();
        bio.insert("nickname".into(), json!("ada"));
        let err = RequestValidator::validate_full(&BIO, &bio).unwrap_err();
        assert!(err.to_string().contains("not a property of Bio"));
    }

    #[test]
    fn identity_field_is_not_writable() {
        let mut bio = full_bio();
        bio.insert("id".into(), json!(42));
        assert!(RequestValidator::validate_full(&BIO, &bio).is_err());
        assert!(RequestValidator::validate_partial(&BIO, &body(json!({"id": 42}))).is_err());
    }

    #[test]
    fn partial_accepts_any_known_subset() {
        assert!(
            RequestValidator::validate_partial(&EXPERIENCE, &body(json!({"role": "Engineer"})))
                .is_ok()
        );
        assert!(RequestValidator::validate_partial(&EXPERIENCE, &Map::new()).is_ok());
    }

    #[test]
    fn partial_rejects_non_string_values() {
        let err = RequestValidator::validate_partial(&EXPERIENCE, &body(json!({"role": 3})))
            .unwrap_err();
        assert!(err.to_string().contains("must be a string"));
    }
}
