//! Form binding and validation.
//!
//! A submission is bound onto a mutable field set in two steps:
//!
//! 1. **bind**: each known key of the JSON body is coerced onto its target
//!    field. With `clear_missing`, keys absent from the body reset the field to
//!    `None`; without it, absent keys leave the current value untouched.
//! 2. **validate**: the bound field set is checked (required fields, lengths)
//!    and converted into the entity's typed fields.
//!
//! Errors from both steps are accumulated into one [`FormErrors`].

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub const NOT_BLANK: &str = "This value should not be blank.";
pub const NOT_VALID: &str = "This value is not valid.";
pub const EXTRA_FIELDS: &str = "This form should not contain extra fields.";

/// Maximum length of text columns.
pub const MAX_TEXT_LEN: usize = 255;

/// Structured validation errors: form-level messages plus per-field messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[error("submitted data is invalid")]
pub struct FormErrors {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    form: Vec<String>,
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors holding a single message for one field.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.form.is_empty() && self.fields.is_empty()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_form(&mut self, message: impl Into<String>) {
        self.form.push(message.into());
    }

    pub fn form_errors(&self) -> &[String] {
        &self.form
    }

    pub fn field(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Merge `other` into `self`, skipping field messages for fields that
    /// already failed (a value that could not be bound is not validated).
    fn absorb(&mut self, other: FormErrors) {
        self.form.extend(other.form);
        for (field, messages) in other.fields {
            self.fields.entry(field).or_insert(messages);
        }
    }
}

/// Input schema of an entity.
pub trait Form {
    /// Keys accepted in a submitted body.
    const FIELDS: &'static [&'static str];

    /// Mutable, possibly incomplete field set the body is bound onto.
    type Data: Default + Clone + Send;

    /// Validated fields, ready to be persisted.
    type Fields: Clone + Send + Sync + 'static;

    fn bind(data: &mut Self::Data, submission: &mut Submission<'_>);

    fn validate(data: Self::Data) -> Result<Self::Fields, FormErrors>;
}

/// Bind `body` onto `data` and validate the result.
pub fn submit<F: Form>(
    mut data: F::Data,
    body: &Map<String, Value>,
    clear_missing: bool,
) -> Result<F::Fields, FormErrors> {
    let mut submission = Submission::new(body, clear_missing, F::FIELDS);
    F::bind(&mut data, &mut submission);
    let mut errors = submission.into_errors();

    match F::validate(data) {
        Ok(fields) if errors.is_empty() => Ok(fields),
        Ok(_) => Err(errors),
        Err(validation) => {
            errors.absorb(validation);
            Err(errors)
        }
    }
}

/// One submitted body being bound against a schema.
#[derive(Debug)]
pub struct Submission<'a> {
    body: &'a Map<String, Value>,
    clear_missing: bool,
    errors: FormErrors,
}

impl<'a> Submission<'a> {
    pub fn new(body: &'a Map<String, Value>, clear_missing: bool, known: &[&str]) -> Self {
        let mut errors = FormErrors::new();
        if body.keys().any(|k| !known.contains(&k.as_str())) {
            errors.add_form(EXTRA_FIELDS);
        }
        Self {
            body,
            clear_missing,
            errors,
        }
    }

    /// Bind a text field. Strings are trimmed and an empty string is `None`.
    /// Numbers are accepted and stringified.
    pub fn text(&mut self, name: &str, target: &mut Option<String>) {
        self.bind_with(name, target, |value| match value {
            Value::String(s) => {
                let trimmed = s.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Value::Number(n) => Ok(Some(n.to_string())),
            _ => Err(()),
        });
    }

    /// Bind a 32-bit integer field from a JSON integer or an integer string.
    pub fn integer(&mut self, name: &str, target: &mut Option<i32>) {
        self.bind_with(name, target, |value| match value {
            Value::Number(n) => n
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Some)
                .ok_or(()),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s.trim().parse::<i32>().map(Some).map_err(|_| ()),
            _ => Err(()),
        });
    }

    /// Bind a reference to another entity by its numeric identifier.
    pub fn reference<I>(&mut self, name: &str, target: &mut Option<I>)
    where
        I: TryFrom<i64> + core::str::FromStr,
    {
        self.bind_with(name, target, |value| match value {
            Value::Number(n) => n
                .as_i64()
                .and_then(|v| I::try_from(v).ok())
                .map(Some)
                .ok_or(()),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::String(s) => s.parse::<I>().map(Some).map_err(|_| ()),
            _ => Err(()),
        });
    }

    fn bind_with<T>(
        &mut self,
        name: &str,
        target: &mut Option<T>,
        convert: impl FnOnce(&Value) -> Result<Option<T>, ()>,
    ) {
        match self.body.get(name) {
            None if self.clear_missing => *target = None,
            None => {}
            Some(Value::Null) => *target = None,
            Some(value) => match convert(value) {
                Ok(v) => *target = v,
                Err(()) => self.errors.add(name, NOT_VALID),
            },
        }
    }

    pub fn into_errors(self) -> FormErrors {
        self.errors
    }
}

/// Require a value to be present.
pub fn required<T>(errors: &mut FormErrors, name: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.add(name, NOT_BLANK);
    }
    value
}

/// Check the length (in characters) of an optional text value.
pub fn max_length(errors: &mut FormErrors, name: &str, value: Option<&str>) {
    if value.is_some_and(|v| v.chars().count() > MAX_TEXT_LEN) {
        errors.add(
            name,
            format!("This value is too long. It should have {MAX_TEXT_LEN} characters or less."),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn unknown_keys_are_a_form_error() {
        let b = body(json!({ "name": "x", "nickname": "y" }));
        let s = Submission::new(&b, true, &["name"]);
        let errors = s.into_errors();
        assert_eq!(errors.form_errors(), &[EXTRA_FIELDS.to_string()]);
    }

    #[test]
    fn text_is_trimmed_and_empty_becomes_none() {
        let b = body(json!({ "a": "  hi  ", "b": "   ", "c": 12 }));
        let mut s = Submission::new(&b, true, &["a", "b", "c"]);
        let (mut a, mut bb, mut c) = (None, Some("old".to_string()), None);
        s.text("a", &mut a);
        s.text("b", &mut bb);
        s.text("c", &mut c);
        assert!(s.into_errors().is_empty());
        assert_eq!(a.as_deref(), Some("hi"));
        assert_eq!(bb, None);
        assert_eq!(c.as_deref(), Some("12"));
    }

    #[test]
    fn missing_keys_clear_only_when_requested() {
        let b = body(json!({}));
        let mut kept = Some(7);
        Submission::new(&b, false, &[]).integer("year", &mut kept);
        assert_eq!(kept, Some(7));

        let mut cleared = Some(7);
        Submission::new(&b, true, &[]).integer("year", &mut cleared);
        assert_eq!(cleared, None);
    }

    #[test]
    fn explicit_null_always_clears() {
        let b = body(json!({ "year": null }));
        let mut year = Some(1949);
        Submission::new(&b, false, &["year"]).integer("year", &mut year);
        assert_eq!(year, None);
    }

    #[test]
    fn integers_accept_numeric_strings_and_reject_the_rest() {
        let b = body(json!({ "a": "1949", "b": 1.5, "c": true, "d": 5_000_000_000_i64 }));
        let mut s = Submission::new(&b, true, &["a", "b", "c", "d"]);
        let (mut a, mut bb, mut c, mut d) = (None, None, None, None);
        s.integer("a", &mut a);
        s.integer("b", &mut bb);
        s.integer("c", &mut c);
        s.integer("d", &mut d);
        let errors = s.into_errors();
        assert_eq!(a, Some(1949));
        for f in ["b", "c", "d"] {
            assert_eq!(errors.field(f), &[NOT_VALID.to_string()], "field {f}");
        }
        assert!(!errors.has_field("a"));
    }

    #[test]
    fn required_and_length_checks_accumulate() {
        let mut errors = FormErrors::new();
        let long = "x".repeat(MAX_TEXT_LEN + 1);
        assert!(required::<String>(&mut errors, "title", None).is_none());
        max_length(&mut errors, "summary", Some(&long));
        max_length(&mut errors, "ok", Some(&"y".repeat(MAX_TEXT_LEN)));
        assert_eq!(errors.field("title"), &[NOT_BLANK.to_string()]);
        assert_eq!(errors.field("summary").len(), 1);
        assert!(!errors.has_field("ok"));
    }

    #[test]
    fn serializes_without_empty_form_list() {
        let errors = FormErrors::single("title", NOT_BLANK);
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({ "fields": { "title": [NOT_BLANK] } })
        );
    }
}
