// Condo Expenses - Input Validation
// Checks request payloads field by field before anything is written
//
// Payload fields are kept as raw JSON values so that a wrong type on one
// field becomes a field-level message instead of rejecting the whole body.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

use crate::error::{AppResult, FieldErrors};
use crate::models::{ExpenseChanges, NewExpense, AMOUNT_SCALE};

pub const DESCRIPTION_MAX_LEN: usize = 255;
pub const CATEGORY_NAME_MAX_LEN: usize = 100;

/// Digits allowed in an amount, fractional digits included
pub const AMOUNT_MAX_DIGITS: u32 = 10;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const BLANK: &str = "This field may not be blank.";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(Value::Null)`)
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Body of expense create/update requests
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpensePayload {
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub amount: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub date: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub category: Option<Value>,
}

/// Body of category create/update requests
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPayload {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Value>,
}

/// How absent fields are treated on update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// PUT: `description` and `amount` must be present
    Full,
    /// PATCH: every field is optional
    Partial,
}

// ============================================================================
// FIELD PARSERS
// ============================================================================

fn parse_text(value: &Value, max_len: usize) -> Result<String, String> {
    match value {
        Value::Null => Err(NOT_NULL.to_string()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Err(BLANK.to_string())
            } else if trimmed.chars().count() > max_len {
                Err(format!(
                    "Ensure this field has no more than {} characters.",
                    max_len
                ))
            } else {
                Ok(trimmed.to_string())
            }
        }
        Value::Number(n) => Ok(n.to_string()),
        _ => Err("Not a valid string.".to_string()),
    }
}

/// Non-negative decimal with at most two places, rescaled to two places
pub fn parse_amount(value: &Value) -> Result<Decimal, String> {
    let text = match value {
        Value::Null => return Err(NOT_NULL.to_string()),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err("A valid number is required.".to_string()),
    };

    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| "A valid number is required.".to_string())?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err("Ensure this value is greater than or equal to 0.".to_string());
    }

    let normalized = amount.normalize();
    if normalized.scale() > AMOUNT_SCALE {
        return Err(format!(
            "Ensure that there are no more than {} decimal places.",
            AMOUNT_SCALE
        ));
    }

    let whole_digits = normalized.trunc().to_string().trim_start_matches('0').len() as u32;
    if whole_digits > AMOUNT_MAX_DIGITS - AMOUNT_SCALE {
        return Err(format!(
            "Ensure that there are no more than {} digits in total.",
            AMOUNT_MAX_DIGITS
        ));
    }

    let mut scaled = normalized.abs();
    scaled.rescale(AMOUNT_SCALE);
    Ok(scaled)
}

pub fn parse_date(value: &Value) -> Result<NaiveDate, String> {
    match value {
        Value::Null => Err(NOT_NULL.to_string()),
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| {
            "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.".to_string()
        }),
        _ => Err("Date has wrong format. Use one of these formats instead: YYYY-MM-DD.".to_string()),
    }
}

/// Category reference: `null` clears, an integer (or integer string) is an id
fn parse_category_ref(value: &Value) -> Result<Option<i64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("Incorrect type. Expected pk value, received {}.", n)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| "Incorrect type. Expected pk value, received str.".to_string()),
        _ => Err("Incorrect type. Expected pk value.".to_string()),
    }
}

fn check_category<F>(id: i64, category_exists: &F, errors: &mut FieldErrors) -> AppResult<()>
where
    F: Fn(i64) -> anyhow::Result<bool>,
{
    if !category_exists(id)? {
        errors.add(
            "category",
            format!("Invalid pk \"{}\" - object does not exist.", id),
        );
    }
    Ok(())
}

/// Keep the parsed value, or record its message under `field`
fn collect<T>(field: &str, parsed: Result<T, String>, errors: &mut FieldErrors) -> Option<T> {
    match parsed {
        Ok(value) => Some(value),
        Err(message) => {
            errors.add(field, message);
            None
        }
    }
}

// ============================================================================
// PAYLOAD VALIDATION
// ============================================================================

/// Validate a create request; `date` defaults to `today`
pub fn validate_new_expense<F>(
    payload: &ExpensePayload,
    today: NaiveDate,
    category_exists: F,
) -> AppResult<NewExpense>
where
    F: Fn(i64) -> anyhow::Result<bool>,
{
    let mut errors = FieldErrors::new();

    let description = match &payload.description {
        Some(value) => collect("description", parse_text(value, DESCRIPTION_MAX_LEN), &mut errors),
        None => {
            errors.add("description", REQUIRED);
            None
        }
    };

    let amount = match &payload.amount {
        Some(value) => collect("amount", parse_amount(value), &mut errors),
        None => {
            errors.add("amount", REQUIRED);
            None
        }
    };

    let date = match &payload.date {
        Some(value) => collect("date", parse_date(value), &mut errors),
        None => Some(today),
    };

    let category = match &payload.category {
        Some(value) => collect("category", parse_category_ref(value), &mut errors).flatten(),
        None => None,
    };
    if let Some(id) = category {
        check_category(id, &category_exists, &mut errors)?;
    }

    match (description, amount, date) {
        (Some(description), Some(amount), Some(date)) if errors.is_empty() => Ok(NewExpense {
            description,
            amount,
            date,
            category,
        }),
        _ => Err(crate::error::AppError::Validation(errors)),
    }
}

/// Validate an update request (PUT or PATCH)
pub fn validate_expense_changes<F>(
    payload: &ExpensePayload,
    mode: UpdateMode,
    category_exists: F,
) -> AppResult<ExpenseChanges>
where
    F: Fn(i64) -> anyhow::Result<bool>,
{
    let mut errors = FieldErrors::new();
    let mut changes = ExpenseChanges::default();

    match &payload.description {
        Some(value) => {
            changes.description =
                collect("description", parse_text(value, DESCRIPTION_MAX_LEN), &mut errors);
        }
        None if mode == UpdateMode::Full => errors.add("description", REQUIRED),
        None => {}
    }

    match &payload.amount {
        Some(value) => changes.amount = collect("amount", parse_amount(value), &mut errors),
        None if mode == UpdateMode::Full => errors.add("amount", REQUIRED),
        None => {}
    }

    if let Some(value) = &payload.date {
        changes.date = collect("date", parse_date(value), &mut errors);
    }

    if let Some(value) = &payload.category {
        changes.category = collect("category", parse_category_ref(value), &mut errors);
        if let Some(Some(id)) = changes.category {
            check_category(id, &category_exists, &mut errors)?;
        }
    }

    errors.into_result(changes)
}

/// Validate a category name; `name_taken` reports whether another category
/// already uses it
pub fn validate_category<F>(payload: &CategoryPayload, name_taken: F) -> AppResult<String>
where
    F: Fn(&str) -> anyhow::Result<bool>,
{
    let mut errors = FieldErrors::new();

    let name = match &payload.name {
        Some(value) => collect("name", parse_text(value, CATEGORY_NAME_MAX_LEN), &mut errors),
        None => {
            errors.add("name", REQUIRED);
            None
        }
    };

    if let Some(name) = &name {
        if name_taken(name)? {
            errors.add("name", "category with this name already exists.");
        }
    }

    match name {
        Some(name) if errors.is_empty() => Ok(name),
        _ => Err(crate::error::AppError::Validation(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use serde_json::json;

    fn payload(value: Value) -> ExpensePayload {
        serde_json::from_value(value).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
    }

    fn only_category_1(id: i64) -> anyhow::Result<bool> {
        Ok(id == 1)
    }

    fn field_errors(err: AppError) -> FieldErrors {
        match err {
            AppError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_payload_distinguishes_null_from_absent() {
        let absent = payload(json!({}));
        assert!(absent.category.is_none());

        let null = payload(json!({ "category": null }));
        assert_eq!(null.category, Some(Value::Null));
    }

    #[test]
    fn test_new_expense_defaults_date_to_today() {
        let expense = validate_new_expense(
            &payload(json!({ "description": "  Water bill ", "amount": 103.2 })),
            today(),
            only_category_1,
        )
        .unwrap();

        assert_eq!(expense.description, "Water bill");
        assert_eq!(expense.amount.to_string(), "103.20");
        assert_eq!(expense.date, today());
        assert_eq!(expense.category, None);
    }

    #[test]
    fn test_new_expense_accepts_string_amount_and_category() {
        let expense = validate_new_expense(
            &payload(json!({
                "description": "Cleaning",
                "amount": "50.00",
                "date": "2025-02-01",
                "category": 1,
            })),
            today(),
            only_category_1,
        )
        .unwrap();

        assert_eq!(expense.amount.to_string(), "50.00");
        assert_eq!(expense.date, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(expense.category, Some(1));
    }

    #[test]
    fn test_new_expense_reports_every_bad_field() {
        let err = validate_new_expense(
            &payload(json!({
                "description": "   ",
                "amount": "-4.00",
                "date": "2025-02-30",
                "category": 7,
            })),
            today(),
            only_category_1,
        )
        .unwrap_err();

        let errors = field_errors(err);
        assert_eq!(errors.messages("description"), [BLANK.to_string()]);
        assert_eq!(
            errors.messages("amount"),
            ["Ensure this value is greater than or equal to 0.".to_string()]
        );
        assert!(errors.contains("date"));
        assert_eq!(
            errors.messages("category"),
            ["Invalid pk \"7\" - object does not exist.".to_string()]
        );
    }

    #[test]
    fn test_new_expense_required_fields() {
        let errors = field_errors(validate_new_expense(&payload(json!({})), today(), only_category_1).unwrap_err());

        assert_eq!(errors.messages("description"), [REQUIRED.to_string()]);
        assert_eq!(errors.messages("amount"), [REQUIRED.to_string()]);
        assert!(!errors.contains("date"));
    }

    #[test]
    fn test_amount_rules() {
        assert_eq!(parse_amount(&json!(0)).unwrap().to_string(), "0.00");
        assert_eq!(parse_amount(&json!("12.5")).unwrap().to_string(), "12.50");
        assert_eq!(parse_amount(&json!("99999999.99")).unwrap().to_string(), "99999999.99");

        assert!(parse_amount(&json!("1.005")).unwrap_err().contains("decimal places"));
        assert!(parse_amount(&json!("100000000")).unwrap_err().contains("digits in total"));
        assert!(parse_amount(&json!("abc")).is_err());
        assert!(parse_amount(&json!(true)).is_err());
        assert_eq!(parse_amount(&Value::Null).unwrap_err(), NOT_NULL);
    }

    #[test]
    fn test_partial_update_only_touches_present_fields() {
        let changes = validate_expense_changes(
            &payload(json!({ "amount": "75.00", "category": null })),
            UpdateMode::Partial,
            only_category_1,
        )
        .unwrap();

        assert_eq!(changes.description, None);
        assert_eq!(changes.amount.unwrap().to_string(), "75.00");
        assert_eq!(changes.date, None);
        assert_eq!(changes.category, Some(None));
    }

    #[test]
    fn test_full_update_requires_description_and_amount() {
        let errors = field_errors(
            validate_expense_changes(
                &payload(json!({ "date": "2025-01-01" })),
                UpdateMode::Full,
                only_category_1,
            )
            .unwrap_err(),
        );

        assert!(errors.contains("description"));
        assert!(errors.contains("amount"));
        assert!(!errors.contains("date"));
    }

    #[test]
    fn test_category_name_validation() {
        let taken = |name: &str| -> anyhow::Result<bool> { Ok(name == "Cleaning") };

        let ok = validate_category(
            &CategoryPayload {
                name: Some(json!(" Maintenance ")),
            },
            taken,
        )
        .unwrap();
        assert_eq!(ok, "Maintenance");

        let duplicate = field_errors(
            validate_category(
                &CategoryPayload {
                    name: Some(json!("Cleaning")),
                },
                taken,
            )
            .unwrap_err(),
        );
        assert_eq!(
            duplicate.messages("name"),
            ["category with this name already exists.".to_string()]
        );

        let long = "x".repeat(CATEGORY_NAME_MAX_LEN + 1);
        let too_long = field_errors(
            validate_category(&CategoryPayload { name: Some(json!(long)) }, taken).unwrap_err(),
        );
        assert!(too_long.contains("name"));

        let missing = field_errors(validate_category(&CategoryPayload::default(), taken).unwrap_err());
        assert_eq!(missing.messages("name"), [REQUIRED.to_string()]);
    }
}
