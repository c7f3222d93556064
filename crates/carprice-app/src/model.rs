// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Serialize, Serializer};
use serde_json::Value;

pub const LOW_PRICE_WARNING: &str = "Predicted price is very low.";
pub const PREDICTION_FAILED: &str = "Prediction failed.";
pub const CONNECTION_FAILED: &str = "Could not connect to prediction server.";

/// Body of `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRequest {
    pub name: String,
    pub company: String,
    #[serde(serialize_with = "serialize_number")]
    pub year: f64,
    #[serde(serialize_with = "serialize_number")]
    pub kms_driven: f64,
    pub fuel_type: String,
}

// Whole numbers go out as JSON integers and non-finite values as null.
fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if !value.is_finite() {
        return serializer.serialize_none();
    }
    if value.fract() == 0.0 && value.abs() < 9.007_199_254_740_992e15 {
        return serializer.serialize_i64(*value as i64);
    }
    serializer.serialize_f64(*value)
}

/// The recognised fields of a prediction reply, each kept only when present
/// and non-null. Values stay untyped: a price may arrive as a number or a
/// numeric string, and any `message` or `error` is shown as text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PredictionResponse {
    pub predicted_price: Option<Value>,
    pub message: Option<Value>,
    pub error: Option<Value>,
}

impl PredictionResponse {
    /// Fails on a `null` body, which carries no fields to read at all.
    pub fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            bail!("prediction reply is null");
        }
        let field = |key: &str| value.get(key).filter(|field| !field.is_null()).cloned();
        Ok(Self {
            predicted_price: field("predicted_price"),
            message: field("message"),
            error: field("error"),
        })
    }

    pub fn price(price: f64) -> Self {
        Self {
            predicted_price: Some(Value::from(price)),
            ..Self::default()
        }
    }

    pub fn message(message: &str) -> Self {
        Self {
            message: Some(Value::from(message)),
            ..Self::default()
        }
    }

    pub fn error(error: &str) -> Self {
        Self {
            error: Some(Value::from(error)),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionResult {
    Price(String),
    Message(String),
    Error(String),
}

impl SubmissionResult {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn text(&self) -> String {
        match self {
            Self::Price(amount) => format_price(amount),
            Self::Message(message) => message.clone(),
            Self::Error(error) => error.clone(),
        }
    }
}

pub fn format_price(amount: &str) -> String {
    format!("Predicted Price: ₹{amount}")
}

/// Whether a reply field counts as set: false, zero, NaN and `""` do not.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text shown for a reply value. Arrays join their items with commas and
/// objects have no readable form.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number_text(number.as_f64().unwrap_or(f64::NAN)),
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_owned(),
    }
}

/// Numeric reading of a reply value for the low-price check; NaN when none.
pub fn numeric_value(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(flag) => f64::from(u8::from(*flag)),
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(text) => parse_numeric_text(text),
        Value::Array(_) => parse_numeric_text(&display_value(value)),
        Value::Object(_) => f64::NAN,
    }
}

fn parse_numeric_text(raw: &str) -> f64 {
    let text = raw.trim();
    if text.is_empty() {
        return 0.0;
    }
    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = text.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).map_or(f64::NAN, |n| n as f64);
        }
    }
    let decimal = text
        .chars()
        .all(|ch| ch.is_ascii_digit() || matches!(ch, '.' | 'e' | 'E' | '+' | '-'));
    if !decimal {
        return f64::NAN;
    }
    text.parse::<f64>().unwrap_or(f64::NAN)
}

/// Shortest round-trip text for a number, with exponent form outside
/// `[1e-6, 1e21)` and negative zero shown as `0`.
pub fn number_text(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    if value == 0.0 {
        return "0".to_owned();
    }
    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return value.to_string();
    }
    let formatted = format!("{value:e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => formatted,
    }
}
