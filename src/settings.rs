//! Editable event metadata.
//!
//! Stored as key/value rows so admins can tweak copy without a deploy.
//! Missing keys fall back to hard-coded defaults at read time, which means
//! the public read path is total: even with an empty (or broken) backend the
//! frontend always gets a complete settings object.

use serde::Serialize;
use serde_json::{Map, Number, Value};
use sqlx::PgPool;
use tracing::warn;

use crate::error::AppError;

pub const DEFAULT_EVENT_TITLE: &str = "Codeathon 2.0";
pub const DEFAULT_FEE: i64 = 60;

pub const FEE_KEY: &str = "payable_per_member";

#[derive(Debug, Serialize, PartialEq)]
pub struct Settings {
    pub event_title: String,
    pub event_description: String,
    pub event_video_url: String,
    pub payment_qr_url: String,
    pub payable_per_member: Number,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            event_title: DEFAULT_EVENT_TITLE.to_string(),
            event_description: String::new(),
            event_video_url: String::new(),
            payment_qr_url: String::new(),
            payable_per_member: Number::from(DEFAULT_FEE),
        }
    }
}

/// Never fails: a store error degrades to the default mapping so the public
/// landing page keeps rendering.
pub async fn get(pool: &PgPool) -> Settings {
    let rows: Vec<(String, Value)> = match sqlx::query_as("SELECT key, value FROM settings")
        .fetch_all(pool)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Settings read failed, serving defaults: {e}");
            return Settings::default();
        }
    };

    effective(rows)
}

/// Right-biased merge of stored rows over the defaults.
pub fn effective(rows: Vec<(String, Value)>) -> Settings {
    let stored: Map<String, Value> = rows.into_iter().collect();

    Settings {
        event_title: text_or(&stored, "event_title", DEFAULT_EVENT_TITLE),
        event_description: text_or(&stored, "event_description", ""),
        event_video_url: text_or(&stored, "event_video_url", ""),
        payment_qr_url: text_or(&stored, "payment_qr_url", ""),
        payable_per_member: coerce_fee(stored.get(FEE_KEY)),
    }
}

/// Upserts each patch entry by key, insert-or-replace. The fee is coerced to
/// a number on the way in so it always serializes numerically on the way out.
pub async fn save(pool: &PgPool, patch: Map<String, Value>) -> Result<(), AppError> {
    for (key, raw) in patch {
        let value = patch_value(&key, raw);

        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(&key)
        .bind(value)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// The fee persists numerically; everything else keeps its given
/// representation, except null, which persists as an empty string.
fn patch_value(key: &str, raw: Value) -> Value {
    if key == FEE_KEY {
        Value::Number(coerce_fee(Some(&raw)))
    } else if raw.is_null() {
        Value::String(String::new())
    } else {
        raw
    }
}

fn text_or(stored: &Map<String, Value>, key: &str, default: &str) -> String {
    stored
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Absent, non-numeric, and negative values all collapse to the default fee.
pub fn coerce_fee(value: Option<&Value>) -> Number {
    let parsed = match value {
        Some(Value::Number(n)) => Some(n.clone()),
        Some(Value::String(s)) => parse_number(s.trim()),
        _ => None,
    };

    parsed
        .filter(|n| n.as_f64().is_some_and(|f| f >= 0.0))
        .unwrap_or_else(|| Number::from(DEFAULT_FEE))
}

fn parse_number(s: &str) -> Option<Number> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::from(i));
    }

    s.parse::<f64>().ok().and_then(Number::from_f64)
}
