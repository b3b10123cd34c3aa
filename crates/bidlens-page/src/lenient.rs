//! Forgiving field readers for library payloads.
//!
//! The library's objects are loosely typed: widths arrive as `300`, `300.0`
//! or `"300"`, bidder codes may be `null`. A field that cannot be read is
//! omitted instead of failing the whole payload.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

/// Text from a string, number or boolean; empty otherwise.
pub(crate) fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(opt_text(deserializer)?.unwrap_or_default())
}

/// Text from a string, number or boolean.
pub(crate) fn opt_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// A number, or a string holding one.
pub(crate) fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A non-negative integer from an integer, an integral float or a string.
pub(crate) fn opt_integer<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let value = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse().ok().or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    };
    Ok(value.and_then(|v| T::try_from(v).ok()))
}

/// Elements of an array that deserialize as `T`; the rest are dropped.
pub(crate) fn items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(values) => from_values(values),
        _ => Vec::new(),
    })
}

/// Keep the elements that deserialize as `T`.
pub(crate) fn from_values<T: DeserializeOwned>(values: Vec<Value>) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!("dropping unreadable entry: {}", e);
                None
            }
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn integral(f: f64) -> Option<u64> {
    (f.is_finite() && f >= 0.0 && f.fract().abs() < f64::EPSILON && f < 1e15).then(|| f as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Sample {
        #[serde(deserialize_with = "opt_integer")]
        width: Option<u32>,
        #[serde(deserialize_with = "opt_f64")]
        cpm: Option<f64>,
        #[serde(deserialize_with = "text")]
        bidder: String,
    }

    fn sample(value: Value) -> Sample {
        serde_json::from_value(value).expect("lenient sample")
    }

    #[test]
    fn test_integer_shapes() {
        assert_eq!(sample(json!({"width": 300})).width, Some(300));
        assert_eq!(sample(json!({"width": 300.0})).width, Some(300));
        assert_eq!(sample(json!({"width": "300"})).width, Some(300));
        assert_eq!(sample(json!({"width": 300.5})).width, None);
        assert_eq!(sample(json!({"width": -1})).width, None);
        assert_eq!(sample(json!({"width": [300]})).width, None);
    }

    #[test]
    fn test_cpm_and_bidder_shapes() {
        let s = sample(json!({"cpm": "1.20", "bidder": null}));
        assert_eq!(s.cpm, Some(1.2));
        assert_eq!(s.bidder, "");
        assert_eq!(sample(json!({"bidder": 7})).bidder, "7");
    }
}
