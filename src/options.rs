//! Effect configuration.
//!
//! Hosts pass an open-ended bag of options. Keys an effect recognizes
//! override its defaults; every other key is carried along untouched so
//! the same bag can be handed to any effect.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ConfigError;

pub const MAX_COUNT_KEY: &str = "maxCount";
pub const DEFAULT_MAX_COUNT: usize = 50;
/// Largest `maxCount` a bag may ask for. Anything above is treated as unusable.
pub const MAX_COUNT_LIMIT: usize = 100_000;

/// Deserializes through [`EffectOptions::from_overrides`], so loading from
/// JSON is as forgiving as merging a bag by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", rename_all = "camelCase")]
pub struct EffectOptions {
    /// Number of particles alive at once.
    pub max_count: usize,
    /// Unrecognized keys, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for EffectOptions {
    fn default() -> Self {
        Self {
            max_count: DEFAULT_MAX_COUNT,
            extra: Map::new(),
        }
    }
}

impl From<Map<String, Value>> for EffectOptions {
    fn from(overrides: Map<String, Value>) -> Self {
        Self::from_overrides(overrides)
    }
}

/// Whole, non-negative numbers up to [`MAX_COUNT_LIMIT`]. `5.0` counts as 5.
fn particle_count(value: &Value) -> Option<usize> {
    let count = match value.as_u64() {
        Some(n) => usize::try_from(n).ok()?,
        None => {
            let f = value.as_f64()?;
            if !f.is_finite() || f < 0.0 || f.fract() != 0.0 || f > MAX_COUNT_LIMIT as f64 {
                return None;
            }
            f as usize
        }
    };
    (count <= MAX_COUNT_LIMIT).then_some(count)
}

impl EffectOptions {
    /// Merges `overrides` over the defaults.
    ///
    /// Never fails: a recognized key with an unusable value keeps its default.
    pub fn from_overrides(overrides: Map<String, Value>) -> Self {
        let mut options = Self::default();
        for (key, value) in overrides {
            if key == MAX_COUNT_KEY {
                match particle_count(&value) {
                    Some(count) => options.max_count = count,
                    None => warn!(
                        %value,
                        default = options.max_count,
                        "ignoring unusable maxCount"
                    ),
                }
            } else {
                options.extra.insert(key, value);
            }
        }
        options
    }

    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Parses a `KEY=VALUE` pair. The value is read as JSON when it parses,
/// otherwise it is kept as a plain string.
pub fn parse_option_pair(input: &str) -> Result<(String, Value), ConfigError> {
    let (key, raw) = input
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidOptionPair {
            input: input.to_string(),
        })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ConfigError::InvalidOptionPair {
            input: input.to_string(),
        });
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Parses a JSON object of options.
pub fn parse_options_json(input: &str) -> Result<Map<String, Value>, ConfigError> {
    match serde_json::from_str(input)? {
        Value::Object(map) => Ok(map),
        other => Err(ConfigError::OptionsNotObject {
            kind: json_kind(&other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn defaults_to_fifty_particles() {
        let options = EffectOptions::from_overrides(Map::new());
        assert_eq!(options.max_count, 50);
        assert!(options.extra.is_empty());
    }

    #[test]
    fn recognized_keys_override_and_others_pass_through() {
        let options = EffectOptions::from_overrides(bag(json!({
            "maxCount": 7,
            "gravity": 0.5,
            "label": "party",
        })));
        assert_eq!(options.max_count, 7);
        assert_eq!(options.extra("gravity"), Some(&json!(0.5)));
        assert_eq!(options.extra("label"), Some(&json!("party")));
        assert_eq!(options.extra(MAX_COUNT_KEY), None);
    }

    #[test]
    fn unusable_max_count_keeps_default() {
        for bad in [json!(-3), json!(2.5), json!("ten"), json!(null)] {
            let options = EffectOptions::from_overrides(bag(json!({ "maxCount": bad })));
            assert_eq!(options.max_count, DEFAULT_MAX_COUNT);
        }
    }

    #[test]
    fn integral_floats_count_as_integers() {
        let options = EffectOptions::from_overrides(bag(json!({ "maxCount": 5.0 })));
        assert_eq!(options.max_count, 5);
    }

    #[test]
    fn counts_above_the_limit_keep_default() {
        for huge in [json!(u64::MAX), json!(MAX_COUNT_LIMIT + 1), json!(1e300)] {
            let options = EffectOptions::from_overrides(bag(json!({ "maxCount": huge })));
            assert_eq!(options.max_count, DEFAULT_MAX_COUNT);
        }
        let options = EffectOptions::from_overrides(bag(json!({ "maxCount": MAX_COUNT_LIMIT })));
        assert_eq!(options.max_count, MAX_COUNT_LIMIT);
    }

    #[test]
    fn zero_is_a_valid_count() {
        let options = EffectOptions::from_overrides(bag(json!({ "maxCount": 0 })));
        assert_eq!(options.max_count, 0);
    }

    #[test]
    fn deserializes_with_flattened_extras() {
        let options: EffectOptions =
            serde_json::from_str(r#"{"maxCount": 3, "theme": "dark"}"#).unwrap();
        assert_eq!(options.max_count, 3);
        assert_eq!(options.extra("theme"), Some(&json!("dark")));

        let options: EffectOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.max_count, DEFAULT_MAX_COUNT);
    }

    #[test]
    fn deserializing_is_as_forgiving_as_merging() {
        for (input, expected) in [
            (r#"{"maxCount": -3}"#, DEFAULT_MAX_COUNT),
            (r#"{"maxCount": "ten"}"#, DEFAULT_MAX_COUNT),
            (r#"{"maxCount": 2.5}"#, DEFAULT_MAX_COUNT),
            (r#"{"maxCount": 2.0}"#, 2),
        ] {
            let options: EffectOptions = serde_json::from_str(input).unwrap();
            assert_eq!(options.max_count, expected, "{input}");
        }
    }

    #[test]
    fn serializes_back_to_a_flat_bag() {
        let options = EffectOptions::from_overrides(bag(json!({
            "maxCount": 12,
            "theme": "dark",
        })));
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value, json!({ "maxCount": 12, "theme": "dark" }));

        let back: EffectOptions = serde_json::from_value(value).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn option_pairs_parse_json_then_fall_back_to_strings() {
        assert_eq!(
            parse_option_pair("maxCount=12").unwrap(),
            ("maxCount".to_string(), json!(12))
        );
        assert_eq!(
            parse_option_pair("label=hello world").unwrap(),
            ("label".to_string(), json!("hello world"))
        );
        assert_eq!(
            parse_option_pair("flag=true").unwrap(),
            ("flag".to_string(), json!(true))
        );
    }

    #[test]
    fn option_pairs_need_a_key() {
        assert!(matches!(
            parse_option_pair("novalue"),
            Err(ConfigError::InvalidOptionPair { .. })
        ));
        assert!(matches!(
            parse_option_pair("=5"),
            Err(ConfigError::InvalidOptionPair { .. })
        ));
    }

    #[test]
    fn options_json_must_be_an_object() {
        let map = parse_options_json(r#"{"maxCount": 2}"#).unwrap();
        assert_eq!(map.get("maxCount"), Some(&json!(2)));

        let err = parse_options_json("[1, 2]").unwrap_err();
        assert_eq!(err.to_string(), "options JSON must be an object, got an array");

        assert!(matches!(
            parse_options_json("{oops"),
            Err(ConfigError::InvalidOptionsJson { .. })
        ));
    }
}
