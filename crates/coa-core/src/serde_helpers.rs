//! Shared serde helper functions used across the config documents.

use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};

/// Serde default function that returns `true`.
///
/// Used for `active` flags, which default to enabled when absent.
pub fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// Parse a truthy string the way the collector's documents spell flags.
///
/// `"True"`, `"yes"`, `"1"` (any case, surrounding whitespace ignored) are
/// true; everything else is false.
pub fn parse_flag(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1"
    )
}

/// Deserialize a flag written either as a YAML bool or as a quoted string.
pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match FlagRepr::deserialize(deserializer)? {
        FlagRepr::Bool(b) => b,
        FlagRepr::Int(i) => i != 0,
        FlagRepr::Text(s) => parse_flag(&s),
    })
}

/// Render a YAML value in its canonical string form for substitution.
///
/// Strings are used as-is, scalars use their literal spelling, null becomes
/// the empty string and collections fall back to inline YAML.
pub fn yaml_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => yaml_to_string(&tagged.value),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Deserialize an optional scalar (string, number or bool) as its string form.
///
/// `version: 1.0` and `version: "1.0"` both yield `Some("1.0")`.
pub fn deserialize_opt_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .filter(|v| !v.is_null())
        .map(|v| yaml_to_string(&v)))
}

/// Flatten a YAML mapping into ordered `(key, value)` string pairs.
///
/// Non-string keys are stringified the same way as values. Document order is
/// preserved.
pub fn mapping_entries(mapping: &Mapping) -> Vec<(String, String)> {
    mapping
        .iter()
        .map(|(k, v)| (yaml_to_string(k), yaml_to_string(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default = "default_true", deserialize_with = "deserialize_flag")]
        active: bool,
    }

    #[test]
    fn test_flag_spellings() {
        let cases = [
            ("active: true", true),
            ("active: false", false),
            ("active: \"True\"", true),
            ("active: \"False\"", false),
            ("active: \" yes \"", true),
            ("active: 0", false),
            ("active: 1", true),
        ];
        for (yaml, expected) in cases {
            let holder: Holder = serde_yaml::from_str(yaml).unwrap();
            assert_eq!(holder.active, expected, "{yaml}");
        }
    }

    #[test]
    fn test_flag_defaults_to_true() {
        let holder: Holder = serde_yaml::from_str("{}").unwrap();
        assert!(holder.active);
    }

    #[test]
    fn test_yaml_to_string_scalars() {
        assert_eq!(yaml_to_string(&Value::Null), "");
        assert_eq!(yaml_to_string(&Value::Bool(true)), "true");
        assert_eq!(yaml_to_string(&serde_yaml::from_str("42").unwrap()), "42");
        assert_eq!(yaml_to_string(&serde_yaml::from_str("1.5").unwrap()), "1.5");
        assert_eq!(yaml_to_string(&Value::String("x".into())), "x");
    }

    #[test]
    fn test_mapping_entries_keeps_order() {
        let mapping: Mapping = serde_yaml::from_str("b: 1\na: two\nc: null").unwrap();
        assert_eq!(
            mapping_entries(&mapping),
            vec![
                ("b".to_string(), "1".to_string()),
                ("a".to_string(), "two".to_string()),
                ("c".to_string(), String::new()),
            ]
        );
    }
}
