use anyhow::{Context, Result};
use serde::Deserialize;
use serde_yaml::{Deserializer, Mapping, Value};

/// Parses the supplied string as a config value
pub fn parse_config<'a>(conf_str: impl Into<&'a str>) -> Result<Value> {
    Value::deserialize(Deserializer::from_str(conf_str.into()))
        .context("Failed to parse configuration yaml")
}

/// Converts a flat key/value property bag into a config mapping
///
/// Values are kept as strings, typed fields are expected to parse them.
pub fn properties_to_value<K, V>(props: impl IntoIterator<Item = (K, V)>) -> Value
where
    K: Into<String>,
    V: Into<String>,
{
    let mut map = Mapping::new();

    for (key, val) in props {
        map.insert(Value::String(key.into()), Value::String(val.into()));
    }

    Value::Mapping(map)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_config() {
        let parsed = parse_config("a: test").unwrap();

        assert_eq!(
            parsed,
            Value::Mapping({
                let mut map = Mapping::new();
                map.insert(
                    Value::String("a".to_string()),
                    Value::String("test".to_string()),
                );
                map
            })
        );
    }

    #[test]
    fn test_parse_config_invalid() {
        assert!(parse_config("@@@").is_err());
    }

    #[test]
    fn test_properties_to_value() {
        let value = properties_to_value(vec![("user", "admin"), ("enableDetailLog", "true")]);

        assert_eq!(value, parse_config("user: admin\nenableDetailLog: 'true'").unwrap());
    }
}
