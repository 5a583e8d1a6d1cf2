use serde::de::DeserializeOwned;

use crate::error::ConfigError;

/// Deserialize JSON with JSON-path context in error messages. `origin` names
/// the file the text came from.
pub fn from_json_with_path<T: DeserializeOwned>(origin: &str, src: &str) -> Result<T, ConfigError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| parse_error(origin, err))
}

/// Same as [`from_json_with_path`], for YAML text.
pub fn from_yaml_with_path<T: DeserializeOwned>(origin: &str, src: &str) -> Result<T, ConfigError> {
    let de = serde_yaml::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| parse_error(origin, err))
}

fn parse_error<E: std::fmt::Display>(origin: &str, err: serde_path_to_error::Error<E>) -> ConfigError {
    let path = err.path().to_string();
    ConfigError::Parse {
        path: origin.to_string(),
        reason: format!("at path {path} → {}", err.into_inner()),
    }
}
