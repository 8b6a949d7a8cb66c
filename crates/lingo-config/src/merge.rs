use crate::config::ServerConfig;
use crate::error::ConfigError;

/// Merge an overlay TOML fragment on top of a base [`ServerConfig`].
///
/// Values present in `overlay_toml` override those in `base`.
/// Missing keys in the overlay keep their `base` values.
/// Works by converting both sides to [`toml::Value`] tables,
/// deep-merging, then deserializing back to [`ServerConfig`].
pub fn merge_configs(base: &ServerConfig, overlay_toml: &str) -> Result<ServerConfig, ConfigError> {
    let base_str = toml::to_string(base).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let mut base_val: toml::Value =
        toml::from_str(&base_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let overlay_val: toml::Value =
        toml::from_str(overlay_toml).map_err(|e| ConfigError::Parse(e.to_string()))?;

    merge_values(&mut base_val, &overlay_val);

    let merged: ServerConfig = base_val
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;

    Ok(merged)
}

/// Recursively merge `overlay` into `base`.
///
/// Tables are merged key-by-key; all other value types are
/// replaced outright.
fn merge_values(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    merge_values(base_val, val);
                } else {
                    base_table.insert(key.clone(), val.clone());
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}
