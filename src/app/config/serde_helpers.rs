use clap::ValueEnum;

/// Helper function to load and parse an environment variable.
/// Returns Ok(()) if the variable doesn't exist (keeps default).
pub fn load_env_var<T>(name: &str, target: &mut T) -> Result<(), super::ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(name) {
        *target = value
            .parse()
            .map_err(|e| super::ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
    }
    Ok(())
}

/// Helper function to load a case-insensitive `ValueEnum` environment variable.
pub fn load_env_enum<T: ValueEnum>(name: &str, target: &mut T) -> Result<(), super::ConfigError> {
    if let Ok(value) = std::env::var(name) {
        *target = T::from_str(&value, true)
            .map_err(|e| super::ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
    }
    Ok(())
}

/// Helper function to load an optional string environment variable.
pub fn load_env_string_opt(name: &str, target: &mut Option<String>) {
    if let Ok(value) = std::env::var(name) {
        *target = Some(value);
    }
}

/// Helper function to load a string environment variable.
pub fn load_env_string(name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(name) {
        *target = value;
    }
}

/// Helper function to load a comma-separated list environment variable.
pub fn load_env_list(name: &str, target: &mut Vec<String>) {
    if let Ok(value) = std::env::var(name) {
        *target = value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
    }
}

/// Helper function to load an optional PathBuf environment variable.
pub fn load_env_path_opt(name: &str, target: &mut Option<std::path::PathBuf>) {
    if let Ok(value) = std::env::var(name) {
        *target = Some(std::path::PathBuf::from(value));
    }
}
