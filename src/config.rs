use crate::SelectionMode;
use derive_more::Display;
use serde::Deserialize;
use std::{collections::HashMap, env, error::Error, str::FromStr};
use tracing::warn;

/// Environment variable selecting the [`SelectionMode`].
pub const MODE_ENV: &str = "SERVICE_LOCATOR_MODE";

/// Environment variable selecting the [`ConstructorSelection`].
pub const CONSTRUCTOR_SELECTION_ENV: &str =
    "SERVICE_LOCATOR_CONSTRUCTOR_SELECTION";

/// How a constructor is chosen when a type declares more than one.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstructorSelection {
    /// Always use the constructor with the most parameters, even if one of
    /// its dependencies can't be resolved.
    Widest,
    /// Use the constructor with the most parameters, falling back to the next
    /// widest one while a dependency can't be resolved.
    #[default]
    WidestResolvable,
}

impl FromStr for ConstructorSelection {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "widest" => Ok(ConstructorSelection::Widest),
            "widest-resolvable" => Ok(ConstructorSelection::WidestResolvable),
            _ => Err(ConfigError::InvalidValue {
                key: CONSTRUCTOR_SELECTION_ENV,
                value: value.to_owned(),
            }),
        }
    }
}

/// Options used when creating containers.
///
/// ```
/// use service_locator::{
///     ConstructorSelection, ContainerOptions, SelectionMode,
/// };
///
/// let options = ContainerOptions::from_toml_str(
///     r#"
///     mode = "prefer-minimal"
///     constructor-selection = "widest"
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(SelectionMode::PreferMinimal, options.mode);
/// assert_eq!(ConstructorSelection::Widest, options.constructor_selection);
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ContainerOptions {
    /// Which back-end the selector tries first.
    pub mode: SelectionMode,
    /// How containers choose between the constructors of a type.
    pub constructor_selection: ConstructorSelection,
}

impl ContainerOptions {
    /// Parses options from a TOML document. Missing keys keep their default
    /// values.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Reads options from the environment. Unset variables keep their
    /// default values, and invalid values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut env_map = HashMap::new();
        for key in [MODE_ENV, CONSTRUCTOR_SELECTION_ENV] {
            if let Ok(value) = env::var(key) {
                env_map.insert(key.to_owned(), value);
            }
        }

        ContainerOptions::default().with_env_map(&env_map)
    }

    /// Overrides these options with the values in `env_map`, which is keyed
    /// by environment variable name.
    #[must_use]
    pub fn with_env_map(mut self, env_map: &HashMap<String, String>) -> Self {
        if let Some(mode) = parse_var(env_map, MODE_ENV) {
            self.mode = mode;
        }

        if let Some(selection) = parse_var(env_map, CONSTRUCTOR_SELECTION_ENV) {
            self.constructor_selection = selection;
        }

        self
    }
}

fn parse_var<T>(env_map: &HashMap<String, String>, key: &str) -> Option<T>
where
    T: FromStr<Err = ConfigError>,
{
    let value = env_map.get(key)?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(error) => {
            warn!(%error, "ignoring environment variable");
            None
        }
    }
}

/// An error that occurred while loading configuration.
#[derive(Debug, Display)]
#[non_exhaustive]
pub enum ConfigError {
    /// A configuration document could not be parsed.
    #[display(fmt = "failed to parse configuration: {}", _0)]
    Parse(toml::de::Error),

    /// A configuration value is not recognized.
    #[display(fmt = "invalid value {:?} for {}", value, key)]
    InvalidValue {
        /// The setting the value was given for.
        key: &'static str,

        /// The value that was given.
        value: String,
    },

    /// The global service locator was configured more than once.
    #[display(fmt = "the service locator has already been configured")]
    AlreadyConfigured,
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Parse(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn missing_keys_use_defaults() {
        let options = ContainerOptions::from_toml_str("").unwrap();
        assert_eq!(ContainerOptions::default(), options);
        assert_eq!(SelectionMode::Auto, options.mode);
        assert_eq!(
            ConstructorSelection::WidestResolvable,
            options.constructor_selection
        );
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        match ContainerOptions::from_toml_str(r#"mode = "fastest""#) {
            Err(error @ ConfigError::Parse(_)) => {
                assert!(error.source().is_some());
            }
            Err(error) => panic!("unexpected error: {error}"),
            Ok(options) => panic!("parsed invalid options: {options:?}"),
        }
    }

    #[test]
    fn environment_overrides_defaults() {
        let options = ContainerOptions::default().with_env_map(&env_map(&[
            (MODE_ENV, "prefer-rich"),
            (CONSTRUCTOR_SELECTION_ENV, "widest"),
        ]));
        assert_eq!(SelectionMode::PreferRich, options.mode);
        assert_eq!(ConstructorSelection::Widest, options.constructor_selection);
    }

    #[test]
    fn invalid_environment_values_are_ignored() {
        let options = ContainerOptions {
            mode: SelectionMode::PreferMinimal,
            ..ContainerOptions::default()
        }
        .with_env_map(&env_map(&[
            (MODE_ENV, "sometimes"),
            (CONSTRUCTOR_SELECTION_ENV, " widest-resolvable "),
        ]));
        assert_eq!(SelectionMode::PreferMinimal, options.mode);
        assert_eq!(
            ConstructorSelection::WidestResolvable,
            options.constructor_selection
        );
    }
}
