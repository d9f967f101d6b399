use std::io;
use std::path::{Path, PathBuf};

use tinyjson::JsonValue;

use crate::scene::Scenario;

/// Read from the working directory at startup, if present.
pub const CONFIG_FILE: &str = "planets.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid JSON: {0}")]
    Json(#[from] tinyjson::JsonParseError),
    #[error("the configuration must be a JSON object")]
    NotAnObject,
    #[error("\"{key}\" must be {expected}")]
    WrongType { key: String, expected: &'static str },
    #[error("unknown scenario \"{0}\", expected \"orbits\" or \"shading\"")]
    UnknownScenario(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub scenario: Scenario,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    /// Forces the offscreen pass on or off; the scenario decides when unset.
    pub offscreen: Option<bool>,
    pub asset_dir: PathBuf,
    pub shader_dir: PathBuf,
    /// Standard deviation of the compositing blur, in texels.
    pub blur_sigma: Option<f32>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scenario: Scenario::Shading,
            width: 800,
            height: 600,
            vsync: true,
            offscreen: None,
            asset_dir: PathBuf::from("assets"),
            shader_dir: PathBuf::from("shader"),
            blur_sigma: None,
        }
    }
}

impl Config {
    /// Reads the configuration at `path`. A missing file is not an error, the
    /// defaults are used instead.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                log::info!("reading configuration from {}", path.display());
                Config::parse(&text)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::info!("{} not found, using the default configuration", path.display());
                Ok(Config::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_owned(),
                source,
            }),
        }
    }

    pub fn parse(text: &str) -> Result<Config, ConfigError> {
        let json: JsonValue = text.parse()?;
        let JsonValue::Object(fields) = json else {
            return Err(ConfigError::NotAnObject);
        };

        let mut config = Config::default();
        for (key, value) in &fields {
            match key.as_str() {
                "scenario" => {
                    let name = take_string(key, value)?;
                    config.scenario = Scenario::from_name(name)
                        .ok_or_else(|| ConfigError::UnknownScenario(name.to_string()))?;
                }
                "width" => config.width = take_dimension(key, value)?,
                "height" => config.height = take_dimension(key, value)?,
                "vsync" => config.vsync = take_bool(key, value)?,
                "offscreen" => config.offscreen = take_optional(value, |v| take_bool(key, v))?,
                "asset_dir" => config.asset_dir = PathBuf::from(take_string(key, value)?),
                "shader_dir" => config.shader_dir = PathBuf::from(take_string(key, value)?),
                "blur_sigma" => {
                    config.blur_sigma = take_optional(value, |v| Ok(take_number(key, v)? as f32))?
                }
                _ => log::warn!("ignoring unknown configuration key \"{key}\""),
            }
        }
        Ok(config)
    }

    /// Whether frames are drawn through the offscreen target.
    pub fn composites(&self) -> bool {
        self.offscreen
            .unwrap_or_else(|| self.scenario.composites_by_default())
    }
}

fn take_string<'a>(key: &str, value: &'a JsonValue) -> Result<&'a str, ConfigError> {
    match value {
        JsonValue::String(s) => Ok(s),
        _ => Err(wrong_type(key, "a string")),
    }
}

fn take_bool(key: &str, value: &JsonValue) -> Result<bool, ConfigError> {
    match value {
        JsonValue::Boolean(b) => Ok(*b),
        _ => Err(wrong_type(key, "true or false")),
    }
}

fn take_number(key: &str, value: &JsonValue) -> Result<f64, ConfigError> {
    match value {
        JsonValue::Number(n) => Ok(*n),
        _ => Err(wrong_type(key, "a number")),
    }
}

fn take_dimension(key: &str, value: &JsonValue) -> Result<u32, ConfigError> {
    let n = take_number(key, value)?;
    if n < 1.0 || n.fract() != 0.0 || n > i32::MAX as f64 {
        return Err(wrong_type(key, "a positive whole number"));
    }
    Ok(n as u32)
}

fn take_optional<T>(
    value: &JsonValue,
    take: impl FnOnce(&JsonValue) -> Result<T, ConfigError>,
) -> Result<Option<T>, ConfigError> {
    match value {
        JsonValue::Null => Ok(None),
        value => take(value).map(Some),
    }
}

fn wrong_type(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::WrongType {
        key: key.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = Config::parse("{}").unwrap();
        assert_eq!(Config::default(), config);
        assert!(config.composites());
    }

    #[test]
    fn reads_every_key() {
        let config = Config::parse(
            r#"{
                "scenario": "orbits",
                "width": 1024,
                "height": 768,
                "vsync": false,
                "offscreen": true,
                "asset_dir": "data",
                "shader_dir": "glsl",
                "blur_sigma": 1.5
            }"#,
        )
        .unwrap();
        assert_eq!(Scenario::Orbits, config.scenario);
        assert_eq!((1024, 768), (config.width, config.height));
        assert!(!config.vsync);
        assert_eq!(Some(true), config.offscreen);
        assert!(config.composites());
        assert_eq!(PathBuf::from("data"), config.asset_dir);
        assert_eq!(PathBuf::from("glsl"), config.shader_dir);
        assert_eq!(Some(1.5), config.blur_sigma);
    }

    #[test]
    fn scenario_decides_compositing_unless_overridden() {
        let orbits = Config::parse(r#"{"scenario": "orbits"}"#).unwrap();
        assert!(!orbits.composites());
        let shading = Config::parse(r#"{"offscreen": false}"#).unwrap();
        assert!(!shading.composites());
        let nulls = Config::parse(r#"{"offscreen": null, "blur_sigma": null}"#).unwrap();
        assert_eq!(None, nulls.offscreen);
        assert_eq!(None, nulls.blur_sigma);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::parse(r#"{"scenario": "galaxy"}"#),
            Err(ConfigError::UnknownScenario(name)) if name == "galaxy"
        ));
        assert!(matches!(
            Config::parse(r#"{"width": "wide"}"#),
            Err(ConfigError::WrongType { key, .. }) if key == "width"
        ));
        assert!(matches!(
            Config::parse(r#"{"height": 0}"#),
            Err(ConfigError::WrongType { .. })
        ));
        assert!(matches!(Config::parse("[1, 2]"), Err(ConfigError::NotAnObject)));
        assert!(matches!(Config::parse("{"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config = Config::parse(r#"{"fullscreen": true}"#).unwrap();
        assert_eq!(Config::default(), config);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = Config::load(Path::new("no/such/planets.json")).unwrap();
        assert_eq!(Config::default(), config);
    }
}
