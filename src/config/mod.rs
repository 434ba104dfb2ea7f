pub mod runtime;
pub use runtime::TimingConfig;

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Complete application configuration (TOML file)
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub hass: HassConfig,
    pub remote: RemoteConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Home Assistant connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HassConfig {
    /// Base URL, e.g. "http://homeassistant.local:8123"
    pub url: String,
    /// Long-lived access token
    pub token: String,
    /// How often the binary polls the remote entity state (seconds)
    pub poll_interval_secs: u64,
}

impl Default for HassConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("HASS_URL")
                .unwrap_or_else(|_| "http://homeassistant.local:8123".to_string()),
            token: std::env::var("HASS_TOKEN").unwrap_or_default(),
            poll_interval_secs: 2,
        }
    }
}

/// Remote panel options.
///
/// Unknown keys are ignored so dashboard configs can be pasted in as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Target remote entity (required)
    #[serde(default)]
    pub entity: String,
    #[serde(default = "default_true")]
    pub show_activity: bool,
    #[serde(default = "default_true")]
    pub show_dpad: bool,
    #[serde(default = "default_true")]
    pub show_nav: bool,
    #[serde(default = "default_true")]
    pub show_mid: bool,
    #[serde(default = "default_true")]
    pub show_media: bool,
    #[serde(default = "default_true")]
    pub show_colors: bool,
    #[serde(default = "default_true")]
    pub show_abc: bool,
    /// Legacy combined toggle for the macros and favorites buttons
    #[serde(default = "default_true")]
    pub show_macro_favorites: bool,
    #[serde(default)]
    pub show_macros_button: Option<bool>,
    #[serde(default)]
    pub show_favorites_button: Option<bool>,
    /// Raw user-authored favorites; normalised by `crate::favorites`
    #[serde(default)]
    pub custom_favorites: Vec<Value>,
    #[serde(default)]
    pub theme: String,
    /// `[r, g, b]` or `{ r, g, b }`
    #[serde(default)]
    pub background_override: Option<Value>,
    #[serde(default)]
    pub max_width: MaxWidth,
}

fn default_true() -> bool {
    true
}

/// Panel width limit: a pixel count or any CSS length
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MaxWidth {
    Pixels(f64),
    Css(String),
}

impl Default for MaxWidth {
    fn default() -> Self {
        MaxWidth::Pixels(360.0)
    }
}

impl MaxWidth {
    pub fn to_css(&self) -> Option<String> {
        match self {
            MaxWidth::Pixels(px) if px.is_finite() && *px > 0.0 => Some(format!("{}px", px)),
            MaxWidth::Pixels(_) => None,
            MaxWidth::Css(s) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else {
                    Some(s.to_string())
                }
            }
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    MissingEntity,
    Read(String),
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingEntity => write!(f, "Select a Sofabaton remote entity"),
            ConfigError::Read(e) => write!(f, "failed to read config: {}", e),
            ConfigError::Parse(e) => write!(f, "failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl RemoteConfig {
    /// Config with defaults for every option except the entity
    pub fn for_entity(entity: &str) -> Self {
        Self {
            entity: entity.to_string(),
            show_activity: true,
            show_dpad: true,
            show_nav: true,
            show_mid: true,
            show_media: true,
            show_colors: true,
            show_abc: true,
            show_macro_favorites: true,
            show_macros_button: None,
            show_favorites_button: None,
            custom_favorites: Vec::new(),
            theme: String::new(),
            background_override: None,
            max_width: MaxWidth::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entity.trim().is_empty() {
            return Err(ConfigError::MissingEntity);
        }
        Ok(())
    }

    pub fn show_macros_button(&self) -> bool {
        self.show_macros_button.unwrap_or(self.show_macro_favorites)
    }

    pub fn show_favorites_button(&self) -> bool {
        self.show_favorites_button.unwrap_or(self.show_macro_favorites)
    }

    /// `background_override` as a CSS color, if it holds three numbers
    pub fn background_css(&self) -> Option<String> {
        let value = self.background_override.as_ref()?;
        let channels = match value {
            Value::Array(items) if items.len() >= 3 => [&items[0], &items[1], &items[2]],
            Value::Object(map) => [map.get("r")?, map.get("g")?, map.get("b")?],
            _ => return None,
        };
        let mut rgb = [0f64; 3];
        for (slot, channel) in rgb.iter_mut().zip(channels) {
            *slot = crate::entity::coerce_number(channel)?;
        }
        Some(format!("rgb({}, {}, {})", rgb[0], rgb[1], rgb[2]))
    }
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig =
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.remote.validate()?;
    Ok(config)
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
    parse_config(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = parse_config(
            r#"
            [remote]
            entity = "remote.living_room"
        "#,
        )
        .unwrap();
        assert_eq!(config.remote.entity, "remote.living_room");
        assert!(config.remote.show_dpad);
        assert!(config.remote.show_abc);
        assert!(config.remote.show_macros_button());
        assert!(config.remote.show_favorites_button());
        assert_eq!(config.remote.max_width.to_css().as_deref(), Some("360px"));
        assert_eq!(config.timing.command_gap_ms, 150);
        assert_eq!(config.timing.request_gap_ms, 3000);
        assert_eq!(config.hass.poll_interval_secs, 2);
    }

    #[test]
    fn test_missing_entity_is_rejected() {
        let err = parse_config("[remote]\nshow_dpad = false\n").unwrap_err();
        assert_eq!(err, ConfigError::MissingEntity);

        let err = parse_config("[remote]\nentity = \"  \"\n").unwrap_err();
        assert_eq!(err, ConfigError::MissingEntity);
    }

    #[test]
    fn test_drawer_button_legacy_fallback() {
        let mut config = RemoteConfig::for_entity("remote.x");
        config.show_macro_favorites = false;
        assert!(!config.show_macros_button());
        assert!(!config.show_favorites_button());

        config.show_macros_button = Some(true);
        assert!(config.show_macros_button());
        assert!(!config.show_favorites_button());

        config.show_macro_favorites = true;
        config.show_favorites_button = Some(false);
        assert!(!config.show_favorites_button());
    }

    #[test]
    fn test_background_override_shapes() {
        let mut config = RemoteConfig::for_entity("remote.x");
        config.background_override = Some(serde_json::json!([10, 20, 30]));
        assert_eq!(config.background_css().as_deref(), Some("rgb(10, 20, 30)"));

        config.background_override = Some(serde_json::json!({"r": 1, "g": "2", "b": 3}));
        assert_eq!(config.background_css().as_deref(), Some("rgb(1, 2, 3)"));

        config.background_override = Some(serde_json::json!([1, "x", 3]));
        assert_eq!(config.background_css(), None);

        config.background_override = Some(serde_json::json!([1, 2]));
        assert_eq!(config.background_css(), None);
    }

    #[test]
    fn test_max_width_css_length() {
        let config = parse_config(
            r#"
            [remote]
            entity = "remote.x"
            max_width = " 40rem "
        "#,
        )
        .unwrap();
        assert_eq!(config.remote.max_width.to_css().as_deref(), Some("40rem"));
        assert_eq!(MaxWidth::Css("".into()).to_css(), None);
    }

    #[test]
    fn test_custom_favorites_from_toml() {
        let config = parse_config(
            r#"
            [remote]
            entity = "remote.x"

            [[remote.custom_favorites]]
            name = "Netflix"
            command_id = 12
            device_id = 3
        "#,
        )
        .unwrap();
        assert_eq!(config.remote.custom_favorites.len(), 1);
        assert_eq!(config.remote.custom_favorites[0]["name"], "Netflix");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[hass]\nurl = \"http://ha:8123\"\ntoken = \"abc\"\n\n[remote]\nentity = \"remote.hub\"\n\n[timing]\nrequest_gap_ms = 5000"
        )
        .unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.hass.url, "http://ha:8123");
        assert_eq!(config.hass.token, "abc");
        assert_eq!(config.timing.request_gap_ms, 5000);
        assert_eq!(config.timing.command_gap_ms, 150);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/sofabaton.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read(_)));
    }
}
