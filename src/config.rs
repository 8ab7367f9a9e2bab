use std::path::PathBuf;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub api_base: String,
    pub api_key: Option<String>,
    pub analysis_model: String,
    pub image_model: String,
    pub settings_path: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            settings_path: PathBuf::from("floral_settings.json"),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            port: non_empty("PORT").and_then(|v| v.parse().ok()).unwrap_or(defaults.port),
            api_base: non_empty("GEMINI_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            api_key: non_empty("GEMINI_API_KEY"),
            analysis_model: non_empty("GEMINI_ANALYSIS_MODEL").unwrap_or(defaults.analysis_model),
            image_model: non_empty("GEMINI_IMAGE_MODEL").unwrap_or(defaults.image_model),
            settings_path: non_empty("SETTINGS_PATH").map(PathBuf::from).unwrap_or(defaults.settings_path),
            max_upload_bytes: non_empty("MAX_UPLOAD_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn falls_back_to_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.port, 8080);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.api_key, None);
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PORT", "not-a-port"),
            ("GEMINI_API_BASE", "http://127.0.0.1:9999/v1beta/"),
            ("GEMINI_API_KEY", "  "),
            ("GEMINI_ANALYSIS_MODEL", "gemini-test"),
            ("SETTINGS_PATH", "/tmp/floral.json"),
        ]);
        let config = Config::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.port, 8080);
        assert_eq!(config.api_base, "http://127.0.0.1:9999/v1beta");
        assert_eq!(config.api_key, None);
        assert_eq!(config.analysis_model, "gemini-test");
        assert_eq!(config.settings_path, PathBuf::from("/tmp/floral.json"));
    }
}
