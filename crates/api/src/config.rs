use fastmal_core::annotation::{
    Markers, DEFAULT_ANNOTATE_TAG, DEFAULT_COMMENT_NAMESPACE, DEFAULT_LABEL_FILE_SUFFIX,
    DEFAULT_ROI_COMPLETE_TAG,
};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Marker tags, comment namespace and label file naming.
    pub annotations: AnnotationConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            annotations: AnnotationConfig::from_env(),
        }
    }
}

/// Names of the tags, namespace and label file suffix the workflow uses.
#[derive(Debug, Clone, Default)]
pub struct AnnotationConfig {
    pub markers: Markers,
}

impl AnnotationConfig {
    /// Load annotation markers from environment variables.
    ///
    /// | Env Var                     | Default                                   |
    /// |-----------------------------|-------------------------------------------|
    /// | `FASTMAL_ANNOTATE_TAG`      | `FASTMAL_ANNOTATE`                        |
    /// | `FASTMAL_ROI_COMPLETE_TAG`  | `FASTMAL_ROI_COMPLETE`                    |
    /// | `FASTMAL_COMMENT_NAMESPACE` | `openmicroscopy.org/fastmal/roi_comment`  |
    /// | `FASTMAL_LABEL_FILE_SUFFIX` | `_RoiLabels.json`                         |
    ///
    /// The annotate tag marks both datasets and images.
    pub fn from_env() -> Self {
        let var = |name: &str, default: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let annotate = var("FASTMAL_ANNOTATE_TAG", DEFAULT_ANNOTATE_TAG);

        Self {
            markers: Markers {
                dataset_annotate: annotate.clone(),
                image_annotate: annotate,
                roi_complete: var("FASTMAL_ROI_COMPLETE_TAG", DEFAULT_ROI_COMPLETE_TAG),
                comment_namespace: var("FASTMAL_COMMENT_NAMESPACE", DEFAULT_COMMENT_NAMESPACE),
                label_file_suffix: var("FASTMAL_LABEL_FILE_SUFFIX", DEFAULT_LABEL_FILE_SUFFIX),
            },
        }
    }
}

/// Log output format, selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines (default).
    #[default]
    Text,
    /// One JSON object per event, for log shippers.
    Json,
}

impl LogFormat {
    /// Parse `text` or `json`, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Read `LOG_FORMAT`, defaulting to [`LogFormat::Text`] when unset.
    ///
    /// Panics at startup on an unknown value.
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(raw) => Self::parse(&raw)
                .unwrap_or_else(|| panic!("LOG_FORMAT must be 'text' or 'json', got '{raw}'")),
            Err(_) => Self::default(),
        }
    }
}
