use crate::utils::error::{LocatorError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocatorConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub panel: PanelConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Bottom sheet geometry and gesture thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Collapsed height as a fraction of the full height.
    pub collapsed_ratio: f64,
    /// Partial height as a fraction of the viewport height.
    pub partial_ratio: f64,
    /// Release speed (px/s) above which a gesture counts as a fling.
    pub fling_velocity: f64,
    pub velocity_window_ms: f64,
    pub animation_ms: f64,
    pub content_visibility_threshold_px: f64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            collapsed_ratio: 0.11,
            partial_ratio: 0.45,
            fling_velocity: 500.0,
            velocity_window_ms: 100.0,
            animation_ms: 250.0,
            content_visibility_threshold_px: 24.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOrdering {
    /// Responses older than the newest issued request are dropped.
    #[default]
    LatestIssued,
    /// Whichever response resolves last is applied.
    LastResolved,
}

pub const DEFAULT_NOTICE_TTL_SECS: u64 = 6;
pub const MAX_NOTICE_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_radius_km: f64,
    pub fetch_ordering: FetchOrdering,
    pub notice_ttl_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_radius_km: 5.0,
            fetch_ordering: FetchOrdering::LatestIssued,
            notice_ttl_secs: DEFAULT_NOTICE_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub wide_breakpoint_px: f64,
    pub sidebar_width_px: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            wide_breakpoint_px: 768.0,
            sidebar_width_px: 380.0,
        }
    }
}

impl LocatorConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(LocatorError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LocatorError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CLINIC_API_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| {
            LocatorError::ConfigValidationError {
                field: "environment".to_string(),
                message: e.to_string(),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("api.base_url", &self.api.base_url)?;
        validation::validate_positive_number("api.timeout_seconds", self.api.timeout_seconds, 1)?;

        validation::validate_range("panel.collapsed_ratio", self.panel.collapsed_ratio, 0.0, 1.0)?;
        validation::validate_range("panel.partial_ratio", self.panel.partial_ratio, 0.0, 1.0)?;
        if self.panel.partial_ratio < self.panel.collapsed_ratio {
            return Err(LocatorError::InvalidConfigValueError {
                field: "panel.partial_ratio".to_string(),
                value: self.panel.partial_ratio.to_string(),
                reason: "Partial height must not be below the collapsed height".to_string(),
            });
        }
        validation::validate_range("panel.fling_velocity", self.panel.fling_velocity, 1.0, 100_000.0)?;
        validation::validate_range("panel.velocity_window_ms", self.panel.velocity_window_ms, 1.0, 1_000.0)?;
        validation::validate_range("panel.animation_ms", self.panel.animation_ms, 0.0, 5_000.0)?;
        validation::validate_range(
            "panel.content_visibility_threshold_px",
            self.panel.content_visibility_threshold_px,
            0.0,
            1_000.0,
        )?;

        validation::validate_range(
            "search.default_radius_km",
            self.search.default_radius_km,
            crate::domain::model::MIN_RADIUS_KM,
            crate::domain::model::MAX_RADIUS_KM,
        )?;
        validation::validate_range("search.notice_ttl_secs", self.search.notice_ttl_secs, 1, MAX_NOTICE_TTL_SECS)?;

        validation::validate_range("layout.wide_breakpoint_px", self.layout.wide_breakpoint_px, 1.0, 10_000.0)?;
        validation::validate_range("layout.sidebar_width_px", self.layout.sidebar_width_px, 1.0, 10_000.0)?;

        Ok(())
    }
}

impl Validate for LocatorConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
