use crate::config::toml_config::LocatorConfig;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "clinic-locator")]
#[command(about = "Find clinics near a location and preview the discovery panel layout")]
pub struct CliConfig {
    #[arg(long, help = "Path to a TOML configuration file")]
    pub config: Option<String>,

    #[arg(long, help = "Overrides api.base_url from the configuration file")]
    pub api_base_url: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub latitude: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub longitude: Option<f64>,

    #[arg(long, help = "Search radius in km (1-50)")]
    pub radius_km: Option<f64>,

    #[arg(long = "service", help = "Required service id; repeat for AND filtering")]
    pub services: Vec<String>,

    #[arg(long, default_value = "390")]
    pub viewport_width: f64,

    #[arg(long, default_value = "844")]
    pub viewport_height: f64,

    #[arg(long, help = "Print the composed layout as JSON")]
    pub json: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Loads the file (or defaults) and applies command-line overrides.
    pub fn resolve(&self) -> Result<LocatorConfig> {
        let mut config = match &self.config {
            Some(path) => LocatorConfig::from_file(path)?,
            None => LocatorConfig::default(),
        };
        if let Some(url) = &self.api_base_url {
            config.api.base_url = url.clone();
        }
        if let Some(radius) = self.radius_km {
            config.search.default_radius_km = radius;
        }
        config.validate_config()?;
        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_range("latitude", *validation::validate_required_field("latitude", &self.latitude)?, -90.0, 90.0)?;
        validation::validate_range("longitude", *validation::validate_required_field("longitude", &self.longitude)?, -180.0, 180.0)?;
        validation::validate_range("viewport_width", self.viewport_width, 1.0, 10_000.0)?;
        validation::validate_range("viewport_height", self.viewport_height, 1.0, 10_000.0)?;
        Ok(())
    }
}
