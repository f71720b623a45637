pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{geolocation::FixedGeolocation, http::HttpClinicApi};
pub use config::LocatorConfig;
pub use core::discovery::{Composition, DiscoveryScreen};
pub use utils::error::{LocatorError, Result};
