use crate::core::GeolocationProvider;
use crate::domain::model::{GeolocationError, Location};
use async_trait::async_trait;

/// A position supplied up front (CLI flags, tests, desktop hosts without a GPS).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedGeolocation {
    position: Result<Location, GeolocationError>,
}

impl FixedGeolocation {
    pub fn at(location: Location) -> Self {
        Self {
            position: Ok(location),
        }
    }

    pub fn failing(error: GeolocationError) -> Self {
        Self {
            position: Err(error),
        }
    }

    /// Builds from optional coordinates; a missing or out-of-range value means no fix.
    pub fn from_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Self {
        match (latitude, longitude) {
            (Some(lat), Some(lon))
                if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) =>
            {
                Self::at(Location::new(lat, lon))
            }
            _ => Self::failing(GeolocationError::PositionUnavailable),
        }
    }
}

#[async_trait]
impl GeolocationProvider for FixedGeolocation {
    async fn current_position(&self) -> Result<Location, GeolocationError> {
        self.position
    }
}
