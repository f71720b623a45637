use crate::domain::model::{GeolocationError, Location, ResultItem, SearchRadius, Service};
use crate::utils::error::Result;
use async_trait::async_trait;

/// The two backend endpoints the discovery panel consumes.
#[async_trait]
pub trait ClinicApi: Send + Sync {
    async fn nearby_clinics(&self, location: Location, radius: SearchRadius) -> Result<Vec<ResultItem>>;
    async fn services(&self) -> Result<Vec<Service>>;
}

#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn current_position(&self) -> std::result::Result<Location, GeolocationError>;
}
