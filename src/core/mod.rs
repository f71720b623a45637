pub mod discovery;
pub mod geo_search;
pub mod layout;
pub mod panel_motion;
pub mod view_coordinator;

pub use crate::domain::model::{Location, PanelState, ResultItem, SearchRadius, Service};
pub use crate::domain::ports::{ClinicApi, GeolocationProvider};
pub use crate::utils::error::Result;
