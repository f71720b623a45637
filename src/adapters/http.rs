use crate::config::toml_config::ApiConfig;
use crate::core::ClinicApi;
use crate::domain::model::{ClinicId, Location, ResultItem, SearchRadius, Service, ServiceId};
use crate::utils::error::{LocatorError, Result};
use crate::utils::validation::validate_url;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Serialize)]
struct NearbyQuery {
    latitude: f64,
    longitude: f64,
    /// meters
    radius: u32,
}

#[derive(Debug, Deserialize)]
struct ServiceRef {
    id: ServiceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClinicDto {
    id: ClinicId,
    name: String,
    #[serde(default)]
    address: String,
    coordinates: Location,
    #[serde(default)]
    service_ids: Vec<ServiceId>,
    // 舊版 API 直接內嵌服務物件
    #[serde(default)]
    services: Vec<ServiceRef>,
    #[serde(alias = "distanceKm")]
    distance: f64,
}

impl From<ClinicDto> for ResultItem {
    fn from(dto: ClinicDto) -> Self {
        let offered_service_ids = dto
            .service_ids
            .into_iter()
            .chain(dto.services.into_iter().map(|s| s.id))
            .collect();
        ResultItem {
            id: dto.id,
            name: dto.name,
            address: dto.address,
            coordinates: dto.coordinates,
            offered_service_ids,
            distance_km: dto.distance,
        }
    }
}

/// reqwest-backed client for the `/clinics` and `/services` endpoints.
#[derive(Debug, Clone)]
pub struct HttpClinicApi {
    client: Client,
    base_url: Url,
}

impl HttpClinicApi {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Self::with_client(client, &config.base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let mut base_url = validate_url("api.base_url", base_url)?;
        // Url::join 會取代最後一段，所以基底必須以 / 結尾
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| LocatorError::ConfigValidationError {
                field: "api.base_url".to_string(),
                message: format!("cannot build endpoint '{}': {}", path, e),
            })
    }

    async fn get_data<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        tracing::debug!("API response status: {} ({})", status, url);

        if !status.is_success() {
            return Err(LocatorError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl ClinicApi for HttpClinicApi {
    async fn nearby_clinics(&self, location: Location, radius: SearchRadius) -> Result<Vec<ResultItem>> {
        let url = self.endpoint("clinics")?;
        let query = NearbyQuery {
            latitude: location.latitude,
            longitude: location.longitude,
            radius: radius.meters(),
        };
        tracing::debug!("Making API request to: {} {:?}", url, query);

        let clinics: Vec<ClinicDto> = self.get_data(self.client.get(url).query(&query)).await?;
        Ok(clinics.into_iter().map(ResultItem::from).collect())
    }

    async fn services(&self) -> Result<Vec<Service>> {
        let url = self.endpoint("services")?;
        tracing::debug!("Making API request to: {}", url);
        self.get_data(self.client.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_nearby_sends_radius_in_meters() {
        let server = MockServer::start_async().await;
        let api_mock = server.mock_async(|when, then| {
            when.method(GET)
                .path("/api/clinics")
                .query_param("latitude", "14.6")
                .query_param("longitude", "121.05")
                .query_param("radius", "5000");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "data": [{
                        "id": 7,
                        "name": "Clinic A",
                        "address": "12 Rizal Ave",
                        "coordinates": {"latitude": 14.61, "longitude": 121.01},
                        "serviceIds": ["svc1", 2],
                        "distance": 2.0
                    }]
                }));
        }).await;

        let api = HttpClinicApi::new(&server.url("/api")).unwrap();
        let clinics = api
            .nearby_clinics(Location::new(14.6, 121.05), SearchRadius::new(5.0).unwrap())
            .await
            .unwrap();

        api_mock.assert_async().await;
        assert_eq!(clinics.len(), 1);
        assert_eq!(clinics[0].id.as_str(), "7");
        assert_eq!(clinics[0].distance_km, 2.0);
        assert!(clinics[0].offered_service_ids.contains(&ServiceId::new("2")));
        assert!(clinics[0].offered_service_ids.contains(&ServiceId::new("svc1")));
    }

    #[tokio::test]
    async fn test_embedded_service_objects_are_accepted() {
        let server = MockServer::start_async().await;
        let api_mock = server.mock_async(|when, then| {
            when.method(GET).path("/clinics");
            then.status(200).json_body(serde_json::json!({
                "data": [{
                    "id": "c1",
                    "name": "Clinic B",
                    "coordinates": {"latitude": 1.0, "longitude": 2.0},
                    "services": [{"id": "svc9", "name": "Dental"}],
                    "distanceKm": 0.4
                }]
            }));
        }).await;

        let api = HttpClinicApi::new(&server.base_url()).unwrap();
        let clinics = api
            .nearby_clinics(Location::new(1.0, 2.0), SearchRadius::default())
            .await
            .unwrap();

        api_mock.assert_async().await;
        assert_eq!(clinics[0].address, "");
        assert!(clinics[0].offered_service_ids.contains(&ServiceId::new("svc9")));
        assert_eq!(clinics[0].distance_km, 0.4);
    }

    #[tokio::test]
    async fn test_services_endpoint() {
        let server = MockServer::start_async().await;
        let api_mock = server.mock_async(|when, then| {
            when.method(GET).path("/services");
            then.status(200).json_body(serde_json::json!({
                "data": [{"id": 1, "name": "Consultation"}, {"id": "svc2", "name": "Vaccination"}]
            }));
        }).await;

        let api = HttpClinicApi::new(&server.base_url()).unwrap();
        let services = api.services().await.unwrap();

        api_mock.assert_async().await;
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].id.as_str(), "1");
        assert_eq!(services[1].name, "Vaccination");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/clinics");
            then.status(503);
        }).await;

        let api = HttpClinicApi::new(&server.base_url()).unwrap();
        let err = api
            .nearby_clinics(Location::new(0.0, 0.0), SearchRadius::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LocatorError::HttpStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_serialization_error() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/services");
            then.status(200).body("{\"items\": []}");
        }).await;

        let api = HttpClinicApi::new(&server.base_url()).unwrap();
        let err = api.services().await.unwrap_err();
        assert!(matches!(err, LocatorError::SerializationError(_)));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let api = HttpClinicApi::new("https://clinics.example.com/api/v1").unwrap();
        assert_eq!(
            api.endpoint("clinics").unwrap().as_str(),
            "https://clinics.example.com/api/v1/clinics"
        );
        assert!(HttpClinicApi::new("not a url").is_err());
    }
}
