use crate::config::toml_config::{FetchOrdering, SearchConfig, DEFAULT_NOTICE_TTL_SECS};
use crate::core::ClinicApi;
use crate::domain::model::{
    ErrorNotice, GeolocationError, Location, NoticeKind, ResultItem, SearchRadius, Service,
    ServiceFilterSet, ServiceId,
};
use crate::utils::error::{LocatorError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// One issued nearby search. The token is monotonically increasing per orchestrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchRequest {
    pub token: u64,
    pub location: Location,
    pub radius: SearchRadius,
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub token: u64,
    pub result: Result<Vec<ResultItem>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDisposition {
    /// Raw results replaced; carries the raw count.
    Applied(usize),
    /// Request failed; previous raw results kept and a notice raised.
    Failed,
    /// A newer request was issued after this one; the response was dropped.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    AwaitingLocation,
    Loading,
    /// A search completed and nothing matched. Not an error.
    Empty,
    Ready(usize),
    /// A location is known but no search has succeeded yet.
    Unavailable,
}

pub struct GeoSearchOrchestrator {
    location: Option<Location>,
    radius: SearchRadius,
    filter: ServiceFilterSet,
    services: Vec<Service>,
    raw_results: Vec<ResultItem>,
    filtered: Vec<ResultItem>,
    ordering: FetchOrdering,
    next_token: u64,
    in_flight: BTreeSet<u64>,
    applied_any: bool,
    notice: Option<ErrorNotice>,
    notice_ttl: chrono::Duration,
}

/// Out-of-range values fall back to the default TTL.
fn notice_ttl(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_NOTICE_TTL_SECS as i64))
}

impl GeoSearchOrchestrator {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            location: None,
            radius: SearchRadius::clamped(config.default_radius_km),
            filter: ServiceFilterSet::new(),
            services: Vec::new(),
            raw_results: Vec::new(),
            filtered: Vec::new(),
            ordering: config.fetch_ordering,
            next_token: 0,
            in_flight: BTreeSet::new(),
            applied_any: false,
            notice: None,
            notice_ttl: notice_ttl(config.notice_ttl_secs),
        }
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }

    pub fn radius(&self) -> SearchRadius {
        self.radius
    }

    pub fn service_filter(&self) -> &ServiceFilterSet {
        &self.filter
    }

    pub fn available_services(&self) -> &[Service] {
        &self.services
    }

    pub fn raw_results(&self) -> &[ResultItem] {
        &self.raw_results
    }

    pub fn filtered_results(&self) -> &[ResultItem] {
        &self.filtered
    }

    pub fn notice(&self) -> Option<&ErrorNotice> {
        self.notice.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.notice.is_some()
    }

    /// Replaces the current fix and issues a search at the current radius.
    pub fn set_location(&mut self, location: Location) -> FetchRequest {
        tracing::debug!("location -> {}", location);
        self.location = Some(location);
        self.fetch(location, self.radius)
    }

    /// Slider input. Never fetches; call [`GeoSearchOrchestrator::apply_radius`] for that.
    pub fn set_radius(&mut self, km: f64) -> SearchRadius {
        self.radius = SearchRadius::clamped(km);
        self.radius
    }

    /// The explicit "apply" action. `None` until a location fix exists.
    pub fn apply_radius(&mut self) -> Option<FetchRequest> {
        let location = self.location?;
        Some(self.fetch(location, self.radius))
    }

    /// Client-side only. An empty set disables filtering.
    pub fn set_service_filter(&mut self, filter: ServiceFilterSet) {
        self.filter = filter;
        self.recompute();
    }

    pub fn toggle_service(&mut self, id: ServiceId) -> bool {
        let selected = self.filter.toggle(id);
        self.recompute();
        selected
    }

    pub fn fetch(&mut self, location: Location, radius: SearchRadius) -> FetchRequest {
        self.next_token += 1;
        let request = FetchRequest {
            token: self.next_token,
            location,
            radius,
        };
        self.in_flight.insert(request.token);
        tracing::info!(
            token = request.token,
            "searching {} within {} km",
            location,
            radius.km()
        );
        request
    }

    /// Performs the request. Holds no borrow of the orchestrator across the await.
    pub async fn execute<A: ClinicApi + ?Sized>(api: &A, request: &FetchRequest) -> FetchOutcome {
        FetchOutcome {
            token: request.token,
            result: api.nearby_clinics(request.location, request.radius).await,
        }
    }

    /// Applies a response. Failures never propagate: they become the notice.
    pub fn complete(&mut self, outcome: FetchOutcome) -> FetchDisposition {
        self.in_flight.remove(&outcome.token);

        if self.ordering == FetchOrdering::LatestIssued && outcome.token < self.next_token {
            tracing::debug!(
                token = outcome.token,
                latest = self.next_token,
                "discarding stale search response"
            );
            return FetchDisposition::Stale;
        }

        match outcome.result {
            Ok(items) => {
                tracing::info!(token = outcome.token, "received {} clinics", items.len());
                self.raw_results = items;
                self.applied_any = true;
                if matches!(&self.notice, Some(n) if n.kind == NoticeKind::Network) {
                    self.notice = None;
                }
                self.recompute();
                FetchDisposition::Applied(self.raw_results.len())
            }
            Err(e) => {
                tracing::warn!(token = outcome.token, "search failed, keeping last results: {}", e);
                self.notice = Some(ErrorNotice::raise(&e));
                FetchDisposition::Failed
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        match self.ordering {
            FetchOrdering::LatestIssued => self.in_flight.contains(&self.next_token),
            FetchOrdering::LastResolved => !self.in_flight.is_empty(),
        }
    }

    pub fn status(&self) -> SearchStatus {
        if !self.applied_any {
            if self.is_loading() {
                return SearchStatus::Loading;
            }
            if self.location.is_none() {
                return SearchStatus::AwaitingLocation;
            }
            return SearchStatus::Unavailable;
        }
        if self.filtered.is_empty() {
            SearchStatus::Empty
        } else {
            SearchStatus::Ready(self.filtered.len())
        }
    }

    /// Catalog for the filter form, loaded once outside the search loop.
    pub fn apply_services(&mut self, result: Result<Vec<Service>>) -> bool {
        match result {
            Ok(services) => {
                tracing::debug!("loaded {} services", services.len());
                self.services = services;
                true
            }
            Err(e) => {
                tracing::warn!("service catalog unavailable: {}", e);
                self.notice = Some(ErrorNotice::raise(&e));
                false
            }
        }
    }

    pub async fn load_services<A: ClinicApi + ?Sized>(&mut self, api: &A) -> bool {
        let result = api.services().await;
        self.apply_services(result)
    }

    pub fn report_geolocation_error(&mut self, err: GeolocationError) {
        let err = LocatorError::from(err);
        tracing::warn!(category = ?err.category(), severity = ?err.severity(), "{}", err);
        self.notice = Some(ErrorNotice::raise(&err));
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Drops the notice once it has been visible for the configured TTL.
    pub fn expire_notice(&mut self, now: DateTime<Utc>) -> bool {
        match &self.notice {
            Some(notice) if now - notice.raised_at >= self.notice_ttl => {
                self.notice = None;
                true
            }
            _ => false,
        }
    }

    // AND 語意：必須提供所有被選取的服務
    fn recompute(&mut self) {
        self.filtered = self
            .raw_results
            .iter()
            .filter(|item| item.offers_all(&self.filter))
            .cloned()
            .collect();
    }
}
