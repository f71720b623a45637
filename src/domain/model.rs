use crate::utils::error::{ErrorCategory, LocatorError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub const MIN_RADIUS_KM: f64 = 1.0;
pub const MAX_RADIUS_KM: f64 = 50.0;

/// A geographic fix. Replaced wholesale, never patched field by field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.latitude, self.longitude)
    }
}

/// Search radius in kilometers, always within `[MIN_RADIUS_KM, MAX_RADIUS_KM]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct SearchRadius(f64);

impl SearchRadius {
    pub fn new(km: f64) -> Result<Self> {
        crate::utils::validation::validate_range("radius_km", km, MIN_RADIUS_KM, MAX_RADIUS_KM)?;
        Ok(Self(km))
    }

    /// Saturating constructor for slider input. Non-finite input falls back to the minimum.
    pub fn clamped(km: f64) -> Self {
        if km.is_finite() {
            Self(km.clamp(MIN_RADIUS_KM, MAX_RADIUS_KM))
        } else {
            Self(MIN_RADIUS_KM)
        }
    }

    pub fn km(&self) -> f64 {
        self.0
    }

    /// The nearby endpoint takes whole meters.
    pub fn meters(&self) -> u32 {
        (self.0 * 1000.0).round() as u32
    }
}

impl Default for SearchRadius {
    fn default() -> Self {
        Self(5.0)
    }
}

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                deserialize_id(deserializer).map(Self)
            }
        }
    };
}

string_id!(ClinicId);
string_id!(ServiceId);

/// 後端有時給數字 id，有時給字串 id，統一轉成字串
fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Unsigned(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Unsigned(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
}

/// One nearby clinic as returned by the radius search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultItem {
    pub id: ClinicId,
    pub name: String,
    pub address: String,
    pub coordinates: Location,
    pub offered_service_ids: BTreeSet<ServiceId>,
    pub distance_km: f64,
}

impl ResultItem {
    pub fn offers_all(&self, filter: &ServiceFilterSet) -> bool {
        filter.iter().all(|id| self.offered_service_ids.contains(id))
    }
}

/// Selected service filters. Empty means "no filtering".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ServiceFilterSet(BTreeSet<ServiceId>);

impl ServiceFilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, id: &ServiceId) -> bool {
        self.0.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceId> {
        self.0.iter()
    }

    /// Returns true when the id was newly selected.
    pub fn toggle(&mut self, id: ServiceId) -> bool {
        if self.0.remove(&id) {
            false
        } else {
            self.0.insert(id);
            true
        }
    }
}

impl<I: Into<ServiceId>> FromIterator<I> for ServiceFilterSet {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelState {
    Collapsed,
    Partial,
    Full,
}

impl PanelState {
    pub const ALL: [PanelState; 3] = [PanelState::Collapsed, PanelState::Partial, PanelState::Full];

    pub fn expanded(self) -> Self {
        match self {
            PanelState::Collapsed => PanelState::Partial,
            PanelState::Partial | PanelState::Full => PanelState::Full,
        }
    }

    pub fn collapsed(self) -> Self {
        match self {
            PanelState::Full => PanelState::Partial,
            PanelState::Partial | PanelState::Collapsed => PanelState::Collapsed,
        }
    }
}

impl fmt::Display for PanelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PanelState::Collapsed => "collapsed",
            PanelState::Partial => "partial",
            PanelState::Full => "full",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeolocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("timed out waiting for a position")]
    Timeout,
}

impl GeolocationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            GeolocationError::PermissionDenied => {
                "Location permission was denied. Enable it to find clinics near you."
            }
            GeolocationError::PositionUnavailable => "Your position is currently unavailable.",
            GeolocationError::Timeout => "Finding your location took too long. Please try again.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Network,
    Geolocation,
}

/// A transient, dismissible error shown over the results. Never blocks input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorNotice {
    pub kind: NoticeKind,
    pub message: String,
    pub raised_at: chrono::DateTime<chrono::Utc>,
}

impl ErrorNotice {
    /// Device errors become geolocation notices; everything else is reported as a network problem.
    pub fn raise(err: &LocatorError) -> Self {
        let kind = match err.category() {
            ErrorCategory::Device => NoticeKind::Geolocation,
            _ => NoticeKind::Network,
        };
        Self {
            kind,
            message: err.user_friendly_message(),
            raised_at: chrono::Utc::now(),
        }
    }
}
