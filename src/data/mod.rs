//! Data services — static JSON-backed lookups standing in for a real backend.
//!
//! The core only depends on the [`DataService`] trait: the surfaces return
//! shaped data, may fail, and may be slow. `StaticDataService` serves the
//! embedded fixtures with simulated latency; `FailingDataService` is the
//! test double for the error paths.

pub mod model;

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::DataError;

pub use model::{
    DayForecast, Deadline, Diagnosis, PlantProtectionBundle, Scheme, Severity, WeatherReport,
    WeatherSnapshot,
};

/// Filters for scheme search.
#[derive(Debug, Clone, Default)]
pub struct SchemeFilter {
    pub category: Option<String>,
    pub crop_type: Option<String>,
}

/// Read-only query surface consumed by the composer and the flow navigator.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Current conditions for a location.
    async fn current_weather(&self, location: &str) -> Result<WeatherSnapshot, DataError>;

    /// Multi-day forecast for a location.
    async fn forecast(&self, location: &str) -> Result<Vec<DayForecast>, DataError>;

    /// All schemes, fixture order.
    async fn all_schemes(&self) -> Result<Vec<Scheme>, DataError>;

    /// Scheme lookup by id.
    async fn scheme_by_id(&self, id: &str) -> Result<Option<Scheme>, DataError>;

    /// Text + filter search over schemes. The "All" crop wildcard matches
    /// every crop filter.
    async fn search_schemes(
        &self,
        query: &str,
        filter: &SchemeFilter,
    ) -> Result<Vec<Scheme>, DataError>;

    /// Crops, symptoms, diagnoses, and tips in one fetch.
    async fn protection_bundle(&self) -> Result<PlantProtectionBundle, DataError>;

    /// Preventive tips only.
    async fn preventive_tips(&self) -> Result<Vec<String>, DataError>;

    /// Best diagnosis for a crop given observed symptoms, by symptom-overlap
    /// count. `None` when no record for the crop shares a symptom.
    async fn diagnose(
        &self,
        crop: &str,
        symptoms: &[String],
    ) -> Result<Option<Diagnosis>, DataError>;
}

/// Per-surface simulated latency.
#[derive(Debug, Clone)]
pub struct LatencyProfile {
    pub weather: Duration,
    pub schemes: Duration,
    pub bundle: Duration,
    pub tips: Duration,
    pub diagnose: Duration,
}

impl Default for LatencyProfile {
    fn default() -> Self {
        Self {
            weather: Duration::from_millis(500),
            schemes: Duration::from_millis(300),
            bundle: Duration::from_millis(300),
            tips: Duration::from_millis(100),
            diagnose: Duration::from_millis(800),
        }
    }
}

impl LatencyProfile {
    /// No simulated latency (tests, headless use).
    pub fn off() -> Self {
        Self {
            weather: Duration::ZERO,
            schemes: Duration::ZERO,
            bundle: Duration::ZERO,
            tips: Duration::ZERO,
            diagnose: Duration::ZERO,
        }
    }
}

/// Data service backed by the JSON fixtures compiled into the binary.
pub struct StaticDataService {
    weather: WeatherReport,
    schemes: Vec<Scheme>,
    protection: PlantProtectionBundle,
    latency: LatencyProfile,
}

impl StaticDataService {
    /// Parse the embedded fixtures. Fails only if the bundled JSON is
    /// malformed, which indicates a broken build.
    pub fn from_embedded(latency: LatencyProfile) -> Result<Self, DataError> {
        let weather: WeatherReport = serde_json::from_str(include_str!("../../data/weather.json"))
            .map_err(|source| DataError::Malformed {
                file: "weather.json",
                source,
            })?;
        let schemes: Vec<Scheme> = serde_json::from_str(include_str!("../../data/schemes.json"))
            .map_err(|source| DataError::Malformed {
                file: "schemes.json",
                source,
            })?;
        let protection: PlantProtectionBundle =
            serde_json::from_str(include_str!("../../data/plant_protection.json")).map_err(
                |source| DataError::Malformed {
                    file: "plant_protection.json",
                    source,
                },
            )?;
        Ok(Self {
            weather,
            schemes,
            protection,
            latency,
        })
    }

    /// Fixture service with latency simulation off (for tests).
    pub fn fixture() -> Self {
        Self::from_embedded(LatencyProfile::off()).expect("embedded fixtures must parse")
    }

    async fn simulate(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl DataService for StaticDataService {
    async fn current_weather(&self, location: &str) -> Result<WeatherSnapshot, DataError> {
        self.simulate(self.latency.weather).await;
        debug!(location = location, "Serving current weather");
        let mut current = self.weather.current.clone();
        // The fixture describes one station; report it under the asked-for name.
        if !location.is_empty() {
            current.location = location.to_string();
        }
        Ok(current)
    }

    async fn forecast(&self, location: &str) -> Result<Vec<DayForecast>, DataError> {
        self.simulate(self.latency.weather).await;
        debug!(location = location, "Serving forecast");
        Ok(self.weather.forecast.clone())
    }

    async fn all_schemes(&self) -> Result<Vec<Scheme>, DataError> {
        self.simulate(self.latency.schemes).await;
        Ok(self.schemes.clone())
    }

    async fn scheme_by_id(&self, id: &str) -> Result<Option<Scheme>, DataError> {
        self.simulate(self.latency.schemes).await;
        Ok(self.schemes.iter().find(|s| s.id == id).cloned())
    }

    async fn search_schemes(
        &self,
        query: &str,
        filter: &SchemeFilter,
    ) -> Result<Vec<Scheme>, DataError> {
        self.simulate(self.latency.schemes).await;
        let query = query.to_lowercase();
        let results = self
            .schemes
            .iter()
            .filter(|s| {
                query.is_empty()
                    || s.title.to_lowercase().contains(&query)
                    || s.short_description.to_lowercase().contains(&query)
            })
            .filter(|s| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|category| s.category == category)
            })
            .filter(|s| {
                filter
                    .crop_type
                    .as_deref()
                    .is_none_or(|crop| s.covers_crop(crop))
            })
            .cloned()
            .collect();
        Ok(results)
    }

    async fn protection_bundle(&self) -> Result<PlantProtectionBundle, DataError> {
        self.simulate(self.latency.bundle).await;
        Ok(self.protection.clone())
    }

    async fn preventive_tips(&self) -> Result<Vec<String>, DataError> {
        self.simulate(self.latency.tips).await;
        Ok(self.protection.preventive_tips.clone())
    }

    async fn diagnose(
        &self,
        crop: &str,
        symptoms: &[String],
    ) -> Result<Option<Diagnosis>, DataError> {
        self.simulate(self.latency.diagnose).await;
        // First record wins on overlap ties, so results are stable across runs.
        let mut best: Option<(usize, &Diagnosis)> = None;
        for diagnosis in self.protection.diagnoses.iter().filter(|d| d.crop == crop) {
            let overlap = diagnosis
                .symptoms
                .iter()
                .filter(|s| symptoms.contains(s))
                .count();
            if overlap > 0 && best.map_or(true, |(top, _)| overlap > top) {
                best = Some((overlap, diagnosis));
            }
        }
        Ok(best.map(|(_, d)| d.clone()))
    }
}

/// Data service where every surface fails — exercises the apology paths.
pub struct FailingDataService;

impl FailingDataService {
    fn unavailable(surface: &str) -> DataError {
        DataError::Unavailable {
            surface: surface.to_string(),
        }
    }
}

#[async_trait]
impl DataService for FailingDataService {
    async fn current_weather(&self, _location: &str) -> Result<WeatherSnapshot, DataError> {
        Err(Self::unavailable("weather"))
    }

    async fn forecast(&self, _location: &str) -> Result<Vec<DayForecast>, DataError> {
        Err(Self::unavailable("forecast"))
    }

    async fn all_schemes(&self) -> Result<Vec<Scheme>, DataError> {
        Err(Self::unavailable("schemes"))
    }

    async fn scheme_by_id(&self, _id: &str) -> Result<Option<Scheme>, DataError> {
        Err(Self::unavailable("schemes"))
    }

    async fn search_schemes(
        &self,
        _query: &str,
        _filter: &SchemeFilter,
    ) -> Result<Vec<Scheme>, DataError> {
        Err(Self::unavailable("schemes"))
    }

    async fn protection_bundle(&self) -> Result<PlantProtectionBundle, DataError> {
        Err(Self::unavailable("plant-protection"))
    }

    async fn preventive_tips(&self) -> Result<Vec<String>, DataError> {
        Err(Self::unavailable("plant-protection"))
    }

    async fn diagnose(
        &self,
        _crop: &str,
        _symptoms: &[String],
    ) -> Result<Option<Diagnosis>, DataError> {
        Err(Self::unavailable("plant-protection"))
    }
}
