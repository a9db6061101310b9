//! Read-only data models served by the data services.
//!
//! Wire layout is camelCase JSON, matching the persisted fixture files.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Current conditions for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub location: String,
    /// Degrees Celsius.
    pub temperature: i32,
    pub condition: String,
    /// Relative humidity, percent.
    pub humidity: u32,
    /// Kilometres per hour.
    pub wind_speed: u32,
    pub sunrise: String,
    pub sunset: String,
}

/// One day of the forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayForecast {
    pub day: String,
    pub high: i32,
    pub low: i32,
    pub condition: String,
    /// Probability of rain, percent.
    pub rain_chance: u32,
}

/// Full weather report: current conditions plus the multi-day forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub current: WeatherSnapshot,
    pub forecast: Vec<DayForecast>,
}

/// Application deadline for a scheme — a calendar date or the "Ongoing"
/// sentinel for rolling enrolment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    Ongoing,
    Date(NaiveDate),
}

impl std::fmt::Display for Deadline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ongoing => write!(f, "Ongoing"),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for Deadline {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Deadline {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "Ongoing" {
            return Ok(Self::Ongoing);
        }
        NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Self::Date)
            .map_err(|e| serde::de::Error::custom(format!("invalid deadline {raw:?}: {e}")))
    }
}

/// A government scheme for farmers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scheme {
    pub id: String,
    pub title: String,
    pub short_description: String,
    pub full_description: String,
    pub benefits: String,
    pub eligibility: String,
    pub deadline: Deadline,
    pub documents: Vec<String>,
    /// Crop names this scheme applies to; may contain the "All" wildcard.
    pub crop_types: Vec<String>,
    pub category: String,
    pub application_link: String,
}

impl Scheme {
    /// Whether this scheme covers the given crop (honours the "All" wildcard).
    pub fn covers_crop(&self, crop: &str) -> bool {
        self.crop_types.iter().any(|c| c == "All" || c == crop)
    }
}

/// How badly a diagnosed problem affects the crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// A crop disease/pest record with treatment guidance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub id: String,
    pub crop: String,
    pub disease: String,
    pub symptoms: Vec<String>,
    pub cause: String,
    pub severity: Severity,
    /// Ordered treatment steps.
    pub treatment: Vec<String>,
    /// Ordered prevention tips.
    pub prevention: Vec<String>,
    /// Ordered organic alternatives.
    pub organic_treatment: Vec<String>,
}

/// Everything the plant-protection flow needs in one fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantProtectionBundle {
    pub crops: Vec<String>,
    pub symptoms: Vec<String>,
    pub diagnoses: Vec<Diagnosis>,
    pub preventive_tips: Vec<String>,
}

impl PlantProtectionBundle {
    /// Disease names recorded for a crop, in fixture order.
    pub fn diseases_for(&self, crop: &str) -> Vec<String> {
        self.diagnoses
            .iter()
            .filter(|d| d.crop == crop)
            .map(|d| d.disease.clone())
            .collect()
    }

    /// Exact crop + disease lookup.
    pub fn find(&self, crop: &str, disease: &str) -> Option<&Diagnosis> {
        self.diagnoses
            .iter()
            .find(|d| d.crop == crop && d.disease == disease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_parses_ongoing_and_dates() {
        let ongoing: Deadline = serde_json::from_str(r#""Ongoing""#).unwrap();
        assert_eq!(ongoing, Deadline::Ongoing);

        let dated: Deadline = serde_json::from_str(r#""2026-07-31""#).unwrap();
        assert_eq!(
            dated,
            Deadline::Date(NaiveDate::from_ymd_opt(2026, 7, 31).unwrap())
        );

        let bad: Result<Deadline, _> = serde_json::from_str(r#""next week""#);
        assert!(bad.is_err());
    }

    #[test]
    fn deadline_serializes_back_to_the_same_string() {
        let ongoing = serde_json::to_string(&Deadline::Ongoing).unwrap();
        assert_eq!(ongoing, r#""Ongoing""#);

        let dated =
            serde_json::to_string(&Deadline::Date(NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()))
                .unwrap();
        assert_eq!(dated, r#""2026-12-31""#);
    }

    #[test]
    fn scheme_uses_camel_case_wire_names() {
        let json = r#"{
            "id": "pm-kisan",
            "title": "PM-KISAN",
            "shortDescription": "Income support",
            "fullDescription": "Full text",
            "benefits": "Money",
            "eligibility": "Farmers",
            "deadline": "Ongoing",
            "documents": ["Aadhaar card"],
            "cropTypes": ["All"],
            "category": "Income Support",
            "applicationLink": "https://pmkisan.gov.in"
        }"#;
        let scheme: Scheme = serde_json::from_str(json).unwrap();
        assert_eq!(scheme.short_description, "Income support");
        assert_eq!(scheme.deadline, Deadline::Ongoing);

        let out = serde_json::to_string(&scheme).unwrap();
        assert!(out.contains("\"shortDescription\""));
        assert!(out.contains("\"cropTypes\""));
        assert!(!out.contains("\"short_description\""));
    }

    #[test]
    fn covers_crop_honours_wildcard() {
        let json = r#"{
            "id": "x", "title": "t", "shortDescription": "s", "fullDescription": "f",
            "benefits": "b", "eligibility": "e", "deadline": "Ongoing",
            "documents": [], "cropTypes": ["All"], "category": "c", "applicationLink": "l"
        }"#;
        let wildcard: Scheme = serde_json::from_str(json).unwrap();
        assert!(wildcard.covers_crop("Tomato"));

        let mut specific = wildcard.clone();
        specific.crop_types = vec!["Wheat".into(), "Rice".into()];
        assert!(specific.covers_crop("Wheat"));
        assert!(!specific.covers_crop("Tomato"));
    }

    #[test]
    fn severity_orders_low_to_critical() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(Severity::Critical.to_string(), "Critical");
    }

    #[test]
    fn bundle_diseases_for_filters_by_crop() {
        let json = r#"{
            "crops": ["Tomato"],
            "symptoms": [],
            "diagnoses": [
                {"id": "a", "crop": "Tomato", "disease": "Early Blight", "symptoms": [],
                 "cause": "c", "severity": "Medium", "treatment": [], "prevention": [],
                 "organicTreatment": []},
                {"id": "b", "crop": "Potato", "disease": "Late Blight", "symptoms": [],
                 "cause": "c", "severity": "Critical", "treatment": [], "prevention": [],
                 "organicTreatment": []}
            ],
            "preventiveTips": []
        }"#;
        let bundle: PlantProtectionBundle = serde_json::from_str(json).unwrap();
        assert_eq!(bundle.diseases_for("Tomato"), vec!["Early Blight"]);
        assert!(bundle.diseases_for("Wheat").is_empty());
        assert!(bundle.find("Potato", "Late Blight").is_some());
        assert!(bundle.find("Potato", "Early Blight").is_none());
    }
}
