//! Incident report records.
//!
//! # Responsibility
//! - Model what the incident form collects (classification, anonymity,
//!   live/edited incident time, optional coordinates).
//! - Shape the JSON payload sent to the remote service and the record kept
//!   by the local fallback store.
//!
//! # Invariants
//! - Anonymous reports never carry reporter name/contact on the wire.
//! - A live incident time is resolved only at submission.

use chrono::{NaiveDateTime, ParseError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ANONYMOUS_NAME: &str = "Anonymous";
/// Minute precision, as produced by a `datetime-local` form input.
const INCIDENT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Incident classification offered by the report form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncidentKind {
    #[default]
    #[serde(rename = "Physical Abuse")]
    PhysicalAbuse,
    #[serde(rename = "Verbal/Emotional Abuse")]
    VerbalEmotionalAbuse,
    #[serde(rename = "Sexual Harassment/Assault")]
    SexualHarassmentAssault,
    #[serde(rename = "Cyberstalking/Bullying")]
    CyberstalkingBullying,
    #[serde(rename = "Other")]
    Other,
}

impl IncidentKind {
    pub const ALL: [IncidentKind; 5] = [
        Self::PhysicalAbuse,
        Self::VerbalEmotionalAbuse,
        Self::SexualHarassmentAssault,
        Self::CyberstalkingBullying,
        Self::Other,
    ];

    /// Human-readable label, identical to the wire value.
    pub fn label(self) -> &'static str {
        match self {
            Self::PhysicalAbuse => "Physical Abuse",
            Self::VerbalEmotionalAbuse => "Verbal/Emotional Abuse",
            Self::SexualHarassmentAssault => "Sexual Harassment/Assault",
            Self::CyberstalkingBullying => "Cyberstalking/Bullying",
            Self::Other => "Other",
        }
    }
}

/// Reporter identity, present only for non-anonymous reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reporter {
    pub name: String,
    /// Phone or email; may be empty.
    pub contact: String,
}

/// Latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// When the incident happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentTime {
    /// Tracks the current local time until the report is submitted.
    Live,
    /// Explicitly edited by the reporter.
    At(NaiveDateTime),
}

impl IncidentTime {
    /// Parses a `YYYY-MM-DDTHH:MM` value as entered in the form.
    pub fn parse_input(value: &str) -> Result<Self, ParseError> {
        NaiveDateTime::parse_from_str(value.trim(), INCIDENT_TIME_FORMAT).map(Self::At)
    }

    /// Resolves to the minute-precision wire value.
    pub fn resolve(&self, now_local: NaiveDateTime) -> String {
        let at = match self {
            Self::Live => now_local,
            Self::At(at) => *at,
        };
        at.format(INCIDENT_TIME_FORMAT).to_string()
    }
}

/// Incident report as drafted by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub kind: IncidentKind,
    pub description: String,
    pub reporter: Option<Reporter>,
    pub location: Option<GeoPoint>,
    pub occurred_at: IncidentTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportValidationError {
    BlankDescription,
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
}

impl Display for ReportValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankDescription => write!(f, "report description cannot be blank"),
            Self::LatitudeOutOfRange(value) => {
                write!(f, "latitude {value} is outside [-90, 90]")
            }
            Self::LongitudeOutOfRange(value) => {
                write!(f, "longitude {value} is outside [-180, 180]")
            }
        }
    }
}

impl Error for ReportValidationError {}

impl Report {
    /// Starts an anonymous, live-timed report without location.
    pub fn anonymous(kind: IncidentKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            reporter: None,
            location: None,
            occurred_at: IncidentTime::Live,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.reporter.is_none()
    }

    /// Checks form-level constraints before submission.
    pub fn validate(&self) -> Result<(), ReportValidationError> {
        if self.description.trim().is_empty() {
            return Err(ReportValidationError::BlankDescription);
        }
        if let Some(point) = self.location {
            if !(-90.0..=90.0).contains(&point.lat) {
                return Err(ReportValidationError::LatitudeOutOfRange(point.lat));
            }
            if !(-180.0..=180.0).contains(&point.lng) {
                return Err(ReportValidationError::LongitudeOutOfRange(point.lng));
            }
        }
        Ok(())
    }

    /// Builds the wire payload, resolving a live incident time to `now_local`.
    pub fn to_payload(&self, now_local: NaiveDateTime) -> ReportPayload {
        let (name, contact) = match &self.reporter {
            Some(reporter) => (reporter.name.clone(), Some(reporter.contact.clone())),
            None => (ANONYMOUS_NAME.to_string(), None),
        };
        ReportPayload {
            is_anonymous: self.is_anonymous(),
            name,
            contact,
            kind: self.kind,
            date: self.occurred_at.resolve(now_local),
            location: self.location,
            description: self.description.clone(),
        }
    }
}

/// JSON body accepted by the remote reports endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub is_anonymous: bool,
    pub name: String,
    pub contact: Option<String>,
    #[serde(rename = "type")]
    pub kind: IncidentKind,
    pub date: String,
    pub location: Option<GeoPoint>,
    pub description: String,
}

/// Report kept by the local fallback store after a failed submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalReport {
    #[serde(flatten)]
    pub payload: ReportPayload,
    pub id: String,
    pub submitted_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 59)
            .unwrap()
    }

    #[test]
    fn anonymous_payload_hides_identity() {
        let report = Report::anonymous(IncidentKind::Other, "something happened");
        let json = serde_json::to_value(report.to_payload(noon())).unwrap();
        assert_eq!(json["isAnonymous"], true);
        assert_eq!(json["name"], "Anonymous");
        assert!(json["contact"].is_null());
        assert!(json["location"].is_null());
        assert_eq!(json["type"], "Other");
        assert_eq!(json["date"], "2024-05-01T12:00");
    }

    #[test]
    fn named_payload_carries_reporter_and_location() {
        let mut report = Report::anonymous(IncidentKind::CyberstalkingBullying, "details");
        report.reporter = Some(Reporter {
            name: "Lee".to_string(),
            contact: "lee@example.org".to_string(),
        });
        report.location = Some(GeoPoint {
            lat: 51.5,
            lng: -0.12,
        });
        let json = serde_json::to_value(report.to_payload(noon())).unwrap();
        assert_eq!(json["isAnonymous"], false);
        assert_eq!(json["name"], "Lee");
        assert_eq!(json["contact"], "lee@example.org");
        assert_eq!(json["type"], "Cyberstalking/Bullying");
        assert_eq!(json["location"]["lat"], 51.5);
        assert_eq!(json["location"]["lng"], -0.12);
    }

    #[test]
    fn edited_incident_time_ignores_now() {
        let mut report = Report::anonymous(IncidentKind::PhysicalAbuse, "x");
        report.occurred_at = IncidentTime::parse_input("2023-12-24T21:15").unwrap();
        assert_eq!(report.to_payload(noon()).date, "2023-12-24T21:15");
    }

    #[test]
    fn validate_rejects_blank_description_and_bad_coordinates() {
        let blank = Report::anonymous(IncidentKind::Other, "   ");
        assert_eq!(
            blank.validate(),
            Err(ReportValidationError::BlankDescription)
        );

        let mut bad = Report::anonymous(IncidentKind::Other, "ok");
        bad.location = Some(GeoPoint {
            lat: 91.0,
            lng: 0.0,
        });
        assert!(matches!(
            bad.validate(),
            Err(ReportValidationError::LatitudeOutOfRange(_))
        ));

        bad.location = Some(GeoPoint {
            lat: 0.0,
            lng: -181.0,
        });
        assert!(matches!(
            bad.validate(),
            Err(ReportValidationError::LongitudeOutOfRange(_))
        ));
    }

    #[test]
    fn local_report_flattens_payload() {
        let payload = Report::anonymous(IncidentKind::Other, "d").to_payload(noon());
        let local = LocalReport {
            payload,
            id: "1700000000000".to_string(),
            submitted_at: "2024-05-01T12:00:59.000Z".to_string(),
        };
        let json = serde_json::to_value(&local).unwrap();
        assert_eq!(json["id"], "1700000000000");
        assert_eq!(json["submittedAt"], "2024-05-01T12:00:59.000Z");
        assert_eq!(json["description"], "d");

        let back: LocalReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, local);
    }

    #[test]
    fn every_kind_label_matches_its_wire_value() {
        for kind in IncidentKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.label());
        }
    }
}
