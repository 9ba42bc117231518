//! Adapter for reading recorded frames
//!
//! Parses rigcast.frame.v1 recordings (JSON array or NDJSON) and validates
//! them against a landmark schema.

use crate::error::RigcastError;
use crate::schema::frame_event::{FrameEvent, LandmarkSchema, ValidationError};

/// Adapter for recorded frame files
pub struct FrameEventAdapter;

impl FrameEventAdapter {
    /// Parse a JSON string containing an array of FrameEvents
    pub fn parse_array(json: &str) -> Result<Vec<FrameEvent>, RigcastError> {
        let events: Vec<FrameEvent> = serde_json::from_str(json)?;
        Ok(events)
    }

    /// Parse NDJSON (newline-delimited JSON) containing FrameEvents
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<FrameEvent>, RigcastError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            if let Some(event) = Self::parse_line(line, line_num + 1)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Parse one NDJSON line; blank lines yield `None`
    pub fn parse_line(line: &str, line_num: usize) -> Result<Option<FrameEvent>, RigcastError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        serde_json::from_str::<FrameEvent>(trimmed)
            .map(Some)
            .map_err(|e| {
                RigcastError::ParseError(format!("Failed to parse line {}: {}", line_num, e))
            })
    }

    /// Validate events, returning only the ones with problems
    pub fn validate_events(events: &[FrameEvent], schema: &LandmarkSchema) -> Vec<ValidationResult> {
        events
            .iter()
            .enumerate()
            .map(|(idx, event)| ValidationResult {
                index: idx,
                frame: event.frame,
                errors: event.validate(schema),
            })
            .filter(|r| !r.errors.is_empty())
            .collect()
    }
}

/// Problems found in one recorded frame
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub frame: Option<u64>,
    pub errors: Vec<ValidationError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::CalibrationProfile;

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let ndjson = "{\"frame\": 1}\n\n  \n{\"frame\": 2, \"resolution\": {\"x\": 640, \"y\": 480}}\n";
        let events = FrameEventAdapter::parse_ndjson(ndjson).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].frame, Some(1));
        assert!(events[0].input.is_empty());
        assert_eq!(events[1].frame, Some(2));
    }

    #[test]
    fn test_parse_ndjson_reports_line_number() {
        let ndjson = "{\"frame\": 1}\n{\"frame\": \n";
        let err = FrameEventAdapter::parse_ndjson(ndjson).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_array() {
        let events = FrameEventAdapter::parse_array(r#"[{"frame": 7}, {}]"#).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].frame, None);
        assert!(FrameEventAdapter::parse_array("{}").is_err());
    }

    #[test]
    fn test_validate_events_keeps_only_failures() {
        let ndjson = concat!(
            "{\"frame\": 1}\n",
            "{\"frame\": 2, \"blendshapes\": [{\"label\": \"_neutral\", \"score\": 0.0}]}\n",
            "{\"frame\": 3, \"schema_version\": \"old\"}\n",
        );
        let events = FrameEventAdapter::parse_ndjson(ndjson).unwrap();
        let schema = LandmarkSchema::for_profile(&CalibrationProfile::builtin());

        let results = FrameEventAdapter::validate_events(&events, &schema);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 1);
        assert_eq!(results[0].frame, Some(2));
        assert!(results[0].errors[0].omits_field());
        assert_eq!(results[1].frame, Some(3));
    }
}
