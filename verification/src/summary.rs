//! Result summary rendered on the final stage.

use ekyc_types::{ChallengeType, VerificationRecord};
use serde::{Deserialize, Serialize};

pub const VERIFIED_STATUS: &str = "MATCH (VERIFIED)";
pub const NOT_VERIFIED_STATUS: &str = "NO MATCH (NOT VERIFIED)";

/// One row of the liveness table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessLine {
    pub kind: ChallengeType,
    pub label: String,
    pub passed: bool,
}

/// Everything the results screen displays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayResult {
    pub document_image: Option<String>,
    pub document_face_image: Option<String>,
    pub live_image: Option<String>,
    /// Transformed score with one decimal, or `N/A`.
    pub display_score: String,
    pub face_verified: bool,
    pub status: String,
    /// Always exactly three lines.
    pub liveness: Vec<LivenessLine>,
    pub all_passed: bool,
}

/// Score as shown to the user: `100 * cos(score / 100)`, one decimal.
pub fn display_score(score: Option<f64>) -> String {
    match score {
        Some(score) => format!("{:.1}", 100.0 * (score / 100.0).cos()),
        None => "N/A".to_string(),
    }
}

/// Build the display view of a record. Pure.
pub fn summarize(record: &VerificationRecord) -> DisplayResult {
    let face_verified = record.face_verified.unwrap_or(false);

    let mut liveness: Vec<LivenessLine> = record
        .liveness_results
        .iter()
        .map(|(kind, passed)| line(kind, passed))
        .collect();
    for kind in ChallengeType::ALL {
        if record.liveness_results.get(kind).is_none() {
            liveness.push(line(kind, false));
        }
    }

    let all_passed = face_verified && liveness.iter().all(|l| l.passed);

    DisplayResult {
        document_image: record.document_image.as_ref().map(|i| i.to_data_url()),
        document_face_image: record.document_face_image.as_ref().map(|i| i.to_data_url()),
        live_image: record.live_image.as_ref().map(|i| i.to_data_url()),
        display_score: display_score(record.match_score),
        face_verified,
        status: if face_verified {
            VERIFIED_STATUS
        } else {
            NOT_VERIFIED_STATUS
        }
        .to_string(),
        liveness,
        all_passed,
    }
}

fn line(kind: ChallengeType, passed: bool) -> LivenessLine {
    LivenessLine {
        kind,
        label: kind.label().to_string(),
        passed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekyc_types::{Image, ImageFormat, LivenessResults};

    #[test]
    fn score_transform_matches_known_values() {
        assert_eq!(display_score(Some(75.0)), "73.2");
        assert_eq!(display_score(Some(80.0)), "69.7");
        assert_eq!(display_score(Some(0.0)), "100.0");
        assert_eq!(display_score(None), "N/A");
    }

    #[test]
    fn empty_record_renders_defaults() {
        let result = summarize(&VerificationRecord::new());
        assert_eq!(result.display_score, "N/A");
        assert!(!result.face_verified);
        assert_eq!(result.status, NOT_VERIFIED_STATUS);
        assert_eq!(result.document_image, None);
        let kinds: Vec<_> = result.liveness.iter().map(|l| l.kind).collect();
        assert_eq!(kinds, ChallengeType::ALL);
        assert!(result.liveness.iter().all(|l| !l.passed));
        assert!(!result.all_passed);
    }

    #[test]
    fn record_order_comes_first_missing_types_appended() {
        let mut record = VerificationRecord::new();
        record.liveness_results = LivenessResults::from_iter([(ChallengeType::Emotion, true)]);
        let result = summarize(&record);
        let rows: Vec<_> = result
            .liveness
            .iter()
            .map(|l| (l.label.as_str(), l.passed))
            .collect();
        assert_eq!(
            rows,
            [
                ("Emotion Detection", true),
                ("Blink Detection", false),
                ("Face Orientation", false),
            ]
        );
    }

    #[test]
    fn verified_record_passes_overall() {
        let record = VerificationRecord {
            document_image: Some(Image::new(ImageFormat::Jpeg, vec![1, 2, 3]).unwrap()),
            match_score: Some(80.0),
            face_verified: Some(true),
            liveness_results: LivenessResults::uniform(true),
            ..VerificationRecord::default()
        };
        let result = summarize(&record);
        assert_eq!(result.status, VERIFIED_STATUS);
        assert_eq!(result.display_score, "69.7");
        assert!(result.all_passed);
        assert_eq!(result.document_image.as_deref(), Some("data:image/jpeg;base64,AQID"));
        assert_eq!(summarize(&record), result);
    }
}
