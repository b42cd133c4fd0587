//! Structured claim model and parsing of generated text.

use serde::{Deserialize, Serialize};

/// A structured diagnostic claim produced by the generation back-end.
///
/// All fields are optional on the wire; missing fields deserialize to their
/// defaults so a partially-structured reply still yields a usable claim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub recommended_treatments: Vec<String>,
    #[serde(default)]
    pub evidence_symptoms: Vec<String>,
}

/// Outcome of parsing back-end text as a claim.
///
/// Downstream consumers pattern-match both variants; an unparseable reply is
/// preserved raw rather than discarded or turned into an error.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedAnswer {
    Parsed(Claim),
    Unparsed(String),
}

impl GeneratedAnswer {
    /// Trim the reply and attempt strict JSON deserialization; keep the raw
    /// text on failure.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        match serde_json::from_str::<Claim>(trimmed) {
            Ok(claim) => Self::Parsed(claim),
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    "Back-end reply is not a structured claim, keeping raw text"
                );
                Self::Unparsed(trimmed.to_string())
            }
        }
    }

    pub fn claim(&self) -> Option<&Claim> {
        match self {
            Self::Parsed(claim) => Some(claim),
            Self::Unparsed(_) => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_claim() {
        let text = r#"
        {
            "diagnosis": "influenza",
            "explanation": "Fever and cough point to influenza.",
            "recommended_treatments": ["paracetamol"],
            "evidence_symptoms": ["fever", "cough"]
        }
        "#;
        match GeneratedAnswer::parse(text) {
            GeneratedAnswer::Parsed(claim) => {
                assert_eq!(claim.diagnosis.as_deref(), Some("influenza"));
                assert_eq!(claim.recommended_treatments, vec!["paracetamol"]);
                assert_eq!(claim.evidence_symptoms, vec!["fever", "cough"]);
            }
            GeneratedAnswer::Unparsed(raw) => panic!("unexpected raw fallback: {raw}"),
        }
    }

    #[test]
    fn missing_fields_default() {
        let answer = GeneratedAnswer::parse(r#"{"diagnosis": "asthma"}"#);
        let claim = answer.claim().expect("parsed");
        assert_eq!(claim.diagnosis.as_deref(), Some("asthma"));
        assert!(claim.explanation.is_none());
        assert!(claim.recommended_treatments.is_empty());
        assert!(claim.evidence_symptoms.is_empty());
    }

    #[test]
    fn non_json_text_is_kept_raw() {
        let answer = GeneratedAnswer::parse("I think it is probably the flu.\n");
        assert_eq!(
            answer,
            GeneratedAnswer::Unparsed("I think it is probably the flu.".to_string())
        );
        assert!(answer.claim().is_none());
    }

    #[test]
    fn serializes_without_absent_options() {
        let claim = Claim {
            diagnosis: Some("influenza".to_string()),
            ..Claim::default()
        };
        let json = serde_json::to_string(&claim).expect("serializes");
        assert!(!json.contains("explanation"));
        assert!(json.contains("recommended_treatments"));
    }
}
