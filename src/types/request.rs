//! Incoming scoring request.

use crate::features::RawApplicantInput;
use serde::{Deserialize, Serialize};

/// A loan-application scoring request as received off the wire.
///
/// The applicant identifier is optional and only ever handled by the
/// transport layer, which pseudonymizes it before anything is logged or
/// published; the pipeline itself never sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    /// Caller-side applicant identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant_id: Option<String>,

    /// Raw financial attributes
    #[serde(flatten)]
    pub input: RawApplicantInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_flat_payload() {
        let json = r#"{
            "applicant_id": "A-1001",
            "loan_amnt": 20000,
            "int_rate": 15,
            "annual_inc": 40000,
            "dti": 40,
            "revol_util": 90,
            "installment": 700
        }"#;

        let request: ScoreRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.applicant_id.as_deref(), Some("A-1001"));
        assert_eq!(request.input.loan_amnt, 20000.0);
        assert_eq!(request.input.installment, 700.0);
    }

    #[test]
    fn test_applicant_id_is_optional() {
        let json = r#"{
            "loan_amnt": 5000,
            "int_rate": 8,
            "annual_inc": 80000,
            "dti": 12,
            "revol_util": 30,
            "installment": 160
        }"#;

        let request: ScoreRequest = serde_json::from_str(json).unwrap();
        assert!(request.applicant_id.is_none());
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let json = r#"{ "loan_amnt": 5000 }"#;
        assert!(serde_json::from_str::<ScoreRequest>(json).is_err());
    }
}
