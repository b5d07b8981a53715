//! Feature derivation for delinquency risk scoring.
//!
//! Transforms raw applicant attributes into the derived feature vector the
//! scorer and explainer were trained against. Feature names and order are
//! fixed per pipeline version; both scoring and attribution consume the
//! same derived vector so the explanation stays consistent with the
//! decision.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Number of features in the canonical vector.
pub const FEATURE_COUNT: usize = 13;

/// Canonical feature names, in the exact order expected by the model.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "loan_amnt",
    "int_rate",
    "installment",
    "annual_inc",
    "dti",
    "revol_util",
    "loan_income_ratio",
    "emi_income_ratio",
    "interest_load",
    "debt_pressure",
    "financial_stress_index",
    "income_cushion",
    "utilization_stress",
];

/// Indices into the canonical feature vector.
pub mod idx {
    pub const LOAN_AMNT: usize = 0;
    pub const INT_RATE: usize = 1;
    pub const INSTALLMENT: usize = 2;
    pub const ANNUAL_INC: usize = 3;
    pub const DTI: usize = 4;
    pub const REVOL_UTIL: usize = 5;
    pub const LOAN_INCOME_RATIO: usize = 6;
    pub const EMI_INCOME_RATIO: usize = 7;
    pub const INTEREST_LOAD: usize = 8;
    pub const DEBT_PRESSURE: usize = 9;
    pub const FINANCIAL_STRESS_INDEX: usize = 10;
    pub const INCOME_CUSHION: usize = 11;
    pub const UTILIZATION_STRESS: usize = 12;
}

/// Raw applicant attributes as received from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawApplicantInput {
    /// Requested loan amount
    pub loan_amnt: f64,
    /// Interest rate (percent)
    pub int_rate: f64,
    /// Annual income; must be strictly positive
    pub annual_inc: f64,
    /// Debt-to-income ratio (percent)
    pub dti: f64,
    /// Revolving line utilization (percent)
    pub revol_util: f64,
    /// Monthly installment amount
    pub installment: f64,
}

impl RawApplicantInput {
    fn fields(&self) -> [(&'static str, f64); 6] {
        [
            ("loan_amnt", self.loan_amnt),
            ("int_rate", self.int_rate),
            ("annual_inc", self.annual_inc),
            ("dti", self.dti),
            ("revol_util", self.revol_util),
            ("installment", self.installment),
        ]
    }
}

/// Ordered feature vector in the canonical layout.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Build a vector directly from canonical-order values.
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    /// Feature value at a canonical index.
    pub fn get(&self, index: usize) -> f64 {
        self.values[index]
    }

    /// All values in canonical order.
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// (name, value) pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }
}

/// Weights of the composite financial stress index. Convex combination;
/// must sum to 1.0. Constants are configuration to be revalidated against
/// the trained scorer, not fixed domain truth.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StressWeights {
    pub emi: f64,
    pub loan: f64,
    pub pressure: f64,
}

impl StressWeights {
    pub fn sum(&self) -> f64 {
        self.emi + self.loan + self.pressure
    }
}

impl Default for StressWeights {
    fn default() -> Self {
        Self {
            emi: 0.4,
            loan: 0.3,
            pressure: 0.3,
        }
    }
}

/// Derives the canonical feature vector from raw applicant attributes.
///
/// Pure and deterministic: identical input yields bit-identical output,
/// which keeps attribution reproducible.
#[derive(Debug, Clone)]
pub struct FeatureDeriver {
    stress_weights: StressWeights,
}

impl FeatureDeriver {
    pub fn new(stress_weights: StressWeights) -> Self {
        Self { stress_weights }
    }

    /// Derive the feature vector.
    ///
    /// Fails with a domain error if any attribute is non-finite or the
    /// income denominator is not strictly positive. Checked before any
    /// division takes place.
    pub fn derive(&self, raw: &RawApplicantInput) -> Result<FeatureVector> {
        for (name, value) in raw.fields() {
            if !value.is_finite() {
                return Err(PipelineError::Domain(format!(
                    "attribute {name} must be finite, got {value}"
                )));
            }
        }
        if raw.annual_inc <= 0.0 {
            return Err(PipelineError::Domain(format!(
                "annual income must be strictly positive, got {}",
                raw.annual_inc
            )));
        }

        let loan_income_ratio = raw.loan_amnt / raw.annual_inc;
        let emi_income_ratio = raw.installment / raw.annual_inc;
        let interest_load = raw.int_rate * loan_income_ratio;
        // dti and revol_util are both percentage-scaled upstream
        let debt_pressure = (raw.dti + raw.revol_util) / 100.0;
        let w = self.stress_weights;
        let financial_stress_index = w.emi * emi_income_ratio
            + w.loan * loan_income_ratio
            + w.pressure * debt_pressure;
        let income_cushion = raw.annual_inc - raw.loan_amnt;
        let utilization_stress = raw.revol_util * raw.dti;

        Ok(FeatureVector::from_values([
            raw.loan_amnt,
            raw.int_rate,
            raw.installment,
            raw.annual_inc,
            raw.dti,
            raw.revol_util,
            loan_income_ratio,
            emi_income_ratio,
            interest_load,
            debt_pressure,
            financial_stress_index,
            income_cushion,
            utilization_stress,
        ]))
    }
}

impl Default for FeatureDeriver {
    fn default() -> Self {
        Self::new(StressWeights::default())
    }
}
