//! Practice domain model — the onboarding customer and its progress signals.
//!
//! Free-text onboarding status strings and contract tri-states arrive from
//! the presentation layer; both are parsed once here, at the boundary, so
//! downstream logic works on closed enums instead of substring heuristics.

use serde::{Deserialize, Serialize};

/// One onboarding customer, normalized from form/request input.
///
/// `provider_email` is the unique identity for Contact lookup;
/// `practice_name` is the natural key for Account lookup. Collisions on
/// either are not detected here — the external CRM's first search hit wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Practice {
    pub practice_name: String,
    /// Falls back to the provider email when no internal ID is supplied.
    pub internal_practice_id: String,
    pub provider_name: String,
    pub provider_email: String,
    pub provider_phone: Option<String>,
    pub provider_address: Option<String>,
    pub provider_npi: Option<String>,
    pub provider_url: Option<String>,
    /// Free-form revenue estimates captured during intake.
    pub medicare_potential: Option<String>,
    pub other_potential: Option<String>,
    /// Raw onboarding status text, stored verbatim on the CRM Deal.
    pub onboarding_status: String,
    pub contract_status: ContractStatus,
}

impl Practice {
    /// The enumerated step parsed from the raw onboarding status, if any.
    pub fn onboarding_step(&self) -> Option<OnboardingStep> {
        OnboardingStep::parse(&self.onboarding_status)
    }
}

/// The five onboarding steps a practice moves through.
///
/// "Initiated" and any unrecognized status parse to `None` rather than a
/// step; the stage mapper treats that as the branch default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    Step1,
    Step2,
    Step3,
    Step4,
    Step5,
}

impl OnboardingStep {
    const MARKERS: [(OnboardingStep, &'static str); 5] = [
        (OnboardingStep::Step1, "Step 1"),
        (OnboardingStep::Step2, "Step 2"),
        (OnboardingStep::Step3, "Step 3"),
        (OnboardingStep::Step4, "Step 4"),
        (OnboardingStep::Step5, "Step 5"),
    ];

    /// Parse a free-text status like `"Step 3 - Care Team"` into a step.
    ///
    /// Matching is case- and phrasing-sensitive by contract: callers supply
    /// canonical `"Step N"` strings. A status naming several steps is
    /// ambiguous input; the lowest-numbered marker wins.
    pub fn parse(status: &str) -> Option<Self> {
        Self::MARKERS
            .iter()
            .find(|(_, marker)| status.contains(marker))
            .map(|(step, _)| *step)
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Step1 => "Step 1",
            Self::Step2 => "Step 2",
            Self::Step3 => "Step 3",
            Self::Step4 => "Step 4",
            Self::Step5 => "Step 5",
        };
        write!(f, "{s}")
    }
}

/// Contract signature tri-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContractStatus {
    #[default]
    Pending,
    Sent,
    Signed,
}

impl ContractStatus {
    /// Parse the vendor/form string; anything other than the two exact
    /// non-default labels is treated as Pending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("Signed") => Self::Signed,
            Some("Sent") => Self::Sent,
            _ => Self::Pending,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Self::Signed)
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Sent => "Sent",
            Self::Signed => "Signed",
        };
        write!(f, "{s}")
    }
}

/// Split a display name on the first space into (first, last).
///
/// Single-token names duplicate into both fields — the CRM requires a
/// last name and "Solo" is better than an empty string.
pub fn split_display_name(name: &str) -> (String, String) {
    match name.split_once(' ') {
        Some((first, rest)) if !rest.trim().is_empty() => {
            (first.to_string(), rest.trim().to_string())
        }
        _ => (name.to_string(), name.to_string()),
    }
}
