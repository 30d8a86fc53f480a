//! Onboarding status → CRM pipeline stage mapping.
//!
//! Pure and total: every (step, contract) pair maps to a stage, and
//! unrecognized status text falls through to the branch default rather
//! than failing. CRM visibility is worth more than strict validation —
//! an unknown stage must never block the write.

use crate::practice::{ContractStatus, OnboardingStep};

/// Sales-pipeline stage as configured in the CRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Qualification,
    ReadyForContract,
    ContractSigned,
    CareTeamSetup,
    EhrConfiguration,
    ClosedWonLive,
}

impl PipelineStage {
    /// The exact stage label the CRM pipeline is configured with.
    /// "Ready for contract" triggers a CRM-side workflow; do not rename.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Qualification => "Qualification",
            Self::ReadyForContract => "Ready for contract",
            Self::ContractSigned => "Contract Signed / Onboarding Start",
            Self::CareTeamSetup => "Onboarding - Care Team Setup",
            Self::EhrConfiguration => "Onboarding - EHR Configuration",
            Self::ClosedWonLive => "Closed Won / Live",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Map onboarding progress and contract state to a pipeline stage.
///
/// Before signature only one thing matters: whether the practice has
/// reached the contract-ready step. After signature the step drives the
/// onboarding sub-stages, checked furthest-first.
pub fn stage_for(step: Option<OnboardingStep>, contract: ContractStatus) -> PipelineStage {
    if !contract.is_signed() {
        return match step {
            Some(OnboardingStep::Step2) => PipelineStage::ReadyForContract,
            _ => PipelineStage::Qualification,
        };
    }
    match step {
        Some(OnboardingStep::Step5) => PipelineStage::ClosedWonLive,
        Some(OnboardingStep::Step4) => PipelineStage::EhrConfiguration,
        Some(OnboardingStep::Step3) => PipelineStage::CareTeamSetup,
        _ => PipelineStage::ContractSigned,
    }
}

/// String facade over [`stage_for`], preserving the historical
/// `mapStatusToStage(status, contractStatus)` contract for callers that
/// still hold the raw strings. Synchronous, total, never fails.
pub fn map_status_to_stage(onboarding_status: &str, contract_status: Option<&str>) -> &'static str {
    stage_for(
        OnboardingStep::parse(onboarding_status),
        ContractStatus::parse(contract_status),
    )
    .label()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_two_unsigned_is_ready_for_contract() {
        assert_eq!(
            map_status_to_stage("Step 2 enrollment", Some("Pending")),
            "Ready for contract"
        );
    }

    #[test]
    fn early_steps_unsigned_are_qualification() {
        assert_eq!(map_status_to_stage("Step 1", Some("Pending")), "Qualification");
        assert_eq!(map_status_to_stage("Step 3", Some("Sent")), "Qualification");
        assert_eq!(map_status_to_stage("Initiated", None), "Qualification");
    }

    #[test]
    fn signed_stages_track_the_step() {
        assert_eq!(
            map_status_to_stage("Step 5 complete", Some("Signed")),
            "Closed Won / Live"
        );
        assert_eq!(
            map_status_to_stage("Step 4", Some("Signed")),
            "Onboarding - EHR Configuration"
        );
        assert_eq!(
            map_status_to_stage("Step 3 - Care Team", Some("Signed")),
            "Onboarding - Care Team Setup"
        );
    }

    #[test]
    fn signed_without_recognized_step_is_onboarding_start() {
        assert_eq!(
            map_status_to_stage("anything unrecognized", Some("Signed")),
            "Contract Signed / Onboarding Start"
        );
        assert_eq!(
            map_status_to_stage("Step 1", Some("Signed")),
            "Contract Signed / Onboarding Start"
        );
    }

    #[test]
    fn total_over_arbitrary_input() {
        let statuses = [
            "", "Step 1", "Step 2", "Step 3", "Step 4", "Step 5", "Initiated",
            "garbage", "step 2", "STEP 2", "Step 2 of Step 5", "Step 99",
        ];
        let contracts = [None, Some(""), Some("Pending"), Some("Sent"), Some("Signed"), Some("??")];
        for status in statuses {
            for contract in contracts {
                let stage = map_status_to_stage(status, contract);
                assert!(!stage.is_empty(), "empty stage for ({status:?}, {contract:?})");
            }
        }
    }
}
