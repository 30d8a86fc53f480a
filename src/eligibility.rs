//! Care-management program eligibility engine.
//!
//! Pure evaluation of a patient's ICD-10 codes against five Medicare
//! care-management programs. The ICD-10 table is a simplified map of
//! common chronic conditions; a production deploy would back this with
//! a terminology service.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Programs a practice can enroll patients into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Program {
    Ccm,
    Rpm,
    Pcm,
    Apcm,
    Bhi,
}

impl Program {
    pub const ALL: [Program; 5] = [
        Program::Ccm,
        Program::Rpm,
        Program::Pcm,
        Program::Apcm,
        Program::Bhi,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Ccm => "CCM",
            Self::Rpm => "RPM",
            Self::Pcm => "PCM",
            Self::Apcm => "APCM",
            Self::Bhi => "BHI",
        }
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            Self::Ccm => "Chronic Care Management",
            Self::Rpm => "Remote Patient Monitoring",
            Self::Pcm => "Principal Care Management",
            Self::Apcm => "Advanced Primary Care Management",
            Self::Bhi => "Behavioral Health Integration",
        }
    }
}

struct ConditionEntry {
    code: &'static str,
    category: &'static str,
}

/// Simplified ICD-10 prefix table of common chronic conditions.
static ICD10_TABLE: &[ConditionEntry] = &[
    ConditionEntry { code: "I10", category: "Hypertension" },
    ConditionEntry { code: "I11", category: "Hypertension" },
    ConditionEntry { code: "I12", category: "Hypertension" },
    ConditionEntry { code: "I13", category: "Hypertension" },
    ConditionEntry { code: "E11", category: "Diabetes" },
    ConditionEntry { code: "E10", category: "Diabetes" },
    ConditionEntry { code: "J44", category: "COPD" },
    ConditionEntry { code: "J45", category: "Asthma" },
    ConditionEntry { code: "I50", category: "Heart Failure" },
    ConditionEntry { code: "M15", category: "Arthritis" },
    ConditionEntry { code: "M16", category: "Arthritis" },
    ConditionEntry { code: "M17", category: "Arthritis" },
    ConditionEntry { code: "E78", category: "Hyperlipidemia" },
    ConditionEntry { code: "N18", category: "CKD" },
    ConditionEntry { code: "F32", category: "Behavioral Health" },
    ConditionEntry { code: "F41", category: "Behavioral Health" },
    ConditionEntry { code: "G30", category: "Dementia" },
];

/// Categories where physiologic monitoring is considered medically
/// necessary for RPM.
const RPM_CATEGORIES: &[&str] = &["Hypertension", "Heart Failure", "Diabetes", "COPD", "Asthma"];

const BHI_CATEGORIES: &[&str] = &["Behavioral Health", "Dementia"];

const NOT_ELIGIBLE_REASON: &str =
    "Not eligible because Medicare eligibility criteria are not met.";

/// Patient intake record for evaluation.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientInput {
    pub id: Option<String>,
    pub name: String,
    pub insurance: Option<String>,
    /// Comma-separated ICD-10 codes.
    pub icd10_codes: String,
    pub last_visit_date: Option<NaiveDate>,
}

/// Evaluation of one program for one patient.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProgramEvaluation {
    pub eligible: bool,
    pub tooltip: String,
    pub evidence: Vec<String>,
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EligibleProgram {
    pub program: String,
    pub tooltip: String,
    pub evidence: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgramConflict {
    pub programs_in_conflict: Vec<String>,
    pub reason: String,
    pub recommendation: String,
}

/// Full evaluation result for display and enrollment workflows.
#[derive(Debug, Clone, Serialize)]
pub struct EligibilityResult {
    pub patient_id: String,
    pub display_name: String,
    pub insurance: String,
    pub eligible_programs: Vec<EligibleProgram>,
    pub program_evaluation: BTreeMap<String, ProgramEvaluation>,
    pub conflicts: Vec<ProgramConflict>,
    pub not_eligible_reason: Option<String>,
    pub recommended_next_steps: Vec<String>,
    /// Human-readable condition categories found in the codes.
    pub identified_conditions: Vec<String>,
    pub ui_status: String,
}

#[derive(Debug, Clone)]
struct Condition {
    code: String,
    category: Option<&'static str>,
}

fn lookup_category(raw_code: &str) -> Option<&'static str> {
    let clean = raw_code.trim().to_uppercase();
    ICD10_TABLE
        .iter()
        .find(|entry| clean == entry.code || clean.starts_with(entry.code))
        .map(|entry| entry.category)
}

/// Evaluate a patient against all programs as of `today`.
pub fn evaluate_patient_eligibility(patient: &PatientInput, today: NaiveDate) -> EligibilityResult {
    let conditions: Vec<Condition> = patient
        .icd10_codes
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|code| Condition {
            code: code.to_uppercase(),
            category: lookup_category(code),
        })
        .collect();

    let categories: BTreeSet<&'static str> =
        conditions.iter().filter_map(|c| c.category).collect();
    let unique_codes: BTreeSet<&str> = conditions.iter().map(|c| c.code.as_str()).collect();

    // CCM: 2+ chronic conditions expected to last 12 months. Two distinct
    // codes are taken as a proxy for two conditions.
    let mut ccm = ProgramEvaluation::default();
    if categories.len() >= 2 || unique_codes.len() >= 2 {
        ccm.eligible = true;
        let list = join_or(&categories, "Detected Conditions");
        ccm.tooltip = format!(
            "Eligible for {} because the patient has 2+ chronic conditions ({list}) expected to last ≥12 months.",
            Program::Ccm.full_name()
        );
        ccm.evidence = conditions
            .iter()
            .map(|c| format!("{} ({})", c.code, c.category.unwrap_or("Condition")))
            .collect();
    } else {
        ccm.tooltip = format!("{NOT_ELIGIBLE_REASON} (Requires 2+ chronic conditions.)");
        ccm.constraints
            .push("Insufficient chronic conditions detected (Need 2+).".to_string());
    }

    // RPM: a condition where physiologic monitoring is medically necessary.
    let mut rpm = ProgramEvaluation::default();
    let rpm_conditions: Vec<&Condition> = conditions
        .iter()
        .filter(|c| c.category.is_some_and(|cat| RPM_CATEGORIES.contains(&cat)))
        .collect();
    if !rpm_conditions.is_empty() {
        rpm.eligible = true;
        let list: BTreeSet<&str> = rpm_conditions.iter().filter_map(|c| c.category).collect();
        rpm.tooltip = format!(
            "Eligible for {} because the patient has a chronic condition ({}) requiring remote physiologic monitoring.",
            Program::Rpm.full_name(),
            join_or(&list, "Detected Conditions")
        );
        rpm.evidence = rpm_conditions.iter().map(|c| c.code.clone()).collect();
    } else {
        rpm.tooltip =
            format!("{NOT_ELIGIBLE_REASON} (No physiologic monitoring indication.)");
        rpm.constraints
            .push("Need diagnosis like HTN, Diabetes, CHF, COPD.".to_string());
    }

    // PCM: exactly the non-CCM single-condition case.
    let mut pcm = ProgramEvaluation::default();
    if !ccm.eligible && !unique_codes.is_empty() {
        pcm.eligible = true;
        pcm.tooltip = format!(
            "Eligible for {} because the patient has one high-risk chronic condition ({}).",
            Program::Pcm.full_name(),
            join_or(&categories, "Detected Condition")
        );
        pcm.evidence = conditions.iter().map(|c| c.code.clone()).collect();
    } else if ccm.eligible {
        pcm.tooltip =
            "CCM is preferred over PCM for multi-condition patients.".to_string();
        pcm.constraints
            .push("CCM is preferred over PCM for multi-condition patients.".to_string());
    } else {
        pcm.tooltip = NOT_ELIGIBLE_REASON.to_string();
        pcm.constraints
            .push("No qualifying chronic condition found.".to_string());
    }

    // BHI: behavioral health or dementia diagnosis.
    let mut bhi = ProgramEvaluation::default();
    let bhi_conditions: Vec<&Condition> = conditions
        .iter()
        .filter(|c| c.category.is_some_and(|cat| BHI_CATEGORIES.contains(&cat)))
        .collect();
    if !bhi_conditions.is_empty() {
        bhi.eligible = true;
        let list: BTreeSet<&str> = bhi_conditions.iter().filter_map(|c| c.category).collect();
        bhi.tooltip = format!(
            "Eligible for {} because the patient has a behavioral health condition ({}).",
            Program::Bhi.full_name(),
            join_or(&list, "Detected Conditions")
        );
        bhi.evidence = bhi_conditions.iter().map(|c| c.code.clone()).collect();
    } else {
        bhi.tooltip = NOT_ELIGIBLE_REASON.to_string();
        bhi.constraints
            .push("No behavioral health diagnosis found.".to_string());
    }

    // APCM: multiple distinct condition categories.
    let mut apcm = ProgramEvaluation::default();
    if categories.len() >= 2 {
        apcm.eligible = true;
        apcm.tooltip = format!(
            "Eligible for {} because the patient has multiple chronic conditions with clinical complexity.",
            Program::Apcm.full_name()
        );
        apcm.evidence = unique_codes.iter().map(|c| c.to_string()).collect();
    } else {
        apcm.tooltip = NOT_ELIGIBLE_REASON.to_string();
    }

    let evaluations: BTreeMap<String, ProgramEvaluation> = [
        (Program::Ccm, ccm),
        (Program::Rpm, rpm),
        (Program::Pcm, pcm),
        (Program::Apcm, apcm),
        (Program::Bhi, bhi),
    ]
    .into_iter()
    .map(|(program, eval)| (program.code().to_string(), eval))
    .collect();

    // Medicare won't pay CCM and PCM in the same month for the same
    // conditions; the PCM rule above prevents the overlap, but flag it
    // if both ever come out eligible.
    let mut conflicts = Vec::new();
    if evaluations["CCM"].eligible && evaluations["PCM"].eligible {
        conflicts.push(ProgramConflict {
            programs_in_conflict: vec!["CCM".to_string(), "PCM".to_string()],
            reason: "Duplicate care management for chronic conditions.".to_string(),
            recommendation: "Enroll in CCM as it covers comprehensive needs.".to_string(),
        });
    }

    let eligible_programs: Vec<EligibleProgram> = Program::ALL
        .iter()
        .filter_map(|program| {
            let eval = &evaluations[program.code()];
            eval.eligible.then(|| EligibleProgram {
                program: program.code().to_string(),
                tooltip: eval.tooltip.clone(),
                evidence: eval.evidence.clone(),
                notes: eval.constraints.clone(),
            })
        })
        .collect();

    let mut not_eligible_reason = None;
    let mut next_steps = Vec::new();
    if eligible_programs.is_empty() {
        not_eligible_reason = Some(NOT_ELIGIBLE_REASON.to_string());
        next_steps.push("Add/confirm active chronic diagnoses".to_string());
        next_steps.push("Verify Medicare coverage".to_string());
    }

    // A visit within the last 12 months is required regardless of codes.
    if let Some(last_visit) = patient.last_visit_date {
        let one_year_ago = today
            .checked_sub_months(chrono::Months::new(12))
            .unwrap_or(today);
        if last_visit < one_year_ago {
            not_eligible_reason = Some(
                "Patient has not had an office visit in more than 12 months. An AWV or office visit is required for Medicare CCM eligibility."
                    .to_string(),
            );
            next_steps.insert(0, "Schedule Annual Wellness Visit (AWV)".to_string());
        }
    }

    let ui_status = if eligible_programs.is_empty() {
        "Not Approved"
    } else {
        "Pending Approval"
    };

    EligibilityResult {
        patient_id: patient.id.clone().unwrap_or_else(|| "unknown".to_string()),
        display_name: patient.name.clone(),
        insurance: patient
            .insurance
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        eligible_programs,
        program_evaluation: evaluations,
        conflicts,
        not_eligible_reason,
        recommended_next_steps: next_steps,
        identified_conditions: categories.iter().map(|c| c.to_string()).collect(),
        ui_status: ui_status.to_string(),
    }
}

fn join_or(set: &BTreeSet<&'static str>, fallback: &str) -> String {
    if set.is_empty() {
        fallback.to_string()
    } else {
        set.iter().copied().collect::<Vec<_>>().join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(codes: &str) -> PatientInput {
        PatientInput {
            id: Some("p1".into()),
            name: "Pat Example".into(),
            insurance: Some("Medicare".into()),
            icd10_codes: codes.into(),
            last_visit_date: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    #[test]
    fn two_conditions_qualify_for_ccm_and_apcm() {
        let result = evaluate_patient_eligibility(&patient("I10, E11"), today());
        assert!(result.program_evaluation["CCM"].eligible);
        assert!(result.program_evaluation["APCM"].eligible);
        assert!(!result.program_evaluation["PCM"].eligible);
        assert_eq!(result.ui_status, "Pending Approval");
        assert!(result.identified_conditions.contains(&"Diabetes".to_string()));
    }

    #[test]
    fn monitorable_condition_qualifies_for_rpm() {
        let result = evaluate_patient_eligibility(&patient("I50.9"), today());
        let rpm = &result.program_evaluation["RPM"];
        assert!(rpm.eligible);
        assert_eq!(rpm.evidence, vec!["I50.9".to_string()]);
    }

    #[test]
    fn single_condition_falls_to_pcm() {
        let result = evaluate_patient_eligibility(&patient("N18"), today());
        assert!(!result.program_evaluation["CCM"].eligible);
        assert!(result.program_evaluation["PCM"].eligible);
        // CKD is not a monitorable category.
        assert!(!result.program_evaluation["RPM"].eligible);
    }

    #[test]
    fn behavioral_codes_qualify_for_bhi() {
        let result = evaluate_patient_eligibility(&patient("F32.1, G30"), today());
        assert!(result.program_evaluation["BHI"].eligible);
    }

    #[test]
    fn unknown_codes_still_count_toward_ccm_code_heuristic() {
        let result = evaluate_patient_eligibility(&patient("Z99, Z98"), today());
        assert!(result.program_evaluation["CCM"].eligible);
        assert!(result.identified_conditions.is_empty());
    }

    #[test]
    fn no_codes_means_not_eligible() {
        let result = evaluate_patient_eligibility(&patient(""), today());
        assert!(result.eligible_programs.is_empty());
        assert_eq!(result.ui_status, "Not Approved");
        assert!(result.not_eligible_reason.is_some());
        assert!(
            result
                .recommended_next_steps
                .contains(&"Verify Medicare coverage".to_string())
        );
    }

    #[test]
    fn stale_last_visit_overrides_eligibility_reason() {
        let mut p = patient("I10, E11");
        p.last_visit_date = NaiveDate::from_ymd_opt(2024, 1, 10);
        let result = evaluate_patient_eligibility(&p, today());
        let reason = result.not_eligible_reason.expect("reason expected");
        assert!(reason.contains("more than 12 months"));
        assert_eq!(
            result.recommended_next_steps.first().map(String::as_str),
            Some("Schedule Annual Wellness Visit (AWV)")
        );
    }

    #[test]
    fn recent_visit_does_not_flag() {
        let mut p = patient("I10, E11");
        p.last_visit_date = NaiveDate::from_ymd_opt(2026, 5, 1);
        let result = evaluate_patient_eligibility(&p, today());
        assert!(result.not_eligible_reason.is_none());
    }

    #[test]
    fn prefix_match_on_icd10_codes() {
        // E11.9 should match the E11 table entry.
        let result = evaluate_patient_eligibility(&patient("E11.9"), today());
        assert!(result.identified_conditions.contains(&"Diabetes".to_string()));
    }
}
