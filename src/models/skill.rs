// src/models/skill.rs

use serde::{Deserialize, Serialize};

/// Proficiency tier for a learner on a single skill.
///
/// Derived from cumulative counters, never from a moving window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProficiencyLevel {
    Novice,
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl ProficiencyLevel {
    /// Classifies cumulative (accuracy, attempts) into a tier.
    ///
    /// Recomputed fresh on every recorded attempt.
    pub fn from_counters(accuracy: f64, attempts: u32) -> Self {
        if attempts < 2 {
            ProficiencyLevel::Novice
        } else if attempts < 4 {
            if accuracy >= 0.5 {
                ProficiencyLevel::Beginner
            } else {
                ProficiencyLevel::Novice
            }
        } else if attempts < 8 {
            if accuracy >= 0.8 {
                ProficiencyLevel::Advanced
            } else if accuracy >= 0.6 {
                ProficiencyLevel::Intermediate
            } else {
                ProficiencyLevel::Beginner
            }
        } else if accuracy >= 0.85 {
            ProficiencyLevel::Expert
        } else if accuracy >= 0.75 {
            ProficiencyLevel::Advanced
        } else if accuracy >= 0.6 {
            ProficiencyLevel::Intermediate
        } else {
            ProficiencyLevel::Beginner
        }
    }
}

/// Clinical roles a skill can be required for, and that learners register as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClinicalRole {
    #[serde(rename = "Registered Nurse")]
    RegisteredNurse,
    #[serde(rename = "Licensed Practical Nurse")]
    LicensedPracticalNurse,
    #[serde(rename = "ICU Nurse")]
    IcuNurse,
    #[serde(rename = "Emergency Room Nurse")]
    ErNurse,
    #[serde(rename = "Medical-Surgical Nurse")]
    MedSurgNurse,
    #[serde(rename = "Pediatric ICU Nurse")]
    PicuNurse,
    #[serde(rename = "Nurse Practitioner")]
    NursePractitioner,
    #[serde(rename = "Respiratory Therapist")]
    RespiratoryTherapist,
    #[serde(rename = "Physician")]
    Physician,
}

/// Skill categories of the ontology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillCategory {
    #[serde(rename = "Clinical Assessment")]
    Assessment,
    #[serde(rename = "Clinical Intervention")]
    Intervention,
    #[serde(rename = "Patient Monitoring")]
    Monitoring,
    #[serde(rename = "Medication Management")]
    Medication,
    #[serde(rename = "Communication")]
    Communication,
    #[serde(rename = "Critical Thinking")]
    CriticalThinking,
    #[serde(rename = "Technical Skills")]
    Technical,
    #[serde(rename = "Patient Safety")]
    Safety,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 8] = [
        SkillCategory::Assessment,
        SkillCategory::Intervention,
        SkillCategory::Monitoring,
        SkillCategory::Medication,
        SkillCategory::Communication,
        SkillCategory::CriticalThinking,
        SkillCategory::Technical,
        SkillCategory::Safety,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SkillCategory::Assessment => "Clinical Assessment",
            SkillCategory::Intervention => "Clinical Intervention",
            SkillCategory::Monitoring => "Patient Monitoring",
            SkillCategory::Medication => "Medication Management",
            SkillCategory::Communication => "Communication",
            SkillCategory::CriticalThinking => "Critical Thinking",
            SkillCategory::Technical => "Technical Skills",
            SkillCategory::Safety => "Patient Safety",
        }
    }
}

/// Atomic clinical competency unit tracked per learner.
///
/// Immutable reference data, built once at process start by the ontology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: SkillCategory,
    /// Parent skill id for hierarchical skills.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_skill: Option<String>,
    pub required_roles: Vec<ClinicalRole>,
    pub proficiency_levels: Vec<ProficiencyLevel>,
    /// Keyword index used by the auto-tagger.
    pub keywords: Vec<String>,
}

/// Named grouping of related skills.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competency {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Member skill ids.
    pub skills: Vec<String>,
    pub roles: Vec<ClinicalRole>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_attempt_is_novice() {
        assert_eq!(ProficiencyLevel::from_counters(1.0, 1), ProficiencyLevel::Novice);
        assert_eq!(ProficiencyLevel::from_counters(0.0, 0), ProficiencyLevel::Novice);
    }

    #[test]
    fn two_to_three_attempts_split_on_half() {
        assert_eq!(ProficiencyLevel::from_counters(0.5, 2), ProficiencyLevel::Beginner);
        assert_eq!(ProficiencyLevel::from_counters(1.0 / 3.0, 3), ProficiencyLevel::Novice);
    }

    #[test]
    fn mid_volume_tiers() {
        // 4 of 5 correct.
        assert_eq!(ProficiencyLevel::from_counters(0.8, 5), ProficiencyLevel::Advanced);
        assert_eq!(ProficiencyLevel::from_counters(0.6, 6), ProficiencyLevel::Intermediate);
        assert_eq!(ProficiencyLevel::from_counters(0.5, 7), ProficiencyLevel::Beginner);
    }

    #[test]
    fn high_volume_tiers() {
        // 9 of 10 correct.
        assert_eq!(ProficiencyLevel::from_counters(0.9, 10), ProficiencyLevel::Expert);
        assert_eq!(ProficiencyLevel::from_counters(0.8, 10), ProficiencyLevel::Advanced);
        assert_eq!(ProficiencyLevel::from_counters(0.6, 12), ProficiencyLevel::Intermediate);
        assert_eq!(ProficiencyLevel::from_counters(0.55, 20), ProficiencyLevel::Beginner);
    }
}
