// src/ontology.rs

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::models::skill::{ClinicalRole, Competency, ProficiencyLevel, Skill, SkillCategory};

/// Closed catalog of clinical skills and competencies.
///
/// Built once at process start; all lookups borrow from it.
pub struct SkillOntology {
    skills: HashMap<String, Skill>,
    competencies: HashMap<String, Competency>,
}

/// Node of the category-grouped skill tree listing.
#[derive(Debug, Clone, Serialize)]
pub struct SkillTreeEntry {
    pub id: String,
    pub name: String,
    pub roles: Vec<ClinicalRole>,
}

fn skill(
    id: &str,
    name: &str,
    description: &str,
    category: SkillCategory,
    required_roles: &[ClinicalRole],
    proficiency_levels: &[ProficiencyLevel],
    keywords: &[&str],
) -> Skill {
    Skill {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category,
        parent_skill: None,
        required_roles: required_roles.to_vec(),
        proficiency_levels: proficiency_levels.to_vec(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

impl SkillOntology {
    pub fn new() -> Self {
        use ClinicalRole::*;
        use ProficiencyLevel::*;
        use SkillCategory::*;

        let catalog = vec![
            // ARDS / ventilator management
            skill(
                "skill_ards_recognition",
                "Recognize ARDS",
                "Identify the presentation of acute respiratory distress syndrome",
                Assessment,
                &[IcuNurse, RespiratoryTherapist],
                &[Beginner, Intermediate, Advanced],
                &["ARDS", "respiratory distress", "hypoxemia", "bilateral infiltrates", "PaO2/FiO2"],
            ),
            skill(
                "skill_vent_setup",
                "Ventilator Setup",
                "Configure mechanical ventilator settings per protocol",
                Technical,
                &[IcuNurse, RespiratoryTherapist],
                &[Intermediate, Advanced],
                &["ventilator", "tidal volume", "PEEP", "FiO2", "plateau pressure", "ARDSnet"],
            ),
            skill(
                "skill_vent_monitoring",
                "Ventilator Monitoring",
                "Track ventilator parameters and the patient's response to them",
                Monitoring,
                &[IcuNurse, RespiratoryTherapist],
                &[Beginner, Intermediate, Advanced],
                &["plateau pressure", "Pplat", "respiratory rate", "minute ventilation", "ABG", "pH"],
            ),
            skill(
                "skill_vent_weaning",
                "Ventilator Weaning",
                "Assess readiness for and conduct spontaneous breathing trials",
                Intervention,
                &[IcuNurse, RespiratoryTherapist],
                &[Intermediate, Advanced],
                &["weaning", "spontaneous breathing trial", "SBT", "extubation", "PEEP"],
            ),
            skill(
                "skill_pbw_calculation",
                "Calculate Predicted Body Weight",
                "Compute PBW for lung-protective tidal volumes",
                Assessment,
                &[IcuNurse, RespiratoryTherapist],
                &[Beginner, Intermediate],
                &["predicted body weight", "PBW", "tidal volume", "height", "calculation"],
            ),
            // Sepsis
            skill(
                "skill_sepsis_recognition",
                "Recognize Sepsis",
                "Identify early signs of sepsis and septic shock",
                Assessment,
                &[RegisteredNurse, IcuNurse, ErNurse],
                &[Beginner, Intermediate, Advanced],
                &["sepsis", "septic shock", "SIRS", "qSOFA", "infection", "hypotension"],
            ),
            skill(
                "skill_sepsis_management",
                "Sepsis Management",
                "Execute the sepsis bundle and initial resuscitation",
                Intervention,
                &[RegisteredNurse, IcuNurse, ErNurse],
                &[Intermediate, Advanced],
                &["sepsis bundle", "fluid resuscitation", "antibiotics", "crystalloid", "vasopressors"],
            ),
            // Medications
            skill(
                "skill_medication_admin",
                "Medication Administration",
                "Administer medications safely following the five rights",
                Medication,
                &[RegisteredNurse, LicensedPracticalNurse, IcuNurse],
                &[Beginner, Intermediate],
                &["medication", "administration", "IV", "dosage", "drug"],
            ),
            skill(
                "skill_critical_drug_management",
                "Critical Drug Management",
                "Titrate vasoactive and other high-alert medications",
                Medication,
                &[IcuNurse, ErNurse],
                &[Intermediate, Advanced],
                &["vasopressor", "inotrope", "sedation", "paralytic", "high-alert"],
            ),
        ];

        let mut skills = HashMap::new();
        for s in catalog {
            skills.insert(s.id.clone(), s);
        }

        let mut competencies = HashMap::new();
        competencies.insert(
            "comp_critical_respiratory".to_string(),
            Competency {
                id: "comp_critical_respiratory".to_string(),
                name: "Critical Respiratory Care".to_string(),
                description: "End-to-end management of critically ill respiratory patients"
                    .to_string(),
                skills: vec![
                    "skill_ards_recognition".to_string(),
                    "skill_vent_setup".to_string(),
                    "skill_vent_monitoring".to_string(),
                    "skill_vent_weaning".to_string(),
                    "skill_pbw_calculation".to_string(),
                ],
                roles: vec![IcuNurse, RespiratoryTherapist],
            },
        );
        competencies.insert(
            "comp_sepsis_care".to_string(),
            Competency {
                id: "comp_sepsis_care".to_string(),
                name: "Sepsis Recognition and Management".to_string(),
                description: "Identification and first-hours management of sepsis".to_string(),
                skills: vec![
                    "skill_sepsis_recognition".to_string(),
                    "skill_sepsis_management".to_string(),
                    "skill_critical_drug_management".to_string(),
                ],
                roles: vec![RegisteredNurse, IcuNurse, ErNurse],
            },
        );

        SkillOntology {
            skills,
            competencies,
        }
    }

    pub fn get_skill(&self, skill_id: &str) -> Option<&Skill> {
        self.skills.get(skill_id)
    }

    pub fn all_skills(&self) -> Vec<&Skill> {
        let mut skills: Vec<&Skill> = self.skills.values().collect();
        skills.sort_by(|a, b| a.id.cmp(&b.id));
        skills
    }

    pub fn skills_by_category(&self, category: SkillCategory) -> Vec<&Skill> {
        let mut skills: Vec<&Skill> = self
            .skills
            .values()
            .filter(|s| s.category == category)
            .collect();
        skills.sort_by(|a, b| a.id.cmp(&b.id));
        skills
    }

    pub fn skills_by_role(&self, role: ClinicalRole) -> Vec<&Skill> {
        let mut skills: Vec<&Skill> = self
            .skills
            .values()
            .filter(|s| s.required_roles.contains(&role))
            .collect();
        skills.sort_by(|a, b| a.id.cmp(&b.id));
        skills
    }

    pub fn get_competency(&self, comp_id: &str) -> Option<&Competency> {
        self.competencies.get(comp_id)
    }

    pub fn all_competencies(&self) -> Vec<&Competency> {
        let mut comps: Vec<&Competency> = self.competencies.values().collect();
        comps.sort_by(|a, b| a.id.cmp(&b.id));
        comps
    }

    /// Skills whose keyword index intersects the given keywords.
    pub fn search_skills_by_keywords(&self, keywords: &[String]) -> Vec<&Skill> {
        let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        let mut matches: Vec<&Skill> = self
            .skills
            .values()
            .filter(|skill| {
                skill
                    .keywords
                    .iter()
                    .any(|sk| lowered.contains(&sk.to_lowercase()))
            })
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches
    }

    /// Category label to the skills under it.
    pub fn skill_tree(&self) -> BTreeMap<String, Vec<SkillTreeEntry>> {
        let mut tree = BTreeMap::new();
        for category in SkillCategory::ALL {
            let entries = self
                .skills_by_category(category)
                .into_iter()
                .map(|s| SkillTreeEntry {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    roles: s.required_roles.clone(),
                })
                .collect();
            tree.insert(category.label().to_string(), entries);
        }
        tree
    }
}

impl Default for SkillOntology {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_loaded() {
        let ontology = SkillOntology::new();
        assert!(ontology.get_skill("skill_ards_recognition").is_some());
        assert_eq!(ontology.all_competencies().len(), 2);
        let comp = ontology.get_competency("comp_sepsis_care").unwrap();
        assert!(comp.skills.contains(&"skill_sepsis_management".to_string()));
    }

    #[test]
    fn keyword_search_matches_case_insensitively() {
        let ontology = SkillOntology::new();
        let hits = ontology.search_skills_by_keywords(&["sepsis".to_string()]);
        assert!(hits.iter().any(|s| s.id == "skill_sepsis_recognition"));
        let hits = ontology.search_skills_by_keywords(&["PEEP".to_string()]);
        assert!(hits.iter().any(|s| s.id == "skill_vent_setup"));
    }

    #[test]
    fn tree_groups_by_category_label() {
        let ontology = SkillOntology::new();
        let tree = ontology.skill_tree();
        let assessment = &tree["Clinical Assessment"];
        assert!(assessment.iter().any(|e| e.id == "skill_ards_recognition"));
        assert!(tree.contains_key("Patient Safety"));
    }
}
