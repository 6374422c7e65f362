// src/tagger.rs

use std::collections::BTreeSet;
use std::sync::Arc;

use regex::Regex;
use serde::Serialize;

use crate::models::question::QuestionContent;
use crate::models::skill::SkillCategory;
use crate::ontology::SkillOntology;

/// Minimum keyword-overlap ratio for a skill tag to be kept.
const CONFIDENCE_THRESHOLD: f64 = 0.3;

/// A confidence-scored skill match for a question.
#[derive(Debug, Clone, Serialize)]
pub struct SkillTag {
    pub skill_id: String,
    pub skill_name: String,
    pub category: SkillCategory,
    pub confidence: f64,
    pub matched_keywords: Vec<String>,
}

/// Tags questions with ontology skills by keyword overlap.
pub struct QuestionTagger {
    ontology: Arc<SkillOntology>,
    word_pattern: Regex,
}

impl QuestionTagger {
    pub fn new(ontology: Arc<SkillOntology>) -> Self {
        QuestionTagger {
            ontology,
            // Clinical terms of interest are 4+ letters.
            word_pattern: Regex::new(r"\b[a-z]{4,}\b").expect("keyword pattern is valid"),
        }
    }

    /// Extracts candidate keywords from the topic, scenario and stem.
    pub fn extract_keywords(&self, topic: &str, content: &QuestionContent) -> Vec<String> {
        let mut keywords: BTreeSet<String> = BTreeSet::new();

        for word in topic.to_lowercase().split_whitespace() {
            keywords.insert(word.to_string());
        }
        for text in [content.scenario(), content.stem()] {
            let lowered = text.to_lowercase();
            for m in self.word_pattern.find_iter(&lowered) {
                keywords.insert(m.as_str().to_string());
            }
        }

        keywords.into_iter().collect()
    }

    /// Scores every candidate skill by keyword overlap and keeps those above
    /// the confidence threshold, highest confidence first.
    pub fn tag(&self, topic: &str, content: &QuestionContent) -> Vec<SkillTag> {
        let keywords = self.extract_keywords(topic, content);
        let keyword_set: BTreeSet<&str> = keywords.iter().map(String::as_str).collect();

        let mut tags: Vec<SkillTag> = Vec::new();
        for skill in self.ontology.search_skills_by_keywords(&keywords) {
            let skill_keywords: BTreeSet<String> =
                skill.keywords.iter().map(|k| k.to_lowercase()).collect();
            let matched: Vec<String> = skill_keywords
                .iter()
                .filter(|k| keyword_set.contains(k.as_str()))
                .cloned()
                .collect();
            let confidence =
                (matched.len() as f64 / skill.keywords.len() as f64).min(1.0);
            if confidence > CONFIDENCE_THRESHOLD {
                tags.push(SkillTag {
                    skill_id: skill.id.clone(),
                    skill_name: skill.name.clone(),
                    category: skill.category,
                    confidence: (confidence * 100.0).round() / 100.0,
                    matched_keywords: matched,
                });
            }
        }

        tags.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        tags
    }

    /// Skill ids for the tags, in confidence order.
    pub fn tag_skill_ids(&self, topic: &str, content: &QuestionContent) -> Vec<String> {
        self.tag(topic, content)
            .into_iter()
            .map(|t| t.skill_id)
            .collect()
    }
}
