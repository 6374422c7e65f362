// src/utils/text.rs

/// Normalizes a free-text topic label for aggregation keys.
pub fn normalize_topic(topic: &str) -> String {
    topic.trim().to_lowercase()
}

/// Builds the synthetic skill id used when a question carries no skill tags.
///
/// Example: "Sepsis Management" -> "topic_sepsis_management".
pub fn topic_fallback_skill(topic: &str) -> String {
    format!("topic_{}", normalize_topic(topic).replace(' ', "_"))
}

/// Turns a skill id into a display label, e.g. "skill_vent_setup" -> "Vent Setup".
pub fn skill_display_name(skill_id: &str) -> String {
    let stripped = skill_id
        .strip_prefix("skill_")
        .unwrap_or(skill_id)
        .replace('_', " ");
    title_case(&stripped)
}

/// Uppercases the first letter of every whitespace-separated word.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_fallback_is_slugged() {
        assert_eq!(topic_fallback_skill("Sepsis Management"), "topic_sepsis_management");
        assert_eq!(topic_fallback_skill("  ARDS  "), "topic_ards");
    }

    #[test]
    fn skill_display_strips_prefix() {
        assert_eq!(skill_display_name("skill_vent_setup"), "Vent Setup");
        assert_eq!(skill_display_name("topic_sepsis"), "Topic Sepsis");
    }

    #[test]
    fn normalize_lowercases_and_trims() {
        assert_eq!(normalize_topic(" Fluid Resuscitation "), "fluid resuscitation");
    }
}
