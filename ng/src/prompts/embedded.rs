//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

/// Topic ideation prompt
pub const TOPIC: &str = include_str!("../../prompts/topic.pmt");

/// Article plan prompt
pub const PLAN: &str = include_str!("../../prompts/plan.pmt");

/// Article body prompt
pub const ARTICLE: &str = include_str!("../../prompts/article.pmt");

/// Names of every template, matching their file stems
pub const TEMPLATE_NAMES: [&str; 3] = ["topic", "plan", "article"];

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    match name {
        "topic" => Some(TOPIC),
        "plan" => Some(PLAN),
        "article" => Some(ARTICLE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_template_is_embedded() {
        for name in TEMPLATE_NAMES {
            assert!(get_embedded(name).is_some(), "missing {}", name);
        }
        assert!(get_embedded("review").is_none());
    }

    #[test]
    fn test_templates_carry_prohibitions() {
        for template in [PLAN, ARTICLE] {
            assert!(template.contains("### 禁止事項"));
            assert!(template.contains("露骨な売り込み"));
            assert!(template.contains("断定的すぎる表現"));
        }
    }

    #[test]
    fn test_templates_show_output_shape() {
        assert!(TOPIC.contains("\"targetAudience\""));
        assert!(PLAN.contains("\"titleOptions\""));
        assert!(PLAN.contains("\"estimatedLength\""));
        assert!(ARTICLE.contains("\"cta\""));
    }
}
