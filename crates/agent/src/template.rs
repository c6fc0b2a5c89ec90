//! The specialized-agent confidence template (§4.1): base confidence, keyword boost,
//! an optional context-key boost, and a context-gated variant that short-circuits to
//! zero when none of its required context keys are present.

use crate::context::AgentContext;

/// Tuning knobs for one specialized agent's `can_handle` score. Per-agent keyword
/// tables are `&'static [&'static str]` constants, not runtime-mutable state (§9).
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceTemplate {
    pub base: f32,
    pub keyword_boost_per_hit: f32,
    pub keyword_boost_ceiling: f32,
    pub context_boost: f32,
    /// When `true`, the score is 0 outright unless at least one `context_keys` entry is
    /// present — the "context-gated" variant for agents that consume upstream output
    /// (summary, fact-check, analysis, comparison, clarification) rather than merely
    /// benefiting from it.
    pub context_gated: bool,
}

impl Default for ConfidenceTemplate {
    fn default() -> Self {
        Self {
            base: 0.25,
            keyword_boost_per_hit: 0.15,
            keyword_boost_ceiling: 0.45,
            context_boost: 0.2,
            context_gated: false,
        }
    }
}

/// Score `message` against `keywords` and `context_keys` per `template`, clamped to 1.
pub fn score(
    message: &str,
    context: &AgentContext,
    template: &ConfidenceTemplate,
    keywords: &[&str],
    context_keys: &[&str],
) -> f32 {
    let has_context = context.has_any_key(context_keys);
    if template.context_gated && !context_keys.is_empty() && !has_context {
        return 0.0;
    }

    let lower = message.to_lowercase();
    let hits = keywords.iter().filter(|k| lower.contains(*k)).count() as f32;
    let keyword_score = (hits * template.keyword_boost_per_hit).min(template.keyword_boost_ceiling);

    let mut confidence = template.base + keyword_score;
    if has_context {
        confidence += template.context_boost;
    }
    confidence.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_hits_boost_confidence_up_to_the_ceiling() {
        let template = ConfidenceTemplate { base: 0.2, keyword_boost_per_hit: 0.2, keyword_boost_ceiling: 0.3, ..Default::default() };
        let ctx = AgentContext::new();
        let s = score("погода и прогноз и дождь", &ctx, &template, &["погода", "прогноз", "дождь"], &[]);
        assert!((s - 0.5).abs() < 1e-6);
    }

    #[test]
    fn context_gated_template_returns_zero_without_required_context() {
        let template = ConfidenceTemplate { context_gated: true, ..Default::default() };
        let ctx = AgentContext::new();
        assert_eq!(score("summarize this", &ctx, &template, &["summarize"], &["search_results"]), 0.0);
    }

    #[test]
    fn context_gated_template_scores_normally_once_context_is_present() {
        use nexus_core::MetadataValue;
        let template = ConfidenceTemplate { context_gated: true, ..Default::default() };
        let mut ctx = AgentContext::new();
        ctx.accumulated.insert("search_results".to_string(), MetadataValue::Flag(true));
        assert!(score("summarize this", &ctx, &template, &["summarize"], &["search_results"]) > 0.0);
    }
}
