//! Closed enumeration of capability tags and their grouping categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Grouping of agent types by their purpose, used for dispatcher-prompt structuring
/// and for the specialized-agent confidence template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentCategory {
    Core,
    Information,
    Processing,
    Specialized,
}

/// Every capability the orchestration engine can route a plan step to.
///
/// Closed by design: routing, the dispatcher's alias table, and the registry all key off
/// this enum rather than free-form strings, so an unrecognized name collapses to
/// [`AgentType::Default`] instead of propagating as an opaque tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    // Core
    Default,
    Dispatcher,

    // Information gathering
    WebSearch,
    KnowledgeBase,
    TechDocs,
    CodeAnalysis,
    Metrics,
    News,
    Todoist,

    // Processing
    Analysis,
    FactCheck,
    Comparison,
    Summary,
    Clarification,

    // Specialized
    Expertise,

    // Legacy aliases, kept for backward compatibility; no agent currently implements these.
    Faq,
    SmallTalk,
    Task,
    Unknown,
}

impl AgentType {
    /// Stable wire tag, also used as the dispatcher prompt's agent identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Default => "default",
            AgentType::Dispatcher => "dispatcher",
            AgentType::WebSearch => "web_search",
            AgentType::KnowledgeBase => "knowledge_base",
            AgentType::TechDocs => "tech_docs",
            AgentType::CodeAnalysis => "code_analysis",
            AgentType::Metrics => "metrics",
            AgentType::News => "news",
            AgentType::Todoist => "todoist",
            AgentType::Analysis => "analysis",
            AgentType::FactCheck => "fact_check",
            AgentType::Comparison => "comparison",
            AgentType::Summary => "summary",
            AgentType::Clarification => "clarification",
            AgentType::Expertise => "expertise",
            AgentType::Faq => "faq",
            AgentType::SmallTalk => "small_talk",
            AgentType::Task => "task",
            AgentType::Unknown => "unknown",
        }
    }

    pub fn category(&self) -> AgentCategory {
        match self {
            AgentType::Default | AgentType::Dispatcher => AgentCategory::Core,
            AgentType::WebSearch
            | AgentType::KnowledgeBase
            | AgentType::TechDocs
            | AgentType::CodeAnalysis
            | AgentType::Metrics
            | AgentType::News
            | AgentType::Todoist => AgentCategory::Information,
            AgentType::Analysis
            | AgentType::FactCheck
            | AgentType::Comparison
            | AgentType::Summary
            | AgentType::Clarification => AgentCategory::Processing,
            AgentType::Expertise => AgentCategory::Specialized,
            AgentType::Faq | AgentType::SmallTalk | AgentType::Task | AgentType::Unknown => {
                AgentCategory::Core
            }
        }
    }

    /// All enum members, in declaration order. Used by the dispatcher to fall back to a
    /// sensible default set when no registry has been wired yet.
    pub const ALL: &'static [AgentType] = &[
        AgentType::Default,
        AgentType::Dispatcher,
        AgentType::WebSearch,
        AgentType::KnowledgeBase,
        AgentType::TechDocs,
        AgentType::CodeAnalysis,
        AgentType::Metrics,
        AgentType::News,
        AgentType::Todoist,
        AgentType::Analysis,
        AgentType::FactCheck,
        AgentType::Comparison,
        AgentType::Summary,
        AgentType::Clarification,
        AgentType::Expertise,
        AgentType::Faq,
        AgentType::SmallTalk,
        AgentType::Task,
        AgentType::Unknown,
    ];
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_partitions_core_agents() {
        assert_eq!(AgentType::Default.category(), AgentCategory::Core);
        assert_eq!(AgentType::Dispatcher.category(), AgentCategory::Core);
    }

    #[test]
    fn category_partitions_information_agents() {
        for t in [
            AgentType::WebSearch,
            AgentType::KnowledgeBase,
            AgentType::TechDocs,
            AgentType::CodeAnalysis,
            AgentType::Metrics,
            AgentType::News,
            AgentType::Todoist,
        ] {
            assert_eq!(t.category(), AgentCategory::Information);
        }
    }

    #[test]
    fn legacy_aliases_fall_back_to_core_category() {
        assert_eq!(AgentType::Faq.category(), AgentCategory::Core);
        assert_eq!(AgentType::Unknown.category(), AgentCategory::Core);
    }

    #[test]
    fn as_str_is_snake_case_and_stable() {
        assert_eq!(AgentType::FactCheck.as_str(), "fact_check");
        assert_eq!(AgentType::WebSearch.to_string(), "web_search");
    }
}
