//! Agent orchestration engine: the registry, dispatcher (planner), plan executor, the
//! reference web-search agent, and the dialog manager turn driver.

pub mod agent;
pub mod context;
pub mod default_agent;
pub mod dialog_manager;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod registry;
pub mod specialized;
pub mod template;
pub mod web_search_agent;

pub use agent::Agent;
pub use context::AgentContext;
pub use default_agent::DefaultAgent;
pub use dialog_manager::{DialogManager, TurnResult};
pub use dispatcher::Dispatcher;
pub use error::AgentError;
pub use executor::{ExecutionOutcome, PlanExecutor};
pub use registry::AgentRegistry;
pub use specialized::{
    AnalysisAgent, ClarificationAgent, CodeAnalysisAgent, ComparisonAgent, ExpertiseAgent,
    FactCheckAgent, KnowledgeBaseAgent, MetricsAgent, NewsAgent, NullTaskProvider, SummaryAgent,
    TaskProvider, TechDocsAgent, TodoistAgent,
};
pub use web_search_agent::WebSearchAgent;
