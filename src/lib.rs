pub mod completion; // Text-completion collaborator (Ollama)
pub mod config;
pub mod interactions; // Normalization, curated lookup, extraction, checker

pub use completion::{CompletionError, MockCompletion, OllamaClient, TextCompletion};
pub use config::AdvisorConfig;
pub use interactions::{
    CheckOutcome, DegradedReason, EvidenceLevel, InteractionChecker, InteractionReport,
    InteractionRisk, KnowledgeStore, ModelAssistedFallback, RuleBasedMatcher, Severity,
};

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins over the default filter.
/// Calling this more than once is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    tracing::info!("{} v{} logging initialized", config::APP_NAME, config::APP_VERSION);
}
