//! Chat engines — free-text in, composed reply out.
//!
//! The mock engine is always available; the LLM engine is opt-in and falls
//! back to the mock on any failure, so `respond` is infallible either way.

pub mod intent;
pub mod llm;
pub mod mock;

pub use intent::{Intent, IntentResolver};
pub use llm::LlmChatEngine;
pub use mock::MockChatEngine;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::AppConfig;
use crate::data::DataService;

/// A composed bot reply: text plus quick-reply chips.
#[derive(Debug, Clone, PartialEq)]
pub struct BotReply {
    pub text: String,
    pub quick_replies: Vec<String>,
}

/// A chat engine answers free text. Infallible by contract: engines convert
/// their own failures into fallback replies.
#[async_trait]
pub trait ChatEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn respond(&self, text: &str) -> BotReply;
}

/// Pick the engine from configuration: LLM when enabled and a key is present,
/// the rule-based mock otherwise.
pub fn create_engine(config: &AppConfig, data: Arc<dyn DataService>) -> Arc<dyn ChatEngine> {
    let location = config.data.default_location.clone();
    if config.llm.enabled {
        if let Some(api_key) = config.llm.api_key.clone() {
            info!(model = %config.llm.model, "Using LLM chat engine");
            return Arc::new(LlmChatEngine::new(
                config.llm.base_url.clone(),
                config.llm.model.clone(),
                api_key,
                MockChatEngine::new(data, location),
            ));
        }
        info!("LLM engine enabled but no API key set, using mock engine");
    } else {
        info!("Using mock chat engine");
    }
    Arc::new(MockChatEngine::new(data, location))
}
