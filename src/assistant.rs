//! Assistant — wires the session store, chat engine, and flow navigator into
//! the free-text send pipeline.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::config::ChatTiming;
use crate::engine::ChatEngine;
use crate::flow::{FlowNavigator, Generation};
use crate::session::{Message, SessionStore};

/// Orchestrator for one user's conversation.
pub struct Assistant {
    session: Arc<SessionStore>,
    engine: Arc<dyn ChatEngine>,
    navigator: Arc<FlowNavigator>,
    generation: Arc<Generation>,
    timing: ChatTiming,
}

impl Assistant {
    pub fn new(
        session: Arc<SessionStore>,
        engine: Arc<dyn ChatEngine>,
        navigator: Arc<FlowNavigator>,
        generation: Arc<Generation>,
        timing: ChatTiming,
    ) -> Arc<Self> {
        Arc::new(Self {
            session,
            engine,
            navigator,
            generation,
            timing,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn navigator(&self) -> &Arc<FlowNavigator> {
        &self.navigator
    }

    /// Free-text send pipeline: echo the user message, simulate typing, ask
    /// the engine, append the reply. Empty input is a no-op; a newer send or
    /// navigation supersedes the pending reply.
    pub async fn send_message(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring empty message");
            return;
        }

        let token = self.generation.begin();
        self.session.add(Message::user(text)).await;

        self.simulate_typing().await;
        if !self.generation.is_current(token) {
            debug!("Stale send discarded before composing");
            return;
        }

        let reply = self.engine.respond(text).await;
        if !self.generation.is_current(token) {
            debug!("Stale reply discarded");
            return;
        }

        self.session
            .add(Message::bot(reply.text).with_quick_replies(reply.quick_replies))
            .await;
    }

    /// Clear the session and re-seed the welcome message.
    pub async fn clear_session(&self) {
        self.generation.begin();
        self.session.clear().await;
        self.navigator.initialize().await;
    }

    async fn simulate_typing(&self) {
        let jitter_ms = if self.timing.typing_jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.timing.typing_jitter_ms)
        } else {
            0
        };
        let delay = self.timing.typing_delay() + Duration::from_millis(jitter_ms);

        self.session.set_typing(true).await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.session.set_typing(false).await;
    }
}
