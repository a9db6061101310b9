//! Rule-based response composer.
//!
//! Resolves the intent, then composes a templated reply — calling the data
//! services where the topic needs live data. Every data failure is converted
//! to a fixed apology reply right here: `respond` cannot fail.

use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use super::intent::{Intent, IntentResolver};
use super::{BotReply, ChatEngine};
use crate::data::DataService;

const GREETINGS: &[&str] = &[
    "Hello! I'm KrishiBot, your farming assistant. How can I help you today?",
    "Namaste! I'm here to help with weather, government schemes, and plant protection. What would you like to know?",
    "Hi there! I can assist you with farming-related queries. Ask me about weather, schemes, or crop protection!",
];

/// Rule-based chat engine serving templated replies from static data.
pub struct MockChatEngine {
    resolver: IntentResolver,
    data: Arc<dyn DataService>,
    location: String,
}

impl MockChatEngine {
    pub fn new(data: Arc<dyn DataService>, location: impl Into<String>) -> Self {
        Self {
            resolver: IntentResolver::new(),
            data,
            location: location.into(),
        }
    }

    /// Compose the reply for an already-resolved intent.
    pub async fn compose(&self, intent: Intent) -> BotReply {
        match intent {
            Intent::Greeting => self.greeting_reply(),
            Intent::Weather => self.weather_reply().await,
            Intent::Schemes => self.schemes_reply().await,
            Intent::PlantProtection => self.protection_reply().await,
            Intent::Fertilizer => Self::fertilizer_reply(),
            Intent::General => Self::general_reply(),
            Intent::Unknown => Self::default_reply(),
        }
    }

    fn greeting_reply(&self) -> BotReply {
        let text = GREETINGS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(GREETINGS[0]);
        BotReply {
            text: text.to_string(),
            quick_replies: vec![
                "Check Weather".into(),
                "Government Schemes".into(),
                "Plant Protection".into(),
                "General Help".into(),
            ],
        }
    }

    async fn weather_reply(&self) -> BotReply {
        match self.data.current_weather(&self.location).await {
            Ok(current) => BotReply {
                text: format!(
                    "Current weather in {}:\n🌡️ Temperature: {}°C\n☁️ Condition: {}\n💧 Humidity: {}%\n💨 Wind Speed: {} km/h\n\nWould you like to see the 7-day forecast?",
                    current.location,
                    current.temperature,
                    current.condition,
                    current.humidity,
                    current.wind_speed
                ),
                quick_replies: vec![
                    "7-Day Forecast".into(),
                    "Weather Alerts".into(),
                    "Farming Tips".into(),
                ],
            },
            Err(e) => {
                warn!(error = %e, "Weather fetch failed, serving apology");
                BotReply {
                    text: "Sorry, I couldn't fetch the weather data right now. Please try again later."
                        .into(),
                    quick_replies: vec!["Retry Weather".into(), "Other Services".into()],
                }
            }
        }
    }

    async fn schemes_reply(&self) -> BotReply {
        match self.data.all_schemes().await {
            Ok(schemes) => {
                let top = &schemes[..schemes.len().min(3)];
                let mut text =
                    String::from("Here are some popular government schemes for farmers:\n\n");
                for (index, scheme) in top.iter().enumerate() {
                    text.push_str(&format!(
                        "{}. {}\n   {}\n   Benefits: {}\n\n",
                        index + 1,
                        scheme.title,
                        scheme.short_description,
                        scheme.benefits
                    ));
                }
                text.push_str("Would you like to know more about any specific scheme?");

                let quick_replies = top
                    .iter()
                    .map(|s| {
                        let mut short: String = s.title.chars().take(20).collect();
                        short.push_str("...");
                        short
                    })
                    .collect();
                BotReply { text, quick_replies }
            }
            Err(e) => {
                warn!(error = %e, "Schemes fetch failed, serving apology");
                BotReply {
                    text: "Sorry, I couldn't fetch the schemes data right now. Please try again later."
                        .into(),
                    quick_replies: vec!["Retry Schemes".into(), "Other Services".into()],
                }
            }
        }
    }

    async fn protection_reply(&self) -> BotReply {
        match self.data.preventive_tips().await {
            Ok(tips) => {
                let mut text = String::from("Here are some plant protection tips:\n\n");
                for (index, tip) in tips.iter().take(3).enumerate() {
                    text.push_str(&format!("{}. {}\n", index + 1, tip));
                }
                text.push_str(
                    "\nFor specific pest/disease diagnosis, please use our Plant Protection tool with crop and symptom details.",
                );
                BotReply {
                    text,
                    quick_replies: vec![
                        "Diagnose Problem".into(),
                        "More Tips".into(),
                        "Organic Solutions".into(),
                    ],
                }
            }
            Err(e) => {
                warn!(error = %e, "Preventive tips fetch failed, serving apology");
                BotReply {
                    text: "Sorry, I couldn't fetch plant protection information right now. Please try again later."
                        .into(),
                    quick_replies: vec!["Retry Protection".into(), "Other Services".into()],
                }
            }
        }
    }

    fn fertilizer_reply() -> BotReply {
        BotReply {
            text: "For fertilizer recommendations:\n\n1. Get your soil tested first\n2. Use balanced NPK fertilizers\n3. Consider organic options like compost\n4. Apply fertilizers based on crop growth stage\n5. Follow recommended dosages\n\nWould you like information about soil testing schemes?"
                .into(),
            quick_replies: vec![
                "Soil Testing".into(),
                "Organic Fertilizers".into(),
                "NPK Guide".into(),
            ],
        }
    }

    fn general_reply() -> BotReply {
        BotReply {
            text: "I can help you with:\n\n🌤️ Weather forecasts and alerts\n🏛️ Government schemes and subsidies\n🌱 Plant protection and pest management\n💬 General farming advice\n\nYou can also use our guided flow for step-by-step assistance!"
                .into(),
            quick_replies: vec![
                "Weather".into(),
                "Schemes".into(),
                "Plant Protection".into(),
                "Guided Flow".into(),
            ],
        }
    }

    fn default_reply() -> BotReply {
        BotReply {
            text: "I didn't quite understand that. I can help you with weather information, government schemes, and plant protection. Try asking about:\n\n• Current weather and forecasts\n• Government schemes for farmers\n• Pest and disease management\n• Fertilizer recommendations\n\nOr use our guided flow for structured assistance!"
                .into(),
            quick_replies: vec![
                "Weather".into(),
                "Schemes".into(),
                "Plant Protection".into(),
                "Guided Flow".into(),
            ],
        }
    }
}

#[async_trait]
impl ChatEngine for MockChatEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn respond(&self, text: &str) -> BotReply {
        let intent = self.resolver.resolve(text);
        debug!(intent = %intent, "Composing rule-based reply");
        self.compose(intent).await
    }
}
