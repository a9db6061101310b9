//! Guided-flow navigator — route-keyed state machine behind the picker UI.
//!
//! Every externally-triggered operation claims a fresh generation token and
//! re-checks it after each await; completions superseded by a newer
//! navigation are discarded instead of appended to the session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::{AppConfig, ChatTiming, Features};
use crate::data::{DataService, Diagnosis};
use crate::session::{
    Card, DropdownContext, DropdownField, FlowAction, Message, SessionStore, Suggestion,
};

/// Monotonic generation counter shared by every message-producing pipeline.
/// A newer `begin` supersedes all in-flight operations.
#[derive(Debug, Default)]
pub struct Generation {
    counter: AtomicU64,
}

impl Generation {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim a new generation token, superseding all prior operations.
    pub fn begin(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether the token still identifies the newest operation.
    pub fn is_current(&self, token: u64) -> bool {
        self.counter.load(Ordering::SeqCst) == token
    }
}

/// Guided-flow routes, keyed by URL path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    Home,
    Weather,
    Schemes,
    PlantProtection,
    SelectCrop,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Home => write!(f, "home"),
            Self::Weather => write!(f, "weather"),
            Self::Schemes => write!(f, "schemes"),
            Self::PlantProtection => write!(f, "plant-protection"),
            Self::SelectCrop => write!(f, "select-crop"),
        }
    }
}

impl std::str::FromStr for Route {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(Self::Home),
            "weather" => Ok(Self::Weather),
            "schemes" => Ok(Self::Schemes),
            "plant-protection" => Ok(Self::PlantProtection),
            "select-crop" => Ok(Self::SelectCrop),
            _ => Err(format!("Unknown route: {}", s)),
        }
    }
}

/// Route-driven navigator appending card-bearing bot messages to the session.
pub struct FlowNavigator {
    session: Arc<SessionStore>,
    data: Arc<dyn DataService>,
    generation: Arc<Generation>,
    app_name: String,
    features: Features,
    timing: ChatTiming,
    location: String,
    /// The diagnosis most recently shown, for the organic follow-up.
    last_diagnosis: RwLock<Option<Diagnosis>>,
}

impl FlowNavigator {
    pub fn new(
        session: Arc<SessionStore>,
        data: Arc<dyn DataService>,
        generation: Arc<Generation>,
        config: &AppConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            session,
            data,
            generation,
            app_name: config.branding.app_name.clone(),
            features: config.features.clone(),
            timing: config.chat.clone(),
            location: config.data.default_location.clone(),
            last_diagnosis: RwLock::new(None),
        })
    }

    /// Seed the welcome message if the restored session is empty.
    pub async fn initialize(&self) {
        if !self.session.is_empty().await {
            return;
        }
        self.seed_welcome().await;
    }

    async fn seed_welcome(&self) {
        let mut suggestions = Vec::new();
        if self.features.weather_module {
            suggestions.push(Suggestion::new("☀️", "Weather Info", FlowAction::Weather));
        }
        if self.features.plant_protection_module {
            suggestions.push(Suggestion::new(
                "🛡️",
                "Plant Protection",
                FlowAction::PlantProtection,
            ));
        }
        if self.features.schemes_module {
            suggestions.push(Suggestion::new("📜", "Schemes", FlowAction::Schemes));
        }
        suggestions.push(Suggestion::new("🌾", "Select Crop", FlowAction::SelectCrop));

        let welcome = Message::bot(format!(
            "🌾 Welcome to {}! I'm your AI-powered farming assistant. How can I help you today?",
            self.app_name
        ))
        .with_suggestions(suggestions);
        self.session.add(welcome).await;
    }

    /// Route change entry point (URL navigation, REST flow endpoint).
    pub async fn activate(&self, route: Route) {
        let token = self.generation.begin();
        self.run_route(route, token).await;
    }

    /// Suggestion-chip entry point: echoes a synthetic user message first.
    pub async fn suggest(&self, action: FlowAction) {
        match action {
            FlowAction::Home => {
                // Reset: clear the session and re-seed the welcome.
                self.generation.begin();
                self.session.clear().await;
                self.seed_welcome().await;
            }
            FlowAction::Organic => {
                let token = self.generation.begin();
                self.session.add(Message::user(action.label())).await;
                self.show_organic(token).await;
            }
            FlowAction::Weather => {
                let token = self.generation.begin();
                self.session.add(Message::user(action.label())).await;
                self.run_route(Route::Weather, token).await;
            }
            FlowAction::Schemes => {
                let token = self.generation.begin();
                self.session.add(Message::user(action.label())).await;
                self.run_route(Route::Schemes, token).await;
            }
            FlowAction::PlantProtection => {
                let token = self.generation.begin();
                self.session.add(Message::user(action.label())).await;
                self.run_route(Route::PlantProtection, token).await;
            }
            FlowAction::SelectCrop => {
                let token = self.generation.begin();
                self.session.add(Message::user(action.label())).await;
                self.run_route(Route::SelectCrop, token).await;
            }
        }
    }

    async fn run_route(&self, route: Route, token: u64) {
        match route {
            Route::Home => {
                self.session.clear().await;
                self.seed_welcome().await;
                return;
            }
            Route::Weather | Route::Schemes | Route::PlantProtection | Route::SelectCrop => {}
        }

        self.simulate_typing(self.timing.typing_delay()).await;
        if self.bail_if_stale(token, route).await {
            return;
        }

        let message = match route {
            Route::Weather => self.weather_message().await,
            Route::Schemes => self.schemes_message().await,
            Route::PlantProtection => {
                self.crop_grid_message(
                    "Let's diagnose your crop issue. Choose your crop from the grid below:",
                    "Sorry, I couldn't load plant protection data. Please try again.",
                )
                .await
            }
            Route::SelectCrop => {
                self.crop_grid_message(
                    "Choose your crop from the grid below:",
                    "Sorry, I couldn't load crops. Please try again.",
                )
                .await
            }
            Route::Home => unreachable!("handled above"),
        };

        if self.bail_if_stale(token, route).await {
            return;
        }
        self.session.add(message).await;
    }

    async fn weather_message(&self) -> Message {
        match self.data.current_weather(&self.location).await {
            Ok(current) => {
                Message::bot("Here's the current weather information for your location:")
                    .with_card(Card::Weather { data: current })
            }
            Err(e) => {
                warn!(error = %e, "Weather flow fetch failed");
                Message::bot("Sorry, I couldn't fetch weather data. Please try again.")
            }
        }
    }

    async fn schemes_message(&self) -> Message {
        match self.data.all_schemes().await {
            Ok(schemes) => {
                let titles = schemes.iter().map(|s| s.title.clone()).collect();
                Message::bot(
                    "Here are the available government schemes. Select one to learn more:",
                )
                .with_card(Card::Dropdown {
                    data: titles,
                    field: DropdownField::Scheme,
                    context: None,
                })
            }
            Err(e) => {
                warn!(error = %e, "Schemes flow fetch failed");
                Message::bot("Sorry, I couldn't fetch schemes. Please try again.")
            }
        }
    }

    async fn crop_grid_message(&self, prompt: &str, apology: &str) -> Message {
        match self.data.protection_bundle().await {
            Ok(bundle) => Message::bot(prompt).with_card(Card::CropGrid { data: bundle.crops }),
            Err(e) => {
                warn!(error = %e, "Crop grid fetch failed");
                Message::bot(apology)
            }
        }
    }

    /// Scheme picked from the dropdown. Accepts the scheme id or exact title.
    pub async fn select_scheme(&self, key: &str) {
        let token = self.generation.begin();

        let scheme = match self.data.scheme_by_id(key).await {
            Ok(Some(scheme)) => Some(scheme),
            Ok(None) => match self.data.all_schemes().await {
                Ok(schemes) => schemes.into_iter().find(|s| s.title == key),
                Err(_) => None,
            },
            Err(e) => {
                warn!(error = %e, "Scheme lookup failed");
                None
            }
        };
        if !self.generation.is_current(token) {
            debug!(key = key, "Stale scheme selection discarded");
            return;
        }

        let Some(scheme) = scheme else {
            self.session
                .add(Message::bot(
                    "Sorry, I couldn't find that scheme. Please pick one from the list.",
                ))
                .await;
            return;
        };

        self.session
            .add(Message::user(format!("Tell me about {}", scheme.title)))
            .await;
        self.simulate_typing(self.timing.scheme_detail_delay()).await;
        if !self.generation.is_current(token) {
            return;
        }

        self.session
            .add(
                Message::bot(format!("Here are the details for **{}**:", scheme.title))
                    .with_card(Card::Scheme { data: scheme }),
            )
            .await;
    }

    /// Crop picked from a grid or dropdown — shows that crop's disease list.
    pub async fn select_crop(&self, crop: &str) {
        let token = self.generation.begin();
        self.session
            .add(Message::user(format!("I selected {}", crop)))
            .await;

        self.simulate_typing(self.timing.typing_delay()).await;
        if !self.generation.is_current(token) {
            return;
        }

        let message = match self.data.protection_bundle().await {
            Ok(bundle) => {
                let diseases = bundle.diseases_for(crop);
                if diseases.is_empty() {
                    Message::bot(format!(
                        "Sorry, I couldn't find any disease records for {}. Please pick a crop from the grid.",
                        crop
                    ))
                } else {
                    Message::bot(format!(
                        "Great! Now select the disease affecting your {}:",
                        crop
                    ))
                    .with_card(Card::Dropdown {
                        data: diseases,
                        field: DropdownField::Disease,
                        context: Some(DropdownContext {
                            crop: crop.to_string(),
                        }),
                    })
                }
            }
            Err(e) => {
                warn!(error = %e, "Disease list fetch failed");
                Message::bot("Sorry, I couldn't load disease information.")
            }
        };

        if !self.generation.is_current(token) {
            debug!(crop = crop, "Stale crop selection discarded");
            return;
        }
        self.session.add(message).await;
    }

    /// Disease picked — terminal diagnosis detail with follow-up suggestions.
    pub async fn select_disease(&self, crop: &str, disease: &str) {
        let token = self.generation.begin();
        self.session
            .add(Message::user(format!("My {} has {}", crop, disease)))
            .await;

        self.simulate_typing(self.timing.diagnosis_delay()).await;
        if !self.generation.is_current(token) {
            return;
        }

        let message = match self.data.protection_bundle().await {
            Ok(bundle) => match bundle.find(crop, disease) {
                Some(diagnosis) => {
                    *self.last_diagnosis.write().await = Some(diagnosis.clone());
                    diagnosis_message(diagnosis)
                }
                None => Message::bot(format!(
                    "Sorry, I couldn't find treatment information for {} on {}.",
                    disease, crop
                ))
                .with_suggestions(vec![Suggestion::new("🏠", "Back to Home", FlowAction::Home)]),
            },
            Err(e) => {
                warn!(error = %e, "Diagnosis fetch failed");
                Message::bot("Sorry, I couldn't find treatment information.")
            }
        };

        if !self.generation.is_current(token) {
            debug!(crop = crop, disease = disease, "Stale diagnosis discarded");
            return;
        }
        self.session.add(message).await;
    }

    /// Organic follow-up for the most recent diagnosis.
    async fn show_organic(&self, token: u64) {
        self.simulate_typing(self.timing.typing_delay()).await;
        if !self.generation.is_current(token) {
            return;
        }

        let message = match self.last_diagnosis.read().await.clone() {
            Some(diagnosis) => {
                let mut text = format!(
                    "🌿 Organic treatment options for {} on {}:\n\n",
                    diagnosis.disease, diagnosis.crop
                );
                for (index, step) in diagnosis.organic_treatment.iter().enumerate() {
                    text.push_str(&format!("{}. {}\n", index + 1, step));
                }
                Message::bot(text).with_suggestions(vec![Suggestion::new(
                    "🏠",
                    "Back to Home",
                    FlowAction::Home,
                )])
            }
            None => Message::bot(
                "Please diagnose a crop problem first — then I can suggest organic treatments.",
            ),
        };

        self.session.add(message).await;
    }

    async fn simulate_typing(&self, delay: Duration) {
        self.session.set_typing(true).await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.session.set_typing(false).await;
    }

    async fn bail_if_stale(&self, token: u64, route: Route) -> bool {
        if self.generation.is_current(token) {
            return false;
        }
        debug!(route = %route, "Stale flow result discarded");
        true
    }
}

/// Render the full diagnosis detail text.
fn diagnosis_message(diagnosis: &Diagnosis) -> Message {
    let mut text = format!(
        "**Diagnosis: {}**\n\n🦠 **Cause:** {}\n⚠️ **Severity:** {}\n\n💊 **Treatment:**\n",
        diagnosis.disease, diagnosis.cause, diagnosis.severity
    );
    for (index, step) in diagnosis.treatment.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", index + 1, step));
    }
    text.push_str("\n🛡️ **Prevention:**\n");
    for (index, tip) in diagnosis.prevention.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", index + 1, tip));
    }
    text.push_str("\n🌿 **Organic Treatment:**\n");
    for (index, step) in diagnosis.organic_treatment.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", index + 1, step));
    }

    Message::bot(text).with_suggestions(vec![
        Suggestion::new("🌿", "Organic Treatment", FlowAction::Organic),
        Suggestion::new("🏠", "Back to Home", FlowAction::Home),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FailingDataService, LatencyProfile, StaticDataService};
    use crate::session::{Sender, Storage};

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.chat = ChatTiming::instant();
        config
    }

    fn navigator_with(data: Arc<dyn DataService>) -> (Arc<SessionStore>, Arc<FlowNavigator>) {
        let session = SessionStore::open(Arc::new(Storage::in_memory()));
        let navigator = FlowNavigator::new(
            Arc::clone(&session),
            data,
            Generation::new(),
            &test_config(),
        );
        (session, navigator)
    }

    fn fixture_navigator() -> (Arc<SessionStore>, Arc<FlowNavigator>) {
        navigator_with(Arc::new(StaticDataService::fixture()))
    }

    #[tokio::test]
    async fn initialize_seeds_welcome_exactly_once() {
        let (session, navigator) = fixture_navigator();
        navigator.initialize().await;
        navigator.initialize().await;

        let messages = session.messages().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].text.contains("Welcome to KrishiBot"));
        assert_eq!(messages[0].sender, Sender::Bot);
        // All three feature modules on + Select Crop
        assert_eq!(messages[0].suggestions.len(), 4);
    }

    #[tokio::test]
    async fn welcome_suggestions_follow_feature_flags() {
        let session = SessionStore::open(Arc::new(Storage::in_memory()));
        let mut config = test_config();
        config.features.schemes_module = false;
        config.features.weather_module = false;
        let navigator = FlowNavigator::new(
            Arc::clone(&session),
            Arc::new(StaticDataService::fixture()),
            Generation::new(),
            &config,
        );
        navigator.initialize().await;

        let messages = session.messages().await;
        let actions: Vec<FlowAction> = messages[0]
            .suggestions
            .iter()
            .map(|s| s.action)
            .collect();
        assert_eq!(
            actions,
            vec![FlowAction::PlantProtection, FlowAction::SelectCrop]
        );
    }

    #[tokio::test]
    async fn weather_route_appends_weather_card() {
        let (session, navigator) = fixture_navigator();
        navigator.activate(Route::Weather).await;

        let messages = session.messages().await;
        let last = messages.last().unwrap();
        assert_eq!(last.sender, Sender::Bot);
        match &last.card {
            Some(Card::Weather { data }) => {
                assert_eq!(data.temperature, 28);
                assert_eq!(data.condition, "Clear");
            }
            other => panic!("expected weather card, got {other:?}"),
        }
        assert!(!session.is_typing().await);
    }

    #[tokio::test]
    async fn schemes_route_appends_scheme_dropdown() {
        let (session, navigator) = fixture_navigator();
        navigator.activate(Route::Schemes).await;

        let last = session.messages().await.pop().unwrap();
        match &last.card {
            Some(Card::Dropdown { data, field, context }) => {
                assert_eq!(*field, DropdownField::Scheme);
                assert!(context.is_none());
                assert!(data.contains(&"PM-KISAN Samman Nidhi".to_string()));
            }
            other => panic!("expected dropdown card, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn protection_and_select_crop_routes_append_crop_grid() {
        let (session, navigator) = fixture_navigator();
        navigator.activate(Route::PlantProtection).await;
        navigator.activate(Route::SelectCrop).await;

        let messages = session.messages().await;
        for message in &messages {
            match &message.card {
                Some(Card::CropGrid { data }) => {
                    assert!(data.contains(&"Tomato".to_string()));
                }
                other => panic!("expected crop grid, got {other:?}"),
            }
        }
        assert!(messages[0].text.contains("diagnose your crop issue"));
        assert_eq!(messages[1].text, "Choose your crop from the grid below:");
    }

    #[tokio::test]
    async fn data_failure_appends_apology_without_card() {
        let (session, navigator) = navigator_with(Arc::new(FailingDataService));
        navigator.activate(Route::Weather).await;
        navigator.activate(Route::Schemes).await;
        navigator.activate(Route::PlantProtection).await;

        let messages = session.messages().await;
        assert_eq!(messages.len(), 3);
        for message in &messages {
            assert!(message.text.starts_with("Sorry"));
            assert!(message.card.is_none());
        }
        assert!(!session.is_typing().await);
    }

    #[tokio::test]
    async fn suggestion_click_echoes_user_message() {
        let (session, navigator) = fixture_navigator();
        navigator.suggest(FlowAction::PlantProtection).await;

        let messages = session.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].text, "Plant Protection");
        assert_eq!(messages[1].sender, Sender::Bot);
    }

    #[tokio::test]
    async fn select_scheme_by_id_and_by_title() {
        let (session, navigator) = fixture_navigator();
        navigator.select_scheme("pm-kisan").await;
        navigator.select_scheme("Kisan Credit Card").await;

        let messages = session.messages().await;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].text, "Tell me about PM-KISAN Samman Nidhi");
        assert!(messages[1].text.contains("**PM-KISAN Samman Nidhi**"));
        assert!(matches!(messages[1].card, Some(Card::Scheme { .. })));
        assert!(messages[3].text.contains("**Kisan Credit Card**"));
    }

    #[tokio::test]
    async fn select_unknown_scheme_falls_back() {
        let (session, navigator) = fixture_navigator();
        navigator.select_scheme("free-tractors").await;

        let messages = session.messages().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].text.contains("couldn't find that scheme"));
    }

    #[tokio::test]
    async fn select_crop_shows_disease_dropdown_with_context() {
        let (session, navigator) = fixture_navigator();
        navigator.select_crop("Tomato").await;

        let messages = session.messages().await;
        assert_eq!(messages[0].text, "I selected Tomato");
        let last = messages.last().unwrap();
        match &last.card {
            Some(Card::Dropdown { data, field, context }) => {
                assert_eq!(*field, DropdownField::Disease);
                assert_eq!(context.as_ref().unwrap().crop, "Tomato");
                assert!(data.contains(&"Early Blight".to_string()));
            }
            other => panic!("expected disease dropdown, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn select_unknown_crop_falls_back() {
        let (session, navigator) = fixture_navigator();
        navigator.select_crop("Banana").await;

        let last = session.messages().await.pop().unwrap();
        assert!(last.text.contains("couldn't find any disease records for Banana"));
        assert!(last.card.is_none());
    }

    #[tokio::test]
    async fn diagnosis_detail_carries_every_fixture_entry_verbatim() {
        let (session, navigator) = fixture_navigator();
        navigator.select_disease("Tomato", "Early Blight").await;

        let service = StaticDataService::fixture();
        let bundle = service.protection_bundle().await.unwrap();
        let fixture = bundle.find("Tomato", "Early Blight").unwrap();

        let last = session.messages().await.pop().unwrap();
        assert!(last.text.contains("**Diagnosis: Early Blight**"));
        assert!(last.text.contains(&fixture.cause));
        assert!(last.text.contains("Medium"));
        for entry in fixture
            .treatment
            .iter()
            .chain(&fixture.prevention)
            .chain(&fixture.organic_treatment)
        {
            assert!(last.text.contains(entry), "missing entry: {entry}");
        }
        let actions: Vec<FlowAction> = last.suggestions.iter().map(|s| s.action).collect();
        assert_eq!(actions, vec![FlowAction::Organic, FlowAction::Home]);
    }

    #[tokio::test]
    async fn absent_crop_disease_pair_falls_back_without_panic() {
        let (session, navigator) = fixture_navigator();
        navigator.select_disease("Tomato", "Moon Blight").await;

        let last = session.messages().await.pop().unwrap();
        assert!(
            last.text
                .contains("couldn't find treatment information for Moon Blight on Tomato")
        );
    }

    #[tokio::test]
    async fn home_suggestion_resets_to_welcome_only() {
        let (session, navigator) = fixture_navigator();
        navigator.initialize().await;
        navigator.activate(Route::Weather).await;
        navigator.select_crop("Tomato").await;
        assert!(session.len().await > 1);

        navigator.suggest(FlowAction::Home).await;
        let messages = session.messages().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].text.contains("Welcome to KrishiBot"));
        assert!(!session.is_typing().await);
    }

    #[tokio::test]
    async fn organic_followup_uses_last_diagnosis() {
        let (session, navigator) = fixture_navigator();
        navigator.select_disease("Tomato", "Early Blight").await;
        navigator.suggest(FlowAction::Organic).await;

        let last = session.messages().await.pop().unwrap();
        assert!(last.text.contains("Organic treatment options for Early Blight on Tomato"));
        assert!(last.text.contains("neem oil"));
    }

    #[tokio::test]
    async fn organic_without_diagnosis_asks_for_one() {
        let (session, navigator) = fixture_navigator();
        navigator.suggest(FlowAction::Organic).await;

        let last = session.messages().await.pop().unwrap();
        assert!(last.text.contains("diagnose a crop problem first"));
    }

    #[tokio::test]
    async fn superseded_flow_result_is_discarded() {
        // Weather fetch takes 50ms; the home reset lands first and must win.
        let latency = LatencyProfile {
            weather: Duration::from_millis(50),
            ..LatencyProfile::off()
        };
        let data = Arc::new(StaticDataService::from_embedded(latency).unwrap());
        let (session, navigator) = navigator_with(data);

        let slow = {
            let navigator = Arc::clone(&navigator);
            tokio::spawn(async move { navigator.activate(Route::Weather).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        navigator.suggest(FlowAction::Home).await;
        slow.await.unwrap();

        let messages = session.messages().await;
        assert_eq!(messages.len(), 1, "stale weather reply must be dropped");
        assert!(messages[0].text.contains("Welcome to KrishiBot"));
        assert!(!session.is_typing().await);
    }

    #[test]
    fn route_display_fromstr_roundtrip() {
        for route in [
            Route::Home,
            Route::Weather,
            Route::Schemes,
            Route::PlantProtection,
            Route::SelectCrop,
        ] {
            let parsed: Route = route.to_string().parse().unwrap();
            assert_eq!(parsed, route);
        }
        assert!("profile".parse::<Route>().is_err());
    }
}
