use std::sync::Arc;

use tracing::{debug, error, warn};
use uuid::Uuid;

use tably_context::{KnowledgeStore, WeatherService};
use tably_core::chat::{
    BusinessInfo, BusinessProfile, ChatReply, ChatRequest, SimpleChatReply, SimpleChatRequest,
    WeatherSummary,
};
use tably_core::errors::ChatError;
use tably_core::knowledge::format_for_prompt;
use tably_core::route::RouterInput;
use tably_core::weather::WeatherQuery;
use tably_llm::{CompletionProvider, TokenStream};

const PROVIDER_FAILURE_APOLOGY: &str =
    "I apologize, but I'm having trouble processing your request right now. Please try again later.";
const EMPTY_COMPLETION_APOLOGY: &str =
    "I apologize, but I couldn't generate a response at the moment.";

/// Per-request pipeline: decide what context the message needs, fetch
/// it (degrading on failure), assemble the prompt, call the model.
pub struct ChatCore {
    weather: Arc<WeatherService>,
    knowledge: Arc<KnowledgeStore>,
    provider: Arc<dyn CompletionProvider>,
    profile: BusinessProfile,
    default_location: String,
}

impl ChatCore {
    pub fn new(
        weather: Arc<WeatherService>,
        knowledge: Arc<KnowledgeStore>,
        provider: Arc<dyn CompletionProvider>,
        profile: BusinessProfile,
        default_location: String,
    ) -> Self {
        Self {
            weather,
            knowledge,
            provider,
            profile,
            default_location,
        }
    }

    /// Blocking chat. Provider-side failures never error the call:
    /// they become the fixed apology. Only caller input and
    /// configuration problems surface as errors.
    pub async fn process_message(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        let (system_prompt, weather_info, location) = self.assemble_context(&request).await?;

        let response = match self.provider.complete(&system_prompt, &request.message).await {
            Ok(text) if text.is_empty() => EMPTY_COMPLETION_APOLOGY.to_string(),
            Ok(text) => text,
            Err(e @ ChatError::Configuration(_)) => return Err(e),
            Err(e) => {
                error!(error = %e, kind = e.error_kind(), "completion failed");
                PROVIDER_FAILURE_APOLOGY.to_string()
            }
        };

        Ok(ChatReply {
            response,
            conversation_id: conversation_id(request.conversation_id),
            weather_info,
            business_info: request.business_name.map(|name| BusinessInfo {
                name,
                location,
                kind: request.business_type.unwrap_or_else(|| "business".to_string()),
            }),
        })
    }

    /// Streaming chat: same context assembly, then the provider's raw
    /// token stream. Dropping the stream cancels the completion.
    pub async fn process_streaming(&self, request: ChatRequest) -> Result<TokenStream, ChatError> {
        let (system_prompt, _, _) = self.assemble_context(&request).await?;
        self.provider.stream(&system_prompt, &request.message).await
    }

    /// Simple chat: route first, then answer for the configured
    /// business profile, echoing the routing decision.
    pub async fn process_simple(
        &self,
        request: SimpleChatRequest,
    ) -> Result<SimpleChatReply, ChatError> {
        let routed = tably_router::route_message(&RouterInput {
            message: request.message.clone(),
            business_id: Some(self.profile.id.clone()),
        });
        debug!(route = routed.route.as_str(), facets = routed.business_facets.len(), "routed simple chat");

        let reply = self.process_message(self.profile_request(request)).await?;

        Ok(SimpleChatReply {
            response: reply.response,
            conversation_id: reply.conversation_id,
            weather_info: reply.weather_info,
            business_info: reply.business_info,
            route: routed.route,
            business_facets: routed.business_facets,
        })
    }

    pub async fn process_simple_streaming(
        &self,
        request: SimpleChatRequest,
    ) -> Result<TokenStream, ChatError> {
        self.process_streaming(self.profile_request(request)).await
    }

    fn profile_request(&self, request: SimpleChatRequest) -> ChatRequest {
        ChatRequest {
            message: request.message,
            business_location: Some(self.profile.location.clone()),
            business_name: Some(self.profile.name.clone()),
            business_type: Some(self.profile.kind.clone()),
            conversation_id: request.conversation_id,
        }
    }

    /// Steps shared by the blocking and streaming paths: validate,
    /// fetch weather if the message calls for it (failure degrades to
    /// absence), retrieve knowledge, build the system prompt.
    async fn assemble_context(
        &self,
        request: &ChatRequest,
    ) -> Result<(String, Option<WeatherSummary>, String), ChatError> {
        if request.message.trim().is_empty() {
            return Err(ChatError::InvalidArgument("message must not be empty".to_string()));
        }

        let location = request
            .business_location
            .clone()
            .unwrap_or_else(|| self.default_location.clone());

        let weather_info = if tably_router::needs_weather_context(&request.message) {
            match self
                .weather
                .get_weather(&WeatherQuery::for_place(&location))
                .await
            {
                Ok(reading) => {
                    debug!(location, temp_f = reading.temp_f, "weather fetched");
                    Some(WeatherSummary::from(&reading))
                }
                Err(e) => {
                    warn!(location, error = %e, "weather unavailable, continuing without it");
                    None
                }
            }
        } else {
            None
        };

        let chunks = self.knowledge.current().retrieve(&request.message);
        let knowledge_block = format_for_prompt(&chunks);

        let system_prompt = build_system_prompt(
            request.business_name.as_deref(),
            weather_info.as_ref(),
            &knowledge_block,
        );

        Ok((system_prompt, weather_info, location))
    }
}

fn conversation_id(existing: Option<String>) -> String {
    existing.unwrap_or_else(|| Uuid::now_v7().to_string())
}

/// Fixed persona/scope preamble, then the optional weather line, then
/// the knowledge block (which carries its own leading blank line).
fn build_system_prompt(
    business_name: Option<&str>,
    weather: Option<&WeatherSummary>,
    knowledge_block: &str,
) -> String {
    let mut prompt = format!(
        "You are the assistant for {}. Answer ONLY using the business-info.yaml file \
         for business information. If business info is not in the file, say you don't \
         have it and offer to connect them to the business. Never guess or use other sources.\
         \n\nAllowed topics: hours, menu highlights, patio & pets, weather (use weather API), \
         contact/directions. Keep replies \u{2264}2 short sentences. If out of scope or \
         missing data: brief apology + offer to connect.",
        business_name.unwrap_or("The Cellar"),
    );

    if let Some(weather) = weather {
        prompt.push_str(&format!(
            "\n\nCurrent weather: {}\u{b0}F ({}\u{b0}C) in {}.",
            weather.temp_f, weather.temp_c, weather.location
        ));
    }

    prompt.push_str(knowledge_block);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::extract::State;
    use axum::routing::get;
    use axum::{Json, Router};
    use parking_lot::Mutex;

    use tably_context::{Geocoder, KnowledgeBase};
    use tably_core::config::Settings;
    use tably_llm::{MockProvider, MockResponse};
    use tably_net::{ResilientClient, RetryPolicy, TtlCache};

    const SAMPLE_YAML: &str = r#"
business:
  name: The Cellar
  type: wine_bar_cafe
  address: 156 Avenida Del Mar, San Clemente, CA 92672
  contact:
    phone: (949) 492-3663
    email: hello@thecellarsite.com
    website: https://thecellarsite.com
hours:
  regular:
    mon: closed
  service_notes:
    brunch: Sat-Sun 10:00-14:00
policies:
  pets: Dogs welcome on the patio
amenities:
  patio: Heated ocean-view patio
"#;

    /// Records the prompts it receives, then answers "ok".
    struct CapturingProvider {
        last_system: Mutex<Option<String>>,
    }

    impl CapturingProvider {
        fn new() -> Self {
            Self {
                last_system: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for CapturingProvider {
        fn name(&self) -> &str {
            "capturing"
        }

        fn model(&self) -> &str {
            "capturing"
        }

        async fn complete(&self, system: &str, _user: &str) -> Result<String, ChatError> {
            *self.last_system.lock() = Some(system.to_string());
            Ok("ok".to_string())
        }

        async fn stream(&self, system: &str, _user: &str) -> Result<TokenStream, ChatError> {
            *self.last_system.lock() = Some(system.to_string());
            Ok(Box::pin(futures::stream::iter(vec![Ok("ok".to_string())])))
        }
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Upstream pair: geocode resolves anything, realtime returns a
    /// fixed 20C. Returns (settings, weather hit counter).
    async fn weather_upstreams() -> (Settings, Arc<AtomicUsize>) {
        let geocode_router = Router::new().route(
            "/search",
            get(|| async {
                Json(serde_json::json!([
                    {"display_name": "San Clemente, CA", "lat": "33.4269", "lon": "-117.6119"}
                ]))
            }),
        );
        let geocode_base = serve(geocode_router).await;

        let hits = Arc::new(AtomicUsize::new(0));
        let weather_router = Router::new()
            .route(
                "/realtime",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(serde_json::json!({
                        "data": {"values": {"temperature": 20.0, "weatherCode": 1000}}
                    }))
                }),
            )
            .with_state(hits.clone());
        let weather_base = serve(weather_router).await;

        let settings = Settings::from_lookup(move |key| match key {
            "NOMINATIM_USER_AGENT" => Some("tably-test/0.1".to_string()),
            "TOMORROW_API_KEY" => Some("k".to_string()),
            "OPENAI_API_KEY" => Some("k".to_string()),
            "GEOCODE_BASE_URL" => Some(geocode_base.clone()),
            "WEATHER_BASE_URL" => Some(weather_base.clone()),
            _ => None,
        })
        .unwrap();

        (settings, hits)
    }

    fn core_with(settings: &Settings, provider: Arc<dyn CompletionProvider>) -> ChatCore {
        let http = Arc::new(ResilientClient::with_policy(RetryPolicy {
            attempts: 3,
            backoff_base: Duration::from_millis(1),
            overall_timeout: Duration::from_secs(2),
        }));
        let cache = Arc::new(TtlCache::new());
        let geocoder = Arc::new(Geocoder::new(http.clone(), cache.clone(), settings));
        let weather = Arc::new(WeatherService::new(http, cache, geocoder, settings));
        let knowledge = Arc::new(KnowledgeStore::new(
            KnowledgeBase::from_yaml(SAMPLE_YAML).unwrap(),
        ));
        ChatCore::new(
            weather,
            knowledge,
            provider,
            BusinessProfile::default(),
            "San Clemente, CA".to_string(),
        )
    }

    fn request(message: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            business_location: Some("San Clemente, CA".to_string()),
            business_name: Some("The Cellar".to_string()),
            business_type: Some("wine_bar_cafe".to_string()),
            conversation_id: None,
        }
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_any_work() {
        let (settings, hits) = weather_upstreams().await;
        let core = core_with(&settings, Arc::new(MockProvider::new(vec![])));
        let err = core.process_message(request("   ")).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn weather_question_gets_weather_context() {
        let (settings, hits) = weather_upstreams().await;
        let provider = Arc::new(CapturingProvider::new());
        let core = core_with(&settings, provider.clone());

        let reply = core
            .process_message(request("Is it warm enough for the patio today?"))
            .await
            .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let weather = reply.weather_info.unwrap();
        assert_eq!(weather.temp_f, 68.0);
        assert_eq!(weather.temp_c, 20.0);

        let prompt = provider.last_system.lock().clone().unwrap();
        assert!(prompt.starts_with("You are the assistant for The Cellar."));
        assert!(prompt.contains("Current weather: 68\u{b0}F (20\u{b0}C) in San Clemente, CA."));
        // Patio question also pulls the amenities chunk.
        assert!(prompt.contains("Business Information:"));
        assert!(prompt.contains("AMENITIES: patio: Heated ocean-view patio"));
    }

    #[tokio::test]
    async fn non_weather_question_skips_the_fetch() {
        let (settings, hits) = weather_upstreams().await;
        let provider = Arc::new(CapturingProvider::new());
        let core = core_with(&settings, provider.clone());

        let reply = core.process_message(request("Do you have wifi?")).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(reply.weather_info.is_none());

        let prompt = provider.last_system.lock().clone().unwrap();
        assert!(!prompt.contains("Current weather"));
    }

    #[tokio::test]
    async fn weather_failure_degrades_to_absence() {
        let (settings, _) = weather_upstreams().await;
        // Redirect weather at a dead port; geocode still works.
        let broken = Settings::from_lookup(|key| match key {
            "WEATHER_BASE_URL" => Some("http://127.0.0.1:1".to_string()),
            "NOMINATIM_USER_AGENT" => Some("tably-test/0.1".to_string()),
            "TOMORROW_API_KEY" => Some("k".to_string()),
            "OPENAI_API_KEY" => Some("k".to_string()),
            "GEOCODE_BASE_URL" => Some(settings.geocode_base_url.clone()),
            _ => None,
        })
        .unwrap();

        let core = core_with(&broken, Arc::new(MockProvider::new(vec![
            MockResponse::text("Come on down!"),
        ])));
        let reply = core
            .process_message(request("What's the weather like?"))
            .await
            .unwrap();
        assert!(reply.weather_info.is_none());
        assert_eq!(reply.response, "Come on down!");
    }

    #[tokio::test]
    async fn provider_failure_becomes_the_apology() {
        let (settings, _) = weather_upstreams().await;
        let core = core_with(&settings, Arc::new(MockProvider::new(vec![
            MockResponse::Error(ChatError::Upstream { status: 500, body: "down".into() }),
        ])));
        let reply = core.process_message(request("Do you have wifi?")).await.unwrap();
        assert_eq!(reply.response, PROVIDER_FAILURE_APOLOGY);
    }

    #[tokio::test]
    async fn empty_completion_becomes_the_fallback() {
        let (settings, _) = weather_upstreams().await;
        let core = core_with(&settings, Arc::new(MockProvider::new(vec![
            MockResponse::text(""),
        ])));
        let reply = core.process_message(request("Do you have wifi?")).await.unwrap();
        assert_eq!(reply.response, EMPTY_COMPLETION_APOLOGY);
    }

    #[tokio::test]
    async fn configuration_error_propagates() {
        let (settings, _) = weather_upstreams().await;
        let core = core_with(&settings, Arc::new(MockProvider::new(vec![
            MockResponse::Error(ChatError::Configuration("no key".into())),
        ])));
        let err = core.process_message(request("Do you have wifi?")).await.unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
    }

    #[tokio::test]
    async fn business_info_present_iff_name_supplied() {
        let (settings, _) = weather_upstreams().await;
        let core = core_with(&settings, Arc::new(MockProvider::new(vec![
            MockResponse::text("a"),
            MockResponse::text("b"),
        ])));

        let with_name = core.process_message(request("Do you have wifi?")).await.unwrap();
        let info = with_name.business_info.unwrap();
        assert_eq!(info.name, "The Cellar");
        assert_eq!(info.kind, "wine_bar_cafe");
        assert_eq!(info.location, "San Clemente, CA");

        let anonymous = core
            .process_message(ChatRequest {
                message: "Do you have wifi?".to_string(),
                business_location: None,
                business_name: None,
                business_type: None,
                conversation_id: None,
            })
            .await
            .unwrap();
        assert!(anonymous.business_info.is_none());
    }

    #[tokio::test]
    async fn conversation_id_is_preserved_or_minted() {
        let (settings, _) = weather_upstreams().await;
        let core = core_with(&settings, Arc::new(MockProvider::new(vec![
            MockResponse::text("a"),
            MockResponse::text("b"),
        ])));

        let mut req = request("Do you have wifi?");
        req.conversation_id = Some("conv-42".to_string());
        let reply = core.process_message(req).await.unwrap();
        assert_eq!(reply.conversation_id, "conv-42");

        let reply = core.process_message(request("Do you have wifi?")).await.unwrap();
        assert!(!reply.conversation_id.is_empty());
    }

    #[tokio::test]
    async fn simple_chat_carries_route_and_facets() {
        use tably_core::route::{Facet, Route};

        let (settings, _) = weather_upstreams().await;
        let core = core_with(&settings, Arc::new(MockProvider::new(vec![
            MockResponse::text("Dogs are welcome on the patio."),
        ])));

        let reply = core
            .process_simple(SimpleChatRequest {
                message: "Can I bring my dog to the patio?".to_string(),
                conversation_id: None,
            })
            .await
            .unwrap();

        assert_eq!(reply.route, Route::Business);
        assert!(reply.business_facets.contains(&Facet::Dog));
        assert!(reply.business_facets.contains(&Facet::Patio));
        assert_eq!(reply.business_info.unwrap().name, "The Cellar");
    }

    #[tokio::test]
    async fn streaming_assembles_the_same_context() {
        use futures::StreamExt;

        let (settings, hits) = weather_upstreams().await;
        let provider = Arc::new(CapturingProvider::new());
        let core = core_with(&settings, provider.clone());

        let mut stream = core
            .process_streaming(request("How hot is it right now?"))
            .await
            .unwrap();
        let mut tokens = Vec::new();
        while let Some(item) = stream.next().await {
            tokens.push(item.unwrap());
        }
        assert_eq!(tokens, ["ok"]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let prompt = provider.last_system.lock().clone().unwrap();
        assert!(prompt.contains("Current weather"));
    }

    #[test]
    fn prompt_sections_compose_in_order() {
        let weather = WeatherSummary {
            location: "San Clemente, CA".into(),
            temp_f: 68.0,
            temp_c: 20.0,
        };
        let prompt = build_system_prompt(
            Some("The Cellar"),
            Some(&weather),
            "\n\nBusiness Information:\nHOURS: mon: closed",
        );

        let persona = prompt.find("You are the assistant for The Cellar").unwrap();
        let weather_at = prompt.find("Current weather:").unwrap();
        let knowledge_at = prompt.find("Business Information:").unwrap();
        assert!(persona < weather_at && weather_at < knowledge_at);
        assert!(prompt.contains("\u{2264}2 short sentences"));
    }

    #[test]
    fn prompt_defaults_business_name() {
        let prompt = build_system_prompt(None, None, "");
        assert!(prompt.starts_with("You are the assistant for The Cellar."));
        assert!(!prompt.contains("Current weather"));
    }
}
