//! Application state.

use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{error, info};

use vchat_gemini::GeminiClient;
use vchat_models::EventMessage;
use vchat_session::Session;
use vchat_store::MediaStore;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

/// Capacity of the shared event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Shared application state.
///
/// The gateway is built once at startup; a missing API key leaves it unset
/// and every AI endpoint reports the initialization failure. The session is
/// process-wide: the app is a shared room of one.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<MediaStore>,
    pub gemini: Option<Arc<GeminiClient>>,
    pub session: Arc<RwLock<Session>>,
    pub events: broadcast::Sender<EventMessage>,
}

impl AppState {
    /// Create new application state from the environment.
    pub fn new(config: ApiConfig) -> Self {
        let store = MediaStore::new(&config.upload_dir);

        let gemini = match GeminiClient::from_env() {
            Ok(client) => {
                info!(model = %client.model(), "Gemini client initialized");
                Some(Arc::new(client))
            }
            Err(e) => {
                error!("Gemini client not initialized: {e}. AI endpoints are disabled.");
                None
            }
        };

        Self::with_gemini(config, store, gemini)
    }

    /// Create state with explicit components (tests inject a stub gateway).
    pub fn with_gemini(
        config: ApiConfig,
        store: MediaStore,
        gemini: Option<Arc<GeminiClient>>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            config,
            store: Arc::new(store),
            gemini,
            session: Arc::new(RwLock::new(Session::new())),
            events,
        }
    }

    /// The gateway, or the initialization error every AI call reports.
    pub fn gemini(&self) -> ApiResult<Arc<GeminiClient>> {
        self.gemini.clone().ok_or_else(|| {
            ApiError::provider("Gemini client is not initialized: GEMINI_API_KEY is not set")
        })
    }

    /// Broadcast an event to every connected client.
    ///
    /// A send error only means no client is listening.
    pub fn broadcast(&self, event: EventMessage) {
        let _ = self.events.send(event);
    }
}
