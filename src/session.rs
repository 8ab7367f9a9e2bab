use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_with::skip_serializing_none;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::gemini::FloralModel;
use crate::i18n::{labels, Labels};
use crate::models::{Language, LoadingState, Suggestion, UserInput};
use crate::render::{CardImage, ResultSnapshot, ResultView};
use crate::settings::SettingsStore;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Carries the localized prompt shown to the user.
    #[error("{message}")] InputRequired { message: &'static str },
    #[error("nothing has been submitted yet")] NothingToRegenerate,
}

enum Phase {
    Idle,
    Loading,
    Success(ResultView),
    Error(String),
}

struct SessionState {
    phase: Phase,
    last_input: Option<UserInput>,
    // Bumped on every submit/reset so a slower, older analysis can't land.
    generation: u64,
    updated_at: DateTime<Utc>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: LoadingState,
    pub result: Option<ResultSnapshot>,
    pub error: Option<String>,
    pub can_regenerate: bool,
    pub language: Language,
    pub labels: &'static Labels,
    pub updated_at: DateTime<Utc>,
}

pub struct Session {
    model: Arc<dyn FloralModel>,
    settings: Arc<SettingsStore>,
    state: Arc<RwLock<SessionState>>,
}

impl Session {
    pub fn new(model: Arc<dyn FloralModel>, settings: Arc<SettingsStore>) -> Self {
        Self {
            model,
            settings,
            state: Arc::new(RwLock::new(SessionState {
                phase: Phase::Idle,
                last_input: None,
                generation: 0,
                updated_at: Utc::now(),
            })),
        }
    }

    pub fn settings(&self) -> &SettingsStore { &self.settings }

    pub async fn submit(&self, input: UserInput) -> Result<SessionSnapshot, SessionError> {
        if !input.can_submit() {
            warn!("Submission blocked: no text and no image");
            return Err(SessionError::InputRequired { message: labels(self.settings.language()).input_required });
        }

        // Read per request: a language switch only affects what is sent next.
        let language = self.settings.language();
        let api_key = self.settings.api_key();

        let generation = {
            let mut state = self.state.write();
            state.generation += 1;
            state.last_input = Some(input.clone());
            state.phase = Phase::Loading;
            state.updated_at = Utc::now();
            state.generation
        };

        info!("🚀 Submitting floral request #{} ({:?})", generation, language);
        // The analysis owns its write-back, so a dropped caller can't leave
        // the session in Loading.
        let model = self.model.clone();
        let state = self.state.clone();
        let task = tokio::spawn(async move {
            let result = model
                .analyze_floral_request(&input.text, input.image.as_ref(), language, &api_key)
                .await;
            let phase = match result {
                Ok(response) => Phase::Success(ResultView::mount(response, model, &api_key)),
                Err(e) => {
                    error!("❌ Floral analysis #{} failed: {}", generation, e);
                    Phase::Error(labels(language).error_generic.to_string())
                }
            };
            settle(&state, generation, phase);
        });

        if let Err(e) = task.await {
            error!("❌ Floral analysis #{} aborted: {}", generation, e);
            settle(&self.state, generation, Phase::Error(labels(language).error_generic.to_string()));
        }

        Ok(self.snapshot())
    }

    /// Sends the last input again; always a fresh analysis request.
    pub async fn regenerate(&self) -> Result<SessionSnapshot, SessionError> {
        let input = self.state.read().last_input.clone().ok_or(SessionError::NothingToRegenerate)?;
        info!("🔄 Regenerating with last input");
        self.submit(input).await
    }

    pub fn reset(&self) -> SessionSnapshot {
        {
            let mut state = self.state.write();
            state.generation += 1;
            state.phase = Phase::Idle;
            state.last_input = None;
            state.updated_at = Utc::now();
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read();
        let language = self.settings.language();
        let (status, result, error) = match &state.phase {
            Phase::Idle => (LoadingState::Idle, None, None),
            Phase::Loading => (LoadingState::Loading, None, None),
            Phase::Success(view) => (LoadingState::Success, Some(view.snapshot()), None),
            Phase::Error(message) => (LoadingState::Error, None, Some(message.clone())),
        };
        SessionSnapshot {
            status,
            result,
            error,
            can_regenerate: state.last_input.is_some(),
            language,
            labels: labels(language),
            updated_at: state.updated_at,
        }
    }

    /// Image state of a card in the current result. `view` pins the lookup
    /// to a specific result so a stale link doesn't resolve to a newer card.
    pub fn card_image(&self, index: usize, view: Option<Uuid>) -> Option<(Arc<Suggestion>, CardImage)> {
        let state = self.state.read();
        let Phase::Success(result) = &state.phase else { return None };
        if view.is_some_and(|id| id != result.id) {
            return None;
        }
        result.card(index).map(|card| (card.suggestion.clone(), card.image()))
    }
}

fn settle(state: &RwLock<SessionState>, generation: u64, phase: Phase) {
    let mut state = state.write();
    if state.generation != generation {
        info!("Discarding superseded analysis #{}", generation);
        return;
    }
    state.phase = phase;
    state.updated_at = Utc::now();
}
