//! Shared mock collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::time::Instant;

use crate::credential::Credential;
use crate::generation::{DiagramResponse, DiagramService, GenerationError};
use crate::identity::Identity;
use crate::render::{DiagramRenderer, RenderFailure, RenderId, RenderedImage, Scaffold};
use crate::telemetry::{ActionType, TelemetryConfig, TelemetryEmitter, TelemetryError, TelemetryEvent, TelemetrySink};

// =============================================================================
// GENERATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    Generate { prompt: String, num_variations: u32 },
    Edit { prompt: String, existing: String },
}

/// Replays queued responses in order and records every call.
#[derive(Default)]
pub struct MockDiagramService {
    responses: Mutex<VecDeque<Result<DiagramResponse, GenerationError>>>,
    calls: Mutex<Vec<ServiceCall>>,
}

impl MockDiagramService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, response: Result<DiagramResponse, GenerationError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn push_single(&self, code: &str) {
        self.push(Ok(DiagramResponse::single(code)));
    }

    pub fn push_multiple(&self, codes: &[&str]) {
        self.push(Ok(DiagramResponse::multiple(codes.iter().map(|c| (*c).to_owned()).collect())));
    }

    pub fn push_error(&self, detail: &str) {
        self.push(Err(GenerationError::Api { status: 500, detail: detail.to_owned() }));
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    fn next(&self) -> Result<DiagramResponse, GenerationError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerationError::EmptyResponse))
    }
}

#[async_trait::async_trait]
impl DiagramService for MockDiagramService {
    async fn generate(
        &self,
        _credential: &Credential,
        prompt: &str,
        num_variations: u32,
    ) -> Result<DiagramResponse, GenerationError> {
        self.calls
            .lock()
            .unwrap()
            .push(ServiceCall::Generate { prompt: prompt.to_owned(), num_variations });
        self.next()
    }

    async fn edit(
        &self,
        _credential: &Credential,
        prompt: &str,
        existing: &str,
    ) -> Result<DiagramResponse, GenerationError> {
        self.calls
            .lock()
            .unwrap()
            .push(ServiceCall::Edit { prompt: prompt.to_owned(), existing: existing.to_owned() });
        self.next()
    }
}

// =============================================================================
// TELEMETRY
// =============================================================================

/// Keeps every delivered event. Optionally rejects them all.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TelemetryEvent>>,
    reject: bool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self { events: Mutex::default(), reject: true })
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn of_type(&self, action_type: ActionType) -> Vec<TelemetryEvent> {
        self.events().into_iter().filter(|e| e.action_type == action_type).collect()
    }
}

#[async_trait::async_trait]
impl TelemetrySink for RecordingSink {
    async fn deliver(&self, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        self.events.lock().unwrap().push(event.clone());
        if self.reject {
            return Err(TelemetryError::Rejected { status: 503, body: "unavailable".into() });
        }
        Ok(())
    }
}

pub fn emitter_with(sink: Arc<RecordingSink>) -> TelemetryEmitter {
    TelemetryEmitter::spawn(Identity::ephemeral(), sink, TelemetryConfig::default())
}

// =============================================================================
// RENDERING
// =============================================================================

/// Renderer driven by markers in the source text:
/// `FAIL` errors, `PANIC` panics, `LOST` never deposits, `SLOW` deposits
/// after 300 ms. Anything else deposits the source bytes immediately.
#[derive(Default)]
pub struct FakeRenderer {
    started: Mutex<Vec<(String, Instant)>>,
    ids: Mutex<Vec<RenderId>>,
}

impl FakeRenderer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn started(&self) -> Vec<(String, Instant)> {
        self.started.lock().unwrap().clone()
    }

    pub fn render_ids(&self) -> Vec<RenderId> {
        self.ids.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DiagramRenderer for FakeRenderer {
    async fn render(&self, render_id: RenderId, source: &str, scaffold: &Scaffold) -> Result<(), RenderFailure> {
        self.started.lock().unwrap().push((source.to_owned(), Instant::now()));
        self.ids.lock().unwrap().push(render_id);

        if source.contains("FAIL") {
            return Err(RenderFailure::Engine(format!("cannot parse {source}")));
        }
        assert!(!source.contains("PANIC"), "renderer exploded");
        if source.contains("LOST") {
            return Ok(());
        }

        let image = RenderedImage {
            render_id,
            content_type: "image/svg+xml".into(),
            bytes: source.as_bytes().to_vec(),
        };
        if source.contains("SLOW") {
            let scaffold = scaffold.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(300)).await;
                scaffold.deposit(image);
            });
        } else {
            scaffold.deposit(image);
        }
        Ok(())
    }
}
