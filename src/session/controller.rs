//! Session controller: the only writer of session state.
//!
//! DESIGN
//! ======
//! Every user action enters here. The controller checks the credential gate
//! before any network call, drives the pure [`Session`] state machine, calls
//! the generation service, and reports the action to telemetry. Methods that
//! change the session take `&mut self`, so user actions are serialized by
//! ownership; the state machine additionally refuses overlapping requests.
//!
//! ERROR HANDLING
//! ==============
//! Generation failures become `RequestFailed` with the service's detail
//! message and leave the prior state intact. Render and telemetry failures
//! never reach the caller as errors: renders come back as failed slots and
//! telemetry is fire-and-forget.

use std::sync::Arc;

use tracing::{info, warn};

use super::state::{Applied, RequestKind, RequestPlan, Session, SessionError};
use super::Phase;
use crate::credential::{Credential, CredentialGate, CredentialStatus};
use crate::generation::{Candidates, DiagramService, GenerationError};
use crate::render::{RenderManager, SlotState};
use crate::telemetry::{Action, ActionType, GestureKind, TelemetryEmitter, ZoomInput};

pub struct SessionController {
    session: Session,
    gate: Arc<dyn CredentialGate>,
    service: Arc<dyn DiagramService>,
    telemetry: TelemetryEmitter,
    renders: RenderManager,
    num_variations: u32,
}

impl SessionController {
    #[must_use]
    pub fn new(
        gate: Arc<dyn CredentialGate>,
        service: Arc<dyn DiagramService>,
        telemetry: TelemetryEmitter,
        renders: RenderManager,
        num_variations: u32,
    ) -> Self {
        Self { session: Session::new(), gate, service, telemetry, renders, num_variations }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn telemetry(&self) -> &TelemetryEmitter {
        &self.telemetry
    }

    // =========================================================================
    // REQUESTS
    // =========================================================================

    /// Submit a prompt: generate on a fresh session, edit once a diagram is
    /// committed. Returns the phase the session settled in.
    ///
    /// # Errors
    ///
    /// `CredentialMissing` without touching state or the network;
    /// `RequestFailed` when the service call fails (prior state restored);
    /// `EmptyPrompt` / `RequestInFlight` from the state machine.
    pub async fn submit(&mut self, prompt: &str) -> Result<Phase, SessionError> {
        let CredentialStatus::Present(credential) = self.gate.check() else {
            info!(diagram_id = %self.session.diagram_id(), "submit blocked: no credential");
            return Err(SessionError::CredentialMissing);
        };

        let plan = self.session.begin_request(prompt, self.num_variations)?;
        self.telemetry.track_submitted_prompt(plan.prompt());
        info!(
            diagram_id = %self.session.diagram_id(),
            kind = ?plan.kind(),
            prompt_len = plan.prompt().len(),
            "request dispatched"
        );

        let candidates = match self.dispatch(&credential, &plan).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(diagram_id = %self.session.diagram_id(), error = %e, "request failed");
                return Err(self.session.fail_request(e.user_message()));
            }
        };

        let applied = self.session.apply_response(candidates)?;
        self.record_applied(&plan, &applied);
        Ok(self.session.phase())
    }

    async fn dispatch(&self, credential: &Credential, plan: &RequestPlan) -> Result<Candidates, GenerationError> {
        let response = match plan {
            RequestPlan::Generate { prompt, num_variations } => {
                self.service.generate(credential, prompt, *num_variations).await?
            }
            RequestPlan::Edit { prompt, existing } => self.service.edit(credential, prompt, existing).await?,
        };
        response.into_candidates()
    }

    fn record_applied(&self, plan: &RequestPlan, applied: &Applied) {
        let diagram_id = self.session.diagram_id();
        let shown = applied.candidates.first().map_or("", String::as_str);

        let action = match applied.kind {
            RequestKind::Generate => {
                let requested = match plan {
                    RequestPlan::Generate { num_variations, .. } => *num_variations,
                    RequestPlan::Edit { .. } => 1,
                };
                let mut action = Action::new(ActionType::DiagramGenerated)
                    .diagram(diagram_id)
                    .prompt(&applied.prompt)
                    .code(shown)
                    .meta("num_variations", requested);
                if applied.candidates.len() > 1 {
                    action = action.candidates(&applied.candidates);
                }
                action
            }
            RequestKind::Edit => {
                let mut action = Action::new(ActionType::DiagramEdited)
                    .diagram(diagram_id)
                    .prompt(&applied.prompt)
                    .previous_prompt(&applied.previous_prompt)
                    .code(shown)
                    .meta("previous_mermaid_code", applied.previous_source.as_str());
                if applied.candidates.len() > 1 {
                    action = action.candidates(&applied.candidates);
                }
                action
            }
        };
        self.telemetry.record(action);
    }

    // =========================================================================
    // VARIATIONS
    // =========================================================================

    /// Note that the user looked at candidate `index`.
    ///
    /// # Errors
    ///
    /// `NoVariations` or `InvalidSelection`.
    pub fn hover_variation(&self, index: usize) -> Result<(), SessionError> {
        let source = self.session.variation(index)?;
        let action = Action::new(ActionType::VariationHover)
            .diagram(self.session.diagram_id())
            .code(source)
            .variation(index, self.session.variations());
        self.telemetry.record(action);
        Ok(())
    }

    /// # Errors
    ///
    /// `RequestInFlight`, `NoVariations` or `InvalidSelection`.
    pub fn select_variation(&mut self, index: usize) -> Result<(), SessionError> {
        let source = self.session.select(index)?.to_owned();
        let action = Action::new(ActionType::VariationSelection)
            .diagram(self.session.diagram_id())
            .code(&source)
            .variation(index, self.session.variations());
        self.telemetry.record(action);
        Ok(())
    }

    /// Commit the selected candidate. Returns the committed source.
    ///
    /// # Errors
    ///
    /// `RequestInFlight` or `NoVariations`.
    pub fn confirm_selection(&mut self) -> Result<String, SessionError> {
        let source = self.session.confirm()?.to_owned();
        info!(diagram_id = %self.session.diagram_id(), revision = self.session.revision(), "variation confirmed");
        Ok(source)
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Start over with a fresh diagram.
    ///
    /// # Errors
    ///
    /// `RequestInFlight`.
    pub fn new_diagram(&mut self) -> Result<(), SessionError> {
        let had_diagram = self.session.has_diagram();
        let previous_id = self.session.diagram_id();
        let previous_source = self.session.source().to_owned();
        self.session.reset()?;

        self.telemetry.record(
            Action::new(ActionType::NewButton)
                .diagram(previous_id)
                .code(&previous_source)
                .meta("had_diagram", had_diagram),
        );
        self.telemetry.track_submitted_prompt("");
        Ok(())
    }

    /// Load existing source as a new diagram, without any network call.
    ///
    /// # Errors
    ///
    /// `RequestInFlight` or `EmptyImport`.
    pub fn import(&mut self, source: &str) -> Result<(), SessionError> {
        self.session.import(source)?;
        info!(diagram_id = %self.session.diagram_id(), "diagram imported");
        Ok(())
    }

    // =========================================================================
    // INTERACTIONS
    // =========================================================================

    /// Hand out the committed source for copying. `None` when there is nothing
    /// to copy.
    pub fn copy_source(&self) -> Option<String> {
        if !self.session.has_diagram() {
            return None;
        }
        let source = self.session.source().to_owned();
        self.telemetry
            .record(Action::new(ActionType::MermaidCopy).diagram(self.session.diagram_id()).code(&source));
        Some(source)
    }

    /// Render the committed source for copying as an image. The copy is
    /// recorded only when the render succeeded.
    pub async fn copy_image(&self) -> Option<SlotState> {
        let state = self.render_preview().await?;
        if state.is_rendered() {
            self.telemetry.record(
                Action::new(ActionType::ImageCopy)
                    .diagram(self.session.diagram_id())
                    .code(self.session.source()),
            );
        }
        Some(state)
    }

    pub fn tab_away(&self) {
        self.telemetry.record(
            Action::new(ActionType::TabAway)
                .diagram(self.session.diagram_id())
                .code(self.session.source())
                .meta("had_diagram", self.session.has_diagram()),
        );
    }

    /// Feed live prompt text; large changes become `prompt_update` events.
    pub fn prompt_changed(&self, text: &str) {
        self.telemetry.observe_prompt(self.session.diagram_id(), text);
    }

    /// Zoom on the committed preview. Recorded once per view; wheel input
    /// waits for the wheel to go quiet.
    pub fn zoom(&self, input: ZoomInput) {
        if !self.session.has_diagram() {
            return;
        }
        let action = Action::new(ActionType::Zoom)
            .diagram(self.session.diagram_id())
            .code(self.session.source())
            .meta("input", input.as_str());
        match input {
            ZoomInput::Button => {
                self.telemetry.record_gesture(GestureKind::Zoom, self.session.view_key(), action);
            }
            ZoomInput::Wheel => self.telemetry.record_wheel_zoom(self.session.view_key(), action),
        }
    }

    /// Pan the committed preview. Recorded once per view.
    pub fn pan(&self) {
        if !self.session.has_diagram() {
            return;
        }
        let action = Action::new(ActionType::Pan)
            .diagram(self.session.diagram_id())
            .code(self.session.source());
        self.telemetry.record_gesture(GestureKind::Pan, self.session.view_key(), action);
    }

    /// # Errors
    ///
    /// `InvalidFeedback` for a missing or out-of-range rating; nothing is sent.
    pub fn rate(&self, rating: Option<u8>, text: &str) -> Result<(), SessionError> {
        self.telemetry
            .record_feedback(self.session.diagram_id(), self.session.source(), rating, text)?;
        Ok(())
    }

    // =========================================================================
    // RENDERING
    // =========================================================================

    /// Render the committed source. `None` before anything is committed.
    pub async fn render_preview(&self) -> Option<SlotState> {
        if !self.session.has_diagram() {
            return None;
        }
        Some(self.renders.render_primary(self.session.source()).await)
    }

    /// Render every pending candidate in its own isolated slot.
    pub async fn render_variations(&self) -> Vec<SlotState> {
        self.renders.render_variations(self.session.variations()).await
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
