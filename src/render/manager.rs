//! Render scheduling: staggered starts, availability polling, containment.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use super::arena::{RenderArena, ScaffoldRegistry};
use super::{DiagramRenderer, RenderFailure, RenderedImage, Slot, SlotState};

pub const DEFAULT_STAGGER: Duration = Duration::from_millis(150);
pub const DEFAULT_POLL_ATTEMPTS: u32 = 5;
pub const DEFAULT_POLL_BACKOFF: Duration = Duration::from_millis(200);
pub const DEFAULT_CLEANUP_GRACE: Duration = Duration::from_secs(1);
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    /// Delay between the starts of consecutive variation renders.
    pub stagger: Duration,
    pub poll_attempts: u32,
    pub poll_backoff: Duration,
    /// How long a scaffold stays mounted after its render settles.
    pub cleanup_grace: Duration,
    /// Upper bound on a single renderer call.
    pub render_timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            stagger: DEFAULT_STAGGER,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            poll_backoff: DEFAULT_POLL_BACKOFF,
            cleanup_grace: DEFAULT_CLEANUP_GRACE,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct RenderManager {
    renderer: Arc<dyn DiagramRenderer>,
    registry: ScaffoldRegistry,
    config: RenderConfig,
}

impl RenderManager {
    #[must_use]
    pub fn new(renderer: Arc<dyn DiagramRenderer>, config: RenderConfig) -> Self {
        Self { renderer, registry: ScaffoldRegistry::new(), config }
    }

    #[must_use]
    pub fn registry(&self) -> &ScaffoldRegistry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render the committed source into the primary slot.
    pub async fn render_primary(&self, source: &str) -> SlotState {
        self.render(source, Slot::Primary).await
    }

    /// Render every candidate concurrently, slot `i` starting `i × stagger`
    /// after the first. Results are in candidate order.
    pub async fn render_variations(&self, sources: &[String]) -> Vec<SlotState> {
        let renders = sources.iter().enumerate().map(|(i, source)| {
            let delay = if sources.len() >= 2 { self.stagger_for(i) } else { Duration::ZERO };
            self.spawn_slot(source.clone(), Slot::Variation(i), delay)
        });
        join_all(renders).await
    }

    /// Render one slot in isolation. Never panics; every problem becomes
    /// `SlotState::Failed` for this slot only.
    pub async fn render(&self, source: &str, slot: Slot) -> SlotState {
        self.spawn_slot(source.to_owned(), slot, Duration::ZERO).await
    }

    fn stagger_for(&self, index: usize) -> Duration {
        self.config
            .stagger
            .checked_mul(u32::try_from(index).unwrap_or(u32::MAX))
            .unwrap_or(Duration::MAX)
    }

    async fn spawn_slot(&self, source: String, slot: Slot, delay: Duration) -> SlotState {
        let manager = self.clone();
        let task = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            manager.render_in_arena(&source).await
        });

        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(RenderFailure::Aborted(e.to_string())),
        };

        match result {
            Ok(image) => SlotState::Rendered(image),
            Err(reason) => {
                warn!(slot = %slot.label(), error = %reason, "render failed");
                SlotState::Failed { label: slot.label(), reason }
            }
        }
    }

    async fn render_in_arena(&self, source: &str) -> Result<RenderedImage, RenderFailure> {
        let arena = RenderArena::mount(&self.registry);
        let render_id = arena.id();
        debug!(render_id = %render_id, "render started");

        let result = self.render_and_poll(&arena, source).await;
        arena.dispose_after(self.config.cleanup_grace);
        result
    }

    async fn render_and_poll(&self, arena: &RenderArena, source: &str) -> Result<RenderedImage, RenderFailure> {
        let renderer = Arc::clone(&self.renderer);
        let scaffold = arena.scaffold().clone();
        let render_id = arena.id();
        let source = source.to_owned();
        let mut call = tokio::spawn(async move { renderer.render(render_id, &source, &scaffold).await });

        match tokio::time::timeout(self.config.render_timeout, &mut call).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => return Err(RenderFailure::Aborted(e.to_string())),
            Err(_) => {
                call.abort();
                return Err(RenderFailure::TimedOut);
            }
        }

        for attempt in 0..self.config.poll_attempts {
            if let Some(image) = arena.scaffold().artifact() {
                return Ok(image);
            }
            if attempt + 1 < self.config.poll_attempts {
                tokio::time::sleep(self.config.poll_backoff).await;
            }
        }
        Err(RenderFailure::Unavailable { attempts: self.config.poll_attempts })
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
