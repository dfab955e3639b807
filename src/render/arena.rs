//! Disposable render scaffolds.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use super::{RenderId, RenderedImage};

/// Drop-box a renderer fills with its artifact.
#[derive(Debug, Clone)]
pub struct Scaffold {
    render_id: RenderId,
    artifact: Arc<Mutex<Option<RenderedImage>>>,
}

impl Scaffold {
    fn new(render_id: RenderId) -> Self {
        Self { render_id, artifact: Arc::new(Mutex::new(None)) }
    }

    #[must_use]
    pub fn render_id(&self) -> RenderId {
        self.render_id
    }

    /// Store the produced image, replacing any earlier one.
    pub fn deposit(&self, image: RenderedImage) {
        *self.lock() = Some(image);
    }

    #[must_use]
    pub fn artifact(&self) -> Option<RenderedImage> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<RenderedImage>> {
        self.artifact
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// All currently mounted scaffolds, keyed by render id.
#[derive(Debug, Clone, Default)]
pub struct ScaffoldRegistry {
    mounted: Arc<Mutex<HashMap<RenderId, Scaffold>>>,
}

impl ScaffoldRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&self, render_id: RenderId) -> Scaffold {
        let scaffold = Scaffold::new(render_id);
        self.lock().insert(render_id, scaffold.clone());
        scaffold
    }

    /// Remove a scaffold. Returns `false` if it was already gone.
    pub fn unmount(&self, render_id: RenderId) -> bool {
        self.lock().remove(&render_id).is_some()
    }

    #[must_use]
    pub fn is_mounted(&self, render_id: RenderId) -> bool {
        self.lock().contains_key(&render_id)
    }

    #[must_use]
    pub fn mounted_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RenderId, Scaffold>> {
        self.mounted
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// One render's scaffold plus the means to tear it down.
#[derive(Debug)]
pub struct RenderArena {
    scaffold: Scaffold,
    registry: ScaffoldRegistry,
}

impl RenderArena {
    /// Mount a scaffold under a fresh render id.
    #[must_use]
    pub fn mount(registry: &ScaffoldRegistry) -> Self {
        let scaffold = registry.mount(RenderId::new());
        Self { scaffold, registry: registry.clone() }
    }

    #[must_use]
    pub fn id(&self) -> RenderId {
        self.scaffold.render_id()
    }

    #[must_use]
    pub fn scaffold(&self) -> &Scaffold {
        &self.scaffold
    }

    /// Unmount now. Safe to call any number of times.
    pub fn dispose(&self) {
        if self.registry.unmount(self.id()) {
            debug!(render_id = %self.id(), "scaffold unmounted");
        }
    }

    /// Unmount after `grace` in the background.
    pub fn dispose_after(self, grace: Duration) {
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            self.dispose();
        });
    }
}

#[cfg(test)]
#[path = "arena_test.rs"]
mod tests;
