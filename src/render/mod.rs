//! Render isolation: every preview renders in its own disposable arena.
//!
//! DESIGN
//! ======
//! - Each render gets a fresh [`RenderId`] and a scaffold mounted in a shared
//!   registry. The renderer deposits its artifact into the scaffold, possibly
//!   after it returns; the manager polls for it with a bounded backoff.
//! - Scaffolds are unmounted after a grace period on success and failure
//!   alike. Unmounting twice is a no-op.
//! - Every slot renders in its own task, so one failing or panicking render
//!   cannot affect its siblings.

pub mod arena;
pub mod ink;
pub mod manager;

use std::fmt;

use uuid::Uuid;

pub use arena::{RenderArena, Scaffold, ScaffoldRegistry};
pub use ink::{ImageFormat, MermaidInkRenderer};
pub use manager::{RenderConfig, RenderManager};

/// Unique per render invocation. Never derived from the diagram id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderId(pub Uuid);

impl RenderId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RenderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "render-{}", self.0.simple())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub render_id: RenderId,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderFailure {
    #[error("renderer error: {0}")]
    Engine(String),

    #[error("no image after {attempts} checks")]
    Unavailable { attempts: u32 },

    #[error("render timed out")]
    TimedOut,

    #[error("render task aborted: {0}")]
    Aborted(String),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Primary,
    Variation(usize),
}

impl Slot {
    /// Human-facing label; variations are numbered from 1.
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Primary => "Preview".to_owned(),
            Self::Variation(i) => format!("Variation {}", i + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    Rendered(RenderedImage),
    Failed { label: String, reason: RenderFailure },
}

impl SlotState {
    #[must_use]
    pub fn image(&self) -> Option<&RenderedImage> {
        match self {
            Self::Rendered(image) => Some(image),
            Self::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }
}

/// Turns diagram source into an image. Enables mocking in tests.
#[async_trait::async_trait]
pub trait DiagramRenderer: Send + Sync {
    /// Render `source`, depositing the artifact into `scaffold`. The deposit
    /// may happen after this returns.
    ///
    /// # Errors
    ///
    /// Returns [`RenderFailure`] when the source cannot be rendered.
    async fn render(&self, render_id: RenderId, source: &str, scaffold: &Scaffold) -> Result<(), RenderFailure>;
}
