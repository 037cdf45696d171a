//! Page render jobs and stale-result rejection
//!
//! Each page render is stamped with a generation. Starting a new render
//! bumps the generation, so a result that arrives after a newer render began
//! is recognized as stale and dropped instead of overwriting the page.

use crate::viewport::ViewportState;
use docview_pdf_engine::{RenderRequest, RgbaImage, TextContent};

/// Generation stamp for one render
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderTicket(u64);

impl RenderTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Monotonic render generation counter
#[derive(Debug, Default)]
pub struct RenderSequence {
    generation: u64,
}

impl RenderSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new render, superseding every earlier ticket.
    pub fn begin(&mut self) -> RenderTicket {
        self.generation += 1;
        RenderTicket(self.generation)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `ticket` belongs to the most recently begun render.
    pub fn is_current(&self, ticket: RenderTicket) -> bool {
        ticket.0 == self.generation
    }
}

/// A page render that has been started but not yet applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRenderJob {
    pub ticket: RenderTicket,
    /// One-based page number
    pub page_number: u32,
    pub request: RenderRequest,
    pub viewport: ViewportState,
}

/// Output of rendering one page: the bitmap plus its text layer
#[derive(Debug, Clone)]
pub struct PageRender {
    pub page_number: u32,
    pub viewport: ViewportState,
    pub bitmap: RgbaImage,
    pub text: TextContent,
}

/// What happened to a finished render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The render was current and is now shown
    Applied,
    /// A newer render started first; the result was dropped
    Stale,
}
