//! Viewer core: page state, annotation overlay and render sequencing.
//!
//! The crate is UI-toolkit agnostic. A host supplies a PDF engine, a byte
//! source for document URLs and an overlay surface, forwards input events to
//! [`ViewerController`], and calls [`ViewerController::flush`] and
//! [`ViewerController::tick`] from its event loop.

pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod geometry;
pub mod overlay;
pub mod polygon;
pub mod render;
pub mod source;
pub mod surface;
pub mod vertices;
pub mod viewport;

pub use config::{ConfigError, OverlayStyle, ViewerConfig};
pub use controller::{ActiveTool, ErrorState, KeyInput, Redraw, ViewerController, ViewerProps};
pub use error::{LoadFailure, ViewerError, ViewerResult};
pub use geometry::{to_normalized, to_surface, NormalizedPoint, PixelPoint, Rotation};
pub use overlay::{DrawOutcome, DrawRequest, OverlayRenderer, ScrollRequest};
pub use render::{PageRender, PageRenderJob, RenderOutcome, RenderTicket};
pub use source::{AnySource, ByteSource, FetchError, FileSource, HttpSource};
pub use surface::{Color, DisplayList, OverlaySurface, Primitive, Rect, TextAlign};
pub use vertices::{PageTarget, VerticesGroup};
pub use viewport::ViewportState;
