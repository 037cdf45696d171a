//! Viewer state machine
//!
//! `ViewerController` owns the document, the page/zoom/rotation state, the
//! active tool and the annotation overlay. State changes never draw directly;
//! they mark a redraw pending and the host calls [`ViewerController::flush`]
//! (and [`ViewerController::tick`] for debounced annotation updates) from its
//! event loop.

use crate::config::ViewerConfig;
use crate::debounce::DebounceTimer;
use crate::error::{LoadFailure, ViewerError, ViewerResult};
use crate::geometry::{to_normalized, PixelPoint, Rotation};
use crate::overlay::{DrawOutcome, DrawRequest, OverlayRenderer};
use crate::render::{PageRender, PageRenderJob, RenderOutcome, RenderSequence};
use crate::source::ByteSource;
use crate::surface::OverlaySurface;
use crate::vertices::{self, VerticesGroup};
use crate::viewport::ViewportState;
use docview_pdf_engine::{DocumentHandle, OpenSource, PdfEngine, RenderRequest, TextContent};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Inputs supplied by the embedding application
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewerProps {
    pub document_url: String,
    /// Regions to highlight
    pub vertices_groups: Vec<VerticesGroup>,
    pub show_pagination_control_initially: bool,
    /// Regions that light up under the pointer
    pub initial_vertices: Vec<VerticesGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveTool {
    #[default]
    Selection,
    HandTool,
}

/// Error panel state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ErrorState {
    #[default]
    None,
    Shown(String),
}

impl ErrorState {
    pub fn is_shown(&self) -> bool {
        matches!(self, ErrorState::Shown(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ErrorState::Shown(message) => Some(message),
            ErrorState::None => None,
        }
    }
}

/// Work waiting for the next [`ViewerController::flush`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Redraw {
    #[default]
    None,
    /// Only the annotation overlay is out of date
    Overlay,
    /// Bitmap, text layer and overlay are out of date
    FullPage,
}

/// A key press forwarded by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: char,
    /// Ctrl on Windows/Linux, Cmd on macOS
    pub modifier: bool,
}

impl KeyInput {
    pub fn new(key: char, modifier: bool) -> Self {
        Self { key, modifier }
    }
}

pub struct ViewerController<E, B, S>
where
    E: PdfEngine,
    B: ByteSource,
    S: OverlaySurface,
{
    config: ViewerConfig,
    engine: E,
    source: B,
    renderer: OverlayRenderer,
    overlay: Option<S>,

    document: Option<DocumentHandle>,
    document_url: Option<String>,
    num_pages: u32,
    current_page: u32,
    scale: f32,
    rotation: Rotation,
    active_tool: ActiveTool,
    loading: bool,
    error: ErrorState,
    show_pagination_control: bool,

    vertices_groups: Vec<VerticesGroup>,
    initial_vertices: Vec<VerticesGroup>,
    hot: Vec<VerticesGroup>,
    overlay_label: Option<String>,

    pan_offset: PixelPoint,
    drag_origin: Option<PixelPoint>,

    viewport: Option<ViewportState>,
    page: Option<PageRender>,
    sequence: RenderSequence,
    annotation_timer: DebounceTimer,
    pending: Redraw,
}

impl<E, B, S> ViewerController<E, B, S>
where
    E: PdfEngine,
    B: ByteSource,
    S: OverlaySurface,
{
    pub fn new(engine: E, source: B, config: ViewerConfig) -> Self {
        let renderer = OverlayRenderer::new(config.style.clone(), config.scroll_margin);
        let scale = config.clamp_scale(config.initial_scale);

        Self {
            config,
            engine,
            source,
            renderer,
            overlay: None,
            document: None,
            document_url: None,
            num_pages: 0,
            current_page: 1,
            scale,
            rotation: Rotation::Deg0,
            active_tool: ActiveTool::Selection,
            loading: false,
            error: ErrorState::None,
            show_pagination_control: false,
            vertices_groups: Vec::new(),
            initial_vertices: Vec::new(),
            hot: Vec::new(),
            overlay_label: None,
            pan_offset: PixelPoint::new(0.0, 0.0),
            drag_origin: None,
            viewport: None,
            page: None,
            sequence: RenderSequence::new(),
            annotation_timer: DebounceTimer::new(),
            pending: Redraw::None,
        }
    }

    /// Apply the host's first set of props and load the document.
    pub fn mount(&mut self, props: ViewerProps, now: Instant) -> ViewerResult<()> {
        self.show_pagination_control = props.show_pagination_control_initially;
        self.initial_vertices = props.initial_vertices;
        if !props.vertices_groups.is_empty() {
            self.set_vertices_groups(props.vertices_groups, now);
        }
        self.load(&props.document_url)
    }

    /// Apply changed props. Only the parts that differ take effect.
    pub fn update_props(&mut self, props: ViewerProps, now: Instant) -> ViewerResult<()> {
        let url_changed = self.document_url.as_deref() != Some(props.document_url.as_str());
        if url_changed {
            // Groups for the incoming document must not be clamped to the old one.
            self.close_document();
        }
        if props.initial_vertices != self.initial_vertices {
            self.set_initial_vertices(props.initial_vertices);
        }
        if props.vertices_groups != self.vertices_groups {
            self.set_vertices_groups(props.vertices_groups, now);
        }
        if url_changed {
            self.load(&props.document_url)?;
        }
        Ok(())
    }

    // --- Document lifecycle ---

    /// Fetch and open the document at `url`, replacing the current one.
    ///
    /// On failure the error panel is shown and the document cleared; the
    /// error is also returned so the host can log or surface it.
    pub fn load(&mut self, url: &str) -> ViewerResult<()> {
        self.close_document();
        self.document_url = Some(url.to_owned());
        self.loading = true;
        self.error = ErrorState::None;
        info!(url, "loading document");

        match self.open(url) {
            Ok((handle, page_count)) => {
                self.document = Some(handle);
                self.num_pages = page_count;
                self.current_page = self.current_page.clamp(1, page_count.max(1));
                self.loading = false;
                self.request(Redraw::FullPage);
                info!(url, page_count, "document loaded");
                Ok(())
            }
            Err(source) => {
                warn!(url, error = %source, "document load failed");
                self.error = ErrorState::Shown(format!("Failed to load PDF document: {source}"));
                self.loading = false;
                self.num_pages = 0;
                Err(ViewerError::Load { url: url.to_owned(), source })
            }
        }
    }

    /// Retry the most recent load.
    pub fn reload(&mut self) -> ViewerResult<()> {
        let url = self.document_url.clone().ok_or(ViewerError::NoDocument)?;
        self.load(&url)
    }

    /// Hide the error panel without reloading.
    pub fn dismiss_error(&mut self) {
        self.error = ErrorState::None;
    }

    fn open(&mut self, url: &str) -> Result<(DocumentHandle, u32), LoadFailure> {
        let bytes = self.source.fetch(url)?;
        let handle = self.engine.open(OpenSource::Bytes(bytes))?;

        match self.engine.page_count(handle) {
            Ok(page_count) => Ok((handle, page_count)),
            Err(err) => {
                if let Err(close_err) = self.engine.close(handle) {
                    warn!(error = %close_err, "failed to close half-opened document");
                }
                Err(err.into())
            }
        }
    }

    fn close_document(&mut self) {
        if let Some(handle) = self.document.take() {
            if let Err(err) = self.engine.close(handle) {
                warn!(handle = handle.raw(), error = %err, "failed to close document");
            }
        }
        self.page = None;
        self.viewport = None;
        self.hot.clear();
        self.reset_pan();
        self.pending = Redraw::None;
        // Renders still in flight belong to the old document.
        self.sequence.begin();
    }

    // --- Zoom and rotation ---

    pub fn zoom_in(&mut self) {
        self.set_scale(self.scale * self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(self.scale / self.config.zoom_step);
    }

    /// Set the zoom scale, clamped to the configured bounds.
    pub fn set_scale(&mut self, scale: f32) {
        if scale.is_nan() {
            return;
        }
        let scale = self.config.clamp_scale(scale);
        if (scale - self.scale).abs() > f32::EPSILON {
            debug!(scale, "zoom changed");
            self.scale = scale;
            self.reset_pan();
            self.request(Redraw::FullPage);
        }
    }

    pub fn reset_zoom(&mut self) {
        self.set_scale(self.config.initial_scale);
    }

    pub fn rotate_right(&mut self) {
        self.set_rotation(self.rotation.rotated_right());
    }

    pub fn rotate_left(&mut self) {
        self.set_rotation(self.rotation.rotated_left());
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        if rotation != self.rotation {
            debug!(degrees = rotation.degrees(), "rotation changed");
            self.rotation = rotation;
            self.reset_pan();
            self.request(Redraw::FullPage);
        }
    }

    // --- Navigation ---

    pub fn next_page(&mut self) {
        self.go_to_page(self.current_page.saturating_add(1));
    }

    pub fn previous_page(&mut self) {
        self.go_to_page(self.current_page.saturating_sub(1));
    }

    pub fn first_page(&mut self) {
        self.go_to_page(1);
    }

    pub fn last_page(&mut self) {
        self.go_to_page(self.num_pages);
    }

    /// Show the one-based `page`, clamped to the document.
    pub fn go_to_page(&mut self, page: u32) {
        let page = page.clamp(1, self.num_pages.max(1));
        if page != self.current_page {
            debug!(from = self.current_page, to = page, "page changed");
            self.current_page = page;
            self.hot.clear();
            self.reset_pan();
            self.request(Redraw::FullPage);
        }
    }

    // --- Tools and chrome ---

    pub fn set_tool(&mut self, tool: ActiveTool) {
        if tool == self.active_tool {
            return;
        }
        debug!(?tool, "tool changed");
        self.active_tool = tool;
        self.drag_origin = None;
        if !self.hot.is_empty() {
            self.hot.clear();
            self.request(Redraw::Overlay);
        }
    }

    /// Handle a keyboard shortcut. Returns whether the key was consumed.
    ///
    /// Modifier+H selects the hand tool, modifier+S the selection tool.
    pub fn handle_key(&mut self, input: KeyInput) -> bool {
        if !input.modifier {
            return false;
        }
        match input.key.to_ascii_lowercase() {
            'h' => self.set_tool(ActiveTool::HandTool),
            's' => self.set_tool(ActiveTool::Selection),
            _ => return false,
        }
        true
    }

    pub fn toggle_pagination_control(&mut self) {
        self.show_pagination_control = !self.show_pagination_control;
    }

    pub fn set_pagination_control_visible(&mut self, visible: bool) {
        self.show_pagination_control = visible;
    }

    // --- Annotations ---

    /// Replace the highlighted regions.
    ///
    /// Switches to the page of the first group and arms the debounce timer;
    /// the overlay is redrawn, and the region scrolled into view, when
    /// [`tick`](Self::tick) sees the timer expire.
    pub fn set_vertices_groups(&mut self, groups: Vec<VerticesGroup>, now: Instant) {
        let target = vertices::target_page(&groups, self.current_page);
        debug!(groups = groups.len(), target, "vertices groups updated");
        self.vertices_groups = groups;
        self.hot.clear();

        if self.document.is_some() {
            self.go_to_page(target);
        } else {
            // Clamped once the document loads.
            self.current_page = target.max(1);
        }
        self.annotation_timer.schedule(now, self.config.debounce_delay());
    }

    /// Replace the regions that react to the pointer.
    pub fn set_initial_vertices(&mut self, groups: Vec<VerticesGroup>) {
        self.initial_vertices = groups;
        if !self.hot.is_empty() {
            self.hot.clear();
            self.request(Redraw::Overlay);
        }
    }

    /// Text drawn above every region instead of the group keys.
    pub fn set_overlay_label(&mut self, label: Option<String>) {
        self.overlay_label = label;
        self.request(Redraw::Overlay);
    }

    /// Advance the annotation debounce timer.
    ///
    /// Returns the overlay outcome when the timer fired. A pending page
    /// render is performed first so the scroll target matches the new page.
    pub fn tick(&mut self, now: Instant) -> ViewerResult<Option<DrawOutcome>> {
        if !self.annotation_timer.poll(now) {
            return Ok(None);
        }
        if self.pending == Redraw::FullPage {
            if let Err(err) = self.flush() {
                // Keep both the page render and the scroll-into-view draw owed.
                self.request(Redraw::FullPage);
                self.annotation_timer.schedule(now, self.config.debounce_delay());
                return Err(err);
            }
        }
        Ok(Some(self.draw_overlay(true)))
    }

    /// Deadline of the pending annotation redraw, for hosts that sleep.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.annotation_timer.deadline()
    }

    // --- Pointer ---

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        if self.active_tool == ActiveTool::HandTool {
            self.drag_origin = Some(PixelPoint::new(x, y));
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag_origin = None;
    }

    /// Pan offsets are relative to the rendered viewport, so a new viewport starts unpanned.
    fn reset_pan(&mut self) {
        self.pan_offset = PixelPoint::new(0.0, 0.0);
        self.drag_origin = None;
    }

    /// Pointer moved to (`x`, `y`) in overlay pixels.
    ///
    /// With the hand tool and a button held this pans. With the selection
    /// tool it hit-tests the hoverable regions and returns the overlay
    /// outcome when the hovered set changed.
    pub fn pointer_move(&mut self, x: f32, y: f32) -> Option<DrawOutcome> {
        match self.active_tool {
            ActiveTool::HandTool => {
                if let Some(origin) = self.drag_origin {
                    self.pan_offset.x = (self.pan_offset.x - (x - origin.x)).max(0.0);
                    self.pan_offset.y = (self.pan_offset.y - (y - origin.y)).max(0.0);
                    self.drag_origin = Some(PixelPoint::new(x, y));
                }
                None
            }
            ActiveTool::Selection => self.hover(x, y),
        }
    }

    /// Pointer left the overlay.
    pub fn pointer_leave(&mut self) -> Option<DrawOutcome> {
        self.drag_origin = None;
        if self.hot.is_empty() {
            return None;
        }
        self.hot.clear();
        Some(self.draw_overlay(false))
    }

    fn hover(&mut self, x: f32, y: f32) -> Option<DrawOutcome> {
        let viewport = self.viewport?;
        let point =
            to_normalized(PixelPoint::new(x, y), viewport.width, viewport.height, self.rotation);
        let hot: Vec<VerticesGroup> = vertices::hits(&self.initial_vertices, self.current_page, point)
            .into_iter()
            .cloned()
            .collect();

        if hot == self.hot {
            return None;
        }
        self.hot = hot;
        Some(self.draw_overlay(false))
    }

    // --- Overlay surface ---

    /// Attach the overlay surface, returning the previous one.
    pub fn attach_overlay(&mut self, mut surface: S) -> Option<S> {
        if let Some(viewport) = self.viewport {
            surface.resize(viewport.width, viewport.height);
            self.request(Redraw::Overlay);
        }
        self.overlay.replace(surface)
    }

    pub fn detach_overlay(&mut self) -> Option<S> {
        self.overlay.take()
    }

    pub fn overlay(&self) -> Option<&S> {
        self.overlay.as_ref()
    }

    fn draw_overlay(&mut self, scroll_into_view: bool) -> DrawOutcome {
        let Some(viewport) = self.viewport else {
            return DrawOutcome::default();
        };

        let (groups, label_keys, label_override) = if self.hot.is_empty() {
            (
                self.vertices_groups.as_slice(),
                self.config.style.label_keys,
                self.overlay_label.as_deref(),
            )
        } else {
            (self.hot.as_slice(), true, None)
        };

        let request = DrawRequest {
            viewport,
            groups,
            rotation: self.rotation,
            scroll_into_view,
            label_override,
            label_keys,
            current_page: self.current_page,
        };
        let outcome = self.renderer.draw(self.overlay.as_mut(), &request);

        if self.pending == Redraw::Overlay {
            self.pending = Redraw::None;
        }
        outcome
    }

    // --- Rendering ---

    /// Start rendering the current page.
    ///
    /// The returned job supersedes every earlier one; hand it to
    /// [`render_job`](Self::render_job) (or an equivalent off-thread
    /// renderer) and pass the result to
    /// [`finish_page_render`](Self::finish_page_render).
    pub fn begin_page_render(&mut self) -> ViewerResult<PageRenderJob> {
        let handle = self.document.ok_or(ViewerError::NoDocument)?;
        let page_index = self.current_page - 1;
        let size = self.engine.page_size(handle, page_index)?;
        let viewport = ViewportState::for_page(size, self.scale, self.rotation);
        let ticket = self.sequence.begin();
        self.pending = Redraw::None;

        debug!(
            generation = ticket.generation(),
            page = self.current_page,
            scale = self.scale,
            "page render started"
        );

        Ok(PageRenderJob {
            ticket,
            page_number: self.current_page,
            request: RenderRequest {
                page_index,
                scale: self.scale,
                rotation: self.rotation.degrees(),
            },
            viewport,
        })
    }

    /// Render `job` with this controller's engine.
    pub fn render_job(&self, job: &PageRenderJob) -> ViewerResult<PageRender> {
        let handle = self.document.ok_or(ViewerError::NoDocument)?;
        let bitmap = self.engine.render_page(handle, job.request)?;
        let text =
            self.engine.text_content(handle, job.request.page_index).unwrap_or_else(|err| {
                warn!(page = job.page_number, error = %err, "text layer unavailable");
                TextContent::default()
            });

        Ok(PageRender { page_number: job.page_number, viewport: job.viewport, bitmap, text })
    }

    /// Apply a finished render unless a newer one has started since.
    pub fn finish_page_render(&mut self, job: PageRenderJob, render: PageRender) -> RenderOutcome {
        if !self.sequence.is_current(job.ticket) {
            debug!(generation = job.ticket.generation(), "discarding stale page render");
            return RenderOutcome::Stale;
        }

        let viewport = render.viewport;
        self.viewport = Some(viewport);
        self.page = Some(render);
        if let Some(surface) = self.overlay.as_mut() {
            surface.resize(viewport.width, viewport.height);
        }
        self.draw_overlay(false);

        RenderOutcome::Applied
    }

    /// Render the current page synchronously.
    pub fn render_page(&mut self) -> ViewerResult<RenderOutcome> {
        let job = self.begin_page_render()?;
        let render = self.render_job(&job)?;
        Ok(self.finish_page_render(job, render))
    }

    /// Perform pending redraw work and report what was done.
    pub fn flush(&mut self) -> ViewerResult<Redraw> {
        match self.pending {
            Redraw::None => Ok(Redraw::None),
            Redraw::Overlay => {
                self.draw_overlay(false);
                Ok(Redraw::Overlay)
            }
            Redraw::FullPage => {
                if self.document.is_none() {
                    self.pending = Redraw::None;
                    return Ok(Redraw::None);
                }
                self.render_page()?;
                Ok(Redraw::FullPage)
            }
        }
    }

    fn request(&mut self, redraw: Redraw) {
        self.pending = self.pending.max(redraw);
    }

    // --- Accessors ---

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn document_url(&self) -> Option<&str> {
        self.document_url.as_deref()
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// One-based page currently shown
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn active_tool(&self) -> ActiveTool {
        self.active_tool
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error_state(&self) -> &ErrorState {
        &self.error
    }

    pub fn pagination_control_visible(&self) -> bool {
        self.show_pagination_control
    }

    pub fn vertices_groups(&self) -> &[VerticesGroup] {
        &self.vertices_groups
    }

    pub fn initial_vertices(&self) -> &[VerticesGroup] {
        &self.initial_vertices
    }

    /// Keys of the regions currently under the pointer.
    pub fn hovered_keys(&self) -> Vec<&str> {
        self.hot.iter().map(|group| group.key.as_str()).collect()
    }

    pub fn pan_offset(&self) -> PixelPoint {
        self.pan_offset
    }

    pub fn viewport(&self) -> Option<ViewportState> {
        self.viewport
    }

    /// The last applied page render.
    pub fn page_render(&self) -> Option<&PageRender> {
        self.page.as_ref()
    }

    pub fn pending_redraw(&self) -> Redraw {
        self.pending
    }
}
