//! Highlight overlay rendering
//!
//! Draws the vertices groups that belong to the current page onto an overlay
//! surface: a translucent fill, an outline and an optional label box above
//! the first vertex. Coordinates are transformed at draw time; the groups
//! themselves are never modified.

use crate::config::OverlayStyle;
use crate::geometry::{to_surface, PixelPoint, Rotation};
use crate::surface::{OverlaySurface, Rect, TextAlign};
use crate::vertices::VerticesGroup;
use crate::viewport::ViewportState;
use serde::Serialize;
use tracing::trace;

/// Everything one overlay pass needs
#[derive(Debug, Clone, Copy)]
pub struct DrawRequest<'a> {
    pub viewport: ViewportState,
    pub groups: &'a [VerticesGroup],
    pub rotation: Rotation,
    /// Ask the host to scroll a lone drawn region into view
    pub scroll_into_view: bool,
    /// Label drawn above every region, replacing keys
    pub label_override: Option<&'a str>,
    /// Label regions with their own keys when no override is given
    pub label_keys: bool,
    /// One-based page currently shown
    pub current_page: u32,
}

/// Request for the host to scroll the viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScrollRequest {
    /// Target left edge in surface pixels
    pub x: f32,
    /// Target top edge in surface pixels
    pub y: f32,
    pub smooth: bool,
}

/// Result of an overlay pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DrawOutcome {
    /// Number of regions drawn
    pub drawn: usize,
    pub scroll_to: Option<ScrollRequest>,
}

#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    style: OverlayStyle,
    scroll_margin: f32,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle, scroll_margin: f32) -> Self {
        Self { style, scroll_margin }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Clear `surface` and draw the groups that belong to the current page.
    ///
    /// A missing surface (not created yet) makes this a no-op.
    pub fn draw<S>(&self, surface: Option<&mut S>, request: &DrawRequest<'_>) -> DrawOutcome
    where
        S: OverlaySurface + ?Sized,
    {
        let Some(surface) = surface else {
            return DrawOutcome::default();
        };

        surface.clear();

        let mut drawn = 0;
        let mut first_anchor: Option<PixelPoint> = None;

        for group in request.groups.iter().filter(|g| g.is_on_page(request.current_page)) {
            let points: Vec<PixelPoint> = group
                .vertices
                .iter()
                .map(|vertex| {
                    to_surface(
                        *vertex,
                        request.viewport.width,
                        request.viewport.height,
                        request.rotation,
                    )
                })
                .collect();

            let Some((&first, rest)) = points.split_first() else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }

            surface.begin_path();
            surface.move_to(first.x, first.y);
            for point in rest {
                surface.line_to(point.x, point.y);
            }
            surface.close_path();
            surface.fill_path(self.style.fill);
            surface.stroke_path(self.style.stroke, self.style.stroke_width);

            let label = match request.label_override {
                Some(text) if !text.is_empty() => Some(text),
                _ if request.label_keys && !group.key.is_empty() => Some(group.key.as_str()),
                _ => None,
            };
            if let Some(text) = label {
                self.draw_label(surface, text, first);
            }

            if drawn == 0 {
                first_anchor = Some(first);
            }
            drawn += 1;
        }

        let scroll_to = match first_anchor {
            Some(anchor) if drawn == 1 && request.scroll_into_view => Some(ScrollRequest {
                x: (anchor.x - self.scroll_margin).max(0.0),
                y: (anchor.y - self.scroll_margin).max(0.0),
                smooth: true,
            }),
            _ => None,
        };

        trace!(page = request.current_page, drawn, "overlay drawn");
        DrawOutcome { drawn, scroll_to }
    }

    fn draw_label<S>(&self, surface: &mut S, text: &str, anchor: PixelPoint)
    where
        S: OverlaySurface + ?Sized,
    {
        let font_size = self.style.label_font_size;
        let padding = self.style.label_padding;
        let width = surface.measure_text(text, font_size) + padding * 2.0;
        let height = font_size + padding * 2.0;

        let rect = Rect::new(anchor.x, (anchor.y - height).max(0.0), width, height);
        surface.fill_rect(rect, self.style.label_background);
        surface.fill_text(
            text,
            rect.x + width / 2.0,
            rect.y + padding + font_size,
            font_size,
            TextAlign::Center,
            self.style.label_text,
        );
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(OverlayStyle::default(), 50.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::NormalizedPoint;
    use crate::surface::{DisplayList, Primitive};
    use crate::vertices::PageTarget;

    fn square(page: PageTarget, key: &str) -> VerticesGroup {
        VerticesGroup::new(
            page,
            key,
            vec![
                NormalizedPoint::new(0.1, 0.1),
                NormalizedPoint::new(0.3, 0.1),
                NormalizedPoint::new(0.3, 0.3),
                NormalizedPoint::new(0.1, 0.3),
            ],
        )
    }

    fn request<'a>(groups: &'a [VerticesGroup], current_page: u32) -> DrawRequest<'a> {
        DrawRequest {
            viewport: ViewportState::new(1000.0, 2000.0, 1.0),
            groups,
            rotation: Rotation::Deg0,
            scroll_into_view: false,
            label_override: None,
            label_keys: false,
            current_page,
        }
    }

    #[test]
    fn test_draws_only_groups_on_current_page() {
        let groups = vec![
            square(PageTarget::Page(0), "a"),
            square(PageTarget::Page(1), "b"),
            square(PageTarget::All, "c"),
        ];
        let mut list = DisplayList::new(1000.0, 2000.0);
        let renderer = OverlayRenderer::default();

        let outcome = renderer.draw(Some(&mut list), &request(&groups, 1));
        assert_eq!(outcome.drawn, 2);
        assert_eq!(list.filled_regions(), 2);

        let outcome = renderer.draw(Some(&mut list), &request(&groups, 3));
        assert_eq!(outcome.drawn, 1);
        assert_eq!(list.filled_regions(), 1);
    }

    #[test]
    fn test_transforms_vertices_to_pixels() {
        let groups = vec![square(PageTarget::Page(0), "a")];
        let mut list = DisplayList::new(1000.0, 2000.0);

        OverlayRenderer::default().draw(Some(&mut list), &request(&groups, 1));

        match &list.primitives()[0] {
            Primitive::FillPath { points, .. } => {
                assert_eq!(points.len(), 4);
                assert!((points[0][0] - 100.0).abs() < 1e-3);
                assert!((points[0][1] - 200.0).abs() < 1e-3);
                assert!((points[2][0] - 300.0).abs() < 1e-3);
                assert!((points[2][1] - 600.0).abs() < 1e-3);
            }
            other => panic!("expected fill, got {other:?}"),
        }
    }

    #[test]
    fn test_rotation_is_applied_at_draw_time() {
        let groups = vec![square(PageTarget::Page(0), "a")];
        let mut list = DisplayList::new(2000.0, 1000.0);
        let mut req = request(&groups, 1);
        req.viewport = ViewportState::new(2000.0, 1000.0, 1.0);
        req.rotation = Rotation::Deg90;

        OverlayRenderer::default().draw(Some(&mut list), &req);

        match &list.primitives()[0] {
            Primitive::FillPath { points, .. } => {
                // (0.1, 0.1) -> ((1 - 0.1) * 2000, 0.1 * 1000)
                assert!((points[0][0] - 1800.0).abs() < 1e-3);
                assert!((points[0][1] - 100.0).abs() < 1e-3);
            }
            other => panic!("expected fill, got {other:?}"),
        }
        assert_eq!(groups[0].vertices[0], NormalizedPoint::new(0.1, 0.1));
    }

    #[test]
    fn test_clears_previous_contents() {
        let groups = vec![square(PageTarget::Page(0), "a")];
        let mut list = DisplayList::new(1000.0, 2000.0);
        let renderer = OverlayRenderer::default();

        renderer.draw(Some(&mut list), &request(&groups, 1));
        renderer.draw(Some(&mut list), &request(&groups, 2));

        assert!(list.is_empty());
    }

    #[test]
    fn test_missing_surface_is_noop() {
        let groups = vec![square(PageTarget::Page(0), "a")];
        let outcome = OverlayRenderer::default().draw::<DisplayList>(None, &request(&groups, 1));

        assert_eq!(outcome, DrawOutcome::default());
    }

    #[test]
    fn test_scrolls_only_for_a_single_region() {
        let one = vec![square(PageTarget::Page(0), "a")];
        let two = vec![square(PageTarget::Page(0), "a"), square(PageTarget::Page(0), "b")];
        let mut list = DisplayList::new(1000.0, 2000.0);
        let renderer = OverlayRenderer::new(OverlayStyle::default(), 50.0);

        let mut req = request(&one, 1);
        req.scroll_into_view = true;
        let outcome = renderer.draw(Some(&mut list), &req);
        let scroll = outcome.scroll_to.expect("single region should scroll");
        assert!((scroll.x - 50.0).abs() < 1e-3);
        assert!((scroll.y - 150.0).abs() < 1e-3);
        assert!(scroll.smooth);

        let mut req = request(&two, 1);
        req.scroll_into_view = true;
        assert_eq!(renderer.draw(Some(&mut list), &req).scroll_to, None);

        let req = request(&one, 1);
        assert_eq!(renderer.draw(Some(&mut list), &req).scroll_to, None);
    }

    #[test]
    fn test_scroll_target_is_clamped_at_origin() {
        let groups = vec![VerticesGroup::new(
            PageTarget::Page(0),
            "corner",
            vec![
                NormalizedPoint::new(0.0, 0.0),
                NormalizedPoint::new(0.1, 0.0),
                NormalizedPoint::new(0.1, 0.1),
            ],
        )];
        let mut list = DisplayList::new(1000.0, 2000.0);
        let mut req = request(&groups, 1);
        req.scroll_into_view = true;

        let scroll = OverlayRenderer::default().draw(Some(&mut list), &req).scroll_to.unwrap();
        assert_eq!((scroll.x, scroll.y), (0.0, 0.0));
    }

    #[test]
    fn test_label_override_draws_box_and_centered_text() {
        let groups = vec![square(PageTarget::Page(0), "key")];
        let mut list = DisplayList::new(1000.0, 2000.0);
        let mut req = request(&groups, 1);
        req.label_override = Some("Total");

        OverlayRenderer::default().draw(Some(&mut list), &req);

        assert_eq!(list.labels(), vec!["Total"]);
        let rect = list
            .primitives()
            .iter()
            .find_map(|p| match p {
                Primitive::FillRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .expect("label background");
        // 5 glyphs * 12pt * 0.6 + 2 * 4pt padding
        assert!((rect.width - 44.0).abs() < 1e-3);
        assert!((rect.height - 20.0).abs() < 1e-3);
        assert!((rect.x - 100.0).abs() < 1e-3);
        assert!((rect.y - 180.0).abs() < 1e-3);

        let text_x = list
            .primitives()
            .iter()
            .find_map(|p| match p {
                Primitive::Text { x, align, .. } => Some((*x, *align)),
                _ => None,
            })
            .expect("label text");
        assert!((text_x.0 - 122.0).abs() < 1e-3);
        assert_eq!(text_x.1, TextAlign::Center);
    }

    #[test]
    fn test_keys_label_regions_when_enabled() {
        let groups = vec![square(PageTarget::Page(0), "alpha"), square(PageTarget::Page(0), "")];
        let mut list = DisplayList::new(1000.0, 2000.0);
        let mut req = request(&groups, 1);

        OverlayRenderer::default().draw(Some(&mut list), &req);
        assert!(list.labels().is_empty());

        req.label_keys = true;
        OverlayRenderer::default().draw(Some(&mut list), &req);
        assert_eq!(list.labels(), vec!["alpha"]);
    }

    #[test]
    fn test_groups_with_a_single_vertex_are_skipped() {
        let groups = vec![VerticesGroup::new(
            PageTarget::Page(0),
            "dot",
            vec![NormalizedPoint::new(0.5, 0.5)],
        )];
        let mut list = DisplayList::new(1000.0, 2000.0);

        let outcome = OverlayRenderer::default().draw(Some(&mut list), &request(&groups, 1));
        assert_eq!(outcome.drawn, 0);
        assert!(list.is_empty());
    }
}
