//! Rendered page viewport

use crate::geometry::Rotation;
use docview_pdf_engine::PageSize;
use serde::{Deserialize, Serialize};

/// Pixel size and zoom of the page as currently rendered
///
/// Recomputed for every render; width and height already account for the
/// rotation (they swap on quarter turns).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl ViewportState {
    pub fn new(width: f32, height: f32, scale: f32) -> Self {
        Self { width, height, scale }
    }

    /// Viewport for a page of `size` points rendered at `scale` and `rotation`.
    pub fn for_page(size: PageSize, scale: f32, rotation: Rotation) -> Self {
        let width = size.width_pt * scale;
        let height = size.height_pt * scale;

        if rotation.is_quarter_turn() {
            Self { width: height, height: width, scale }
        } else {
            Self { width, height, scale }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_scales_page_size() {
        let size = PageSize { width_pt: 600.0, height_pt: 800.0 };
        let viewport = ViewportState::for_page(size, 1.5, Rotation::Deg0);
        assert_eq!(viewport, ViewportState::new(900.0, 1200.0, 1.5));
    }

    #[test]
    fn test_viewport_swaps_on_quarter_turn() {
        let size = PageSize { width_pt: 600.0, height_pt: 800.0 };
        assert_eq!(
            ViewportState::for_page(size, 1.0, Rotation::Deg270),
            ViewportState::new(800.0, 600.0, 1.0)
        );
        assert_eq!(
            ViewportState::for_page(size, 1.0, Rotation::Deg180),
            ViewportState::new(600.0, 800.0, 1.0)
        );
    }
}
