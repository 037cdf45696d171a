//! Overlay drawing surfaces
//!
//! The overlay renderer draws through the [`OverlaySurface`] trait, a small
//! canvas-style API (paths, rectangles, text). [`DisplayList`] is the default
//! implementation: it retains the primitives so a host can replay them on its
//! own canvas, and so the CLI can print them.

use serde::{Deserialize, Serialize};

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let channel = |range: std::ops::Range<usize>| {
            digits.get(range).and_then(|pair| u8::from_str_radix(pair, 16).ok())
        };

        match digits.len() {
            6 => Some(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, channel(6..8)?)),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// Translucent yellow used for region fills
    pub const HIGHLIGHT: Color = Color::new(255, 214, 0, 77);
    pub const HIGHLIGHT_STROKE: Color = Color::rgb(230, 160, 0);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Left,
    Center,
}

/// Retained overlay primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Primitive {
    FillPath {
        points: Vec<[f32; 2]>,
        color: Color,
    },
    StrokePath {
        points: Vec<[f32; 2]>,
        closed: bool,
        color: Color,
        width: f32,
    },
    FillRect {
        rect: Rect,
        color: Color,
    },
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        align: TextAlign,
        color: Color,
    },
}

/// Canvas-style 2D drawing API the overlay renderer targets.
pub trait OverlaySurface {
    /// Current surface size in pixels.
    fn size(&self) -> (f32, f32);
    /// Resize the surface; implies a clear.
    fn resize(&mut self, width: f32, height: f32);
    /// Erase everything drawn so far.
    fn clear(&mut self);

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    fn close_path(&mut self);
    fn fill_path(&mut self, color: Color);
    fn stroke_path(&mut self, color: Color, width: f32);

    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn fill_text(&mut self, text: &str, x: f32, y: f32, size: f32, align: TextAlign, color: Color);
    /// Advance width of `text` at font `size`.
    fn measure_text(&self, text: &str, size: f32) -> f32;
}

/// Average glyph advance as a fraction of the font size.
const DEFAULT_GLYPH_ADVANCE: f32 = 0.6;

/// Retained list of overlay primitives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayList {
    width: f32,
    height: f32,
    primitives: Vec<Primitive>,
    #[serde(skip)]
    path: Vec<[f32; 2]>,
    #[serde(skip)]
    path_closed: bool,
    #[serde(skip, default = "default_glyph_advance")]
    glyph_advance: f32,
}

fn default_glyph_advance() -> f32 {
    DEFAULT_GLYPH_ADVANCE
}

impl DisplayList {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            primitives: Vec::new(),
            path: Vec::new(),
            path_closed: false,
            glyph_advance: DEFAULT_GLYPH_ADVANCE,
        }
    }

    /// Override the glyph advance used by `measure_text`.
    pub fn with_glyph_advance(mut self, advance: f32) -> Self {
        self.glyph_advance = advance;
        self
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Number of filled regions; one per highlighted group.
    pub fn filled_regions(&self) -> usize {
        self.primitives.iter().filter(|p| matches!(p, Primitive::FillPath { .. })).count()
    }

    /// Text of every label drawn, in order.
    pub fn labels(&self) -> Vec<&str> {
        self.primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Default for DisplayList {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl OverlaySurface for DisplayList {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.clear();
    }

    fn clear(&mut self) {
        self.primitives.clear();
        self.path.clear();
        self.path_closed = false;
    }

    fn begin_path(&mut self) {
        self.path.clear();
        self.path_closed = false;
    }

    fn move_to(&mut self, x: f32, y: f32) {
        // Only one subpath is retained; a new move starts over.
        self.path.clear();
        self.path_closed = false;
        self.path.push([x, y]);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.path.push([x, y]);
    }

    fn close_path(&mut self) {
        self.path_closed = true;
    }

    fn fill_path(&mut self, color: Color) {
        if self.path.len() < 3 {
            return;
        }
        self.primitives.push(Primitive::FillPath { points: self.path.clone(), color });
    }

    fn stroke_path(&mut self, color: Color, width: f32) {
        if self.path.len() < 2 {
            return;
        }
        self.primitives.push(Primitive::StrokePath {
            points: self.path.clone(),
            closed: self.path_closed,
            color,
            width,
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.primitives.push(Primitive::FillRect { rect, color });
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, size: f32, align: TextAlign, color: Color) {
        self.primitives.push(Primitive::Text { text: text.to_owned(), x, y, size, align, color });
    }

    fn measure_text(&self, text: &str, size: f32) -> f32 {
        text.chars().count() as f32 * size * self.glyph_advance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex_round_trip() {
        let color = Color::from_hex("#ffd6004d").unwrap();
        assert_eq!(color, Color::HIGHLIGHT);
        assert_eq!(color.to_hex(), "#ffd6004d");

        assert_eq!(Color::from_hex("000000"), Some(Color::BLACK));
        assert_eq!(Color::from_hex("#12345"), None);
        assert_eq!(Color::from_hex("#gg0000"), None);
    }

    #[test]
    fn test_closed_path_produces_fill_and_stroke() {
        let mut list = DisplayList::new(100.0, 100.0);
        list.begin_path();
        list.move_to(0.0, 0.0);
        list.line_to(10.0, 0.0);
        list.line_to(10.0, 10.0);
        list.close_path();
        list.fill_path(Color::HIGHLIGHT);
        list.stroke_path(Color::BLACK, 2.0);

        assert_eq!(list.filled_regions(), 1);
        assert_eq!(
            list.primitives()[1],
            Primitive::StrokePath {
                points: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]],
                closed: true,
                color: Color::BLACK,
                width: 2.0,
            }
        );
    }

    #[test]
    fn test_degenerate_path_is_not_filled() {
        let mut list = DisplayList::new(100.0, 100.0);
        list.begin_path();
        list.move_to(0.0, 0.0);
        list.line_to(10.0, 0.0);
        list.fill_path(Color::HIGHLIGHT);

        assert!(list.is_empty());
    }

    #[test]
    fn test_resize_clears() {
        let mut list = DisplayList::new(100.0, 100.0);
        list.fill_rect(Rect::new(0.0, 0.0, 5.0, 5.0), Color::WHITE);
        list.resize(200.0, 50.0);

        assert!(list.is_empty());
        assert_eq!(list.size(), (200.0, 50.0));
    }

    #[test]
    fn test_measure_text_scales_with_length_and_size() {
        let list = DisplayList::default();
        assert!((list.measure_text("abcd", 10.0) - 24.0).abs() < 1e-4);
        assert_eq!(list.measure_text("", 10.0), 0.0);

        let wide = DisplayList::default().with_glyph_advance(1.0);
        assert_eq!(wide.measure_text("ab", 12.0), 24.0);
    }

    #[test]
    fn test_primitives_serialize_with_kind_tag() {
        let mut list = DisplayList::new(10.0, 10.0);
        list.fill_rect(Rect::new(1.0, 2.0, 3.0, 4.0), Color::BLACK);

        let value = serde_json::to_value(list.primitives()).unwrap();
        assert_eq!(value[0]["kind"], "fill_rect");
        assert_eq!(value[0]["rect"]["width"], 3.0);
    }
}
