// src/render/page.rs

use super::metrics::{Font, text_width};
use lopdf::Object;
use lopdf::content::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Drawing operations for a single page, in PDF user space (origin at the
/// bottom-left corner).
#[derive(Debug, Default)]
pub struct PageCanvas {
    operations: Vec<Operation>,
}

impl PageCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw `text` with its baseline at `y`, aligned inside `[x, x + width]`.
    #[allow(clippy::too_many_arguments)]
    pub fn text(&mut self, text: &str, font: Font, size: f32, x: f32, y: f32, width: f32, align: Align) {
        if text.is_empty() {
            return;
        }
        let x = match align {
            Align::Left => x,
            Align::Center => x + (width - text_width(text, font, size)) / 2.0,
            Align::Right => x + width - text_width(text, font, size),
        };
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.resource().into(), size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, thickness: f32) {
        self.operations.extend([
            Operation::new("w", vec![thickness.into()]),
            Operation::new("m", vec![x1.into(), y1.into()]),
            Operation::new("l", vec![x2.into(), y2.into()]),
            Operation::new("S", vec![]),
        ]);
    }

    pub fn hline(&mut self, x: f32, y: f32, width: f32, thickness: f32) {
        self.line(x, y, x + width, y, thickness);
    }

    pub fn vline(&mut self, x: f32, top: f32, bottom: f32, thickness: f32) {
        self.line(x, top, x, bottom, thickness);
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }
}

/// Map text onto the single-byte WinAnsi encoding declared for the page
/// fonts. Latin-1 characters pass through; anything else becomes '?'.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
            0x2013 => 0x96,
            0x2014 => 0x97,
            0x2018 => 0x91,
            0x2019 => 0x92,
            0x201C => 0x93,
            0x201D => 0x94,
            _ => b'?',
        })
        .collect()
}
