//! Hierarchical OCR result, shaped after the Vision `fullTextAnnotation`.
//!
//! Proto3 JSON drops zero-valued numbers and empty lists, so every field
//! falls back to its default when absent.

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextAnnotation {
    pub pages: Vec<Page>,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Page {
    pub width: u32,
    pub height: u32,
    pub confidence: Option<f32>,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Block {
    pub bounding_box: Option<BoundingPoly>,
    pub confidence: Option<f32>,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Paragraph {
    pub bounding_box: Option<BoundingPoly>,
    pub confidence: Option<f32>,
    pub words: Vec<Word>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Word {
    pub bounding_box: Option<BoundingPoly>,
    pub confidence: Option<f32>,
    pub symbols: Vec<Symbol>,
}

impl Word {
    /// Recognized text, reassembled from the symbols.
    pub fn text(&self) -> String {
        self.symbols.iter().map(|symbol| symbol.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Symbol {
    pub text: String,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoundingPoly {
    pub vertices: Vec<Vertex>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Vertex {
    pub x: i32,
    pub y: i32,
}

impl Vertex {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}
