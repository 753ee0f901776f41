use std::path::Path;

use imageproc::point::Point;
use tracing::instrument;

use crate::{
    annotation::{TextAnnotation, Word},
    overlay::{Overlay, RED},
    Result, SourceImage,
};

pub const PARAGRAPH_CONFIDENCE_THRESHOLD: f64 = 0.90;
pub const WORD_CONFIDENCE_THRESHOLD: f64 = 0.90;
/// Words need more symbols than this to be flagged; lone characters are
/// recognition noise rather than truncation.
pub const MIN_SYMBOLS_EXCLUSIVE: usize = 1;

/// Vision reports single precision scores, compared here in double
/// precision, so a reported `0.9` sits just below the threshold.
fn below(confidence: Option<f32>, threshold: f64) -> bool {
    confidence.is_some_and(|confidence| f64::from(confidence) < threshold)
}

/// Flags low-confidence words in an OCR result.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceAggregator;

impl ConfidenceAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Words inside low-confidence paragraphs that are themselves
    /// low-confidence and longer than one symbol.
    pub fn flagged_words<'a>(&self, annotation: &'a TextAnnotation) -> Vec<&'a Word> {
        annotation
            .pages
            .iter()
            .flat_map(|page| &page.blocks)
            .flat_map(|block| &block.paragraphs)
            .filter(|paragraph| below(paragraph.confidence, PARAGRAPH_CONFIDENCE_THRESHOLD))
            .flat_map(|paragraph| &paragraph.words)
            .filter(|word| {
                below(word.confidence, WORD_CONFIDENCE_THRESHOLD)
                    && word.symbols.len() > MIN_SYMBOLS_EXCLUSIVE
            })
            .collect()
    }

    /// Outlines every flagged word on `overlay`. Returns whether any word
    /// was flagged.
    #[instrument(level = "debug", skip_all)]
    pub fn score_text(&self, annotation: &TextAnnotation, overlay: &mut Overlay) -> bool {
        let flagged = self.flagged_words(annotation);
        for word in &flagged {
            log::trace!("Low confidence word {:?} ({:?})", word.text(), word.confidence);
            let Some(bounding_box) = &word.bounding_box else {
                continue;
            };
            let outline = bounding_box
                .vertices
                .iter()
                .map(|vertex| Point::new(vertex.x, vertex.y))
                .collect::<Vec<_>>();
            if outline.len() > 1 {
                overlay.draw_closed(&outline, RED);
            }
        }
        log::debug!("{} low confidence words", flagged.len());
        !flagged.is_empty()
    }

    /// Scores a single file against its annotation, writing
    /// `encoding_<name>` into `output_dir` when a word was flagged.
    #[instrument(skip(self, annotation))]
    pub fn score_text_file(
        &self,
        path: &Path,
        annotation: &TextAnnotation,
        output_dir: Option<&Path>,
    ) -> Result<bool> {
        let source = SourceImage::load(path)?;
        let mut overlay = Overlay::new(&source.image);
        let detected = self.score_text(annotation, &mut overlay);
        if let Some(output_dir) = output_dir.filter(|_| detected) {
            overlay.save(output_dir, &source.file_name)?;
        }
        Ok(detected)
    }
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgb, RgbImage};

    use super::*;
    use crate::annotation::{Block, BoundingPoly, Page, Paragraph, Symbol, Vertex};

    fn word(text: &str, confidence: f32) -> Word {
        Word {
            bounding_box: Some(BoundingPoly {
                vertices: vec![
                    Vertex::new(4, 4),
                    Vertex::new(30, 4),
                    Vertex::new(30, 14),
                    Vertex::new(4, 14),
                ],
            }),
            confidence: Some(confidence),
            symbols: text
                .chars()
                .map(|c| Symbol {
                    text: c.to_string(),
                    confidence: Some(confidence),
                })
                .collect(),
        }
    }

    fn annotation(paragraph_confidence: Option<f32>, words: Vec<Word>) -> TextAnnotation {
        TextAnnotation {
            pages: vec![Page {
                blocks: vec![Block {
                    paragraphs: vec![Paragraph {
                        confidence: paragraph_confidence,
                        words,
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn blank_overlay() -> Overlay {
        Overlay::new(&DynamicImage::ImageRgb8(RgbImage::from_pixel(
            40,
            20,
            Rgb([255, 255, 255]),
        )))
    }

    #[test]
    fn confident_paragraph_hides_bad_words() {
        let aggregator = ConfidenceAggregator::new();
        let tree = annotation(Some(0.95), vec![word("garbled", 0.1)]);
        assert!(aggregator.flagged_words(&tree).is_empty());

        let mut overlay = blank_overlay();
        assert!(!aggregator.score_text(&tree, &mut overlay));
        assert!(!overlay.is_marked());
    }

    #[test]
    fn single_symbols_are_exempt() {
        let aggregator = ConfidenceAggregator::new();
        let tree = annotation(Some(0.5), vec![word("x", 0.5)]);
        assert!(aggregator.flagged_words(&tree).is_empty());

        let tree = annotation(Some(0.5), vec![word("xy", 0.5)]);
        assert_eq!(aggregator.flagged_words(&tree).len(), 1);
    }

    #[test]
    fn flagged_words_are_outlined() {
        let aggregator = ConfidenceAggregator::new();
        let tree = annotation(Some(0.5), vec![word("abc", 0.5), word("fine", 0.99)]);
        let flagged = aggregator.flagged_words(&tree);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].text(), "abc");

        let mut overlay = blank_overlay();
        assert!(aggregator.score_text(&tree, &mut overlay));
        assert_eq!(*overlay.canvas().get_pixel(10, 4), RED);
    }

    #[test]
    fn reported_point_nine_counts_as_low() {
        let aggregator = ConfidenceAggregator::new();
        let tree = annotation(Some(0.9), vec![word("edge", 0.9)]);
        assert_eq!(aggregator.flagged_words(&tree).len(), 1);
    }

    #[test]
    fn missing_scores_never_flag() {
        let aggregator = ConfidenceAggregator::new();
        let mut unscored = word("abc", 0.1);
        unscored.confidence = None;
        assert!(aggregator
            .flagged_words(&annotation(Some(0.1), vec![unscored]))
            .is_empty());
        assert!(aggregator
            .flagged_words(&annotation(None, vec![word("abc", 0.1)]))
            .is_empty());
        assert!(aggregator
            .flagged_words(&TextAnnotation::default())
            .is_empty());
    }

    #[test]
    fn words_without_boxes_still_count() {
        let aggregator = ConfidenceAggregator::new();
        let mut unboxed = word("abc", 0.2);
        unboxed.bounding_box = None;
        let mut overlay = blank_overlay();
        assert!(aggregator.score_text(&annotation(Some(0.2), vec![unboxed]), &mut overlay));
        assert!(!overlay.is_marked());
    }
}
