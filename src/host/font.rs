//! Font metrics and greedy line wrapping for the simulated host

use unicode_linebreak::{linebreaks, BreakOpportunity};
use unicode_segmentation::UnicodeSegmentation;

/// Metrics needed for text layout
#[derive(Debug, Clone)]
pub struct FontMetrics {
    /// Line height in logical pixels
    pub line_height: f32,
    /// Width of ASCII characters (0-127)
    pub char_widths: Vec<f32>,
    /// Default width for non-ASCII characters
    pub default_width: f32,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self::monospace(10.0, 20.0)
    }
}

impl FontMetrics {
    pub fn new(line_height: f32, char_widths: Vec<f32>, default_width: f32) -> Self {
        Self {
            line_height,
            char_widths,
            default_width,
        }
    }

    /// Every character `char_width` wide
    pub fn monospace(char_width: f32, line_height: f32) -> Self {
        Self {
            line_height,
            char_widths: vec![char_width; 128],
            default_width: char_width,
        }
    }

    /// Get width of a character
    pub fn width(&self, c: char) -> f32 {
        if c.is_ascii() {
            if c.is_control() {
                return 0.0;
            }
            if let Some(w) = self.char_widths.get(c as usize) {
                return *w;
            }
        }
        self.default_width
    }

    /// Width of a grapheme cluster
    pub fn grapheme_width(&self, grapheme: &str) -> f32 {
        if grapheme == "\t" {
            self.default_width * 4.0
        } else {
            grapheme.chars().map(|c| self.width(c)).sum()
        }
    }

    pub fn text_width(&self, text: &str) -> f32 {
        text.graphemes(true).map(|g| self.grapheme_width(g)).sum()
    }

    /// Character offset in `text` closest to horizontal position `x`
    pub fn offset_for_x(&self, text: &str, x: f32) -> usize {
        if x <= 0.0 {
            return 0;
        }
        let mut offset = 0;
        let mut left = 0.0;
        for grapheme in text.graphemes(true) {
            let w = self.grapheme_width(grapheme);
            if x < left + w / 2.0 {
                return offset;
            }
            left += w;
            offset += grapheme.chars().count();
        }
        offset
    }
}

/// One wrapped line as a character range of its text node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
    pub width: f32,
}

/// Greedy wrap of `text` into lines no wider than `max_width`
///
/// Trailing whitespace hangs past the edge. A single unbreakable run wider
/// than the line stays on one overflowing line.
pub fn wrap_text(text: &str, max_width: f32, metrics: &FontMetrics) -> Vec<LineSpan> {
    let mut byte_lines: Vec<(usize, usize, f32)> = Vec::new();
    let mut line_start = 0;
    let mut line_width = 0.0f32;
    let mut prev = 0;

    for (brk, opportunity) in linebreaks(text) {
        let segment = &text[prev..brk];
        let visible = metrics.text_width(segment.trim_end());
        if line_width > 0.0 && line_width + visible > max_width {
            byte_lines.push((line_start, prev, line_width));
            line_start = prev;
            line_width = 0.0;
        }
        line_width += metrics.text_width(segment);
        if opportunity == BreakOpportunity::Mandatory && brk < text.len() {
            byte_lines.push((line_start, brk, line_width));
            line_start = brk;
            line_width = 0.0;
        }
        prev = brk;
    }
    if line_start < text.len() {
        byte_lines.push((line_start, text.len(), line_width));
    }

    // Byte offsets to character offsets
    let mut lines = Vec::with_capacity(byte_lines.len());
    let mut chars_before = 0;
    let mut last_byte = 0;
    for (start, end, width) in byte_lines {
        chars_before += text[last_byte..start].chars().count();
        let len = text[start..end].chars().count();
        lines.push(LineSpan {
            start: chars_before,
            end: chars_before + len,
            width: width.min(metrics.text_width(text[start..end].trim_end()).max(0.0)),
        });
        chars_before += len;
        last_byte = end;
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_words() {
        let metrics = FontMetrics::monospace(10.0, 20.0);
        let text = "abcd ".repeat(24);
        let lines = wrap_text(&text, 600.0, &metrics);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].start, 0);
        assert_eq!(lines[0].end, 60);
        assert_eq!(lines[1].start, 60);
        assert_eq!(lines[1].end, 120);
        assert_eq!(lines[0].width, 590.0);
    }

    #[test]
    fn test_wrap_mandatory_break() {
        let metrics = FontMetrics::monospace(10.0, 20.0);
        let lines = wrap_text("one\ntwo", 600.0, &metrics);
        assert_eq!(lines.len(), 2);
        assert_eq!((lines[1].start, lines[1].end), (4, 7));
    }

    #[test]
    fn test_long_word_overflows() {
        let metrics = FontMetrics::monospace(10.0, 20.0);
        let lines = wrap_text("abcdefghij", 50.0, &metrics);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_offset_for_x() {
        let metrics = FontMetrics::monospace(10.0, 20.0);
        assert_eq!(metrics.offset_for_x("abcd", 0.0), 0);
        assert_eq!(metrics.offset_for_x("abcd", 14.0), 1);
        assert_eq!(metrics.offset_for_x("abcd", 16.0), 2);
        assert_eq!(metrics.offset_for_x("abcd", 400.0), 4);
    }
}
