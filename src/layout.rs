use crate::document::Document;
use crate::selection::{NodeId, SelectionHost, SelectionRange};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// One contiguous placement of (part of) a token on a laid-out line.
/// Tokens split across lines by embedded newlines or wrapping produce
/// one segment per placement.
#[derive(Debug, Clone)]
struct Segment {
    token: usize,
    line: usize,
    x: u16,
    /// Char offset of this segment's start within the token text.
    char_base: usize,
    text: String,
}

/// Tokens wrapped into styled terminal lines for a given width, plus
/// the geometry needed to map mouse positions back to tokens.
pub struct TextLayout {
    lines: Vec<Line<'static>>,
    segments: Vec<Segment>,
}

impl TextLayout {
    pub fn build(doc: &Document, width: u16, selected: Option<usize>, base_style: Style) -> Self {
        let width = width.max(1);
        let mut lines: Vec<Vec<Span<'static>>> = vec![Vec::new()];
        let mut segments = Vec::new();
        let mut x: u16 = 0;

        for (index, token) in doc.tokens().iter().enumerate() {
            let style = token_style(doc, index, selected, base_style);
            let mut char_base = 0;
            for (part_no, part) in token.text.split('\n').enumerate() {
                if part_no > 0 {
                    // The split consumed a newline.
                    char_base += 1;
                    lines.push(Vec::new());
                    x = 0;
                }
                if part.is_empty() {
                    continue;
                }
                let part_width = part.width() as u16;
                if x > 0 && x.saturating_add(part_width) > width {
                    lines.push(Vec::new());
                    x = 0;
                }
                segments.push(Segment {
                    token: index,
                    line: lines.len() - 1,
                    x,
                    char_base,
                    text: part.to_string(),
                });
                lines
                    .last_mut()
                    .expect("at least one line")
                    .push(Span::styled(part.to_string(), style));
                x = x.saturating_add(part_width);
                char_base += part.chars().count();
            }
        }

        let lines = lines.into_iter().map(Line::from).collect();
        Self { lines, segments }
    }

    pub fn lines(&self) -> &[Line<'static>] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Map a position within the text area (column, laid-out line) to
    /// the token under it and the char offset of that cell within the
    /// token's text.
    pub fn hit_test(&self, x: u16, line: usize) -> Option<(NodeId, usize)> {
        for seg in self.segments.iter().filter(|s| s.line == line) {
            let mut col = seg.x as usize;
            for (i, ch) in seg.text.chars().enumerate() {
                let w = UnicodeWidthChar::width(ch).unwrap_or(0).max(1);
                if (x as usize) >= col && (x as usize) < col + w {
                    return Some((seg.token, seg.char_base + i));
                }
                col += w;
            }
        }
        None
    }
}

fn token_style(doc: &Document, index: usize, selected: Option<usize>, base: Style) -> Style {
    let token = &doc.tokens()[index];
    let mut style = base;
    if let Some(color) = token.color {
        style = style.fg(color);
    }
    if token.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if token.italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if token.underline {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if selected == Some(index) {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

/// The concrete selection host: node ids are token indices in sibling
/// order, text lengths come from the document, and while the color
/// picker popup is open every range counts as inside its subtree.
pub struct LayoutHost<'a> {
    doc: &'a Document,
    range: Option<SelectionRange>,
    picker_open: bool,
}

impl<'a> LayoutHost<'a> {
    pub fn new(doc: &'a Document, range: Option<SelectionRange>, picker_open: bool) -> Self {
        Self {
            doc,
            range,
            picker_open,
        }
    }
}

impl SelectionHost for LayoutHost<'_> {
    fn active_range(&self) -> Option<SelectionRange> {
        self.range
    }

    fn node_text_len(&self, node: NodeId) -> usize {
        self.doc.token(node).map_or(0, |t| t.text.chars().count())
    }

    fn node_ordinal(&self, node: NodeId) -> usize {
        node
    }

    fn picker_contains(&self, _node: NodeId) -> bool {
        self.picker_open
    }
}

#[cfg(test)]
mod tests {
    use super::{LayoutHost, TextLayout};
    use crate::document::Document;
    use crate::selection::{SelectionRange, SelectionTracker};
    use ratatui::style::{Modifier, Style};

    fn line_text(layout: &TextLayout, line: usize) -> String {
        layout.lines()[line]
            .spans
            .iter()
            .map(|s| s.content.as_ref())
            .collect()
    }

    #[test]
    fn narrow_width_wraps_at_token_boundaries() {
        let doc = Document::new("The cat sat");
        let layout = TextLayout::build(&doc, 7, None, Style::default());
        let texts: Vec<String> = (0..layout.line_count())
            .map(|i| line_text(&layout, i))
            .collect();
        assert_eq!(texts, vec!["The cat", " sat"]);
    }

    #[test]
    fn wide_width_keeps_everything_on_one_line() {
        let doc = Document::new("The cat sat");
        let layout = TextLayout::build(&doc, 80, None, Style::default());
        assert_eq!(layout.line_count(), 1);
        assert_eq!(line_text(&layout, 0), "The cat sat");
    }

    #[test]
    fn embedded_newlines_force_line_breaks() {
        let doc = Document::new("one\ntwo");
        let layout = TextLayout::build(&doc, 80, None, Style::default());
        assert_eq!(layout.line_count(), 2);
        assert_eq!(line_text(&layout, 0), "one");
        assert_eq!(line_text(&layout, 1), "two");
    }

    #[test]
    fn hit_test_finds_token_and_offset() {
        let doc = Document::new("The cat sat");
        let layout = TextLayout::build(&doc, 80, None, Style::default());
        assert_eq!(layout.hit_test(0, 0), Some((0, 0)));
        assert_eq!(layout.hit_test(2, 0), Some((0, 2)));
        assert_eq!(layout.hit_test(3, 0), Some((1, 0)));
        assert_eq!(layout.hit_test(4, 0), Some((2, 0)));
        assert_eq!(layout.hit_test(6, 0), Some((2, 2)));
        assert_eq!(layout.hit_test(40, 0), None);
        assert_eq!(layout.hit_test(0, 9), None);
    }

    #[test]
    fn hit_test_accounts_for_wrapping() {
        let doc = Document::new("The cat sat");
        let layout = TextLayout::build(&doc, 7, None, Style::default());
        // " sat" wrapped onto line 1.
        assert_eq!(layout.hit_test(0, 1), Some((3, 0)));
        assert_eq!(layout.hit_test(1, 1), Some((4, 0)));
    }

    #[test]
    fn selected_token_is_reversed() {
        let doc = Document::new("The cat sat");
        let layout = TextLayout::build(&doc, 80, Some(2), Style::default());
        let spans = &layout.lines()[0].spans;
        let cat = spans.iter().find(|s| s.content == "cat").unwrap();
        assert!(cat.style.add_modifier.contains(Modifier::REVERSED));
        let the = spans.iter().find(|s| s.content == "The").unwrap();
        assert!(!the.style.add_modifier.contains(Modifier::REVERSED));
    }

    #[test]
    fn token_styles_flow_into_spans() {
        let mut doc = Document::new("The cat sat");
        doc.toggle_bold(0);
        doc.toggle_underline(4);
        let layout = TextLayout::build(&doc, 80, None, Style::default());
        let spans = &layout.lines()[0].spans;
        assert!(
            spans
                .iter()
                .find(|s| s.content == "The")
                .unwrap()
                .style
                .add_modifier
                .contains(Modifier::BOLD)
        );
        assert!(
            spans
                .iter()
                .find(|s| s.content == "sat")
                .unwrap()
                .style
                .add_modifier
                .contains(Modifier::UNDERLINED)
        );
    }

    #[test]
    fn whole_node_click_selects_the_word_through_the_tracker() {
        let doc = Document::new("The cat sat");
        let layout = TextLayout::build(&doc, 80, None, Style::default());
        let (node, _) = layout.hit_test(5, 0).unwrap();
        let range = SelectionRange::whole_node(node, doc.token(node).unwrap().text.chars().count());
        let host = LayoutHost::new(&doc, Some(range), false);
        let mut tracker = SelectionTracker::new();
        tracker.on_selection_change(&host);
        assert_eq!(tracker.selected(), Some(2));
    }

    #[test]
    fn picker_open_preserves_existing_selection() {
        let doc = Document::new("The cat sat");
        let mut tracker = SelectionTracker::new();
        let range = SelectionRange::whole_node(2, 3);
        tracker.on_selection_change(&LayoutHost::new(&doc, Some(range), false));
        assert_eq!(tracker.selected(), Some(2));

        let stray = SelectionRange::whole_node(0, 3);
        tracker.on_selection_change(&LayoutHost::new(&doc, Some(stray), true));
        assert_eq!(tracker.selected(), Some(2));
    }
}
