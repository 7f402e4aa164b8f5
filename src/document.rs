use ratatui::style::Color;
use regex::Regex;

/// One atomic unit of the document: a word or a separator run, with its
/// own style state.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Option<Color>,
}

impl Token {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            bold: false,
            italic: false,
            underline: false,
            color: None,
        }
    }
}

/// Fixed sequence of tokens split from the initial text. Tokens are
/// mutated in place and never inserted, deleted, or reordered, so a
/// token's index identifies it for the whole session.
#[derive(Debug, Clone)]
pub struct Document {
    tokens: Vec<Token>,
}

impl Document {
    /// Split `text` into alternating separator and word tokens. Every
    /// run of word characters (`\w+`) becomes one token; every gap
    /// between runs becomes one unstyled token. Empty input yields an
    /// empty sequence.
    pub fn new(text: &str) -> Self {
        let word = Regex::new(r"\w+").expect("word pattern is valid");
        let mut tokens = Vec::new();
        let mut last = 0;
        for m in word.find_iter(text) {
            if m.start() > last {
                tokens.push(Token::plain(&text[last..m.start()]));
            }
            tokens.push(Token::plain(m.as_str()));
            last = m.end();
        }
        if last < text.len() {
            tokens.push(Token::plain(&text[last..]));
        }
        Self { tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The current logical document text: all tokens' text in order.
    pub fn text(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    /// True if the token at `index` is a word run rather than a
    /// separator run.
    pub fn is_word(&self, index: usize) -> bool {
        self.tokens
            .get(index)
            .is_some_and(|t| t.text.chars().next().is_some_and(word_char))
    }

    // All mutators are no-ops out of range; callers guard on selection
    // presence, so an absent token is the same as no selection.

    pub fn toggle_bold(&mut self, index: usize) {
        if let Some(t) = self.tokens.get_mut(index) {
            t.bold = !t.bold;
        }
    }

    pub fn toggle_italic(&mut self, index: usize) {
        if let Some(t) = self.tokens.get_mut(index) {
            t.italic = !t.italic;
        }
    }

    pub fn toggle_underline(&mut self, index: usize) {
        if let Some(t) = self.tokens.get_mut(index) {
            t.underline = !t.underline;
        }
    }

    pub fn set_color(&mut self, index: usize, color: Color) {
        if let Some(t) = self.tokens.get_mut(index) {
            t.color = Some(color);
        }
    }

    /// Replace the text of the token at `index`, keeping its style
    /// flags and color.
    pub fn replace_text(&mut self, index: usize, text: &str) {
        if let Some(t) = self.tokens.get_mut(index) {
            t.text = text.to_string();
        }
    }
}

fn word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::Document;
    use ratatui::style::Color;

    #[test]
    fn tokenize_splits_words_and_separators() {
        let doc = Document::new("The cat sat");
        let texts: Vec<&str> = doc.tokens().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["The", " ", "cat", " ", "sat"]);
    }

    #[test]
    fn tokenize_is_lossless_and_order_preserving() {
        for input in [
            "The cat sat",
            "  leading and trailing  ",
            "punctuation, too! (really?)",
            "café au lait",
            "one\ntwo\n\nthree",
            "under_scores and d1g1ts",
            "",
        ] {
            let doc = Document::new(input);
            assert_eq!(doc.text(), input, "round trip failed for {input:?}");
        }
    }

    #[test]
    fn empty_input_yields_empty_sequence() {
        let doc = Document::new("");
        assert!(doc.is_empty());
        assert_eq!(doc.text(), "");
    }

    #[test]
    fn new_tokens_carry_no_style() {
        let doc = Document::new("a b");
        for token in doc.tokens() {
            assert!(!token.bold && !token.italic && !token.underline);
            assert!(token.color.is_none());
        }
    }

    #[test]
    fn double_toggle_restores_original_flag() {
        let mut doc = Document::new("The cat sat");
        doc.toggle_bold(2);
        assert!(doc.token(2).unwrap().bold);
        doc.toggle_bold(2);
        assert!(!doc.token(2).unwrap().bold);
    }

    #[test]
    fn mutation_leaves_other_tokens_untouched() {
        let mut doc = Document::new("The cat sat");
        let before: Vec<_> = doc.tokens().to_vec();
        doc.toggle_italic(2);
        doc.set_color(2, Color::Rgb(0xff, 0x69, 0x00));
        doc.replace_text(2, "dog");
        for (i, token) in doc.tokens().iter().enumerate() {
            if i != 2 {
                assert_eq!(token, &before[i]);
            }
        }
    }

    #[test]
    fn out_of_range_mutations_are_no_ops() {
        let mut doc = Document::new("The cat sat");
        let before: Vec<_> = doc.tokens().to_vec();
        doc.toggle_bold(99);
        doc.toggle_italic(99);
        doc.toggle_underline(99);
        doc.set_color(99, Color::Red);
        doc.replace_text(99, "nope");
        assert_eq!(doc.tokens(), &before[..]);
    }

    #[test]
    fn replace_text_preserves_style() {
        let mut doc = Document::new("The cat sat");
        doc.toggle_bold(2);
        doc.toggle_underline(2);
        doc.set_color(2, Color::Rgb(0x06, 0x93, 0xe3));
        doc.replace_text(2, "kitty");
        let token = doc.token(2).unwrap();
        assert_eq!(token.text, "kitty");
        assert!(token.bold && token.underline && !token.italic);
        assert_eq!(token.color, Some(Color::Rgb(0x06, 0x93, 0xe3)));
        assert_eq!(doc.text(), "The kitty sat");
    }

    #[test]
    fn is_word_distinguishes_words_from_separators() {
        let doc = Document::new("The cat sat");
        assert!(doc.is_word(0));
        assert!(!doc.is_word(1));
        assert!(doc.is_word(2));
        assert!(!doc.is_word(99));
    }
}
