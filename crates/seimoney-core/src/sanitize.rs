//! Sanitizing agent replies before display
//!
//! Agent text is untrusted markup. It is never handed to a renderer as-is:
//! `render` turns it into plain styled fragments for terminal views, and
//! `to_safe_html` rebuilds an attribute-free HTML string for HTML sinks.
//! Only a small set of inline formatting tags survives either path. The
//! contents of script-like elements are dropped entirely.

/// Tags whose formatting is kept
const ALLOWED_TAGS: &[&str] = &[
    "b", "strong", "i", "em", "u", "code", "br", "p", "div", "li", "ul", "ol", "a",
];

/// Tags whose contents are removed along with the tag
const DROPPED_CONTENT_TAGS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "template", "svg", "head",
];

/// Tags that end the current line
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "tr", "table", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote",
    "pre", "section", "article", "header", "footer",
];

const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "meta", "link", "wbr", "source"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub code: bool,
    pub link: bool,
}

/// A run of display text sharing one style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub style: InlineStyle,
}

pub type SafeLine = Vec<Fragment>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Open(String),
    Close(String),
    Void(String),
}

/// Split markup into text and tag tokens. Attributes are discarded here, so
/// nothing downstream can ever see an `href`, `onclick`, or `style`.
fn tokenize(markup: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut rest = markup;

    while let Some(lt) = rest.find('<') {
        text.push_str(&rest[..lt]);
        let after = &rest[lt..];

        if let Some(comment) = after.strip_prefix("<!--") {
            rest = match comment.find("-->") {
                Some(end) => &comment[end + 3..],
                None => "",
            };
            continue;
        }

        let Some(gt) = after.find('>') else {
            // Unterminated '<' is literal text
            text.push_str(after);
            rest = "";
            break;
        };

        let inner = &after[1..gt];
        rest = &after[gt + 1..];

        match parse_tag(inner) {
            Some(token) => {
                if !text.is_empty() {
                    tokens.push(Token::Text(std::mem::take(&mut text)));
                }
                tokens.push(token);
            }
            None => {
                // "a < b > c" and friends are prose, not tags
                text.push_str(&after[..gt + 1]);
            }
        }
    }

    text.push_str(rest);
    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
    tokens
}

fn parse_tag(inner: &str) -> Option<Token> {
    let (closing, body) = match inner.strip_prefix('/') {
        Some(body) => (true, body),
        None => (false, inner),
    };

    // Doctype and processing instructions
    if body.starts_with('!') || body.starts_with('?') {
        return Some(Token::Void(String::new()));
    }

    let name: String = body
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    if name.is_empty() || !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }

    // Name must be followed by whitespace, '/', or the end of the tag
    let after_name = &body[name.len()..];
    if !(after_name.is_empty()
        || after_name.starts_with(|c: char| c.is_whitespace())
        || after_name.starts_with('/'))
    {
        return None;
    }

    if closing {
        Some(Token::Close(name))
    } else if VOID_TAGS.contains(&name.as_str()) || body.trim_end().ends_with('/') {
        Some(Token::Void(name))
    } else {
        Some(Token::Open(name))
    }
}

fn decode(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

fn looks_like_html(tokens: &[Token]) -> bool {
    tokens.iter().any(|t| match t {
        Token::Open(name) | Token::Close(name) | Token::Void(name) => {
            name == "br" || BLOCK_TAGS.contains(&name.as_str())
        }
        Token::Text(_) => false,
    })
}

#[derive(Default)]
struct StyleDepth {
    bold: usize,
    italic: usize,
    underline: usize,
    code: usize,
    link: usize,
}

impl StyleDepth {
    fn counter(&mut self, tag: &str) -> Option<&mut usize> {
        match tag {
            "b" | "strong" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some(&mut self.bold),
            "i" | "em" => Some(&mut self.italic),
            "u" => Some(&mut self.underline),
            "code" | "pre" => Some(&mut self.code),
            "a" => Some(&mut self.link),
            _ => None,
        }
    }

    fn style(&self) -> InlineStyle {
        InlineStyle {
            bold: self.bold > 0,
            italic: self.italic > 0,
            underline: self.underline > 0,
            code: self.code > 0,
            link: self.link > 0,
        }
    }
}

struct LineBuilder {
    lines: Vec<SafeLine>,
    current: SafeLine,
    collapse_whitespace: bool,
}

impl LineBuilder {
    fn push_text(&mut self, text: &str, style: InlineStyle) {
        let text = strip_terminal_controls(text);
        let text = text.as_str();
        if self.collapse_whitespace {
            let mut collapsed = String::with_capacity(text.len());
            let mut last_space = self.ends_with_space();
            for c in text.chars() {
                if c.is_whitespace() {
                    if !last_space {
                        collapsed.push(' ');
                    }
                    last_space = true;
                } else {
                    collapsed.push(c);
                    last_space = false;
                }
            }
            self.append(&collapsed, style);
        } else {
            for (i, segment) in text.split('\n').enumerate() {
                if i > 0 {
                    self.break_line(true);
                }
                self.append(segment.trim_end_matches('\r'), style);
            }
        }
    }

    fn ends_with_space(&self) -> bool {
        match self.current.last() {
            Some(fragment) => fragment.text.ends_with(' '),
            None => true,
        }
    }

    fn append(&mut self, text: &str, style: InlineStyle) {
        if text.is_empty() {
            return;
        }
        match self.current.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.current.push(Fragment {
                text: text.to_string(),
                style,
            }),
        }
    }

    /// `force` keeps empty lines (explicit `<br>` or newline); block edges don't.
    fn break_line(&mut self, force: bool) {
        if let Some(last) = self.current.last_mut() {
            let trimmed = last.text.trim_end().len();
            last.text.truncate(trimmed);
        }
        self.current.retain(|f| !f.text.is_empty());

        if !self.current.is_empty() || force {
            self.lines.push(std::mem::take(&mut self.current));
        }
    }

    fn finish(mut self) -> Vec<SafeLine> {
        self.break_line(false);
        while self.lines.last().is_some_and(|line| line.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

/// Remove terminal escape sequences and control characters.
///
/// CSI (`ESC [`) and OSC (`ESC ]`, ended by BEL or `ESC \\`) sequences are
/// dropped whole, including their parameters. Any other control character
/// is removed, except `\n`, and `\t` which becomes a space.
pub fn strip_terminal_controls(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\n' => out.push('\n'),
            '\t' => out.push(' '),
            '\x1b' => match chars.peek() {
                Some('[') => {
                    chars.next();
                    // Parameters run until the final byte
                    while let Some(c) = chars.next() {
                        if ('@'..='~').contains(&c) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\x07' {
                            break;
                        }
                        if c == '\x1b' {
                            if chars.peek() == Some(&'\\') {
                                chars.next();
                            }
                            break;
                        }
                    }
                }
                // Two-character escape
                Some(_) => {
                    chars.next();
                }
                None => {}
            },
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Convert untrusted agent markup into styled display lines.
pub fn render(markup: &str) -> Vec<SafeLine> {
    let tokens = tokenize(markup);
    let mut builder = LineBuilder {
        lines: Vec::new(),
        current: Vec::new(),
        collapse_whitespace: looks_like_html(&tokens),
    };
    let mut depth = StyleDepth::default();
    let mut dropped = 0usize;

    for token in tokens {
        match token {
            Token::Open(name) if DROPPED_CONTENT_TAGS.contains(&name.as_str()) => dropped += 1,
            Token::Close(name) if DROPPED_CONTENT_TAGS.contains(&name.as_str()) => {
                dropped = dropped.saturating_sub(1)
            }
            _ if dropped > 0 => {}
            Token::Text(text) => builder.push_text(&decode(&text), depth.style()),
            Token::Void(name) => {
                if name == "br" || name == "hr" {
                    builder.break_line(true);
                }
            }
            Token::Open(name) => {
                if BLOCK_TAGS.contains(&name.as_str()) {
                    builder.break_line(false);
                }
                if name == "li" {
                    builder.append("• ", InlineStyle::default());
                }
                if let Some(counter) = depth.counter(&name) {
                    *counter += 1;
                }
            }
            Token::Close(name) => {
                if let Some(counter) = depth.counter(&name) {
                    *counter = counter.saturating_sub(1);
                }
                if BLOCK_TAGS.contains(&name.as_str()) {
                    builder.break_line(false);
                }
            }
        }
    }

    builder.finish()
}

/// Sanitized text without styling, one line per display line
pub fn to_plain_text(markup: &str) -> String {
    render(markup)
        .iter()
        .map(|line| line.iter().map(|f| f.text.as_str()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rebuild markup keeping only allowlisted tags, without attributes, and
/// with all text escaped. Links keep their text but lose their target.
pub fn to_safe_html(markup: &str) -> String {
    let mut out = String::new();
    let mut open: Vec<String> = Vec::new();
    let mut dropped = 0usize;

    for token in tokenize(markup) {
        match token {
            Token::Open(name) if DROPPED_CONTENT_TAGS.contains(&name.as_str()) => dropped += 1,
            Token::Close(name) if DROPPED_CONTENT_TAGS.contains(&name.as_str()) => {
                dropped = dropped.saturating_sub(1)
            }
            _ if dropped > 0 => {}
            Token::Text(text) => {
                out.push_str(&html_escape::encode_text(&strip_terminal_controls(&decode(&text))))
            }
            Token::Void(name) => {
                if name == "br" {
                    out.push_str("<br>");
                }
            }
            Token::Open(name) => {
                if ALLOWED_TAGS.contains(&name.as_str()) && name != "a" && name != "br" {
                    out.push_str(&format!("<{}>", name));
                    open.push(name);
                }
            }
            Token::Close(name) => {
                // Close only what we opened; stray closers are dropped
                if let Some(pos) = open.iter().rposition(|n| *n == name) {
                    for tag in open.drain(pos..).rev() {
                        out.push_str(&format!("</{}>", tag));
                    }
                }
            }
        }
    }

    for tag in open.into_iter().rev() {
        out.push_str(&format!("</{}>", tag));
    }
    out
}
