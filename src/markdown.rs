//! Bot replies are markdown. This turns them into styled ratatui lines.
//!
//! Raw HTML in a reply is never interpreted; it is shown as literal text.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

const STYLE_HEADING: Style = Style::new().fg(Color::Cyan).add_modifier(Modifier::BOLD);
const STYLE_CODE_BLOCK: Style = Style::new().fg(Color::Gray);
const STYLE_INLINE_CODE: Style = Style::new().fg(Color::Cyan);
const STYLE_LINK: Style = Style::new()
    .fg(Color::Blue)
    .add_modifier(Modifier::UNDERLINED);

struct Renderer {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    /// `None` for bullets, `Some(n)` for the next number of an ordered list.
    lists: Vec<Option<u64>>,
    link: Option<String>,
}

impl Renderer {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            spans: Vec::new(),
            styles: vec![Style::default()],
            lists: Vec::new(),
            link: None,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, f: impl FnOnce(Style) -> Style) {
        let next = f(self.style());
        self.styles.push(next);
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn flush(&mut self) {
        if !self.spans.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        }
    }

    /// Blank separator between blocks, never doubled and never leading.
    fn gap(&mut self) {
        self.flush();
        if self.lines.last().is_some_and(|l| l.width() > 0) {
            self.lines.push(Line::default());
        }
    }

    fn text(&mut self, text: &str, style: Style) {
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                self.lines.push(Line::from(std::mem::take(&mut self.spans)));
            }
            if !part.is_empty() {
                self.spans.push(Span::styled(part.to_string(), style));
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.gap();
                }
            }
            Tag::Heading { .. } => {
                self.gap();
                self.push_style(|_| STYLE_HEADING);
            }
            Tag::CodeBlock(kind) => {
                self.gap();
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.lines.push(Line::styled(
                            format!("[{lang}]"),
                            STYLE_CODE_BLOCK.add_modifier(Modifier::ITALIC),
                        ));
                    }
                }
                self.push_style(|_| STYLE_CODE_BLOCK);
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.gap();
                } else {
                    self.flush();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.spans
                    .push(Span::raw(format!("{}{marker}", "  ".repeat(depth))));
            }
            Tag::Emphasis => self.push_style(|s| s.add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(|s| s.add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => self.push_style(|s| s.add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { dest_url, .. } => {
                self.link = Some(dest_url.to_string());
                self.push_style(|s| s.patch(STYLE_LINK));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Item => self.flush(),
            TagEnd::Heading(_) => {
                self.flush();
                self.pop_style();
            }
            TagEnd::CodeBlock => {
                self.flush();
                self.pop_style();
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.link.take() {
                    self.spans
                        .push(Span::styled(format!(" ({url})"), Style::new().fg(Color::DarkGray)));
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|l| l.width() == 0) {
            self.lines.pop();
        }
        self.lines
    }
}

pub fn render_markdown(text: &str) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut renderer = Renderer::new();
    for event in Parser::new_ext(text, options) {
        match event {
            Event::Start(tag) => renderer.start(tag),
            Event::End(tag) => renderer.end(tag),
            Event::Text(text) => {
                let style = renderer.style();
                renderer.text(&text, style);
            }
            Event::Code(code) => renderer.spans.push(Span::styled(code.to_string(), STYLE_INLINE_CODE)),
            Event::Html(html) | Event::InlineHtml(html) => {
                let style = renderer.style();
                renderer.text(&html, style);
            }
            Event::SoftBreak => renderer.spans.push(Span::raw(" ")),
            Event::HardBreak => renderer.flush(),
            Event::Rule => {
                renderer.gap();
                renderer
                    .lines
                    .push(Line::styled("─".repeat(24), Style::new().fg(Color::DarkGray)));
            }
            _ => {}
        }
    }
    renderer.finish()
}

/// Plain text of a line, for tests and width calculations.
pub fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(md: &str) -> Vec<String> {
        render_markdown(md).iter().map(line_text).collect()
    }

    #[test]
    fn paragraphs_are_separated_by_blank_line() {
        assert_eq!(texts("First\n\nSecond"), vec!["First", "", "Second"]);
    }

    #[test]
    fn bold_and_code_are_styled() {
        let lines = render_markdown("**Strong** summary with `cargo`");
        let spans = &lines[0].spans;
        assert_eq!(spans[0].content, "Strong");
        assert!(spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(spans[2].content, "cargo");
        assert_eq!(spans[2].style, STYLE_INLINE_CODE);
    }

    #[test]
    fn lists_get_markers() {
        assert_eq!(
            texts("- one\n- two\n\n1. a\n2. b"),
            vec!["• one", "• two", "", "1. a", "2. b"]
        );
    }

    #[test]
    fn code_block_keeps_lines() {
        assert_eq!(
            texts("```rust\nfn main() {\n    run();\n}\n```"),
            vec!["[rust]", "fn main() {", "    run();", "}"]
        );
    }

    #[test]
    fn html_is_shown_literally() {
        let text = texts("<script>alert(1)</script>").join("\n");
        assert!(text.contains("<script>"));
        let inline = texts("hi <b>there</b>").join("");
        assert_eq!(inline, "hi <b>there</b>");
    }

    #[test]
    fn links_show_destination() {
        assert_eq!(
            texts("[docs](https://example.com)"),
            vec!["docs (https://example.com)"]
        );
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert!(render_markdown("").is_empty());
    }
}
