//! Markdown rendering for assistant replies.
//!
//! `render` turns CommonMark (plus tables, strikethrough, task lists and
//! bare-URL autolinks) into a small block/inline tree. Fenced code is syntax highlighted up front so
//! the view layer only has to lay widgets out. The markup helpers at the
//! bottom produce escaped Pango markup for GTK labels.

use linkify::{LinkFinder, LinkKind};
use once_cell::sync::Lazy;
use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use std::mem;
use std::time::Duration;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// How long a code block's copy button shows its confirmation.
pub const COPY_FEEDBACK: Duration = Duration::from_secs(2);

const THEME: &str = "base16-ocean.dark";

static SYNTAXES: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEMES: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);
static URLS: Lazy<LinkFinder> = Lazy::new(|| {
    let mut finder = LinkFinder::new();
    finder.kinds(&[LinkKind::Url]);
    finder
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link { url: String, content: Vec<Inline> },
    TaskMarker(bool),
    SoftBreak,
    LineBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnAlign {
    Default,
    Left,
    Center,
    Right,
}

impl From<Alignment> for ColumnAlign {
    fn from(a: Alignment) -> Self {
        match a {
            Alignment::None => ColumnAlign::Default,
            Alignment::Left => ColumnAlign::Left,
            Alignment::Center => ColumnAlign::Center,
            Alignment::Right => ColumnAlign::Right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub text: String,
    /// `#rrggbb`, absent for unhighlighted code.
    pub color: Option<String>,
    pub bold: bool,
    pub italic: bool,
}

impl StyledSpan {
    fn plain(text: &str) -> Self {
        Self { text: text.to_string(), color: None, bold: false, italic: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Position among the message's code blocks, used to key the copy button.
    pub index: usize,
    pub language: Option<String>,
    pub code: String,
    pub lines: Vec<Vec<StyledSpan>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub alignments: Vec<ColumnAlign>,
    pub header: Vec<Vec<Inline>>,
    pub rows: Vec<Vec<Vec<Inline>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Heading { level: u8, content: Vec<Inline> },
    Code(CodeBlock),
    Quote(Vec<Block>),
    List { start: Option<u64>, items: Vec<Vec<Block>> },
    Table(Table),
    Rule,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedMessage {
    pub blocks: Vec<Block>,
}

impl RenderedMessage {
    /// Every code block in document order, including nested ones.
    pub fn code_blocks(&self) -> Vec<&CodeBlock> {
        fn walk<'a>(blocks: &'a [Block], out: &mut Vec<&'a CodeBlock>) {
            for block in blocks {
                match block {
                    Block::Code(code) => out.push(code),
                    Block::Quote(inner) => walk(inner, out),
                    Block::List { items, .. } => items.iter().for_each(|item| walk(item, out)),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.blocks, &mut out);
        out
    }
}

pub fn render(text: &str) -> RenderedMessage {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut builder = Builder::new();
    for event in Parser::new_ext(text, options) {
        builder.event(event);
    }
    builder.finish()
}

#[derive(Debug, PartialEq, Eq)]
enum ContainerKind {
    Root,
    Quote,
    List(Option<u64>),
    Item,
}

struct Container {
    kind: ContainerKind,
    blocks: Vec<Block>,
    items: Vec<Vec<Block>>,
}

impl Container {
    fn new(kind: ContainerKind) -> Self {
        Self { kind, blocks: Vec::new(), items: Vec::new() }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum InlineKind {
    Paragraph,
    /// Text that appears without a paragraph, as in tight list items.
    Implicit,
    Heading(u8),
    Cell,
    Emphasis,
    Strong,
    Strikethrough,
    Link(String),
}

struct InlineFrame {
    kind: InlineKind,
    children: Vec<Inline>,
}

#[derive(Default)]
struct TableState {
    alignments: Vec<ColumnAlign>,
    header: Vec<Vec<Inline>>,
    rows: Vec<Vec<Vec<Inline>>>,
    row: Vec<Vec<Inline>>,
}

struct Builder {
    containers: Vec<Container>,
    inlines: Vec<InlineFrame>,
    table: Option<TableState>,
    code: Option<(Option<String>, String)>,
    code_blocks: usize,
}

impl Builder {
    fn new() -> Self {
        Self {
            containers: vec![Container::new(ContainerKind::Root)],
            inlines: Vec::new(),
            table: None,
            code: None,
            code_blocks: 0,
        }
    }

    fn push_block(&mut self, block: Block) {
        if let Some(top) = self.containers.last_mut() {
            top.blocks.push(block);
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        if self.inlines.is_empty() {
            self.open_inline(InlineKind::Implicit);
        }
        let Some(top) = self.inlines.last_mut() else {
            return;
        };
        // The parser may split a run of text into several events.
        match (top.children.last_mut(), inline) {
            (Some(Inline::Text(prev)), Inline::Text(next)) => prev.push_str(&next),
            (_, inline) => top.children.push(inline),
        }
    }

    /// Pops the innermost frame, turning bare URLs in its text into links
    /// unless it sits inside an explicit link.
    fn pop_inline(&mut self) -> Option<InlineFrame> {
        let mut frame = self.inlines.pop()?;
        let in_link = matches!(frame.kind, InlineKind::Link(_))
            || self.inlines.iter().any(|f| matches!(f.kind, InlineKind::Link(_)));
        if !in_link {
            frame.children = autolink(mem::take(&mut frame.children));
        }
        Some(frame)
    }

    fn open_inline(&mut self, kind: InlineKind) {
        self.inlines.push(InlineFrame { kind, children: Vec::new() });
    }

    fn open_span(&mut self, kind: InlineKind) {
        if self.inlines.is_empty() {
            self.open_inline(InlineKind::Implicit);
        }
        self.open_inline(kind);
    }

    fn close_implicit(&mut self) {
        if self.inlines.last().is_some_and(|f| f.kind == InlineKind::Implicit) {
            if let Some(frame) = self.pop_inline() {
                self.push_block(Block::Paragraph(frame.children));
            }
        }
    }

    fn close_container(&mut self) -> Option<Container> {
        self.close_implicit();
        if self.containers.len() > 1 { self.containers.pop() } else { None }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => match self.code.as_mut() {
                Some((_, buf)) => buf.push_str(&text),
                None => self.push_inline(Inline::Text(text.into_string())),
            },
            Event::Code(code) => self.push_inline(Inline::Code(code.into_string())),
            Event::Html(html) | Event::InlineHtml(html) => self.push_inline(Inline::Text(html.into_string())),
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::LineBreak),
            Event::TaskListMarker(done) => self.push_inline(Inline::TaskMarker(done)),
            Event::Rule => {
                self.close_implicit();
                self.push_block(Block::Rule);
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.close_implicit();
                self.open_inline(InlineKind::Paragraph);
            }
            Tag::Heading { level, .. } => {
                self.close_implicit();
                self.open_inline(InlineKind::Heading(heading_level(level)));
            }
            Tag::BlockQuote(_) => {
                self.close_implicit();
                self.containers.push(Container::new(ContainerKind::Quote));
            }
            Tag::CodeBlock(kind) => {
                self.close_implicit();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            Tag::List(start) => {
                self.close_implicit();
                self.containers.push(Container::new(ContainerKind::List(start)));
            }
            Tag::Item => self.containers.push(Container::new(ContainerKind::Item)),
            Tag::Table(alignments) => {
                self.close_implicit();
                self.table = Some(TableState {
                    alignments: alignments.into_iter().map(ColumnAlign::from).collect(),
                    ..TableState::default()
                });
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.row.clear();
                }
            }
            Tag::TableCell => self.open_inline(InlineKind::Cell),
            Tag::Emphasis => self.open_span(InlineKind::Emphasis),
            Tag::Strong => self.open_span(InlineKind::Strong),
            Tag::Strikethrough => self.open_span(InlineKind::Strikethrough),
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.open_span(InlineKind::Link(dest_url.into_string()))
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) => {
                if let Some(frame) = self.pop_inline() {
                    let block = match frame.kind {
                        InlineKind::Heading(level) => Block::Heading { level, content: frame.children },
                        _ => Block::Paragraph(frame.children),
                    };
                    self.push_block(block);
                }
            }
            TagEnd::BlockQuote(_) => {
                if let Some(quote) = self.close_container() {
                    self.push_block(Block::Quote(quote.blocks));
                }
            }
            TagEnd::CodeBlock => self.finish_code(),
            TagEnd::Item => {
                if let Some(item) = self.close_container() {
                    if let Some(list) = self.containers.last_mut() {
                        list.items.push(item.blocks);
                    }
                }
            }
            TagEnd::List(_) => {
                if let Some(list) = self.close_container() {
                    let start = match list.kind {
                        ContainerKind::List(start) => start,
                        _ => None,
                    };
                    self.push_block(Block::List { start, items: list.items });
                }
            }
            TagEnd::TableCell => {
                if let Some(frame) = self.pop_inline() {
                    if let Some(table) = self.table.as_mut() {
                        table.row.push(frame.children);
                    }
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.header = mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.push_block(Block::Table(Table {
                        alignments: table.alignments,
                        header: table.header,
                        rows: table.rows,
                    }));
                }
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link | TagEnd::Image => {
                if let Some(frame) = self.pop_inline() {
                    let inline = match frame.kind {
                        InlineKind::Emphasis => Inline::Emphasis(frame.children),
                        InlineKind::Strong => Inline::Strong(frame.children),
                        InlineKind::Strikethrough => Inline::Strikethrough(frame.children),
                        InlineKind::Link(url) => Inline::Link { url, content: frame.children },
                        _ => Inline::Emphasis(frame.children),
                    };
                    self.push_inline(inline);
                }
            }
            _ => {}
        }
    }

    fn finish_code(&mut self) {
        let Some((language, mut code)) = self.code.take() else {
            return;
        };
        if code.ends_with('\n') {
            code.pop();
        }
        let lines = highlight(&code, language.as_deref());
        let index = self.code_blocks;
        self.code_blocks += 1;
        self.push_block(Block::Code(CodeBlock { index, language, code, lines }));
    }

    fn finish(mut self) -> RenderedMessage {
        self.close_implicit();
        while self.containers.len() > 1 {
            if let Some(open) = self.containers.pop() {
                self.push_block(Block::Quote(open.blocks));
            }
        }
        let blocks = self.containers.pop().map(|root| root.blocks).unwrap_or_default();
        RenderedMessage { blocks }
    }
}

fn autolink(children: Vec<Inline>) -> Vec<Inline> {
    let mut out = Vec::with_capacity(children.len());
    for inline in children {
        let Inline::Text(text) = inline else {
            out.push(inline);
            continue;
        };
        for span in URLS.spans(&text) {
            let piece = span.as_str().to_string();
            match span.kind() {
                Some(LinkKind::Url) => out.push(Inline::Link {
                    url: piece.clone(),
                    content: vec![Inline::Text(piece)],
                }),
                _ => out.push(Inline::Text(piece)),
            }
        }
    }
    out
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn plain_lines(code: &str) -> Vec<Vec<StyledSpan>> {
    code.lines().map(|line| vec![StyledSpan::plain(line)]).collect()
}

/// Splits `code` into lines of colored spans. Unknown languages come back
/// as plain, uncolored lines.
pub fn highlight(code: &str, language: Option<&str>) -> Vec<Vec<StyledSpan>> {
    let syntax = language.and_then(|lang| SYNTAXES.find_syntax_by_token(lang));
    let (Some(syntax), Some(theme)) = (syntax, THEMES.themes.get(THEME)) else {
        return plain_lines(code);
    };
    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut lines = Vec::new();
    for line in LinesWithEndings::from(code) {
        let Ok(ranges) = highlighter.highlight_line(line, &SYNTAXES) else {
            return plain_lines(code);
        };
        let spans = ranges
            .into_iter()
            .filter_map(|(style, text)| {
                let text = text.trim_end_matches('\n');
                if text.is_empty() {
                    return None;
                }
                let fg = style.foreground;
                Some(StyledSpan {
                    text: text.to_string(),
                    color: Some(format!("#{:02x}{:02x}{:02x}", fg.r, fg.g, fg.b)),
                    bold: style.font_style.contains(FontStyle::BOLD),
                    italic: style.font_style.contains(FontStyle::ITALIC),
                })
            })
            .collect();
        lines.push(spans);
    }
    lines
}

// Pango markup

pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn inline_markup(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&escape_markup(text)),
            Inline::Code(code) => {
                out.push_str("<tt>");
                out.push_str(&escape_markup(code));
                out.push_str("</tt>");
            }
            Inline::Emphasis(inner) => out.push_str(&format!("<i>{}</i>", inline_markup(inner))),
            Inline::Strong(inner) => out.push_str(&format!("<b>{}</b>", inline_markup(inner))),
            Inline::Strikethrough(inner) => out.push_str(&format!("<s>{}</s>", inline_markup(inner))),
            Inline::Link { url, content } => out.push_str(&format!(
                "<a href=\"{}\">{}</a>",
                escape_markup(url),
                inline_markup(content)
            )),
            Inline::TaskMarker(true) => out.push_str("☑ "),
            Inline::TaskMarker(false) => out.push_str("☐ "),
            Inline::SoftBreak => out.push(' '),
            Inline::LineBreak => out.push('\n'),
        }
    }
    out
}

pub fn heading_markup(level: u8, content: &[Inline]) -> String {
    let size = match level {
        1 => "xx-large",
        2 => "x-large",
        3 => "large",
        _ => "medium",
    };
    format!("<span size=\"{size}\" weight=\"bold\">{}</span>", inline_markup(content))
}

pub fn code_markup(block: &CodeBlock) -> String {
    let lines: Vec<String> = block
        .lines
        .iter()
        .map(|spans| {
            spans
                .iter()
                .map(|span| {
                    let mut text = escape_markup(&span.text);
                    if span.bold {
                        text = format!("<b>{text}</b>");
                    }
                    if span.italic {
                        text = format!("<i>{text}</i>");
                    }
                    match &span.color {
                        Some(color) => format!("<span foreground=\"{color}\">{text}</span>"),
                        None => text,
                    }
                })
                .collect()
        })
        .collect();
    format!("<tt>{}</tt>", lines.join("\n"))
}
