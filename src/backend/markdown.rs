//! Markdown → PDF renderer.
//!
//! Three passes, each a plain function over owned data:
//!
//! ```text
//! markdown ──▶ parse_blocks ──▶ Layout ──▶ pdf::write_document
//! (text)       (pulldown-cmark,  (word wrap,  (pdf-writer, built-in
//!               tables + fences)  paging)      + embedded fonts)
//! ```
//!
//! The style sheet is fixed: Helvetica body text with page margins, shaded
//! monospace code blocks, and bordered tables with a shaded header row.
//! Characters beyond ASCII are drawn with a TrueType face found on the
//! system (or the configured font file), embedded in the PDF. Raw HTML is
//! shown as literal text.
//!
//! Output is deterministic (no timestamps), so rendering the same Markdown
//! twice on the same machine produces identical bytes.

use super::fonts::FontBook;
use super::layout::{Geometry, Layout};
use super::{pdf, write_output, BackendError, MarkdownToPdfRenderer};
use crate::config::{ConversionConfig, PageSize};
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use std::collections::BTreeSet;
use std::mem::take;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default [`MarkdownToPdfRenderer`].
#[derive(Debug, Clone)]
pub struct MarkdownPdf {
    page_size: PageSize,
    margin_pt: f32,
    font_size: f32,
    title: Option<String>,
    font_file: Option<PathBuf>,
}

impl MarkdownPdf {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            page_size: config.page_size,
            margin_pt: config.margin_pt,
            font_size: config.font_size,
            title: config.title.clone(),
            font_file: config.font_file.clone(),
        }
    }

    /// Render `markdown` to PDF bytes.
    ///
    /// `fallback_title` is used for the document title when neither the
    /// config nor a heading supplies one.
    pub fn render_bytes(&self, markdown: &str, fallback_title: Option<&str>) -> Vec<u8> {
        let blocks = parse_blocks(markdown);
        debug!("Parsed {} Markdown blocks", blocks.len());

        let (width, height) = self.page_size.dimensions();
        let geometry = Geometry::new(width, height, self.margin_pt);
        let fonts = FontBook::for_chars(&document_chars(&blocks), self.font_file.as_deref());
        if !fonts.missing().is_empty() {
            debug!("No font covers {:?}", fonts.missing());
        }
        let mut layout = Layout::new(geometry, self.font_size, &fonts);
        for block in &blocks {
            layout.block(block);
        }
        let pages = layout.finish();

        let title = self
            .title
            .clone()
            .or_else(|| first_heading(&blocks))
            .or_else(|| fallback_title.map(str::to_string));

        let written = pdf::write_document(&pages, &geometry, title.as_deref(), &fonts);
        if written.substituted > 0 {
            warn!(
                "{} character(s) have no glyph in any available font and were replaced with '?'",
                written.substituted
            );
        }
        debug!(
            "Laid out {} page(s) with {} embedded font(s), {} bytes",
            pages.len(),
            fonts.faces().len(),
            written.bytes.len()
        );
        written.bytes
    }
}

impl Default for MarkdownPdf {
    fn default() -> Self {
        Self::new(&ConversionConfig::default())
    }
}

impl MarkdownToPdfRenderer for MarkdownPdf {
    fn render(&self, markdown: &str, output: &Path) -> Result<(), BackendError> {
        let stem = output.file_stem().and_then(|s| s.to_str());
        let bytes = self.render_bytes(markdown, stem);
        write_output(output, &bytes)
    }
}

// ── Block model ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Style {
    Regular,
    Bold,
    Italic,
    BoldItalic,
    Code,
}

/// A run of inline text in one style. A lone `"\n"` is a hard line break.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Span {
    pub text: String,
    pub style: Style,
}

impl Span {
    pub(crate) fn is_break(&self) -> bool {
        self.text == "\n"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Block {
    Heading {
        level: u8,
        spans: Vec<Span>,
    },
    Paragraph {
        quote_depth: usize,
        spans: Vec<Span>,
    },
    /// `marker` is empty for continuation paragraphs of an item.
    ListItem {
        depth: usize,
        marker: String,
        spans: Vec<Span>,
    },
    /// `quote_depth` and `depth` are the enclosing blockquote and list levels.
    Code {
        quote_depth: usize,
        depth: usize,
        lines: Vec<String>,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Rule,
}

/// Parse Markdown (CommonMark + GFM tables, fenced code) into blocks.
pub(crate) fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut builder = BlockBuilder::default();
    for event in Parser::new_ext(markdown, Options::ENABLE_TABLES) {
        builder.push(event);
    }
    builder.finish()
}

/// Every character the blocks draw.
fn document_chars(blocks: &[Block]) -> BTreeSet<char> {
    let mut chars = BTreeSet::new();
    let mut add = |text: &str| chars.extend(text.chars());
    for block in blocks {
        match block {
            Block::Heading { spans, .. }
            | Block::Paragraph { spans, .. }
            | Block::ListItem { spans, .. } => spans.iter().for_each(|s| add(&s.text)),
            Block::Code { lines, .. } => lines.iter().for_each(|l| add(l)),
            Block::Table { header, rows } => {
                header.iter().chain(rows.iter().flatten()).for_each(|c| add(c))
            }
            Block::Rule => {}
        }
    }
    chars
}

fn first_heading(blocks: &[Block]) -> Option<String> {
    blocks.iter().find_map(|b| match b {
        Block::Heading { spans, .. } => {
            let text: String = spans.iter().map(|s| s.text.as_str()).collect();
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => None,
    })
}

#[derive(Default)]
struct TableState {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    spans: Vec<Span>,
    strong: usize,
    emphasis: usize,
    quote_depth: usize,
    /// One entry per open list: the next ordinal, or None for bullets.
    lists: Vec<Option<u64>>,
    item_marker: Option<String>,
    code: Option<String>,
    table: Option<TableState>,
}

impl BlockBuilder {
    fn push(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text, None),
            Event::Code(code) => self.text(&code, Some(Style::Code)),
            Event::SoftBreak => self.text(" ", None),
            Event::HardBreak => self.text("\n", None),
            Event::Rule => {
                self.flush();
                self.blocks.push(Block::Rule);
            }
            Event::TaskListMarker(done) => self.text(if done { "[x] " } else { "[ ] " }, None),
            Event::Html(html) => self.html_block(&html),
            Event::InlineHtml(html) => self.text(&html, None),
            // Footnotes and math have no rendering here.
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { .. } | Tag::HtmlBlock => self.flush(),
            Tag::BlockQuote(_) => {
                self.flush();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(_) => {
                self.flush();
                self.code = Some(String::new());
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}.");
                        *n += 1;
                        marker
                    }
                    _ => "\u{2022}".to_string(),
                };
                self.item_marker = Some(marker);
            }
            Tag::Table(_) => {
                self.flush();
                self.table = Some(TableState::default());
            }
            Tag::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.cell.clear();
                }
            }
            Tag::Emphasis | Tag::Image { .. } => self.emphasis += 1,
            Tag::Strong => self.strong += 1,
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Item | TagEnd::HtmlBlock => self.flush(),
            TagEnd::Heading(level) => {
                let spans = take(&mut self.spans);
                if !is_blank(&spans) {
                    self.blocks.push(Block::Heading {
                        level: level as u8,
                        spans,
                    });
                }
            }
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::CodeBlock => {
                if let Some(code) = self.code.take() {
                    let lines = code
                        .trim_end_matches('\n')
                        .lines()
                        .map(|l| l.replace('\t', "    "))
                        .collect();
                    self.blocks.push(Block::Code {
                        quote_depth: self.quote_depth,
                        depth: self.lists.len(),
                        lines,
                    });
                }
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = take(&mut table.cell);
                    table.row.push(cell.trim().to_string());
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.header = take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.blocks.push(Block::Table {
                        header: table.header,
                        rows: table.rows,
                    });
                }
            }
            TagEnd::Emphasis | TagEnd::Image => self.emphasis = self.emphasis.saturating_sub(1),
            TagEnd::Strong => self.strong = self.strong.saturating_sub(1),
            _ => {}
        }
    }

    fn text(&mut self, text: &str, style: Option<Style>) {
        if let Some(code) = self.code.as_mut() {
            code.push_str(text);
            return;
        }
        if let Some(table) = self.table.as_mut() {
            let text = if text == "\n" { " " } else { text };
            table.cell.push_str(text);
            return;
        }

        let style = style.unwrap_or_else(|| self.current_style());
        match self.spans.last_mut() {
            Some(last) if last.style == style && !last.is_break() && text != "\n" => {
                last.text.push_str(text)
            }
            _ => self.spans.push(Span {
                text: text.to_string(),
                style,
            }),
        }
    }

    /// Block-level HTML, one line per source line, in the code face.
    fn html_block(&mut self, html: &str) {
        for line in html.split_inclusive('\n') {
            let text = line.trim_end_matches(['\r', '\n']);
            if !text.is_empty() {
                self.text(text, Some(Style::Code));
            }
            if line.ends_with('\n') {
                self.text("\n", None);
            }
        }
    }

    fn current_style(&self) -> Style {
        match (self.strong > 0, self.emphasis > 0) {
            (true, true) => Style::BoldItalic,
            (true, false) => Style::Bold,
            (false, true) => Style::Italic,
            (false, false) => Style::Regular,
        }
    }

    /// Emit pending inline text as a paragraph or list item.
    fn flush(&mut self) {
        let spans = take(&mut self.spans);
        let marker = self.item_marker.take();
        if is_blank(&spans) && marker.is_none() {
            return;
        }

        if self.lists.is_empty() {
            self.blocks.push(Block::Paragraph {
                quote_depth: self.quote_depth,
                spans,
            });
        } else {
            self.blocks.push(Block::ListItem {
                depth: self.lists.len(),
                marker: marker.unwrap_or_default(),
                spans,
            });
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

fn is_blank(spans: &[Span]) -> bool {
    spans.iter().all(|s| s.text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(spans: &[Span]) -> String {
        spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn headings_and_paragraphs() {
        let blocks = parse_blocks("# Title\n\nSome *emphasis* and **bold**.\n\n## Next");
        assert_eq!(blocks.len(), 3);
        match &blocks[0] {
            Block::Heading { level, spans } => {
                assert_eq!(*level, 1);
                assert_eq!(plain(spans), "Title");
            }
            other => panic!("unexpected {other:?}"),
        }
        match &blocks[1] {
            Block::Paragraph { spans, quote_depth } => {
                assert_eq!(*quote_depth, 0);
                assert_eq!(plain(spans), "Some emphasis and bold.");
                assert!(spans.iter().any(|s| s.style == Style::Italic && s.text == "emphasis"));
                assert!(spans.iter().any(|s| s.style == Style::Bold && s.text == "bold"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(blocks[2], Block::Heading { level: 2, .. }));
    }

    #[test]
    fn fenced_code_keeps_lines() {
        let blocks = parse_blocks("```rust\nfn main() {\n\tprintln!(\"hi\");\n}\n```\n");
        assert_eq!(
            blocks,
            vec![Block::Code {
                quote_depth: 0,
                depth: 0,
                lines: vec![
                    "fn main() {".to_string(),
                    "    println!(\"hi\");".to_string(),
                    "}".to_string(),
                ]
            }]
        );
    }

    #[test]
    fn gfm_table() {
        let blocks = parse_blocks("| Name | Qty |\n|------|-----|\n| Apple | 3 |\n| Pear | `7` |\n");
        assert_eq!(
            blocks,
            vec![Block::Table {
                header: vec!["Name".into(), "Qty".into()],
                rows: vec![
                    vec!["Apple".into(), "3".into()],
                    vec!["Pear".into(), "7".into()],
                ],
            }]
        );
    }

    #[test]
    fn ordered_and_nested_lists() {
        let blocks = parse_blocks("3. three\n4. four\n   - inner\n");
        let items: Vec<(usize, String, String)> = blocks
            .iter()
            .map(|b| match b {
                Block::ListItem { depth, marker, spans } => (*depth, marker.clone(), plain(spans)),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            items,
            vec![
                (1, "3.".to_string(), "three".to_string()),
                (1, "4.".to_string(), "four".to_string()),
                (2, "\u{2022}".to_string(), "inner".to_string()),
            ]
        );
    }

    #[test]
    fn inline_code_style() {
        let blocks = parse_blocks("Run `cargo` now");
        match &blocks[0] {
            Block::Paragraph { spans, .. } => {
                assert!(spans.iter().any(|s| s.style == Style::Code && s.text == "cargo"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn blockquote_depth_and_rule() {
        let blocks = parse_blocks("> quoted\n\n---\n\nafter");
        assert!(matches!(blocks[0], Block::Paragraph { quote_depth: 1, .. }));
        assert_eq!(blocks[1], Block::Rule);
        assert!(matches!(blocks[2], Block::Paragraph { quote_depth: 0, .. }));
    }

    #[test]
    fn hard_break_is_its_own_span() {
        let blocks = parse_blocks("line one  \nline two");
        match &blocks[0] {
            Block::Paragraph { spans, .. } => {
                assert_eq!(spans.iter().filter(|s| s.is_break()).count(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn title_from_first_heading() {
        let blocks = parse_blocks("intro\n\n## Quarterly Report\n\n# Later");
        assert_eq!(first_heading(&blocks).as_deref(), Some("Quarterly Report"));
    }

    #[test]
    fn render_is_deterministic() {
        let md = "# Report\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n```\ncode\n```\n";
        let renderer = MarkdownPdf::default();
        let first = renderer.render_bytes(md, None);
        let second = renderer.render_bytes(md, None);
        assert_eq!(first, second);
        assert!(first.starts_with(b"%PDF-"));
    }

    #[test]
    fn empty_markdown_still_yields_a_page() {
        let bytes = MarkdownPdf::default().render_bytes("", Some("empty"));
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn render_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("doc.pdf");
        MarkdownPdf::default().render("# Hello", &out).unwrap();
        let bytes = std::fs::read(&out).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("(Hello)"));
    }

    #[test]
    fn raw_html_is_kept_as_literal_text() {
        let blocks = parse_blocks("<div class=\"note\">\nhello\n</div>\n\nA <b>bold</b> claim");
        match &blocks[0] {
            Block::Paragraph { spans, .. } => {
                assert_eq!(plain(spans), "<div class=\"note\">\nhello\n</div>\n");
                assert!(spans.iter().any(|s| s.style == Style::Code && s.text == "hello"));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &blocks[1] {
            Block::Paragraph { spans, .. } => assert_eq!(plain(spans), "A <b>bold</b> claim"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn code_block_remembers_quote_and_list_nesting() {
        let quoted = parse_blocks("> ```\n> quoted();\n> ```\n");
        assert!(matches!(quoted[0], Block::Code { quote_depth: 1, depth: 0, .. }));

        let listed = parse_blocks("- item\n\n  ```\n  listed();\n  ```\n");
        assert!(listed
            .iter()
            .any(|b| matches!(b, Block::Code { quote_depth: 0, depth: 1, lines } if lines == &["listed();"])));
    }

    #[test]
    fn non_latin_text_is_embedded_and_extractable() {
        let Some(font) = crate::backend::fonts::tests::unicode_font() else {
            eprintln!("skipping: no Unicode TrueType font installed");
            return;
        };
        let config = ConversionConfig::builder().font_file(font).build().unwrap();
        let bytes = MarkdownPdf::new(&config).render_bytes("# Отчёт 報告\n\nΓειά σου", None);

        let raw = String::from_utf8_lossy(&bytes);
        assert!(raw.contains("/Identity-H"));
        assert!(raw.contains("/FontFile2"));

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let text = doc.extract_text(&[1]).unwrap();
        assert!(text.contains("Отчёт"), "extracted {text:?}");
        assert!(text.contains("Γειά σου"), "extracted {text:?}");
    }

    #[test]
    fn ascii_documents_embed_nothing() {
        let bytes = MarkdownPdf::default().render_bytes("# Plain\n\nascii only", None);
        assert!(!String::from_utf8_lossy(&bytes).contains("/FontFile2"));
    }
}
