//! Page layout: turns [`Block`]s into positioned drawing operations.
//!
//! Coordinates are PDF user space (origin bottom-left, points). The cursor
//! `y` moves down from the top margin; a block that does not fit in the space
//! left on the page starts a new one.

use super::fonts::{FontBook, FontId};
use super::markdown::{Block, Span, Style};
use super::pdf::Font;
use std::mem::take;

const LINE_HEIGHT: f32 = 1.35;
const HEADING_SCALE: [f32; 6] = [2.0, 1.5, 1.25, 1.1, 1.0, 0.9];
const LIST_INDENT: f32 = 18.0;
const QUOTE_INDENT: f32 = 14.0;
const CODE_PADDING: f32 = 6.0;
const CELL_PADDING: f32 = 6.0;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Geometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl Geometry {
    /// Margins that would leave less than a quarter of the page are shrunk.
    pub(crate) fn new(width: f32, height: f32, margin: f32) -> Self {
        let margin = margin.max(0.0).min(width.min(height) * 0.375);
        Self {
            width,
            height,
            margin,
        }
    }

    fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    fn top(&self) -> f32 {
        self.height - self.margin
    }

    fn bottom(&self) -> f32 {
        self.margin
    }
}

/// One drawing operation on a page.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Op {
    /// `(x, y)` is the baseline origin.
    Text {
        x: f32,
        y: f32,
        font: FontId,
        size: f32,
        text: String,
    },
    Fill {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        gray: f32,
    },
    Stroke {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        gray: f32,
        width: f32,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        gray: f32,
        width: f32,
    },
}

/// A run of same-font text placed at `x` within its line.
#[derive(Debug, Clone, PartialEq)]
struct Run {
    x: f32,
    font: FontId,
    text: String,
}

enum Piece {
    Word {
        text: String,
        font: Font,
        space_before: bool,
    },
    Break,
}

pub(crate) struct Layout<'a> {
    geometry: Geometry,
    base: f32,
    fonts: &'a FontBook,
    pages: Vec<Vec<Op>>,
    y: f32,
}

impl<'a> Layout<'a> {
    pub(crate) fn new(geometry: Geometry, base: f32, fonts: &'a FontBook) -> Self {
        Self {
            geometry,
            base,
            fonts,
            pages: vec![Vec::new()],
            y: geometry.top(),
        }
    }

    /// Finished pages. Always at least one, possibly empty.
    pub(crate) fn finish(self) -> Vec<Vec<Op>> {
        self.pages
    }

    pub(crate) fn block(&mut self, block: &Block) {
        match block {
            Block::Heading { level, spans } => self.heading(*level, spans),
            Block::Paragraph { quote_depth, spans } => self.paragraph(*quote_depth, spans),
            Block::ListItem {
                depth,
                marker,
                spans,
            } => self.list_item(*depth, marker, spans),
            Block::Code {
                quote_depth,
                depth,
                lines,
            } => self.code(*quote_depth, *depth, lines),
            Block::Table { header, rows } => self.table(header, rows),
            Block::Rule => self.rule(),
        }
    }

    // ── Cursor ───────────────────────────────────────────────────────────

    fn at_top(&self) -> bool {
        self.y >= self.geometry.top()
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = self.geometry.top();
    }

    /// Start a new page unless `height` fits below the cursor.
    fn ensure(&mut self, height: f32) {
        if self.y - height < self.geometry.bottom() && !self.at_top() {
            self.new_page();
        }
    }

    /// Vertical space, dropped at the top of a page.
    fn gap(&mut self, height: f32) {
        if !self.at_top() {
            self.y -= height;
        }
    }

    fn ops(&mut self) -> &mut Vec<Op> {
        // `pages` is never empty.
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Draw wrapped text starting at `x`, one line per `size * LINE_HEIGHT`.
    fn text_lines(&mut self, lines: Vec<Vec<Run>>, x: f32, size: f32) -> f32 {
        let line_height = size * LINE_HEIGHT;
        let mut first_baseline = None;
        for line in lines {
            self.ensure(line_height);
            let baseline = self.y - size;
            first_baseline.get_or_insert(baseline);
            for run in line {
                self.ops().push(Op::Text {
                    x: x + run.x,
                    y: baseline,
                    font: run.font,
                    size,
                    text: run.text,
                });
            }
            self.y -= line_height;
        }
        first_baseline.unwrap_or(self.y - size)
    }

    /// One vertical bar per quote level between `top` and the cursor.
    fn quote_bars(&mut self, quote_depth: usize, x: f32, top: f32) {
        let bottom = self.y;
        for level in 0..quote_depth {
            let x = x + QUOTE_INDENT * level as f32 + 3.0;
            self.ops().push(Op::Line {
                from: (x, top),
                to: (x, bottom),
                gray: 0.75,
                width: 2.0,
            });
        }
    }

    // ── Blocks ───────────────────────────────────────────────────────────

    fn heading(&mut self, level: u8, spans: &[Span]) {
        let idx = usize::from(level.clamp(1, 6)) - 1;
        let size = self.base * HEADING_SCALE[idx];
        self.gap(size * 0.8);
        // Keep the heading with at least one following line.
        self.ensure(size * LINE_HEIGHT + self.base * LINE_HEIGHT);
        let lines = self.wrap(spans, size, self.geometry.content_width(), true);
        self.text_lines(lines, self.geometry.margin, size);
        self.y -= size * 0.3;
    }

    fn paragraph(&mut self, quote_depth: usize, spans: &[Span]) {
        let indent = QUOTE_INDENT * quote_depth as f32;
        let width = self.geometry.content_width() - indent;
        let lines = self.wrap(spans, self.base, width, false);

        let page = self.pages.len();
        let top = self.y;
        self.text_lines(lines, self.geometry.margin + indent, self.base);

        // The bar is drawn only when the paragraph stayed on one page.
        if quote_depth > 0 && page == self.pages.len() {
            self.quote_bars(quote_depth, self.geometry.margin, top);
        }
        self.y -= self.base * 0.6;
    }

    fn list_item(&mut self, depth: usize, marker: &str, spans: &[Span]) {
        let indent = LIST_INDENT * depth as f32;
        let x = self.geometry.margin + indent;
        let width = self.geometry.content_width() - indent;
        let mut lines = self.wrap(spans, self.base, width, false);
        if lines.is_empty() {
            lines.push(Vec::new());
        }

        let baseline = self.text_lines(lines, x, self.base);
        if !marker.is_empty() {
            let size = self.base;
            let font = FontId::Builtin(Font::Regular);
            let marker_x = x - 5.0 - self.fonts.measure(font, marker, size);
            self.ops().push(Op::Text {
                x: marker_x,
                y: baseline,
                font,
                size,
                text: marker.to_string(),
            });
        }
        self.y -= self.base * 0.25;
    }

    /// Shaded code block. Inside quotes and lists it keeps the enclosing
    /// indent, and quote bars run beside the shading on every page.
    fn code(&mut self, quote_depth: usize, depth: usize, lines: &[String]) {
        let size = self.base * 0.9;
        let line_height = size * LINE_HEIGHT;
        let indent = QUOTE_INDENT * quote_depth as f32 + LIST_INDENT * depth as f32;
        let x = self.geometry.margin + indent;
        let width = self.geometry.content_width() - indent;
        let text_width = (width - 2.0 * CODE_PADDING).max(1.0);

        let wrapped: Vec<String> = lines
            .iter()
            .flat_map(|line| self.split_long_word(line, Font::Mono, size, text_width))
            .collect();

        self.ensure(line_height + 2.0 * CODE_PADDING);
        let mut shade = ShadeStart::at(self);
        self.y -= CODE_PADDING;
        for line in wrapped {
            if self.y - line_height - CODE_PADDING < self.geometry.bottom() && !shade.is_empty(self)
            {
                self.y -= CODE_PADDING;
                let top = shade.top;
                shade.close(self, x, width);
                self.quote_bars(quote_depth, self.geometry.margin, top);
                self.new_page();
                shade = ShadeStart::at(self);
                self.y -= CODE_PADDING;
            }
            let baseline = self.y - size;
            let mut run_x = x + CODE_PADDING;
            for (font, text) in self.fonts.segments(Font::Mono, &line) {
                let run_width = self.fonts.measure(font, &text, size);
                self.ops().push(Op::Text {
                    x: run_x,
                    y: baseline,
                    font,
                    size,
                    text,
                });
                run_x += run_width;
            }
            self.y -= line_height;
        }
        self.y -= CODE_PADDING;
        let top = shade.top;
        shade.close(self, x, width);
        self.quote_bars(quote_depth, self.geometry.margin, top);
        self.y -= self.base * 0.6;
    }

    fn table(&mut self, header: &[String], rows: &[Vec<String>]) {
        let columns = rows.iter().map(Vec::len).chain([header.len()]).max().unwrap_or(0);
        if columns == 0 {
            return;
        }
        let size = self.base * 0.95;
        let col_width = self.geometry.content_width() / columns as f32;
        let text_width = (col_width - 2.0 * CELL_PADDING).max(1.0);

        self.gap(self.base * 0.2);
        let header_row = (!header.is_empty()).then_some((header, true));
        for (cells, is_header) in header_row.into_iter().chain(rows.iter().map(|r| (r.as_slice(), false))) {
            let wrapped: Vec<Vec<Vec<Run>>> = (0..columns)
                .map(|i| {
                    let text = cells.get(i).map(String::as_str).unwrap_or("");
                    let span = Span {
                        text: text.to_string(),
                        style: Style::Regular,
                    };
                    self.wrap(std::slice::from_ref(&span), size, text_width, is_header)
                })
                .collect();
            self.table_row(wrapped, col_width, size, is_header);
        }
        self.y -= self.base * 0.6;
    }

    /// Draw one table row. A row taller than a page continues on the next
    /// one, each part with its own cell borders.
    fn table_row(&mut self, cells: Vec<Vec<Vec<Run>>>, col_width: f32, size: f32, is_header: bool) {
        let line_height = size * LINE_HEIGHT;
        let line_count = cells.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let row_height = line_count as f32 * line_height + 2.0 * CELL_PADDING;
        if row_height <= self.geometry.top() - self.geometry.bottom() {
            self.ensure(row_height);
        }

        let mut cells: Vec<std::vec::IntoIter<Vec<Run>>> = cells.into_iter().map(Vec::into_iter).collect();
        let mut remaining = line_count;
        while remaining > 0 {
            let room = ((self.y - self.geometry.bottom() - 2.0 * CELL_PADDING) / line_height).floor();
            if room < 1.0 && !self.at_top() {
                self.new_page();
                continue;
            }
            let lines = (room.max(1.0) as usize).min(remaining);
            remaining -= lines;

            let height = lines as f32 * line_height + 2.0 * CELL_PADDING;
            let top = self.y;
            let bottom = top - height;
            let left = self.geometry.margin;
            if is_header {
                self.ops().push(Op::Fill {
                    x: left,
                    y: bottom,
                    w: col_width * cells.len() as f32,
                    h: height,
                    gray: 0.92,
                });
            }
            for (i, cell) in cells.iter_mut().enumerate() {
                let cell_x = left + col_width * i as f32;
                self.ops().push(Op::Stroke {
                    x: cell_x,
                    y: bottom,
                    w: col_width,
                    h: height,
                    gray: 0.87,
                    width: 0.5,
                });
                let mut baseline = top - CELL_PADDING - size;
                for line in cell.by_ref().take(lines) {
                    for run in line {
                        self.ops().push(Op::Text {
                            x: cell_x + CELL_PADDING + run.x,
                            y: baseline,
                            font: run.font,
                            size,
                            text: run.text,
                        });
                    }
                    baseline -= line_height;
                }
            }
            self.y = bottom;
            if remaining > 0 {
                self.new_page();
            }
        }
    }

    fn rule(&mut self) {
        self.gap(self.base * 0.4);
        self.ensure(self.base);
        let y = self.y - self.base / 2.0;
        let from = (self.geometry.margin, y);
        let to = (self.geometry.width - self.geometry.margin, y);
        self.ops().push(Op::Line {
            from,
            to,
            gray: 0.6,
            width: 0.75,
        });
        self.y -= self.base;
    }

    // ── Line breaking ────────────────────────────────────────────────────

    /// Greedy word wrap into lines no wider than `max_width`.
    ///
    /// Words longer than a full line are broken between characters.
    fn wrap(&self, spans: &[Span], size: f32, max_width: f32, bold: bool) -> Vec<Vec<Run>> {
        let mut lines = Vec::new();
        let mut line: Vec<Run> = Vec::new();
        let mut width = 0.0_f32;

        for piece in pieces(spans, bold) {
            let (text, font, space_before) = match piece {
                Piece::Break => {
                    lines.push(take(&mut line));
                    width = 0.0;
                    continue;
                }
                Piece::Word {
                    text,
                    font,
                    space_before,
                } => (text, font, space_before),
            };

            for chunk in self.split_long_word(&text, font, size, max_width) {
                let chunk_width = self.fonts.measure_styled(font, &chunk, size);
                let space = match line.last() {
                    Some(run) if space_before => self.fonts.measure(run.font, " ", size),
                    _ => 0.0,
                };

                if !line.is_empty() && width + space + chunk_width > max_width {
                    lines.push(take(&mut line));
                    width = 0.0;
                    self.place(&mut line, &mut width, &chunk, font, size, false);
                } else {
                    let spaced = space > 0.0;
                    width += space;
                    self.place(&mut line, &mut width, &chunk, font, size, spaced);
                }
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
        lines
    }

    /// Append a word at the end of `line`, one run per font, merging into
    /// the previous run when the font matches. `width` must already include
    /// any leading space.
    fn place(&self, line: &mut Vec<Run>, width: &mut f32, word: &str, base: Font, size: f32, spaced: bool) {
        for (i, (font, text)) in self.fonts.segments(base, word).into_iter().enumerate() {
            let text_width = self.fonts.measure(font, &text, size);
            match line.last_mut() {
                Some(run) if run.font == font => {
                    if i == 0 && spaced {
                        run.text.push(' ');
                    }
                    run.text.push_str(&text);
                }
                _ => line.push(Run {
                    x: *width,
                    font,
                    text,
                }),
            }
            *width += text_width;
        }
    }

    /// Break `word` between characters into chunks no wider than
    /// `max_width`. An empty word yields one empty chunk.
    fn split_long_word(&self, word: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
        if self.fonts.measure_styled(font, word, size) <= max_width {
            return vec![word.to_string()];
        }
        let mut chunks = Vec::new();
        let mut current = String::new();
        for ch in word.chars() {
            let mut candidate = current.clone();
            candidate.push(ch);
            if !current.is_empty() && self.fonts.measure_styled(font, &candidate, size) > max_width {
                chunks.push(take(&mut current));
            }
            current.push(ch);
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

/// Where a shaded code region began: the op index its fill goes in front of.
struct ShadeStart {
    op_index: usize,
    top: f32,
}

impl ShadeStart {
    fn at(layout: &mut Layout<'_>) -> Self {
        Self {
            op_index: layout.ops().len(),
            top: layout.y,
        }
    }

    fn is_empty(&self, layout: &mut Layout<'_>) -> bool {
        layout.ops().len() == self.op_index
    }

    /// Insert the background behind the text drawn since `at`.
    fn close(self, layout: &mut Layout<'_>, x: f32, width: f32) {
        let bottom = layout.y;
        let fill = Op::Fill {
            x,
            y: bottom,
            w: width,
            h: self.top - bottom,
            gray: 0.96,
        };
        layout.ops().insert(self.op_index, fill);
    }
}

fn pieces(spans: &[Span], bold: bool) -> Vec<Piece> {
    let mut out = Vec::new();
    let mut pending_space = false;
    for span in spans {
        if span.is_break() {
            out.push(Piece::Break);
            pending_space = false;
            continue;
        }
        let font = Font::for_style(span.style, bold);
        let mut word = String::new();
        let mut word_space = false;
        for ch in span.text.chars() {
            if ch.is_whitespace() {
                if !word.is_empty() {
                    out.push(Piece::Word {
                        text: take(&mut word),
                        font,
                        space_before: word_space,
                    });
                }
                pending_space = true;
            } else {
                if word.is_empty() {
                    word_space = pending_space;
                    pending_space = false;
                }
                word.push(ch);
            }
        }
        if !word.is_empty() {
            out.push(Piece::Word {
                text: word,
                font,
                space_before: word_space,
            });
        }
    }
    out
}
