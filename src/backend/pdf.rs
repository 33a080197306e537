//! PDF serialisation with pdf-writer.
//!
//! ASCII text is drawn with the standard Type 1 fonts (Helvetica family and
//! Courier), which every PDF reader ships, and is encoded as WinAnsi. Faces
//! from the [`FontBook`] are embedded as Type 0 fonts over a CIDFontType2
//! descendant, with Identity-H glyph ids and a ToUnicode CMap so the text
//! stays searchable and extractable.

use super::fonts::{EmbeddedFace, FontBook, FontId};
use super::layout::{Geometry, Op};
use crate::backend::markdown::Style;
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo};
use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str, TextStr};

/// The five built-in fonts the renderer draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Font {
    Regular,
    Bold,
    Italic,
    BoldItalic,
    Mono,
}

impl Font {
    pub(crate) const ALL: [Font; 5] = [
        Font::Regular,
        Font::Bold,
        Font::Italic,
        Font::BoldItalic,
        Font::Mono,
    ];

    /// Font for an inline style. `bold` forces a bold face (headings, table headers).
    pub(crate) fn for_style(style: Style, bold: bool) -> Font {
        match (style, bold) {
            (Style::Code, _) => Font::Mono,
            (Style::Regular | Style::Bold, true) | (Style::Bold, false) => Font::Bold,
            (Style::Italic | Style::BoldItalic, true) | (Style::BoldItalic, false) => {
                Font::BoldItalic
            }
            (Style::Italic, false) => Font::Italic,
            (Style::Regular, false) => Font::Regular,
        }
    }

    fn base_font(self) -> &'static [u8] {
        match self {
            Font::Regular => b"Helvetica",
            Font::Bold => b"Helvetica-Bold",
            Font::Italic => b"Helvetica-Oblique",
            Font::BoldItalic => b"Helvetica-BoldOblique",
            Font::Mono => b"Courier",
        }
    }

    fn resource_name(self) -> &'static [u8] {
        match self {
            Font::Regular => b"F1",
            Font::Bold => b"F2",
            Font::Italic => b"F3",
            Font::BoldItalic => b"F4",
            Font::Mono => b"F5",
        }
    }

    /// Advance width of `text` at `size`, in points.
    pub(crate) fn measure(self, text: &str, size: f32) -> f32 {
        let units: f32 = text.chars().map(|ch| self.char_width(ch)).sum();
        units * size / 1000.0
    }

    /// Glyph width in 1/1000 em.
    pub(crate) fn char_width(self, ch: char) -> f32 {
        let regular = match ch {
            ' '..='~' => HELVETICA_WIDTHS[ch as usize - 0x20] as f32,
            _ => 556.0,
        };
        match self {
            Font::Mono => 600.0,
            Font::Regular | Font::Italic => regular,
            // The bold cuts run wider; overestimating only wraps a little early.
            Font::Bold | Font::BoldItalic => regular * 1.08,
        }
    }
}

/// Helvetica AFM widths for U+0020..=U+007E.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Encode `text` as WinAnsi, replacing unmappable characters with `?`.
///
/// Returns the encoded bytes and the number of replacements.
pub(crate) fn encode_winansi(text: &str) -> (Vec<u8>, usize) {
    let mut substituted = 0;
    let bytes = text
        .chars()
        .map(|ch| {
            winansi_byte(ch).unwrap_or_else(|| {
                substituted += 1;
                b'?'
            })
        })
        .collect();
    (bytes, substituted)
}

fn winansi_byte(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..0x7F).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    let byte = match ch {
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

pub(crate) struct Written {
    pub bytes: Vec<u8>,
    /// Characters replaced with `?` across the document.
    pub substituted: usize,
}

/// Resource name of the embedded face in `slot`.
fn embedded_resource_name(slot: usize) -> String {
    format!("E{}", slot + 1)
}

/// Serialise laid-out pages into a complete PDF file.
pub(crate) fn write_document(
    pages: &[Vec<Op>],
    geometry: &Geometry,
    title: Option<&str>,
    fonts: &FontBook,
) -> Written {
    let mut alloc = Ref::new(1);
    let catalog_id = alloc.bump();
    let tree_id = alloc.bump();
    let info_id = alloc.bump();
    let font_ids: Vec<(Font, Ref)> = Font::ALL.iter().map(|&f| (f, alloc.bump())).collect();
    let embedded_ids: Vec<Ref> = fonts.faces().iter().map(|_| alloc.bump()).collect();
    let page_ids: Vec<(Ref, Ref)> = pages.iter().map(|_| (alloc.bump(), alloc.bump())).collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(tree_id);
    pdf.pages(tree_id)
        .kids(page_ids.iter().map(|&(page, _)| page))
        .count(page_ids.len() as i32);

    let mut info = pdf.document_info(info_id);
    info.producer(TextStr("uniconvert"));
    if let Some(title) = title {
        info.title(TextStr(title));
    }
    info.finish();

    for &(font, id) in &font_ids {
        pdf.type1_font(id)
            .base_font(Name(font.base_font()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }
    for (face, &id) in fonts.faces().iter().zip(&embedded_ids) {
        write_embedded_font(&mut pdf, &mut alloc, id, face);
    }

    let media_box = Rect::new(0.0, 0.0, geometry.width, geometry.height);
    let mut substituted = 0;
    for (ops, &(page_id, content_id)) in pages.iter().zip(&page_ids) {
        let mut page = pdf.page(page_id);
        page.media_box(media_box).parent(tree_id).contents(content_id);
        {
            let mut resources = page.resources();
            let mut font_dict = resources.fonts();
            for &(font, id) in &font_ids {
                font_dict.pair(Name(font.resource_name()), id);
            }
            for (slot, &id) in embedded_ids.iter().enumerate() {
                font_dict.pair(Name(embedded_resource_name(slot).as_bytes()), id);
            }
        }
        page.finish();

        let (content, count) = page_content(ops, fonts);
        substituted += count;
        pdf.stream(content_id, &content);
    }

    Written {
        bytes: pdf.finish(),
        substituted,
    }
}

/// Write a Type 0 font, its CIDFontType2 descendant, the descriptor, the
/// FontFile2 stream and the ToUnicode CMap.
fn write_embedded_font(pdf: &mut Pdf, alloc: &mut Ref, type0_id: Ref, face: &EmbeddedFace) {
    let cid_id = alloc.bump();
    let descriptor_id = alloc.bump();
    let file_id = alloc.bump();
    let cmap_id = alloc.bump();
    let name = Name(face.name.as_bytes());

    pdf.type0_font(type0_id)
        .base_font(name)
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_id)
        .to_unicode(cmap_id);

    let mut cid = pdf.cid_font(cid_id);
    cid.subtype(CidFontType::Type2)
        .base_font(name)
        .system_info(SystemInfo {
            registry: Str(b"Adobe"),
            ordering: Str(b"Identity"),
            supplement: 0,
        })
        .font_descriptor(descriptor_id)
        .default_width(500.0)
        .cid_to_gid_map_predefined(Name(b"Identity"));
    {
        // One entry per run of consecutive glyph ids.
        let mut widths = cid.widths();
        let mut run: Vec<f32> = Vec::new();
        let mut run_start = 0u16;
        let mut next = None;
        for (id, advance) in face.widths() {
            if next != Some(id) && !run.is_empty() {
                widths.consecutive(run_start, run.drain(..));
            }
            if run.is_empty() {
                run_start = id;
            }
            run.push(advance);
            next = id.checked_add(1);
        }
        if !run.is_empty() {
            widths.consecutive(run_start, run);
        }
    }
    cid.finish();

    let [x_min, y_min, x_max, y_max] = face.bbox;
    pdf.font_descriptor(descriptor_id)
        .name(name)
        .flags(FontFlags::NON_SYMBOLIC)
        .bbox(Rect::new(x_min, y_min, x_max, y_max))
        .italic_angle(face.italic_angle)
        .ascent(face.ascent)
        .descent(face.descent)
        .cap_height(face.cap_height)
        .stem_v(80.0)
        .font_file2(file_id);

    pdf.stream(file_id, &face.data)
        .pair(Name(b"Length1"), face.data.len() as i32);
    pdf.stream(cmap_id, &face.to_unicode_cmap());
}

fn page_content(ops: &[Op], fonts: &FontBook) -> (Vec<u8>, usize) {
    let mut content = Content::new();
    let mut substituted = 0;

    for op in ops {
        match op {
            Op::Text {
                x,
                y,
                font,
                size,
                text,
            } => {
                content.begin_text();
                match *font {
                    FontId::Builtin(font) => {
                        let (bytes, count) = encode_winansi(text);
                        substituted += count;
                        content.set_font(Name(font.resource_name()), *size);
                        content.next_line(*x, *y);
                        content.show(Str(&bytes));
                    }
                    FontId::Embedded(slot) => {
                        let bytes = fonts.faces().get(slot).map(|face| face.encode(text)).unwrap_or_default();
                        let name = embedded_resource_name(slot);
                        content.set_font(Name(name.as_bytes()), *size);
                        content.next_line(*x, *y);
                        content.show(Str(&bytes));
                    }
                }
                content.end_text();
            }
            Op::Fill { x, y, w, h, gray } => {
                content.save_state();
                content.set_fill_gray(*gray);
                content.rect(*x, *y, *w, *h);
                content.fill_nonzero();
                content.restore_state();
            }
            Op::Stroke {
                x,
                y,
                w,
                h,
                gray,
                width,
            } => {
                content.save_state();
                content.set_stroke_gray(*gray);
                content.set_line_width(*width);
                content.rect(*x, *y, *w, *h);
                content.stroke();
                content.restore_state();
            }
            Op::Line {
                from,
                to,
                gray,
                width,
            } => {
                content.save_state();
                content.set_stroke_gray(*gray);
                content.set_line_width(*width);
                content.move_to(from.0, from.1);
                content.line_to(to.0, to.1);
                content.stroke();
                content.restore_state();
            }
        }
    }

    (content.finish(), substituted)
}
