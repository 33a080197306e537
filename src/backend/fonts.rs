//! Font selection for PDF text.
//!
//! ASCII is always drawn with the built-in Type 1 fonts. Every other
//! character is looked up in TrueType faces (a font file given in the config
//! first, then the faces installed on the system) and the faces that cover
//! the document are embedded as CID fonts with Identity-H encoding.
//!
//! A character no face covers stays with the built-in font, where WinAnsi
//! still encodes Latin-1 and a few typographic marks; anything beyond that is
//! drawn as `?`.

use super::pdf::Font;
use resvg::usvg::fontdb;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, warn};

/// Families tried first, in order, before any other installed face.
const PREFERRED_FAMILIES: [&str; 9] = [
    "DejaVu Sans",
    "Noto Sans",
    "Liberation Sans",
    "Arial",
    "FreeSans",
    "Arial Unicode MS",
    "Noto Sans CJK SC",
    "Droid Sans Fallback",
    "WenQuanYi Micro Hei",
];

/// The font a run of text is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FontId {
    Builtin(Font),
    /// Index into [`FontBook::faces`].
    Embedded(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Glyph {
    pub id: u16,
    /// Advance width in 1/1000 em.
    pub advance: f32,
}

/// A TrueType face embedded whole in the output.
#[derive(Debug)]
pub(crate) struct EmbeddedFace {
    /// PostScript name, sanitised for use as a PDF name.
    pub name: String,
    pub data: Vec<u8>,
    /// Metrics in 1/1000 em.
    pub ascent: f32,
    pub descent: f32,
    pub cap_height: f32,
    pub bbox: [f32; 4],
    pub italic_angle: f32,
    glyphs: BTreeMap<char, Glyph>,
}

impl EmbeddedFace {
    /// Parse a face and keep the glyphs of `wanted` it covers.
    ///
    /// Returns `None` for collections, CFF-flavoured fonts and faces that
    /// cover none of `wanted`.
    fn load(data: &[u8], index: u32, wanted: &BTreeSet<char>) -> Option<Self> {
        // A collection cannot be embedded as a single FontFile2.
        if index != 0 || data.starts_with(b"ttcf") {
            return None;
        }
        let face = ttf_parser::Face::parse(data, index).ok()?;
        if face.tables().glyf.is_none() {
            return None;
        }

        let scale = 1000.0 / f32::from(face.units_per_em().max(1));
        let glyph = |ch: char| {
            let id = face.glyph_index(ch).filter(|g| g.0 != 0)?;
            let advance = face.glyph_hor_advance(id).unwrap_or(0);
            Some(Glyph {
                id: id.0,
                advance: f32::from(advance) * scale,
            })
        };

        let mut glyphs: BTreeMap<char, Glyph> = wanted
            .iter()
            .filter_map(|&ch| glyph(ch).map(|g| (ch, g)))
            .collect();
        if glyphs.is_empty() {
            return None;
        }
        if let Some(space) = glyph(' ') {
            glyphs.insert(' ', space);
        }

        let name = face
            .names()
            .into_iter()
            .filter(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .find_map(|n| n.to_string())
            .map(|n| sanitize_name(&n))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "EmbeddedFont".to_string());
        let bbox = face.global_bounding_box();

        Some(Self {
            name,
            data: data.to_vec(),
            ascent: f32::from(face.ascender()) * scale,
            descent: f32::from(face.descender()) * scale,
            cap_height: face
                .capital_height()
                .map_or(f32::from(face.ascender()) * scale * 0.7, |h| f32::from(h) * scale),
            bbox: [
                f32::from(bbox.x_min) * scale,
                f32::from(bbox.y_min) * scale,
                f32::from(bbox.x_max) * scale,
                f32::from(bbox.y_max) * scale,
            ],
            italic_angle: face.italic_angle(),
            glyphs,
        })
    }

    fn glyph(&self, ch: char) -> Option<Glyph> {
        self.glyphs.get(&ch).copied()
    }

    /// Covered characters, excluding the space added for run joining.
    fn covered(&self) -> impl Iterator<Item = char> + '_ {
        self.glyphs.keys().copied().filter(|&ch| ch != ' ')
    }

    /// Two-byte glyph ids for Identity-H; unknown characters map to glyph 0.
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        text.chars()
            .flat_map(|ch| self.glyph(ch).map_or(0, |g| g.id).to_be_bytes())
            .collect()
    }

    /// `(glyph id, advance)` pairs sorted by glyph id, one per glyph.
    pub(crate) fn widths(&self) -> Vec<(u16, f32)> {
        let by_id: BTreeMap<u16, f32> = self.glyphs.values().map(|g| (g.id, g.advance)).collect();
        by_id.into_iter().collect()
    }

    /// ToUnicode CMap mapping each glyph id back to its character.
    pub(crate) fn to_unicode_cmap(&self) -> Vec<u8> {
        let mut by_id: BTreeMap<u16, char> = BTreeMap::new();
        for (&ch, g) in &self.glyphs {
            by_id.entry(g.id).or_insert(ch);
        }
        let mappings: Vec<(u16, char)> = by_id.into_iter().collect();

        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n\
             <0000> <FFFF>\n\
             endcodespacerange\n",
        );
        // At most 100 entries per bfchar section.
        for chunk in mappings.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for &(id, ch) in chunk {
                let mut units = [0u16; 2];
                let target: String = ch
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|u| format!("{u:04X}"))
                    .collect();
                cmap.push_str(&format!("<{id:04X}> <{target}>\n"));
            }
            cmap.push_str("endbfchar\n");
        }
        cmap.push_str(
            "endcmap\n\
             CMapName currentdict /CMap defineresource pop\n\
             end\n\
             end\n",
        );
        cmap.into_bytes()
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// The fonts one document is drawn with.
#[derive(Debug, Default)]
pub(crate) struct FontBook {
    faces: Vec<EmbeddedFace>,
    /// Which face draws each covered non-ASCII character.
    coverage: BTreeMap<char, usize>,
    /// Non-ASCII characters no face covers.
    missing: Vec<char>,
}

impl FontBook {
    /// Find faces for every non-ASCII character in `chars`.
    ///
    /// Pure-ASCII input never touches the font database.
    pub(crate) fn for_chars(chars: &BTreeSet<char>, font_file: Option<&Path>) -> Self {
        let mut remaining: BTreeSet<char> = chars
            .iter()
            .copied()
            .filter(|c| !c.is_ascii() && !c.is_whitespace())
            .collect();
        if remaining.is_empty() {
            return Self::default();
        }

        let mut db = fontdb::Database::new();
        let mut explicit = Vec::new();
        if let Some(path) = font_file {
            match db.load_font_file(path) {
                Ok(()) => explicit = db.faces().map(|f| f.id).collect(),
                Err(e) => warn!("Cannot load font file '{}': {e}", path.display()),
            }
            if explicit.is_empty() {
                warn!("No usable face in font file '{}'", path.display());
            }
        }
        db.load_system_fonts();
        let candidates = candidate_order(&db, &explicit);
        debug!(
            "{} font face(s) available for {} non-ASCII character(s)",
            candidates.len(),
            remaining.len()
        );

        let mut book = Self::default();
        for id in candidates {
            if remaining.is_empty() {
                break;
            }
            let Some(Some(face)) = db.with_face_data(id, |data, index| {
                EmbeddedFace::load(data, index, &remaining)
            }) else {
                continue;
            };
            let slot = book.faces.len();
            for ch in face.covered() {
                remaining.remove(&ch);
                book.coverage.insert(ch, slot);
            }
            debug!("Embedding font '{}' ({} bytes)", face.name, face.data.len());
            book.faces.push(face);
        }
        book.missing = remaining.into_iter().collect();
        book
    }

    pub(crate) fn faces(&self) -> &[EmbeddedFace] {
        &self.faces
    }

    pub(crate) fn missing(&self) -> &[char] {
        &self.missing
    }

    /// Font that draws `ch` in a run styled with `base`.
    pub(crate) fn font_for(&self, base: Font, ch: char) -> FontId {
        if ch.is_ascii() {
            return FontId::Builtin(base);
        }
        match self.coverage.get(&ch) {
            Some(&slot) => FontId::Embedded(slot),
            None => FontId::Builtin(base),
        }
    }

    /// Split `text` into runs that each use one font. Whitespace stays in
    /// the run it follows.
    pub(crate) fn segments(&self, base: Font, text: &str) -> Vec<(FontId, String)> {
        let mut out: Vec<(FontId, String)> = Vec::new();
        for ch in text.chars() {
            match out.last_mut() {
                Some((_, run)) if ch.is_whitespace() => run.push(ch),
                Some((id, run)) if *id == self.font_for(base, ch) => run.push(ch),
                _ => out.push((self.font_for(base, ch), ch.to_string())),
            }
        }
        out
    }

    /// Advance of `ch` drawn with `id`, in 1/1000 em.
    pub(crate) fn advance(&self, id: FontId, ch: char) -> f32 {
        match id {
            FontId::Builtin(font) => font.char_width(ch),
            FontId::Embedded(slot) => self
                .faces
                .get(slot)
                .and_then(|face| face.glyph(ch))
                .map_or(500.0, |g| g.advance),
        }
    }

    /// Width of `text` drawn entirely with `id`, in points.
    pub(crate) fn measure(&self, id: FontId, text: &str, size: f32) -> f32 {
        match id {
            FontId::Builtin(font) => font.measure(text, size),
            FontId::Embedded(_) => {
                let units: f32 = text.chars().map(|ch| self.advance(id, ch)).sum();
                units * size / 1000.0
            }
        }
    }

    /// Width of `text` styled with `base` once split into [`segments`](Self::segments).
    pub(crate) fn measure_styled(&self, base: Font, text: &str, size: f32) -> f32 {
        self.segments(base, text)
            .iter()
            .map(|(id, run)| self.measure(*id, run, size))
            .sum()
    }
}

/// Faces from the explicit font file first, then preferred families, then
/// every other face; regular upright faces ahead of bold, italic and mono.
fn candidate_order(db: &fontdb::Database, explicit: &[fontdb::ID]) -> Vec<fontdb::ID> {
    let mut faces: Vec<&fontdb::FaceInfo> = db.faces().filter(|f| !explicit.contains(&f.id)).collect();
    faces.sort_by_cached_key(|f| {
        let family = f.families.first().map(|(name, _)| name.clone()).unwrap_or_default();
        let rank = PREFERRED_FAMILIES
            .iter()
            .position(|p| p.eq_ignore_ascii_case(&family))
            .unwrap_or(PREFERRED_FAMILIES.len());
        let regular = f.style == fontdb::Style::Normal && f.weight == fontdb::Weight::NORMAL;
        (!regular, f.monospaced, rank, family, f.post_script_name.clone())
    });
    explicit.iter().copied().chain(faces.into_iter().map(|f| f.id)).collect()
}
