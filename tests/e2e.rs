//! End-to-end tests through the real backends.
//!
//! Every test builds its inputs inside a fresh `TempDir`, so nothing is read
//! from or written to the repository. Run with:
//!   cargo test --test e2e -- --nocapture
//!
//! Set `RUST_LOG=uniconvert=debug` to see the pipeline logs.

use image::{ImageFormat, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uniconvert::{
    convert, render_markdown_text, ConversionConfig, ConversionFamily, ConversionRequest,
    ConvertError, Stage, TargetFormat,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const REPORT_MD: &str = "\
# Quarterly Report

Revenue grew **12%** compared to the *previous* quarter.

## Highlights

- New customers in three regions
- Churn down to `2.1%`

| Region | Revenue |
|--------|---------|
| North  | 1200    |
| South  | 950     |

```
total = north + south
```
";

const LOGO_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="64" height="32">
  <circle cx="16" cy="16" r="14" fill="#1e90ff"/>
  <rect x="36" y="4" width="24" height="24" fill="#ff8c00" fill-opacity="0.5"/>
</svg>"##;

fn write(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn write_png(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    let img = RgbaImage::from_fn(16, 16, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([200, 30, 30, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    img.save_with_format(&path, ImageFormat::Png).unwrap();
    path
}

fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Text of every page as lopdf extracts it, followed by the raw file.
///
/// Content streams are uncompressed, so literal strings are also searchable
/// in the raw bytes when extraction does not decode a font.
fn pdf_text(path: &Path) -> String {
    let doc = lopdf::Document::load(path).expect("output should be a readable PDF");
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    assert!(!pages.is_empty(), "PDF has no pages");
    let extracted = doc.extract_text(&pages).unwrap_or_default();
    let raw = std::fs::read(path).unwrap();
    format!("{extracted}\n{}", String::from_utf8_lossy(&raw))
}

// ── Scenario A: Markdown → PDF with defaults ─────────────────────────────────

#[test]
fn scenario_a_markdown_defaults_to_pdf_next_to_input() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let input = write(&dir, "report.md", REPORT_MD.as_bytes());

    let report = convert(&ConversionRequest::new(&input), &ConversionConfig::default()).unwrap();

    assert_eq!(report.plan.family(), ConversionFamily::Markdown);
    assert_eq!(report.plan.output(), dir.path().join("report.pdf"));
    assert!(report.bytes_written > 0);

    let text = pdf_text(report.plan.output());
    assert!(text.contains("Quarterly Report"), "headings missing from: {text}");
    assert!(text.contains("Highlights"), "headings missing from: {text}");
    assert!(text.contains("North"), "table cell missing from: {text}");
}

#[test]
fn markdown_to_pdf_with_letter_pages_and_title() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(&dir, "notes.markdown", b"plain text only");
    let out = dir.path().join("nested/out/notes.pdf");
    let config = ConversionConfig::builder()
        .page_size(uniconvert::PageSize::Letter)
        .title("Meeting notes")
        .build()
        .unwrap();

    convert(&ConversionRequest::new(&input).with_output(&out), &config).unwrap();

    let doc = lopdf::Document::load(&out).unwrap();
    let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
    let page = doc.get_dictionary(page_id).unwrap();
    let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
    let width = media_box[2].as_float().unwrap();
    assert!((width - 612.0).abs() < 0.5, "width {width}");
    let raw = std::fs::read(&out).unwrap();
    assert!(String::from_utf8_lossy(&raw).contains("Meeting notes"));
}

// ── Scenario B: SVG → PNG ────────────────────────────────────────────────────

#[test]
fn scenario_b_svg_to_png() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let input = write(&dir, "logo.svg", LOGO_SVG.as_bytes());

    let report = convert(
        &ConversionRequest::new(&input).with_target("png"),
        &ConversionConfig::default(),
    )
    .unwrap();

    let out = dir.path().join("logo.png");
    assert_eq!(report.plan.output(), out);
    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!((img.width(), img.height()), (64, 32));
}

#[test]
fn svg_scale_enlarges_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(&dir, "logo.svg", LOGO_SVG.as_bytes());
    let config = ConversionConfig::builder().svg_scale(2.0).build().unwrap();

    convert(&ConversionRequest::new(&input).with_target("webp"), &config).unwrap();

    let img = image::open(dir.path().join("logo.webp")).unwrap();
    assert_eq!((img.width(), img.height()), (128, 64));
}

// ── Scenario C: image → pdf is rejected ──────────────────────────────────────

#[test]
fn scenario_c_image_to_pdf_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_png(&dir, "photo.png");

    let err = convert(
        &ConversionRequest::new(&input).with_target("pdf"),
        &ConversionConfig::default(),
    )
    .unwrap_err();

    assert!(matches!(err, ConvertError::UnsupportedTargetFormat { .. }), "{err:?}");
    assert_eq!(dir_listing(dir.path()), vec!["photo.png"]);
}

// ── Scenario D: SVG → JPG inferred from -o, no intermediate left ─────────────

#[test]
fn scenario_d_svg_to_jpg_infers_target_and_cleans_up() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let input = write(&dir, "icon.svg", LOGO_SVG.as_bytes());
    let out = dir.path().join("icon.jpg");

    let report = convert(
        &ConversionRequest::new(&input).with_output(&out),
        &ConversionConfig::default(),
    )
    .unwrap();

    assert_eq!(report.plan.target(), TargetFormat::JPG);
    assert_eq!(dir_listing(dir.path()), vec!["icon.jpg", "icon.svg"]);

    let img = image::open(&out).unwrap().to_rgb8();
    // Transparent corner flattened onto white.
    let corner = img.get_pixel(63, 31).0;
    assert!(corner.iter().all(|&c| c > 235), "got {corner:?}");
}

#[test]
fn failed_svg_conversion_leaves_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(&dir, "broken.svg", b"<svg><unclosed");

    let err = convert(
        &ConversionRequest::new(&input).with_target("webp"),
        &ConversionConfig::default(),
    )
    .unwrap_err();

    assert!(matches!(err, ConvertError::Conversion { stage: Stage::SvgConvert, .. }), "{err:?}");
    assert!(err.to_string().starts_with("Error in svg-convert: "));
    assert_eq!(dir_listing(dir.path()), vec!["broken.svg"]);
}

// ── Scenario E: missing input ────────────────────────────────────────────────

#[test]
fn scenario_e_missing_input_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("missing.md");

    let err = convert(&ConversionRequest::new(&input), &ConversionConfig::default()).unwrap_err();

    assert!(matches!(err, ConvertError::InputNotFound { .. }));
    assert!(dir_listing(dir.path()).is_empty());
}

// ── Raster conversions ───────────────────────────────────────────────────────

#[test]
fn png_to_each_raster_target() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_png(&dir, "photo.png");

    for (target, format) in [
        ("jpg", ImageFormat::Jpeg),
        ("jpeg", ImageFormat::Jpeg),
        ("webp", ImageFormat::WebP),
    ] {
        let report = convert(
            &ConversionRequest::new(&input).with_target(target),
            &ConversionConfig::default(),
        )
        .unwrap();
        let bytes = std::fs::read(report.plan.output()).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), format, "{target}");
        assert_eq!(report.bytes_written, bytes.len() as u64);
    }
}

#[test]
fn corrupt_raster_is_an_image_convert_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(&dir, "fake.jpg", b"not a jpeg");

    let err = convert(
        &ConversionRequest::new(&input).with_target("png"),
        &ConversionConfig::default(),
    )
    .unwrap_err();

    assert!(matches!(err, ConvertError::Conversion { stage: Stage::ImageConvert, .. }), "{err:?}");
    assert_eq!(dir_listing(dir.path()), vec!["fake.jpg"]);
}

// ── Idempotence ──────────────────────────────────────────────────────────────

#[test]
fn repeated_conversions_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let md = write(&dir, "report.md", REPORT_MD.as_bytes());
    let svg = write(&dir, "logo.svg", LOGO_SVG.as_bytes());
    let png = write_png(&dir, "photo.png");
    let config = ConversionConfig::default();

    let cases = [
        (ConversionRequest::new(&md).with_output(dir.path().join("r.pdf")), "r.pdf"),
        (ConversionRequest::new(&svg).with_output(dir.path().join("l.jpg")), "l.jpg"),
        (ConversionRequest::new(&png).with_output(dir.path().join("p.webp")), "p.webp"),
    ];

    for (request, name) in &cases {
        convert(request, &config).unwrap();
        let first = std::fs::read(dir.path().join(name)).unwrap();
        convert(request, &config).unwrap();
        let second = std::fs::read(dir.path().join(name)).unwrap();
        assert_eq!(first, second, "{name} differs between runs");
    }
}

// ── Inline Markdown ──────────────────────────────────────────────────────────

#[test]
fn inline_markdown_uses_same_renderer() {
    let dir = tempfile::tempdir().unwrap();
    let from_text = dir.path().join("text.pdf");
    let from_file = dir.path().join("file.pdf");
    let input = write(&dir, "file.md", REPORT_MD.as_bytes());
    let config = ConversionConfig::builder().title("Same").build().unwrap();

    render_markdown_text(REPORT_MD, &from_text, &config).unwrap();
    convert(&ConversionRequest::new(&input).with_output(&from_file), &config).unwrap();

    assert_eq!(
        std::fs::read(&from_text).unwrap(),
        std::fs::read(&from_file).unwrap()
    );
}
