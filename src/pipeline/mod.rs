//! Pipeline stages that turn a request into a plan and a plan into output.
//!
//! Each submodule implements exactly one step. The first three are pure
//! decisions over paths and strings; only [`dispatch`] touches backends.
//!
//! ## Data Flow
//!
//! ```text
//! request ──▶ detect ──▶ target ──▶ output_path ──▶ dispatch
//! (paths)    (family)   (format)   (default path)  (backend)
//! ```
//!
//! 1. [`detect`]: input extension → conversion family
//! 2. [`target`]: explicit `-t`, else output extension → target format
//! 3. [`output_path`]: default output path when `-o` is absent
//! 4. [`dispatch`]: invoke the Markdown, raster or SVG backend

pub mod detect;
pub mod dispatch;
pub mod output_path;
pub mod target;
