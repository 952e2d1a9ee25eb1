//! Bundled font faces
//!
//! Face files live in the configured fonts directory and are named
//! `<prefix>-<Variant>.<ext>`, e.g. `JetBrainsMono-Bold.woff2` or
//! `Hack-Regular.ttf`. The SVG path embeds them as base64 `@font-face`
//! rules; the raster path loads them into the font database.
//!
//! Hack Regular is compiled into the crate. A family with no face files
//! embeds it: Hack directly, any other family behind a `local()` source
//! for its own name.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use base64::Engine as _;
use resvg::usvg::fontdb;
use tokio::sync::OnceCell;

use crate::params::FontChoice;
use crate::Result;

/// (file suffix, font-weight, font-style)
const VARIANTS: &[(&str, u16, &str)] = &[
    ("Regular", 400, "normal"),
    ("Bold", 700, "normal"),
    ("Italic", 400, "italic"),
    ("BoldItalic", 700, "italic"),
];

/// (extension, mime type, CSS format hint), in order of preference
const FORMATS: &[(&str, &str, &str)] = &[
    ("woff2", "font/woff2", "woff2"),
    ("woff", "font/woff", "woff"),
    ("ttf", "font/ttf", "truetype"),
    ("otf", "font/otf", "opentype"),
];

/// Hack Regular (MIT / Bitstream Vera, see `fonts/LICENSE-Hack.txt`)
pub const BUNDLED_FACE: &[u8] = include_bytes!("../fonts/Hack-Regular.ttf");
const BUNDLED_FAMILY: &str = "Hack";

/// A complete `@font-face` stylesheet for one family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFace {
    pub font: FontChoice,
    pub css: Arc<str>,
    /// Number of faces embedded, the bundled face included
    pub embedded_faces: usize,
}

pub struct FontLibrary {
    dir: PathBuf,
    load_system_fonts: bool,
    jetbrains_mono: OnceCell<FontFace>,
    hack: OnceCell<FontFace>,
    database: OnceLock<Arc<fontdb::Database>>,
}

impl FontLibrary {
    pub fn new(dir: impl Into<PathBuf>, load_system_fonts: bool) -> Self {
        Self {
            dir: dir.into(),
            load_system_fonts,
            jetbrains_mono: OnceCell::new(),
            hack: OnceCell::new(),
            database: OnceLock::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Font-face stylesheet for `font`, loaded from disk on first use
    pub async fn font_face(&self, font: FontChoice) -> Result<FontFace> {
        let cell = match font {
            FontChoice::JetBrainsMono => &self.jetbrains_mono,
            FontChoice::Hack => &self.hack,
        };
        let face = cell
            .get_or_try_init(|| load_font_face(&self.dir, font))
            .await?;
        Ok(face.clone())
    }

    /// Font database for the raster path: bundled faces plus, if enabled,
    /// the system fonts. Built once; blocking.
    pub fn database(&self) -> Arc<fontdb::Database> {
        self.database
            .get_or_init(|| {
                let mut db = fontdb::Database::new();
                if self.load_system_fonts {
                    db.load_system_fonts();
                }
                if self.dir.is_dir() {
                    db.load_fonts_dir(&self.dir);
                }
                if !has_family(&db, BUNDLED_FAMILY) {
                    db.load_font_data(BUNDLED_FACE.to_vec());
                }
                let mono = if has_family(&db, FontChoice::JetBrainsMono.family()) {
                    FontChoice::JetBrainsMono.family()
                } else {
                    BUNDLED_FAMILY
                };
                db.set_monospace_family(mono);
                log::debug!("font database holds {} faces", db.len());
                Arc::new(db)
            })
            .clone()
    }
}

async fn load_font_face(dir: &Path, font: FontChoice) -> Result<FontFace> {
    let mut rules = Vec::new();
    for (variant, weight, style) in VARIANTS {
        for (ext, mime, format) in FORMATS {
            let path = dir.join(format!("{}-{}.{}", font.file_prefix(), variant, ext));
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    let data = base64::engine::general_purpose::STANDARD.encode(bytes);
                    rules.push(font_face_rule(
                        font.family(),
                        *weight,
                        style,
                        &format!("url(data:{};base64,{}) format(\"{}\")", mime, data, format),
                    ));
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    if rules.is_empty() {
        log::warn!(
            "no face files for {} in {}; embedding the bundled {} face",
            font.family(),
            dir.display(),
            BUNDLED_FAMILY
        );
        let data = base64::engine::general_purpose::STANDARD.encode(BUNDLED_FACE);
        let bundled = format!("url(data:font/ttf;base64,{}) format(\"truetype\")", data);
        let src = if font.family() == BUNDLED_FAMILY {
            bundled
        } else {
            format!("local(\"{}\"), {}", font.family(), bundled)
        };
        rules.push(font_face_rule(font.family(), 400, "normal", &src));
    } else {
        log::debug!("embedded {} faces of {}", rules.len(), font.family());
    }

    Ok(FontFace {
        font,
        embedded_faces: rules.len(),
        css: rules.join("\n").into(),
    })
}

fn has_family(db: &fontdb::Database, family: &str) -> bool {
    db.faces()
        .any(|face| face.families.iter().any(|(name, _)| name == family))
}

fn font_face_rule(family: &str, weight: u16, style: &str, src: &str) -> String {
    format!(
        "@font-face {{\n  font-family: \"{}\";\n  font-style: {};\n  font-weight: {};\n  src: {};\n}}",
        family, style, weight, src
    )
}
