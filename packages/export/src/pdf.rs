// ABOUTME: PDF renderer built on printpdf with an optional embedded Unicode font
// ABOUTME: Lays out blocks as wrapped lines on A4 pages and paginates

use std::env;
use std::io::Cursor;
use std::path::PathBuf;

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};
use tracing::{debug, warn};

use crate::blocks::{parse_blocks, Block};
use crate::{DocumentRenderer, ExportError, ExportFormat, ExportResult};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const PT_TO_MM: f32 = 0.3528;
const LINE_SPACING: f32 = 1.4;
const BODY_SIZE: f32 = 10.5;
const CODE_SIZE: f32 = 9.0;

/// TrueType/OpenType font embedded for non-Latin text (e.g. a CJK font)
pub const PDF_FONT_ENV: &str = "PDF_FONT_PATH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FontStyle {
    Regular,
    Bold,
    Mono,
}

impl FontStyle {
    /// Average glyph width as a fraction of the font size
    fn width_factor(&self) -> f32 {
        match self {
            FontStyle::Regular => 0.5,
            FontStyle::Bold => 0.55,
            FontStyle::Mono => 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Line {
    text: String,
    style: FontStyle,
    size: f32,
    indent_mm: f32,
    gap_before_mm: f32,
}

impl Line {
    fn advance_mm(&self) -> f32 {
        self.gap_before_mm + self.size * PT_TO_MM * LINE_SPACING
    }
}

struct PdfFonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    mono: IndirectFontRef,
    unicode: bool,
}

impl PdfFonts {
    fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Mono => &self.mono,
        }
    }
}

/// Renders Markdown to PDF.
///
/// With a font path the font is embedded and text is kept as-is. Without
/// one, or when the font cannot be loaded, the built-in Helvetica and
/// Courier fonts are used and characters outside Latin-1 are replaced.
#[derive(Debug, Default, Clone)]
pub struct PdfRenderer {
    font_path: Option<PathBuf>,
}

impl PdfRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Font path taken from `PDF_FONT_PATH` when set
    pub fn from_env() -> Self {
        Self {
            font_path: env::var(PDF_FONT_ENV)
                .ok()
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn with_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    fn load_fonts(&self, doc: &PdfDocumentReference) -> ExportResult<PdfFonts> {
        if let Some(path) = &self.font_path {
            match std::fs::read(path) {
                Ok(data) => match doc.add_external_font(Cursor::new(data)) {
                    Ok(font) => {
                        debug!("Embedding PDF font {}", path.display());
                        return Ok(PdfFonts {
                            regular: font.clone(),
                            bold: font.clone(),
                            mono: font,
                            unicode: true,
                        });
                    }
                    Err(e) => warn!(
                        "Unusable PDF font {}, falling back to Helvetica: {:?}",
                        path.display(),
                        e
                    ),
                },
                Err(e) => warn!(
                    "Cannot read PDF font {}, falling back to Helvetica: {}",
                    path.display(),
                    e
                ),
            }
        }

        Ok(PdfFonts {
            regular: doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(pdf_error)?,
            bold: doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(pdf_error)?,
            mono: doc
                .add_builtin_font(BuiltinFont::Courier)
                .map_err(pdf_error)?,
            unicode: false,
        })
    }
}

impl DocumentRenderer for PdfRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn render(&self, title: &str, markdown: &str) -> ExportResult<Vec<u8>> {
        let pdf_title = to_pdf_text(title);
        let (doc, first_page, first_layer) = PdfDocument::new(
            pdf_title.as_str(),
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "content",
        );
        let fonts = self.load_fonts(&doc)?;

        let lines = layout(title, &parse_blocks(markdown), fonts.unicode);
        let pages = paginate(lines, PAGE_HEIGHT_MM - 2.0 * MARGIN_MM);
        debug!("Rendering PDF with {} page(s)", pages.len());

        for (index, page) in pages.iter().enumerate() {
            let layer = if index == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page_index, layer_index) =
                    doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");
                doc.get_page(page_index).get_layer(layer_index)
            };

            let mut y = PAGE_HEIGHT_MM - MARGIN_MM;
            for line in page {
                y -= line.advance_mm();
                layer.use_text(
                    line.text.clone(),
                    line.size,
                    Mm(MARGIN_MM + line.indent_mm),
                    Mm(y),
                    fonts.get(line.style),
                );
            }
        }

        doc.save_to_bytes().map_err(pdf_error)
    }
}

fn pdf_error<E: std::fmt::Debug>(err: E) -> ExportError {
    ExportError::Render(format!("pdf: {:?}", err))
}

/// Replace characters the built-in fonts cannot encode
fn to_pdf_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2022}' => '*',
            '\t' => ' ',
            c if (' '..='~').contains(&c) || ('\u{A0}'..='\u{FF}').contains(&c) => c,
            _ => '?',
        })
        .collect()
}

/// Wide (CJK and fullwidth) characters take two columns
fn char_width(c: char) -> usize {
    if c >= '\u{2E80}' {
        2
    } else {
        1
    }
}

/// Number of leading chars of `word` that fit in `max` columns (at least one)
fn fitting_prefix(word: &[char], max: usize) -> usize {
    let mut used = 0;
    for (i, c) in word.iter().enumerate() {
        used += char_width(*c);
        if used > max {
            return i.max(1);
        }
    }
    word.len()
}

/// Greedy word wrap by column count; overlong words are split
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.iter().map(|c| char_width(*c)).sum::<usize>() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let take = fitting_prefix(&word, max_chars);
            lines.push(word.drain(..take).collect());
        }
        let word_len: usize = word.iter().map(|c| char_width(*c)).sum();
        if word_len == 0 {
            continue;
        }
        if current_len > 0 && current_len + 1 + word_len > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word);
        current_len += word_len;
    }
    if current_len > 0 {
        lines.push(current);
    }
    lines
}

fn max_chars(style: FontStyle, size: f32, indent_mm: f32) -> usize {
    let usable_mm = PAGE_WIDTH_MM - 2.0 * MARGIN_MM - indent_mm;
    (usable_mm / (size * PT_TO_MM * style.width_factor())) as usize
}

fn push_wrapped(
    lines: &mut Vec<Line>,
    unicode: bool,
    text: &str,
    style: FontStyle,
    size: f32,
    indent_mm: f32,
    gap_before_mm: f32,
) {
    let text = if unicode {
        text.replace('\t', " ")
    } else {
        to_pdf_text(text)
    };
    for (i, chunk) in wrap_text(&text, max_chars(style, size, indent_mm))
        .into_iter()
        .enumerate()
    {
        lines.push(Line {
            text: chunk,
            style,
            size,
            indent_mm,
            gap_before_mm: if i == 0 { gap_before_mm } else { 0.0 },
        });
    }
}

fn heading_size(level: u8) -> f32 {
    match level {
        1 => 18.0,
        2 => 15.0,
        3 => 13.0,
        _ => 11.5,
    }
}

fn layout(title: &str, blocks: &[Block], unicode: bool) -> Vec<Line> {
    let mut lines = Vec::new();
    push_wrapped(&mut lines, unicode, title, FontStyle::Bold, 20.0, 0.0, 0.0);

    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                push_wrapped(
                    &mut lines,
                    unicode,
                    text,
                    FontStyle::Bold,
                    heading_size(*level),
                    0.0,
                    4.0,
                );
            }
            Block::Paragraph(text) => {
                push_wrapped(&mut lines, unicode, text, FontStyle::Regular, BODY_SIZE, 0.0, 2.0);
            }
            Block::ListItem {
                depth,
                marker,
                text,
            } => {
                let indent = 5.0 * (*depth as f32 + 1.0);
                let item = format!("{} {}", marker, text);
                push_wrapped(&mut lines, unicode, &item, FontStyle::Regular, BODY_SIZE, indent, 0.5);
            }
            Block::Code { text, .. } => {
                let limit = max_chars(FontStyle::Mono, CODE_SIZE, 5.0);
                for (i, raw) in text.lines().enumerate() {
                    let raw = if unicode {
                        raw.replace('\t', "    ")
                    } else {
                        to_pdf_text(raw)
                    };
                    let mut chars: Vec<char> = raw.chars().collect();
                    let mut chunks: Vec<String> = Vec::new();
                    while !chars.is_empty() {
                        let take = fitting_prefix(&chars, limit.max(1));
                        chunks.push(chars.drain(..take).collect());
                    }
                    if chunks.is_empty() {
                        chunks.push(String::new());
                    }
                    for (j, chunk) in chunks.into_iter().enumerate() {
                        lines.push(Line {
                            text: chunk,
                            style: FontStyle::Mono,
                            size: CODE_SIZE,
                            indent_mm: 5.0,
                            gap_before_mm: if i == 0 && j == 0 { 2.0 } else { 0.0 },
                        });
                    }
                }
            }
            Block::TableRow(cells) => {
                push_wrapped(
                    &mut lines,
                    unicode,
                    &cells.join(" | "),
                    FontStyle::Regular,
                    BODY_SIZE,
                    0.0,
                    0.5,
                );
            }
            Block::Rule => lines.push(Line {
                text: "-".repeat(max_chars(FontStyle::Regular, BODY_SIZE, 0.0) / 2),
                style: FontStyle::Regular,
                size: BODY_SIZE,
                indent_mm: 0.0,
                gap_before_mm: 2.0,
            }),
        }
    }
    lines
}

/// Split lines into pages whose total advance fits `usable_height_mm`
fn paginate(lines: Vec<Line>, usable_height_mm: f32) -> Vec<Vec<Line>> {
    let mut pages = Vec::new();
    let mut page: Vec<Line> = Vec::new();
    let mut used = 0.0;

    for mut line in lines {
        if !page.is_empty() && used + line.advance_mm() > usable_height_mm {
            pages.push(std::mem::take(&mut page));
            used = 0.0;
            line.gap_before_mm = 0.0;
        }
        used += line.advance_mm();
        page.push(line);
    }
    if !page.is_empty() {
        pages.push(page);
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wrap_text_respects_width() {
        let wrapped = wrap_text("one two three four five", 9);
        assert_eq!(wrapped, vec!["one two", "three", "four five"]);
        assert!(wrap_text("", 10).is_empty());
    }

    #[test]
    fn test_wrap_text_splits_long_words() {
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_pdf_text_replaces_unsupported_characters() {
        assert_eq!(to_pdf_text("“Café” — 会议"), "\"Café\" - ??");
    }

    #[test]
    fn test_wrap_counts_wide_characters_twice() {
        assert_eq!(wrap_text("会议纪要总结", 4), vec!["会议", "纪要", "总结"]);
        assert_eq!(wrap_text("ab 会议", 7), vec!["ab 会议"]);
        assert_eq!(wrap_text("ab 会议", 6), vec!["ab", "会议"]);
    }

    #[test]
    fn test_layout_keeps_text_only_with_embedded_font() {
        let blocks = vec![Block::Paragraph("会议纪要".into())];
        assert_eq!(layout("纪要", &blocks, true)[1].text, "会议纪要");
        assert_eq!(layout("纪要", &blocks, false)[1].text, "????");
    }

    #[test]
    fn test_missing_font_falls_back_to_builtin() {
        let bytes = PdfRenderer::new()
            .with_font("/nonexistent/prdsmith/font.ttf")
            .render("会议 Summarizer", "# 背景\n\nRemote teams.\n")
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_paginate_starts_new_pages() {
        let lines = layout("Title", &vec![Block::Paragraph("x".into()); 200], false);
        let pages = paginate(lines, PAGE_HEIGHT_MM - 2.0 * MARGIN_MM);
        assert!(pages.len() > 1);
        for page in &pages {
            let height: f32 = page.iter().map(Line::advance_mm).sum();
            assert!(height <= PAGE_HEIGHT_MM - 2.0 * MARGIN_MM);
        }
        assert_eq!(pages.iter().map(Vec::len).sum::<usize>(), 201);
    }

    #[test]
    fn test_render_produces_pdf_bytes() {
        let bytes = PdfRenderer::new()
            .render(
                "Meeting Summarizer",
                "# Background\n\nRemote teams.\n\n- Recaps\n\n```mermaid\ngraph TD\n  A --> B\n```\n",
            )
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
