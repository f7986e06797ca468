// ABOUTME: Export of final PRD Markdown to downloadable files
// ABOUTME: Format selection, renderers, file names and Content-Disposition headers

pub mod blocks;
pub mod docx;
pub mod pdf;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub use blocks::{parse_blocks, Block};
pub use docx::DocxRenderer;
pub use pdf::{PdfRenderer, PDF_FONT_ENV};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Render error: {0}")]
    Render(String),
}

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Md,
    Pdf,
    Docx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Md => "md",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Md => "text/markdown; charset=utf-8",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> ExportResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(ExportFormat::Md),
            "pdf" => Ok(ExportFormat::Pdf),
            "docx" => Ok(ExportFormat::Docx),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Turns a titled Markdown document into file bytes
pub trait DocumentRenderer: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn render(&self, title: &str, markdown: &str) -> ExportResult<Vec<u8>>;
}

/// Markdown passthrough
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl DocumentRenderer for MarkdownRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Md
    }

    fn render(&self, _title: &str, markdown: &str) -> ExportResult<Vec<u8>> {
        Ok(markdown.as_bytes().to_vec())
    }
}

pub fn renderer_for(format: ExportFormat) -> Box<dyn DocumentRenderer> {
    match format {
        ExportFormat::Md => Box::new(MarkdownRenderer),
        ExportFormat::Pdf => Box::new(PdfRenderer::from_env()),
        ExportFormat::Docx => Box::new(DocxRenderer::new()),
    }
}

/// Keeps ASCII letters, digits and CJK ideographs; everything else becomes `_`
pub fn export_file_name(title: &str, format: ExportFormat) -> String {
    let stem: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || ('\u{4e00}'..='\u{9fa5}').contains(&c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_PRD.{}", stem, format.extension())
}

/// RFC 5987 attachment header so non-ASCII names survive
pub fn content_disposition(file_name: &str) -> String {
    format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

/// A rendered file ready to send
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    pub fn content_disposition(&self) -> String {
        content_disposition(&self.file_name)
    }
}

pub fn export_document(
    format: ExportFormat,
    title: &str,
    markdown: &str,
) -> ExportResult<ExportedFile> {
    let renderer = renderer_for(format);
    let bytes = renderer.render(title, markdown)?;
    let file_name = export_file_name(title, renderer.format());
    info!("Exported {} ({} bytes)", file_name, bytes.len());

    Ok(ExportedFile {
        file_name,
        content_type: format.content_type(),
        bytes,
    })
}
