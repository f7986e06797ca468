// ABOUTME: DOCX renderer built on docx-rs
// ABOUTME: Maps Markdown blocks to sized headings, bullet paragraphs and monospace code

use std::io::Cursor;

use docx_rs::{AlignmentType, Docx, Paragraph, Run, RunFonts};
use tracing::debug;

use crate::blocks::{parse_blocks, Block};
use crate::{DocumentRenderer, ExportError, ExportFormat, ExportResult};

const MONO_FONT: &str = "Courier New";

/// Heading run size in half-points
fn heading_size(level: u8) -> usize {
    match level {
        1 => 36,
        2 => 30,
        3 => 26,
        _ => 24,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DocxRenderer;

impl DocxRenderer {
    pub fn new() -> Self {
        Self
    }

    fn paragraphs(block: &Block) -> Vec<Paragraph> {
        match block {
            Block::Heading { level, text } => vec![Paragraph::new().add_run(
                Run::new()
                    .add_text(text.as_str())
                    .bold()
                    .size(heading_size(*level)),
            )],
            Block::Paragraph(text) => {
                vec![Paragraph::new().add_run(Run::new().add_text(text.as_str()))]
            }
            Block::ListItem {
                depth,
                marker,
                text,
            } => {
                let prefix = "    ".repeat(*depth);
                vec![Paragraph::new()
                    .add_run(Run::new().add_text(format!("{}{} {}", prefix, marker, text)))]
            }
            Block::Code { text, .. } => text
                .lines()
                .map(|line| {
                    Paragraph::new().add_run(
                        Run::new()
                            .add_text(line)
                            .fonts(RunFonts::new().ascii(MONO_FONT).hi_ansi(MONO_FONT))
                            .size(18),
                    )
                })
                .collect(),
            Block::TableRow(cells) => {
                vec![Paragraph::new().add_run(Run::new().add_text(cells.join(" | ")))]
            }
            Block::Rule => vec![Paragraph::new().add_run(Run::new().add_text("―".repeat(30)))],
        }
    }
}

impl DocumentRenderer for DocxRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Docx
    }

    fn render(&self, title: &str, markdown: &str) -> ExportResult<Vec<u8>> {
        let blocks = parse_blocks(markdown);
        debug!("Rendering DOCX with {} block(s)", blocks.len());

        let mut docx = Docx::new().add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(title).bold().size(44))
                .align(AlignmentType::Center),
        );
        for block in &blocks {
            for paragraph in Self::paragraphs(block) {
                docx = docx.add_paragraph(paragraph);
            }
        }

        let mut buffer = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buffer)
            .map_err(|e| ExportError::Render(format!("docx: {}", e)))?;
        Ok(buffer.into_inner())
    }
}
