// ABOUTME: Flat block model of a Markdown document
// ABOUTME: Built from pulldown-cmark events and shared by the PDF and DOCX renderers

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    ListItem { depth: usize, marker: String, text: String },
    Code { language: Option<String>, text: String },
    TableRow(Vec<String>),
    Rule,
}

/// Parse Markdown into renderable blocks. Inline formatting is flattened
/// to plain text.
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let mut builder = BlockBuilder::default();

    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(tag) => builder.start(tag),
            Event::End(tag_end) => builder.end(tag_end),
            Event::Text(text) | Event::Code(text) => builder.buffer.push_str(&text),
            Event::SoftBreak => builder.push_break(' '),
            Event::HardBreak => builder.push_break('\n'),
            Event::Rule => builder.blocks.push(Block::Rule),
            Event::TaskListMarker(done) => {
                builder.buffer.push_str(if done { "[x] " } else { "[ ] " })
            }
            _ => {}
        }
    }

    builder.blocks
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    buffer: String,
    heading: Option<u8>,
    code_language: Option<Option<String>>,
    /// Next number per open list, None for bullet lists
    lists: Vec<Option<u64>>,
    row: Option<Vec<String>>,
}

impl BlockBuilder {
    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Heading { level, .. } => {
                self.buffer.clear();
                self.heading = Some(level as u8);
            }
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.buffer.clear();
                } else if !self.buffer.is_empty() {
                    self.buffer.push(' ');
                }
            }
            Tag::CodeBlock(kind) => {
                self.flush_item();
                self.buffer.clear();
                let language = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.trim().is_empty() => {
                        Some(lang.trim().to_string())
                    }
                    _ => None,
                };
                self.code_language = Some(language);
            }
            Tag::List(start) => {
                // Text of the parent item comes before its nested list
                self.flush_item();
                self.lists.push(start);
            }
            Tag::Item => self.buffer.clear(),
            Tag::TableHead | Tag::TableRow => self.row = Some(Vec::new()),
            Tag::TableCell => self.buffer.clear(),
            _ => {}
        }
    }

    fn end(&mut self, tag_end: TagEnd) {
        match tag_end {
            TagEnd::Heading(_) => {
                if let Some(level) = self.heading.take() {
                    let text = self.take_buffer();
                    self.blocks.push(Block::Heading { level, text });
                }
            }
            TagEnd::Paragraph => {
                if self.lists.is_empty() {
                    let text = self.take_buffer();
                    if !text.is_empty() {
                        self.blocks.push(Block::Paragraph(text));
                    }
                }
            }
            TagEnd::CodeBlock => {
                let language = self.code_language.take().flatten();
                let text = std::mem::take(&mut self.buffer)
                    .trim_end_matches('\n')
                    .to_string();
                self.blocks.push(Block::Code { language, text });
            }
            TagEnd::Item => self.flush_item(),
            TagEnd::List(_) => {
                self.lists.pop();
            }
            TagEnd::TableCell => {
                let cell = self.take_buffer();
                if let Some(row) = self.row.as_mut() {
                    row.push(cell);
                }
            }
            TagEnd::TableHead | TagEnd::TableRow => {
                if let Some(row) = self.row.take() {
                    self.blocks.push(Block::TableRow(row));
                }
            }
            _ => {}
        }
    }

    fn push_break(&mut self, separator: char) {
        if self.code_language.is_some() {
            self.buffer.push('\n');
        } else {
            self.buffer.push(separator);
        }
    }

    fn take_buffer(&mut self) -> String {
        std::mem::take(&mut self.buffer).trim().to_string()
    }

    fn flush_item(&mut self) {
        let text = self.take_buffer();
        if text.is_empty() || self.lists.is_empty() {
            return;
        }
        let depth = self.lists.len() - 1;
        let marker = match self.lists.last_mut() {
            Some(Some(next)) => {
                let marker = format!("{}.", next);
                *next += 1;
                marker
            }
            _ => "•".to_string(),
        };
        self.blocks.push(Block::ListItem {
            depth,
            marker,
            text,
        });
    }
}
