// ABOUTME: Syntax validator for model-generated Mermaid source
// ABOUTME: Line-oriented parser for flowchart and journey diagrams plus a balance check for other kinds

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

const FLOW_DIRECTIONS: &[&str] = &["TD", "TB", "BT", "LR", "RL"];

/// Headers accepted without a full grammar; only delimiters are checked
const OTHER_DIAGRAM_KEYWORDS: &[&str] = &[
    "sequenceDiagram",
    "classDiagram",
    "classDiagram-v2",
    "stateDiagram",
    "stateDiagram-v2",
    "erDiagram",
    "gantt",
    "pie",
    "mindmap",
    "timeline",
    "gitGraph",
    "quadrantChart",
    "requirementDiagram",
    "C4Context",
    "sankey-beta",
    "xychart-beta",
    "block-beta",
];

const FLOW_DIRECTIVES: &[&str] = &["style", "classDef", "class", "linkStyle", "click"];

/// Node shapes as (open, close) pairs, longest openers first
const NODE_SHAPES: &[(&str, &str)] = &[
    ("([", "])"),
    ("[(", ")]"),
    ("((", "))"),
    ("[[", "]]"),
    ("{{", "}}"),
    ("[", "]"),
    ("(", ")"),
    ("{", "}"),
    (">", "]"),
];

lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"</?[A-Za-z][A-Za-z0-9]*(\s[^<>]*)?/?>").unwrap();
}

/// Result of validating one candidate source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MermaidValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MermaidValidation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

/// Stateless Mermaid checker. Every failure is reported in the returned
/// value; nothing is kept between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct MermaidValidator;

impl MermaidValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, source: &str) -> MermaidValidation {
        match parse_diagram(source) {
            Ok(()) => MermaidValidation::ok(),
            Err(e) => {
                debug!("Mermaid validation failed: {}", e);
                MermaidValidation::invalid(e.to_string())
            }
        }
    }
}

#[derive(Debug)]
struct ParseError {
    line: usize,
    message: String,
}

impl ParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parse error on line {}: {}", self.line, self.message)
    }
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    text: &'a str,
}

fn parse_diagram(source: &str) -> Result<(), ParseError> {
    let lines: Vec<Line> = source
        .lines()
        .enumerate()
        .map(|(idx, text)| Line {
            number: idx + 1,
            text: text.trim(),
        })
        .filter(|line| !line.text.is_empty() && !line.text.starts_with("%%"))
        .collect();

    let Some((header, body)) = lines.split_first() else {
        return Err(ParseError::new(1, "Diagram source is empty"));
    };

    if let Some(line) = lines.iter().find(|line| HTML_TAG.is_match(line.text)) {
        return Err(ParseError::new(
            line.number,
            "HTML tags are not supported in diagram text",
        ));
    }

    let mut header_parts = split_statements(header.text).into_iter();
    let declaration = header_parts.next().unwrap_or_default();
    let mut words = declaration.split_whitespace();
    let keyword = words.next().unwrap_or_default();

    match keyword {
        "graph" | "flowchart" => {
            if let Some(direction) = words.next() {
                if !FLOW_DIRECTIONS.contains(&direction) {
                    return Err(ParseError::new(
                        header.number,
                        format!("Invalid flowchart direction '{}'", direction),
                    ));
                }
            }
            if let Some(extra) = words.next() {
                return Err(ParseError::new(
                    header.number,
                    format!("Unexpected '{}' after diagram header", extra),
                ));
            }

            let mut statements: Vec<Line> = header_parts
                .map(|text| Line {
                    number: header.number,
                    text,
                })
                .collect();
            for line in body {
                statements.extend(split_statements(line.text).into_iter().map(|text| Line {
                    number: line.number,
                    text,
                }));
            }
            if statements.is_empty() {
                return Err(ParseError::new(header.number, "Diagram has no content"));
            }
            parse_flowchart(&statements)
        }
        "journey" => {
            if words.next().is_some() || header_parts.next().is_some() {
                return Err(ParseError::new(
                    header.number,
                    "Unexpected content after 'journey'",
                ));
            }
            parse_journey(header.number, body)
        }
        other if OTHER_DIAGRAM_KEYWORDS.contains(&other) => {
            if body.is_empty() {
                return Err(ParseError::new(header.number, "Diagram has no content"));
            }
            // Entity relationships use braces as cardinality markers
            check_balance(body, other != "erDiagram")
        }
        other => Err(ParseError::new(
            header.number,
            format!("No diagram type detected for '{}'", other),
        )),
    }
}

/// Split a line on `;` outside of quoted text
fn split_statements(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            ';' if !in_quote => {
                parts.push(text[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts.retain(|part| !part.is_empty());
    parts
}

/// `Some(argument)` when `text` is `keyword` or `keyword <argument>`
fn keyword_arg<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(keyword)?;
    if rest.is_empty() {
        Some(rest)
    } else if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

// ============================================================================
// Flowchart
// ============================================================================

fn parse_flowchart(statements: &[Line]) -> Result<(), ParseError> {
    let mut open_subgraphs: Vec<usize> = Vec::new();

    for stmt in statements {
        let text = stmt.text;

        if let Some(arg) = keyword_arg(text, "subgraph") {
            if arg.is_empty() {
                return Err(ParseError::new(stmt.number, "subgraph requires an id"));
            }
            check_balance(std::slice::from_ref(stmt), true)?;
            open_subgraphs.push(stmt.number);
            continue;
        }

        if text == "end" {
            if open_subgraphs.pop().is_none() {
                return Err(ParseError::new(
                    stmt.number,
                    "Unexpected 'end' without a matching subgraph",
                ));
            }
            continue;
        }

        if let Some(arg) = keyword_arg(text, "direction") {
            if !FLOW_DIRECTIONS.contains(&arg) {
                return Err(ParseError::new(
                    stmt.number,
                    format!("Invalid subgraph direction '{}'", arg),
                ));
            }
            continue;
        }

        if let Some(directive) = FLOW_DIRECTIVES
            .iter()
            .find(|directive| keyword_arg(text, directive).is_some())
        {
            if keyword_arg(text, directive).is_some_and(str::is_empty) {
                return Err(ParseError::new(
                    stmt.number,
                    format!("'{}' requires arguments", directive),
                ));
            }
            check_balance(std::slice::from_ref(stmt), true)?;
            continue;
        }

        parse_chain(text).map_err(|message| ParseError::new(stmt.number, message))?;
    }

    match open_subgraphs.last() {
        Some(line) => Err(ParseError::new(
            *line,
            "Unclosed subgraph (missing 'end')",
        )),
        None => Ok(()),
    }
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn starts_with(&self, pattern: &str) -> bool {
        self.matches_at(self.pos, pattern)
    }

    fn eat(&mut self, pattern: &str) -> bool {
        if self.starts_with(pattern) {
            self.pos += pattern.chars().count();
            true
        } else {
            false
        }
    }

    fn eat_run(&mut self, c: char) -> usize {
        let start = self.pos;
        while self.peek() == Some(c) {
            self.pos += 1;
        }
        self.pos - start
    }

    /// Offset of the first occurrence of any pattern, with the matched pattern
    fn find_any<'p>(&self, patterns: &[&'p str]) -> Option<(usize, &'p str)> {
        (self.pos..self.chars.len()).find_map(|start| {
            patterns
                .iter()
                .find(|pattern| self.matches_at(start, pattern))
                .map(|pattern| (start - self.pos, *pattern))
        })
    }

    fn matches_at(&self, start: usize, pattern: &str) -> bool {
        pattern
            .chars()
            .enumerate()
            .all(|(offset, c)| self.chars.get(start + offset) == Some(&c))
    }

    fn rest(&self) -> String {
        self.chars[self.pos..].iter().take(20).collect()
    }
}

fn is_id_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `node [& node]* (edge node [& node]*)*`
fn parse_chain(text: &str) -> Result<(), String> {
    let mut cur = Cursor::new(text);
    cur.skip_ws();

    if parse_edge(&mut cur)? {
        return Err("Edge without a source node".to_string());
    }
    parse_node_group(&mut cur)?;

    loop {
        cur.skip_ws();
        if cur.is_eof() {
            return Ok(());
        }
        if !parse_edge(&mut cur)? {
            return Err(format!("Unexpected token '{}'", cur.rest()));
        }
        cur.skip_ws();
        if cur.is_eof() {
            return Err("Edge without a target node".to_string());
        }
        parse_node_group(&mut cur)?;
    }
}

fn parse_node_group(cur: &mut Cursor) -> Result<(), String> {
    parse_node(cur)?;
    loop {
        cur.skip_ws();
        if !cur.eat("&") {
            return Ok(());
        }
        cur.skip_ws();
        parse_node(cur)?;
    }
}

fn parse_node(cur: &mut Cursor) -> Result<(), String> {
    let start = cur.pos;
    while cur.peek().is_some_and(is_id_char) {
        cur.pos += 1;
    }
    if cur.pos == start {
        return Err(match cur.peek() {
            Some(c) => format!("Expected a node id, found '{}'", c),
            None => "Expected a node id".to_string(),
        });
    }

    if let Some((open, close)) = NODE_SHAPES.iter().find(|(open, _)| cur.starts_with(open)) {
        cur.eat(open);
        parse_label(cur, close)?;
    }

    if cur.eat(":::") {
        let class_start = cur.pos;
        while cur.peek().is_some_and(|c| is_id_char(c) || c == '-') {
            cur.pos += 1;
        }
        if cur.pos == class_start {
            return Err("Expected a class name after ':::'".to_string());
        }
    }
    Ok(())
}

fn parse_label(cur: &mut Cursor, close: &str) -> Result<(), String> {
    cur.skip_ws();

    if cur.eat("\"") {
        loop {
            match cur.bump() {
                Some('"') => break,
                Some(_) => {}
                None => return Err("Unterminated string in node label".to_string()),
            }
        }
        cur.skip_ws();
        if !cur.eat(close) {
            return Err(format!("Expected '{}' to close the node shape", close));
        }
        return Ok(());
    }

    let mut length = 0;
    loop {
        if cur.starts_with(close) {
            if length == 0 {
                return Err("Empty node label".to_string());
            }
            cur.eat(close);
            return Ok(());
        }
        match cur.bump() {
            None => return Err(format!("Unterminated node shape (missing '{}')", close)),
            Some(c) if "[](){}".contains(c) => {
                return Err(format!(
                    "Unexpected '{}' inside node label; quote labels that contain brackets",
                    c
                ))
            }
            Some('"') => return Err("Unexpected quote inside node label".to_string()),
            Some(_) => length += 1,
        }
    }
}

/// Consume an edge and its optional `|label|`. Returns false when the
/// cursor is not at an edge.
fn parse_edge(cur: &mut Cursor) -> Result<bool, String> {
    let start = cur.pos;
    cur.eat("<");

    let complete = match (cur.peek(), cur.peek_at(1)) {
        (Some('-'), Some('.')) => {
            cur.pos += 2;
            cur.eat_run('.');
            if cur.eat("-") {
                cur.eat(">");
                true
            } else {
                false
            }
        }
        (Some('-'), _) => {
            let run = cur.eat_run('-');
            if run < 2 {
                cur.pos = start;
                return Ok(false);
            }
            eat_arrow_head(cur) || run >= 3
        }
        (Some('='), _) => {
            let run = cur.eat_run('=');
            if run < 2 {
                cur.pos = start;
                return Ok(false);
            }
            eat_arrow_head(cur) || run >= 3
        }
        _ => {
            cur.pos = start;
            return Ok(false);
        }
    };

    if !complete {
        // Text edge such as `-- text -->`, `== text ==>` or `-. text .->`
        let terminators = ["-->", "---", "==>", "===", ".->", ".-"];
        let Some((offset, terminator)) = cur.find_any(&terminators) else {
            return Err("Unterminated edge text".to_string());
        };
        cur.pos += offset;
        cur.eat(terminator);
        let last = terminator.chars().last().unwrap_or('-');
        if last != '>' {
            cur.eat_run(last);
            eat_arrow_head(cur);
        }
    }

    cur.skip_ws();
    if cur.eat("|") {
        loop {
            match cur.bump() {
                Some('|') => break,
                Some(_) => {}
                None => return Err("Unterminated edge label".to_string()),
            }
        }
    }
    Ok(true)
}

fn eat_arrow_head(cur: &mut Cursor) -> bool {
    if cur.eat(">") {
        return true;
    }
    let head = cur.peek();
    let boundary = cur.peek_at(1).map_or(true, char::is_whitespace);
    if matches!(head, Some('x') | Some('o')) && boundary {
        cur.pos += 1;
        return true;
    }
    false
}

// ============================================================================
// Journey
// ============================================================================

fn parse_journey(header_line: usize, body: &[Line]) -> Result<(), ParseError> {
    let mut tasks = 0;

    for line in body {
        let text = line.text;

        if let Some(arg) = keyword_arg(text, "title").or_else(|| keyword_arg(text, "section")) {
            if arg.is_empty() {
                return Err(ParseError::new(line.number, "Expected text after keyword"));
            }
            continue;
        }
        if text.starts_with("accTitle") || text.starts_with("accDescr") {
            continue;
        }

        let mut parts = text.splitn(3, ':');
        let name = parts.next().unwrap_or_default().trim();
        let Some(score) = parts.next().map(str::trim) else {
            return Err(ParseError::new(
                line.number,
                format!("Expected 'task: score: actors', found '{}'", text),
            ));
        };
        if name.is_empty() {
            return Err(ParseError::new(line.number, "Journey task has no name"));
        }
        let score: u8 = score.parse().map_err(|_| {
            ParseError::new(
                line.number,
                format!("Task score '{}' is not an integer", score),
            )
        })?;
        if score > 5 {
            return Err(ParseError::new(
                line.number,
                format!("Task score {} is outside 0..5", score),
            ));
        }
        if parts.next().is_some_and(|actors| actors.trim().is_empty()) {
            return Err(ParseError::new(line.number, "Journey task is missing actors"));
        }
        tasks += 1;
    }

    if tasks == 0 {
        return Err(ParseError::new(header_line, "Journey has no tasks"));
    }
    Ok(())
}

// ============================================================================
// Delimiter balance
// ============================================================================

fn check_balance(lines: &[Line], brackets: bool) -> Result<(), ParseError> {
    let mut stack: Vec<(char, usize)> = Vec::new();

    for line in lines {
        let mut in_quote = false;
        for c in line.text.chars() {
            if in_quote {
                if c == '"' {
                    in_quote = false;
                }
                continue;
            }
            match c {
                '"' => in_quote = true,
                '(' | '[' | '{' if brackets => stack.push((c, line.number)),
                ')' | ']' | '}' if brackets => {
                    let expected = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match stack.pop() {
                        Some((open, _)) if open == expected => {}
                        _ => {
                            return Err(ParseError::new(
                                line.number,
                                format!("Unbalanced '{}'", c),
                            ))
                        }
                    }
                }
                _ => {}
            }
        }
        if in_quote {
            return Err(ParseError::new(line.number, "Unterminated string"));
        }
    }

    match stack.last() {
        Some((open, line)) => Err(ParseError::new(*line, format!("Unclosed '{}'", open))),
        None => Ok(()),
    }
}
