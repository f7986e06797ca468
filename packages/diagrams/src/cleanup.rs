// ABOUTME: Post-processing applied to raw model output before validation and storage
// ABOUTME: Strips code fences, normalizes blank lines and fixes common journey mistakes

use lazy_static::lazy_static;
use prdsmith_core::DiagramKind;
use regex::Regex;

lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)```").unwrap();
    static ref TRAILING_NOTE: Regex = Regex::new(r"\s*[(（][^()（）]*[)）]$").unwrap();
}

/// Normalize model output into bare Mermaid source.
///
/// The first fenced block wins when one exists; otherwise stray fence
/// markers are removed. Whitespace-only lines are emptied, runs of blank
/// lines collapse to one, and the result is trimmed.
pub fn clean_mermaid(raw: &str, kind: DiagramKind) -> String {
    let body = match FENCED_BLOCK.captures(raw).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().to_string(),
        None => raw
            .lines()
            .filter(|line| !line.trim_start().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n"),
    };

    let mut lines: Vec<String> = Vec::new();
    for line in body.lines() {
        let mut line = line.trim_end().to_string();
        if kind == DiagramKind::Journey && line.contains(':') {
            // Parenthetical notes after the actor list break the task grammar
            line = TRAILING_NOTE.replace(&line, "").into_owned();
        }
        let previous_blank = lines.last().is_some_and(|prev| prev.is_empty());
        if line.is_empty() && previous_blank {
            continue;
        }
        lines.push(line);
    }

    lines.join("\n").trim().to_string()
}
