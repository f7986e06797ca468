// ABOUTME: Prompt templates for PRD generation, editing and finalization
// ABOUTME: Renders PRD content as readable Markdown for the final merge prompt

use std::fmt::Write;

use prdsmith_core::{DiagramKind, DiagramSet, PrdDocument};

use crate::error::Result;
use crate::merge::TargetField;

pub const GENERATE_SYSTEM_PROMPT: &str = "You are a senior product manager who turns rough product ideas \
into structured, buildable product requirements documents. Be concrete, consider real delivery \
constraints, and always answer with a single JSON object.";

pub const EDIT_SYSTEM_PROMPT: &str = "You edit product requirements documents. Change only what the \
instruction asks for and leave every other field exactly as it is. Reply with one valid JSON object, \
no Markdown fences and no commentary.";

pub const FINALIZE_SYSTEM_PROMPT: &str = "You are a technical writer who merges a PRD draft and its \
Mermaid diagrams into one deliverable Markdown document. Embed every diagram inside the section it \
illustrates, surrounded by prose that explains it. Describe architecture, interfaces and data models \
in natural language, tables or diagrams; never include source code. Return Markdown only.";

const PRD_SCHEMA: &str = r#"{
  "title": "Product name",
  "description": "One sentence: what it is and who it helps",
  "background": "Market context, opportunity and the problem solved",
  "targetUsers": {
    "primary": ["Primary persona with role, context and pain"],
    "secondary": ["Secondary persona"]
  },
  "painPoints": ["Pain point"],
  "coreValue": ["Value proposition"],
  "features": [
    {
      "id": "feature_1",
      "name": "Feature name",
      "description": "What the feature does",
      "priority": "high",
      "effort": 3,
      "value": 4,
      "acceptanceCriteria": ["Testable criterion"]
    }
  ],
  "successMetrics": ["Measurable metric"],
  "techFeasibility": {
    "overall": "medium",
    "challenges": ["Technical challenge"],
    "recommendations": ["Recommendation"]
  },
  "competitors": [
    {
      "name": "Competitor",
      "features": ["Core feature"],
      "differences": "How we differ"
    }
  ]
}"#;

pub fn generate_prompt(idea: &str) -> String {
    format!(
        r#"Write a complete PRD for the following product idea.

Idea: {idea}

Answer with JSON in exactly this structure:

{PRD_SCHEMA}

Guidance:
- painPoints, coreValue and successMetrics: 3-5 entries each
- features: 6-10 entries; priority is high, medium or low; effort and value are integers 1-5;
  2-3 acceptance criteria per feature
- techFeasibility.overall is easy, medium or hard with 2-3 challenges and recommendations
- competitors: 2-3 entries

The reply must be valid JSON that parses as-is."#
    )
}

pub fn edit_prompt(
    current: &PrdDocument,
    instruction: &str,
    target: Option<TargetField>,
) -> Result<String> {
    let current_json = serde_json::to_string_pretty(current)?;
    let mut prompt = format!(
        "# Current PRD\n\n```json\n{}\n```\n\n# Instruction\n\n{}\n",
        current_json, instruction
    );

    if let Some(field) = target {
        let _ = write!(
            prompt,
            "\n# Target field\n\nOnly `{}` should change. Keep every other field as it is.\n",
            field
        );
    }

    prompt.push_str(
        "\n# Output\n\nReturn the updated PRD as JSON with the same structure and types. \
Fields you did not change may be omitted. No explanations.\n",
    );
    Ok(prompt)
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- none".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Every PRD field as Markdown, in document order
pub fn render_prd_markdown(prd: &PrdDocument) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "## Basics\n");
    let _ = writeln!(out, "- **Title**: {}", prd.title);
    let _ = writeln!(out, "- **Description**: {}", prd.description);
    if let Some(background) = &prd.background {
        let _ = writeln!(out, "- **Background**: {}", background);
    }

    let _ = writeln!(out, "\n## Target users\n");
    let _ = writeln!(out, "**Primary**:\n{}", bullet_list(&prd.target_users.primary));
    if !prd.target_users.secondary.is_empty() {
        let _ = writeln!(
            out,
            "\n**Secondary**:\n{}",
            bullet_list(&prd.target_users.secondary)
        );
    }

    let _ = writeln!(out, "\n## Pain points\n\n{}", bullet_list(&prd.pain_points));
    let _ = writeln!(out, "\n## Core value\n\n{}", bullet_list(&prd.core_value));

    let _ = writeln!(out, "\n## Features");
    for feature in &prd.features {
        let _ = writeln!(
            out,
            "\n### {} (priority: {}, effort: {}/5, value: {}/5)\n",
            feature.name,
            feature.priority.as_str(),
            feature.effort,
            feature.value
        );
        if !feature.description.is_empty() {
            let _ = writeln!(out, "{}\n", feature.description);
        }
        let _ = writeln!(
            out,
            "**Acceptance criteria**:\n{}",
            bullet_list(&feature.acceptance_criteria)
        );
    }

    let _ = writeln!(
        out,
        "\n## Success metrics\n\n{}",
        bullet_list(&prd.success_metrics)
    );

    let _ = writeln!(out, "\n## Technical feasibility\n");
    match &prd.tech_feasibility {
        Some(tech) => {
            let _ = writeln!(out, "**Overall**: {}\n", tech.overall.as_str());
            let _ = writeln!(out, "**Challenges**:\n{}\n", bullet_list(&tech.challenges));
            let _ = writeln!(
                out,
                "**Recommendations**:\n{}",
                bullet_list(&tech.recommendations)
            );
        }
        None => {
            let _ = writeln!(out, "**Overall**: unknown");
        }
    }

    let _ = writeln!(out, "\n## Competitors");
    if prd.competitors.is_empty() {
        let _ = writeln!(out, "\n- none");
    }
    for competitor in &prd.competitors {
        let differences = if competitor.differences.is_empty() {
            "not stated"
        } else {
            competitor.differences.as_str()
        };
        let _ = writeln!(
            out,
            "\n### {}\n\n**Features**: {}\n**Differences**: {}",
            competitor.name,
            competitor.features.join(", "),
            differences
        );
    }

    out
}

/// Section of the final document each diagram belongs in
fn diagram_home(kind: DiagramKind) -> &'static str {
    match kind {
        DiagramKind::Architecture | DiagramKind::Dataflow => "Technical solution",
        DiagramKind::Journey => "User analysis",
        DiagramKind::Features => "Feature planning",
    }
}

pub fn finalize_prompt(prd: &PrdDocument, diagrams: &DiagramSet) -> String {
    let mut prompt = String::from("# Task\n\nMerge the PRD below into one complete, deliverable Markdown document.\n\n# PRD\n\n");
    prompt.push_str(&render_prd_markdown(prd));

    prompt.push_str("\n# Mermaid diagrams (embed each in its section)\n");
    for kind in DiagramKind::ALL {
        let code = diagrams
            .get(kind)
            .filter(|code| !code.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("%% no {} diagram", kind));
        let _ = write!(
            prompt,
            "\n## {} (goes in \"{}\")\n\n```mermaid\n{}\n```\n",
            kind.display_name(),
            diagram_home(kind),
            code
        );
    }

    prompt.push_str(
        r#"
# Output

Produce the full document with these sections and no table of contents:

1. Document info (title, version, date)
2. Product background (context, opportunity, problem)
3. User analysis (users, personas, pain points, user journey diagram)
4. Feature planning (features, priorities, acceptance criteria, feature module diagram)
5. Success metrics (KPIs and how they are measured)
6. Technical solution (architecture diagram, data flow diagram, stack, API principles, data model concepts)
7. Delivery plan (phases, milestones, resources)
8. Risks (technical, market, mitigations)
9. Appendix (glossary, references)

Keep the PRD title as the document title. Put explanatory text before and after every diagram.
Return Markdown only.
"#,
    );
    prompt
}
