// ABOUTME: Prompt builders for Mermaid diagram generation and editing
// ABOUTME: One builder per diagram kind, each embedding a PRD snapshot and syntax constraints

use prdsmith_core::{DiagramKind, PrdDocument};

pub const DIAGRAM_SYSTEM_PROMPT: &str = "You are a senior system architect and product designer who draws clear, \
accurate diagrams in the Mermaid language.

Strict syntax rules:
1. Node ids are short ASCII identifiers (A, B, C or Node1, Node2); display text goes in brackets: A[Text], B(Rounded), C[(Database)].
2. Edges use A --> B or A -->|label| B; edge labels are one to four words.
3. Every node definition and every edge sits on its own line.
4. Node text is concise (at most eight words) and never contains brackets or quotes.
5. Never use HTML tags such as <br/> or <div>.
6. Never use mindmap syntax; use graph LR or graph TD.

Output only Mermaid code, optionally wrapped in a ```mermaid fence, with no explanation.";

pub const DIAGRAM_EDIT_SYSTEM_PROMPT: &str = "You are a diagram editing assistant. Apply the user's \
instruction to the existing Mermaid diagram, keep the syntax valid, and return only the updated Mermaid code \
without any explanation.";

const FLOW_CONSTRAINTS: &str = "# Syntax constraints (the diagram will not render otherwise)

- One node definition or edge per line
- Keep node text short; use numbered ids for long names
- Correct forms: A[User], B[Frontend], C[(Database)]
- Edge forms: A --> B or A -->|data| B
- No HTML tags, no brackets or quotes inside node text
- Split complex content across several nodes instead of one crowded node";

/// Build the generation prompt for one diagram kind
pub fn diagram_prompt(kind: DiagramKind, prd: &PrdDocument) -> String {
    match kind {
        DiagramKind::Architecture => architecture_prompt(prd),
        DiagramKind::Journey => journey_prompt(prd),
        DiagramKind::Features => features_prompt(prd),
        DiagramKind::Dataflow => dataflow_prompt(prd),
    }
}

fn product_header(prd: &PrdDocument) -> String {
    format!(
        "**Product**: {}\n**Description**: {}",
        prd.title, prd.description
    )
}

fn feature_lines(prd: &PrdDocument) -> String {
    prd.features
        .iter()
        .map(|f| format!("- {}: {}", f.name, f.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn difficulty(prd: &PrdDocument) -> &'static str {
    prd.tech_feasibility
        .as_ref()
        .map(|tech| tech.overall.as_str())
        .unwrap_or("unknown")
}

fn architecture_prompt(prd: &PrdDocument) -> String {
    format!(
        "# Task

Draw the system architecture of the product below as a Mermaid `graph TD` diagram.

# PRD

{header}

**Core features**:
{features}

**Technical difficulty**: {difficulty}

# Requirements

1. Use `graph TD` (top to bottom)
2. Show the layers: frontend, backend services, data stores, external services where needed
3. Suggest a technology for each layer in the node text
4. Connect components with arrows that follow the data flow

{constraints}

# Output

Return only Mermaid code, for example:
```mermaid
graph TD
    A[User] --> B[Web UI]
    B --> C[API Service]
    C --> D[(Database)]
    C --> E[AI Service]
```",
        header = product_header(prd),
        features = feature_lines(prd),
        difficulty = difficulty(prd),
        constraints = FLOW_CONSTRAINTS,
    )
}

fn journey_prompt(prd: &PrdDocument) -> String {
    let pain_points = if prd.pain_points.is_empty() {
        "none".to_string()
    } else {
        prd.pain_points
            .iter()
            .map(|p| format!("- {}", p))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let secondary = if prd.target_users.secondary.is_empty() {
        String::new()
    } else {
        format!(
            "\n- Secondary users: {}",
            prd.target_users.secondary.join(", ")
        )
    };
    let features = prd
        .features
        .iter()
        .take(5)
        .map(|f| format!("- {}", f.name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "# Task

Draw the typical user journey of the product below as a Mermaid `journey` diagram.

# PRD

{header}

**Target users**:
- Primary users: {primary}{secondary}

**Pain points**:
{pain_points}

**Core features**:
{features}

# Requirements

1. Use the `journey` diagram type
2. Cover the complete flow in four to six key steps grouped into sections
3. Give every step a satisfaction score from 0 to 5 (5 = delighted)

# Syntax constraints (the diagram will not render otherwise)

- One step per line in the form `Step name: score: actor`
- Keep step names and section titles short
- No HTML tags, no parentheses after the actor list

# Output

Return only Mermaid code, for example:
```mermaid
journey
    title Using the product
    section Sign up
      Visit site: 4: User
      Create account: 3: User
    section Core flow
      Use feature A: 5: User
      Review result: 5: User
```",
        header = product_header(prd),
        primary = prd.target_users.primary.join(", "),
        secondary = secondary,
        pain_points = pain_points,
        features = features,
    )
}

fn features_prompt(prd: &PrdDocument) -> String {
    let features = prd
        .features
        .iter()
        .map(|f| {
            format!(
                "- **{}** (priority: {}): {}",
                f.name,
                f.priority.as_str(),
                f.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "# Task

Draw the feature module structure of the product below as a Mermaid `graph LR` diagram.

# PRD

{header}

**Feature list**:
{features}

# Requirements

1. Use `graph LR` (left to right); never use mindmap
2. Group features into modules by type or priority
3. Place high-priority features closest to the product root

{constraints}

# Output

Return only Mermaid code, for example:
```mermaid
graph LR
    A[Product] --> B[User Management]
    A --> C[Core Features]
    C --> C1[Feature A]
    C --> C2[Feature B]
```",
        header = product_header(prd),
        features = features,
        constraints = FLOW_CONSTRAINTS,
    )
}

fn dataflow_prompt(prd: &PrdDocument) -> String {
    format!(
        "# Task

Draw how data moves through the product below as a Mermaid `graph TD` diagram.

# PRD

{header}

**Core features**:
{features}

**Technical difficulty**: {difficulty}

# Requirements

1. Use `graph TD`
2. Show where user input enters, how it passes between components, how it is
   validated and transformed, and where it is finally stored or displayed
3. Label edges with the kind of data that moves

{constraints}

# Output

Return only Mermaid code, for example:
```mermaid
graph TD
    A[User Input] -->|submit| B[Validation]
    B -->|ok| C[Processing]
    B -->|fail| D[Error Message]
    C -->|save| E[(Database)]
```",
        header = product_header(prd),
        features = feature_lines(prd),
        difficulty = difficulty(prd),
        constraints = FLOW_CONSTRAINTS,
    )
}

/// Build the prompt that rewrites an existing diagram per a user instruction
pub fn diagram_edit_prompt(kind: DiagramKind, current_code: &str, instruction: &str) -> String {
    format!(
        "# Task

The user wants to change the {name}. Update the Mermaid code according to the instruction.

# Current diagram

```
{current_code}
```

# Instruction

{instruction}

# Requirements

1. Keep the Mermaid syntax valid
2. No HTML tags such as <br/>
3. Keep node text short and on one line
4. Return only the updated Mermaid code with no explanation",
        name = kind.display_name(),
        current_code = current_code,
        instruction = instruction,
    )
}
