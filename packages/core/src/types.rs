// ABOUTME: Domain type definitions for prdsmith
// ABOUTME: Sessions, messages, structured PRD documents and diagram bookkeeping

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Default effort/value score when the model leaves it out or sends garbage
const DEFAULT_SCORE: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ============================================================================
// Sessions and messages
// ============================================================================

/// Which of the three UI steps a session has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SessionStep {
    /// PRD draft generated or being edited
    Draft = 1,
    /// Diagrams generated
    Diagrams = 2,
    /// Final document merged
    Final = 3,
}

impl From<SessionStep> for u8 {
    fn from(step: SessionStep) -> Self {
        step as u8
    }
}

impl TryFrom<u8> for SessionStep {
    type Error = ParseEnumError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SessionStep::Draft),
            2 => Ok(SessionStep::Diagrams),
            3 => Ok(SessionStep::Final),
            other => Err(ParseEnumError::new("session step", &other.to_string())),
        }
    }
}

/// Author of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(ParseEnumError::new("message role", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    pub current_step: SessionStep,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of the append-only edit history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Short PRD projection used by session listings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrdSummary {
    pub id: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    #[serde(flatten)]
    pub session: Session,
    pub prd: Option<PrdSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    pub messages: Vec<Message>,
    pub prd: Option<PrdRecord>,
}

// ============================================================================
// PRD document
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" | "p0" => Ok(Priority::High),
            "medium" | "p1" => Ok(Priority::Medium),
            "low" | "p2" => Ok(Priority::Low),
            other => Err(ParseEnumError::new("priority", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(lenient_enum(Value::deserialize(deserializer)?))
    }
}

/// Overall technical difficulty estimate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" | "low" => Ok(Difficulty::Easy),
            "medium" | "moderate" => Ok(Difficulty::Medium),
            "hard" | "high" => Ok(Difficulty::Hard),
            other => Err(ParseEnumError::new("difficulty", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(lenient_enum(Value::deserialize(deserializer)?))
    }
}

/// Unknown, null or non-string values fall back to the default variant
fn lenient_enum<T: FromStr + Default>(value: Value) -> T {
    value
        .as_str()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default()
}

/// Accepts numbers or numeric strings and clamps into 1..=5
fn deserialize_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let raw = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(raw
        .filter(|v| v.is_finite())
        .map(|v| v.round().clamp(1.0, 5.0) as u8)
        .unwrap_or(DEFAULT_SCORE))
}

/// Treats an explicit `null` the same as a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_score() -> u8 {
    DEFAULT_SCORE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: Priority,
    #[serde(default = "default_score", deserialize_with = "deserialize_score")]
    pub effort: u8,
    #[serde(default = "default_score", deserialize_with = "deserialize_score")]
    pub value: u8,
    #[serde(default, deserialize_with = "null_as_default")]
    pub acceptance_criteria: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetUsers {
    #[serde(default, deserialize_with = "null_as_default")]
    pub primary: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub secondary: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechFeasibility {
    #[serde(default, deserialize_with = "null_as_default")]
    pub overall: Difficulty,
    #[serde(default, deserialize_with = "null_as_default")]
    pub challenges: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub differences: String,
}

/// Structured PRD content as produced by generation and edits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrdDocument {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_users: TargetUsers,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pain_points: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub core_value: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<Feature>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub success_metrics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_feasibility: Option<TechFeasibility>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub competitors: Vec<Competitor>,
}

// ============================================================================
// Diagrams
// ============================================================================

/// The four Mermaid visualisations derived from a PRD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    Architecture,
    Journey,
    Features,
    Dataflow,
}

impl DiagramKind {
    /// Generation order for "generate all"
    pub const ALL: [DiagramKind; 4] = [
        DiagramKind::Architecture,
        DiagramKind::Journey,
        DiagramKind::Features,
        DiagramKind::Dataflow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramKind::Architecture => "architecture",
            DiagramKind::Journey => "journey",
            DiagramKind::Features => "features",
            DiagramKind::Dataflow => "dataflow",
        }
    }

    /// Human-readable name used in messages and prompts
    pub fn display_name(&self) -> &'static str {
        match self {
            DiagramKind::Architecture => "system architecture diagram",
            DiagramKind::Journey => "user journey diagram",
            DiagramKind::Features => "feature module diagram",
            DiagramKind::Dataflow => "data flow diagram",
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagramKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "architecture" => Ok(DiagramKind::Architecture),
            "journey" => Ok(DiagramKind::Journey),
            "features" => Ok(DiagramKind::Features),
            "dataflow" => Ok(DiagramKind::Dataflow),
            other => Err(ParseEnumError::new("diagram type", other)),
        }
    }
}

/// Stored Mermaid sources, one optional slot per kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramSet {
    #[serde(rename = "mermaidArchitecture")]
    pub architecture: Option<String>,
    #[serde(rename = "mermaidJourney")]
    pub journey: Option<String>,
    #[serde(rename = "mermaidFeatures")]
    pub features: Option<String>,
    #[serde(rename = "mermaidDataflow")]
    pub dataflow: Option<String>,
}

impl DiagramSet {
    pub fn get(&self, kind: DiagramKind) -> Option<&str> {
        match kind {
            DiagramKind::Architecture => self.architecture.as_deref(),
            DiagramKind::Journey => self.journey.as_deref(),
            DiagramKind::Features => self.features.as_deref(),
            DiagramKind::Dataflow => self.dataflow.as_deref(),
        }
    }

    pub fn set(&mut self, kind: DiagramKind, code: Option<String>) {
        let slot = match kind {
            DiagramKind::Architecture => &mut self.architecture,
            DiagramKind::Journey => &mut self.journey,
            DiagramKind::Features => &mut self.features,
            DiagramKind::Dataflow => &mut self.dataflow,
        };
        *slot = code;
    }

    /// Number of kinds holding non-blank source
    pub fn present_count(&self) -> usize {
        DiagramKind::ALL
            .iter()
            .filter(|kind| self.get(**kind).is_some_and(|code| !code.trim().is_empty()))
            .count()
    }
}

/// A persisted PRD row with decoded document fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrdRecord {
    pub id: String,
    pub session_id: String,
    #[serde(flatten)]
    pub document: PrdDocument,
    #[serde(flatten)]
    pub diagrams: DiagramSet,
    pub is_final: bool,
    pub final_content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
