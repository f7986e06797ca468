// ABOUTME: Merge of model edit output onto a stored PRD
// ABOUTME: Only fields the model returned overwrite stored values; hints name editable fields

use std::fmt;
use std::str::FromStr;

use prdsmith_core::{Competitor, Feature, PrdDocument, TargetUsers, TechFeasibility};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{PrdError, Result};
use crate::parse::missing_fields;

/// A top-level PRD field an edit can be pointed at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetField {
    Title,
    Description,
    Background,
    TargetUsers,
    PainPoints,
    CoreValue,
    Features,
    SuccessMetrics,
    TechFeasibility,
    Competitors,
}

impl TargetField {
    pub const ALL: [TargetField; 10] = [
        TargetField::Title,
        TargetField::Description,
        TargetField::Background,
        TargetField::TargetUsers,
        TargetField::PainPoints,
        TargetField::CoreValue,
        TargetField::Features,
        TargetField::SuccessMetrics,
        TargetField::TechFeasibility,
        TargetField::Competitors,
    ];

    /// Wire name, matching the camelCase JSON key
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetField::Title => "title",
            TargetField::Description => "description",
            TargetField::Background => "background",
            TargetField::TargetUsers => "targetUsers",
            TargetField::PainPoints => "painPoints",
            TargetField::CoreValue => "coreValue",
            TargetField::Features => "features",
            TargetField::SuccessMetrics => "successMetrics",
            TargetField::TechFeasibility => "techFeasibility",
            TargetField::Competitors => "competitors",
        }
    }
}

impl fmt::Display for TargetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetField {
    type Err = PrdError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        TargetField::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<&str> = TargetField::ALL.iter().map(|f| f.as_str()).collect();
                PrdError::Validation(format!(
                    "unknown target field '{}', expected one of: {}",
                    wanted,
                    known.join(", ")
                ))
            })
    }
}

/// Edit reply where every field is optional. Fields the model left out or
/// set to null keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrdPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub background: Option<String>,
    pub target_users: Option<TargetUsers>,
    pub pain_points: Option<Vec<String>>,
    pub core_value: Option<Vec<String>>,
    pub features: Option<Vec<Feature>>,
    pub success_metrics: Option<Vec<String>>,
    pub tech_feasibility: Option<TechFeasibility>,
    pub competitors: Option<Vec<Competitor>>,
}

impl PrdPatch {
    pub fn from_object(map: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(map))
            .map_err(|e| PrdError::MalformedResponse(format!("edit shape mismatch: {}", e)))
    }

    /// Fields this patch would overwrite
    pub fn touched(&self) -> Vec<TargetField> {
        TargetField::ALL
            .into_iter()
            .filter(|field| self.touches(*field))
            .collect()
    }

    fn touches(&self, field: TargetField) -> bool {
        match field {
            TargetField::Title => self.title.is_some(),
            TargetField::Description => self.description.is_some(),
            TargetField::Background => self.background.is_some(),
            TargetField::TargetUsers => self.target_users.is_some(),
            TargetField::PainPoints => self.pain_points.is_some(),
            TargetField::CoreValue => self.core_value.is_some(),
            TargetField::Features => self.features.is_some(),
            TargetField::SuccessMetrics => self.success_metrics.is_some(),
            TargetField::TechFeasibility => self.tech_feasibility.is_some(),
            TargetField::Competitors => self.competitors.is_some(),
        }
    }
}

/// Apply `patch` to `existing` and re-check the required fields
pub fn merge_document(existing: &PrdDocument, patch: PrdPatch) -> Result<PrdDocument> {
    debug!("Merging edit touching {:?}", patch.touched());
    let mut merged = existing.clone();

    if let Some(title) = patch.title {
        merged.title = title;
    }
    if let Some(description) = patch.description {
        merged.description = description;
    }
    if let Some(background) = patch.background {
        merged.background = Some(background);
    }
    if let Some(target_users) = patch.target_users {
        merged.target_users = target_users;
    }
    if let Some(pain_points) = patch.pain_points {
        merged.pain_points = pain_points;
    }
    if let Some(core_value) = patch.core_value {
        merged.core_value = core_value;
    }
    if let Some(features) = patch.features {
        merged.features = features;
    }
    if let Some(success_metrics) = patch.success_metrics {
        merged.success_metrics = success_metrics;
    }
    if let Some(tech_feasibility) = patch.tech_feasibility {
        merged.tech_feasibility = Some(tech_feasibility);
    }
    if let Some(competitors) = patch.competitors {
        merged.competitors = competitors;
    }

    let missing = missing_fields(&merged);
    if !missing.is_empty() {
        warn!("Edit would leave PRD without {:?}", missing);
        return Err(PrdError::IncompleteDocument(missing));
    }
    Ok(merged)
}
