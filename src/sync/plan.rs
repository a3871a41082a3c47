use std::collections::{HashMap, HashSet};

use crate::model::field::{FieldConfig, FieldValue, ProjectField};
use crate::model::mapping::FieldMapping;

/// Issues of `source` that also appear in `target`, in source order, each
/// at most once.
pub fn common_issues(source: &[String], target: &[String]) -> Vec<String> {
    let in_target: HashSet<&str> = target.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    source
        .iter()
        .filter(|issue| in_target.contains(issue.as_str()) && seen.insert(issue.as_str()))
        .cloned()
        .collect()
}

/// Name→field lookup of an issue's current values. A later field with the
/// same name replaces an earlier one.
pub fn index_by_name(fields: &[ProjectField]) -> HashMap<&str, &ProjectField> {
    fields.iter().map(|f| (f.name.as_str(), f)).collect()
}

/// What one mapping means for one issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPlan {
    /// The issue has no value for the mapping's source field.
    MissingSource,
    /// The target already holds the same value.
    Unchanged { value: FieldValue },
    Update {
        field: ProjectField,
        previous: FieldValue,
    },
}

/// Decide whether `mapping` requires a write on the target. The source value
/// is copied verbatim; kinds are not coerced.
pub fn plan_field_update(
    mapping: &FieldMapping,
    source_fields: &[ProjectField],
    target_fields: &HashMap<&str, &ProjectField>,
    target_configs: &[FieldConfig],
) -> FieldPlan {
    let Some(source) = source_fields
        .iter()
        .find(|f| f.name == mapping.source_field)
    else {
        return FieldPlan::MissingSource;
    };

    let existing = target_fields.get(mapping.target_field.as_str());
    if let Some(existing) = existing {
        if existing.value.same_as(&source.value) {
            return FieldPlan::Unchanged {
                value: existing.value.clone(),
            };
        }
    }

    let id = existing
        .map(|f| f.id.clone())
        .filter(|id| !id.is_empty())
        .or_else(|| {
            target_configs
                .iter()
                .find(|c| c.name == mapping.target_field)
                .map(|c| c.id.clone())
        })
        .unwrap_or_default();

    FieldPlan::Update {
        field: ProjectField::new(id, mapping.target_field.clone(), source.value.clone()),
        previous: existing.map(|f| f.value.clone()).unwrap_or_default(),
    }
}
