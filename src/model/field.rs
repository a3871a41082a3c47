use std::fmt;

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Date,
    SingleSelect,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Date => write!(f, "date"),
            FieldKind::SingleSelect => write!(f, "single select"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub id: String,
    pub name: String,
}

/// A field a board exposes. Only date and single-select fields are modeled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldConfig {
    pub id: String,
    pub name: String,
    pub kind: FieldKind,
    pub options: Vec<SelectOption>,
}

impl FieldConfig {
    pub fn date(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: FieldKind::Date,
            options: Vec::new(),
        }
    }

    pub fn single_select(
        id: impl Into<String>,
        name: impl Into<String>,
        options: Vec<SelectOption>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: FieldKind::SingleSelect,
            options,
        }
    }

    pub fn option_id(&self, option_name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.name == option_name)
            .map(|o| o.id.as_str())
    }
}

/// Value of one field on one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldValue {
    Date(NaiveDate),
    /// Name of the selected single-select option.
    Text(String),
    #[default]
    Absent,
}

impl FieldValue {
    /// Sync equality: both dates and calendar-equal, or both text and
    /// byte-equal. Anything involving `Absent` is never the same, including
    /// absent against absent.
    pub fn same_as(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Date(a), FieldValue::Date(b)) => a == b,
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Text(t) => f.write_str(t),
            FieldValue::Absent => f.write_str("<unset>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectField {
    /// Field configuration ID; empty when not known yet.
    pub id: String,
    pub name: String,
    pub value: FieldValue,
}

impl ProjectField {
    pub fn new(id: impl Into<String>, name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value,
        }
    }
}
