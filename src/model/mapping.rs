use crate::error::MappingError;

/// Copy the value of `source_field` on the source board into `target_field`
/// on the target board. Names are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub source_field: String,
    pub target_field: String,
}

impl FieldMapping {
    pub fn new(source_field: impl Into<String>, target_field: impl Into<String>) -> Self {
        Self {
            source_field: source_field.into(),
            target_field: target_field.into(),
        }
    }
}

/// Parse `source=target` strings in order. Duplicates are kept; whether the
/// named fields exist is only checked per issue during the sync.
pub fn parse_field_mappings<I, S>(raw: I) -> Result<Vec<FieldMapping>, MappingError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .map(|entry| {
            let entry = entry.as_ref();
            let parts: Vec<&str> = entry.split('=').collect();
            if parts.len() != 2 {
                return Err(MappingError::InvalidFormat(entry.to_string()));
            }
            let (source, target) = (parts[0].trim(), parts[1].trim());
            if source.is_empty() || target.is_empty() {
                return Err(MappingError::EmptyName(entry.to_string()));
            }
            Ok(FieldMapping::new(source, target))
        })
        .collect()
}
