use std::collections::BTreeMap;

use thiserror::Error;

use super::model::{Category, Field, Respondent, SurveyDataset};

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// A rejected query: the caller named a field or value outside the schema.
///
/// Never produced for a well-formed filter that simply matches nobody.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown filter field '{field}' (expected one of: {})", field_names())]
    UnknownField { field: String, value: String },

    #[error(
        "'{value}' is not a valid {field} (expected one of: {})",
        field.labels().join(", ")
    )]
    InvalidValue { field: Field, value: String },

    #[error("filter field '{field}' supplied more than once")]
    DuplicateField { field: Field },

    #[error("cannot group by '{field}' (expected one of: {})", field_names())]
    UnknownGroupField { field: String },

    #[error("missing required parameter 'group_by'")]
    MissingGroupBy,

    #[error("parameter 'group_by' supplied more than once")]
    DuplicateGroupBy,
}

impl ValidationError {
    /// The offending field name, if the error names one.
    pub fn field(&self) -> Option<String> {
        match self {
            ValidationError::UnknownField { field, .. }
            | ValidationError::UnknownGroupField { field } => Some(field.clone()),
            ValidationError::InvalidValue { field, .. }
            | ValidationError::DuplicateField { field } => Some(field.name().to_string()),
            ValidationError::MissingGroupBy | ValidationError::DuplicateGroupBy => {
                Some("group_by".to_string())
            }
        }
    }

    /// The offending value, if the error names one.
    pub fn value(&self) -> Option<&str> {
        match self {
            ValidationError::UnknownField { value, .. }
            | ValidationError::InvalidValue { value, .. } => Some(value),
            _ => None,
        }
    }
}

fn field_names() -> String {
    Field::ALL.map(Field::name).join(", ")
}

// ---------------------------------------------------------------------------
// Filter criteria: at most one required value per field
// ---------------------------------------------------------------------------

/// Validated filter: field → required category.
///
/// A field that is absent is unconstrained; the empty criteria match every
/// respondent. Fields are combined with AND, so insertion order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    required: BTreeMap<Field, Category>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `(field, value)` pairs against the survey schema.
    ///
    /// Every pair is checked before any filtering happens: an unknown field,
    /// a value outside the field's closed set or a repeated field fails the
    /// whole set.
    pub fn parse<I, K, V>(pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut criteria = FilterCriteria::new();
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            let field = Field::parse(key).ok_or_else(|| ValidationError::UnknownField {
                field: key.to_string(),
                value: value.to_string(),
            })?;
            let category = field
                .category(value)
                .ok_or_else(|| ValidationError::InvalidValue {
                    field,
                    value: value.to_string(),
                })?;
            if criteria.required.insert(field, category).is_some() {
                return Err(ValidationError::DuplicateField { field });
            }
        }
        Ok(criteria)
    }

    /// Add (or replace) the requirement for `category`'s field.
    pub fn with(mut self, category: Category) -> Self {
        self.required.insert(category.field(), category);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }

    pub fn len(&self) -> usize {
        self.required.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, Category)> + '_ {
        self.required.iter().map(|(f, c)| (*f, *c))
    }

    /// Whether `respondent` satisfies every requirement.
    pub fn matches(&self, respondent: &Respondent) -> bool {
        self.required
            .iter()
            .all(|(field, wanted)| respondent.category(*field) == *wanted)
    }

    /// Respondents passing the filter, in dataset order.
    pub fn select<'a>(
        &'a self,
        dataset: &'a SurveyDataset,
    ) -> impl Iterator<Item = &'a Respondent> + 'a {
        dataset.all().iter().filter(move |r| self.matches(r))
    }
}
