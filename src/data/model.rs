use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::loader::LoadError;

// ---------------------------------------------------------------------------
// Closed categorical value sets
// ---------------------------------------------------------------------------

/// Declares a closed set of categorical labels as a fieldless enum.
///
/// Each generated type gets `ALL` (declaration order), `label()`,
/// `from_label()` (exact, case-sensitive) and `ordinal()`.
macro_rules! categorical {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            pub fn from_label(label: &str) -> Option<Self> {
                match label {
                    $($label => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn ordinal(self) -> usize {
                self as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

categorical!(
    /// Respondent age bracket.
    AgeGroup {
        From18To29 => "18-29",
        From30To44 => "30-44",
        From45To64 => "45-64",
        Over65 => "65+",
    }
);

categorical!(
    Gender {
        Male => "Male",
        Female => "Female",
        NonBinary => "Non-binary",
    }
);

categorical!(
    /// Self-reported race / ethnicity.
    Race {
        White => "White",
        Black => "Black",
        Hispanic => "Hispanic",
        Asian => "Asian",
        Other => "Other",
    }
);

categorical!(
    /// Highest completed education level.
    Education {
        HighSchoolOrLess => "High school or less",
        SomeCollege => "Some college",
        Bachelors => "Bachelor's",
        Graduate => "Graduate",
    }
);

categorical!(
    /// Annual household income band (USD).
    Income {
        Under30k => "<30k",
        From30kTo60k => "30-60k",
        From60kTo100k => "60-100k",
        From100kTo150k => "100-150k",
        Over150k => "150k+",
    }
);

/// Largest closed set among the categorical fields.
pub const MAX_CATEGORIES: usize = 5;

// ---------------------------------------------------------------------------
// Field – the five filterable / groupable columns
// ---------------------------------------------------------------------------

/// A categorical column of the survey schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    AgeGroup,
    Gender,
    Race,
    Education,
    Income,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::AgeGroup,
        Field::Gender,
        Field::Race,
        Field::Education,
        Field::Income,
    ];

    /// Column / parameter name.
    pub fn name(self) -> &'static str {
        match self {
            Field::AgeGroup => "age_group",
            Field::Gender => "gender",
            Field::Race => "race",
            Field::Education => "education",
            Field::Income => "income",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Every accepted label for this field, in declaration order.
    pub fn labels(self) -> Vec<&'static str> {
        match self {
            Field::AgeGroup => AgeGroup::ALL.iter().map(|v| v.label()).collect(),
            Field::Gender => Gender::ALL.iter().map(|v| v.label()).collect(),
            Field::Race => Race::ALL.iter().map(|v| v.label()).collect(),
            Field::Education => Education::ALL.iter().map(|v| v.label()).collect(),
            Field::Income => Income::ALL.iter().map(|v| v.label()).collect(),
        }
    }

    /// Resolve `label` against this field's closed set.
    pub fn category(self, label: &str) -> Option<Category> {
        Some(match self {
            Field::AgeGroup => Category::AgeGroup(AgeGroup::from_label(label)?),
            Field::Gender => Category::Gender(Gender::from_label(label)?),
            Field::Race => Category::Race(Race::from_label(label)?),
            Field::Education => Category::Education(Education::from_label(label)?),
            Field::Income => Category::Income(Income::from_label(label)?),
        })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Category – a typed value of any categorical field
// ---------------------------------------------------------------------------

/// One value of one categorical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Category {
    AgeGroup(AgeGroup),
    Gender(Gender),
    Race(Race),
    Education(Education),
    Income(Income),
}

impl Category {
    pub fn field(self) -> Field {
        match self {
            Category::AgeGroup(_) => Field::AgeGroup,
            Category::Gender(_) => Field::Gender,
            Category::Race(_) => Field::Race,
            Category::Education(_) => Field::Education,
            Category::Income(_) => Field::Income,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::AgeGroup(v) => v.label(),
            Category::Gender(v) => v.label(),
            Category::Race(v) => v.label(),
            Category::Education(v) => v.label(),
            Category::Income(v) => v.label(),
        }
    }

    /// Position within the field's closed set; always `< MAX_CATEGORIES`.
    pub fn ordinal(self) -> usize {
        match self {
            Category::AgeGroup(v) => v.ordinal(),
            Category::Gender(v) => v.ordinal(),
            Category::Race(v) => v.ordinal(),
            Category::Education(v) => v.ordinal(),
            Category::Income(v) => v.ordinal(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Respondent – one row of the survey table
// ---------------------------------------------------------------------------

/// A single survey respondent. `Copy`, so callers only ever hold values or
/// shared references, never a handle into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Respondent {
    pub id: i64,
    pub age_group: AgeGroup,
    pub gender: Gender,
    pub race: Race,
    pub education: Education,
    pub income: Income,
    pub supports_policy: bool,
}

impl Respondent {
    /// The respondent's value for a categorical field.
    pub fn category(&self, field: Field) -> Category {
        match field {
            Field::AgeGroup => Category::AgeGroup(self.age_group),
            Field::Gender => Category::Gender(self.gender),
            Field::Race => Category::Race(self.race),
            Field::Education => Category::Education(self.education),
            Field::Income => Category::Income(self.income),
        }
    }
}

// ---------------------------------------------------------------------------
// SurveyDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full, validated respondent table. Immutable once constructed.
#[derive(Debug, Clone, Default)]
pub struct SurveyDataset {
    respondents: Vec<Respondent>,
}

impl SurveyDataset {
    /// Build the dataset, rejecting duplicate ids.
    pub fn from_respondents(respondents: Vec<Respondent>) -> Result<Self, LoadError> {
        // id → 1-based row of first occurrence
        let mut seen: HashMap<i64, usize> = HashMap::with_capacity(respondents.len());
        for (i, r) in respondents.iter().enumerate() {
            if let Some(first_row) = seen.insert(r.id, i + 1) {
                return Err(LoadError::DuplicateId {
                    id: r.id,
                    first_row,
                    row: i + 1,
                });
            }
        }
        Ok(SurveyDataset { respondents })
    }

    /// All respondents in load order.
    pub fn all(&self) -> &[Respondent] {
        &self.respondents
    }

    pub fn len(&self) -> usize {
        self.respondents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.respondents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn respondent(id: i64) -> Respondent {
        Respondent {
            id,
            age_group: AgeGroup::From30To44,
            gender: Gender::Female,
            race: Race::Asian,
            education: Education::Graduate,
            income: Income::Over150k,
            supports_policy: true,
        }
    }

    #[test]
    fn labels_resolve_exactly() {
        assert_eq!(Gender::from_label("Non-binary"), Some(Gender::NonBinary));
        assert_eq!(Gender::from_label("female"), None);
        assert_eq!(Education::from_label("Bachelor's"), Some(Education::Bachelors));
        assert_eq!(Income::from_label("150k+").map(Income::label), Some("150k+"));
    }

    #[test]
    fn field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::parse(field.name()), Some(field));
        }
        assert_eq!(Field::parse("political_party"), None);
        assert_eq!(Field::parse("Gender"), None);
    }

    #[test]
    fn closed_sets_have_declared_sizes() {
        assert_eq!(Field::AgeGroup.labels().len(), 4);
        assert_eq!(Field::Gender.labels().len(), 3);
        assert_eq!(Field::Race.labels().len(), 5);
        assert_eq!(Field::Education.labels().len(), 4);
        assert_eq!(Field::Income.labels().len(), 5);
        for field in Field::ALL {
            assert!(field.labels().len() <= MAX_CATEGORIES);
        }
    }

    #[test]
    fn category_knows_its_field() {
        let r = respondent(1);
        for field in Field::ALL {
            let cat = r.category(field);
            assert_eq!(cat.field(), field);
            assert_eq!(field.category(cat.label()), Some(cat));
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = SurveyDataset::from_respondents(vec![respondent(1), respondent(2), respondent(1)])
            .unwrap_err();
        match err {
            LoadError::DuplicateId { id, first_row, row } => {
                assert_eq!((id, first_row, row), (1, 1, 3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_dataset_is_valid() {
        let ds = SurveyDataset::from_respondents(Vec::new()).unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.all().len(), 0);
    }
}
