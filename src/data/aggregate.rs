use serde::Serialize;

use super::filter::{FilterCriteria, ValidationError};
use super::model::{Category, Field, Respondent, SurveyDataset, MAX_CATEGORIES};

// ---------------------------------------------------------------------------
// Result records
// ---------------------------------------------------------------------------

/// Respondent count and support rate for one selection.
///
/// `support_rate` is `None` exactly when `count == 0`; otherwise it lies in
/// `[0, 1]` at full precision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SupportSummary {
    pub count: usize,
    pub support_rate: Option<f64>,
}

/// One partition of a grouped query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupSupport {
    pub group_value: Category,
    pub count: usize,
    pub support_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    count: usize,
    supporters: usize,
}

impl Tally {
    fn add(&mut self, respondent: &Respondent) {
        self.count += 1;
        if respondent.supports_policy {
            self.supporters += 1;
        }
    }

    fn support_rate(self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.supporters as f64 / self.count as f64)
        }
    }

    fn summary(self) -> SupportSummary {
        SupportSummary {
            count: self.count,
            support_rate: self.support_rate(),
        }
    }
}

fn summarize<'a>(rows: impl Iterator<Item = &'a Respondent>) -> SupportSummary {
    let mut tally = Tally::default();
    rows.for_each(|r| tally.add(r));
    tally.summary()
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Support rate across the whole dataset.
pub fn overall_rate(dataset: &SurveyDataset) -> SupportSummary {
    summarize(dataset.all().iter())
}

/// Support rate among respondents matching already-validated criteria.
pub fn filtered_summary(dataset: &SurveyDataset, criteria: &FilterCriteria) -> SupportSummary {
    summarize(criteria.select(dataset))
}

/// Validate raw `(field, value)` criteria, then compute the support rate of
/// the matching respondents. No match is a zero-count success, not an error.
pub fn filtered_rate<I, K, V>(
    dataset: &SurveyDataset,
    criteria: I,
) -> Result<SupportSummary, ValidationError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let criteria = FilterCriteria::parse(criteria)?;
    Ok(filtered_summary(dataset, &criteria))
}

/// Per-value support rates for `field` among respondents matching `criteria`.
///
/// Only values present in the selection are reported, in order of first
/// appearance in the dataset.
pub fn grouped_summary(
    dataset: &SurveyDataset,
    field: Field,
    criteria: &FilterCriteria,
) -> Vec<GroupSupport> {
    // category ordinal → index into `groups`
    let mut slots: [Option<usize>; MAX_CATEGORIES] = [None; MAX_CATEGORIES];
    let mut groups: Vec<(Category, Tally)> = Vec::new();

    for respondent in criteria.select(dataset) {
        let category = respondent.category(field);
        let pos = *slots[category.ordinal()].get_or_insert_with(|| {
            groups.push((category, Tally::default()));
            groups.len() - 1
        });
        groups[pos].1.add(respondent);
    }

    groups
        .into_iter()
        .map(|(group_value, tally)| GroupSupport {
            group_value,
            count: tally.count,
            support_rate: tally.support_rate(),
        })
        .collect()
}

/// Validate the grouping field and raw criteria, then group.
pub fn grouped_rates<I, K, V>(
    dataset: &SurveyDataset,
    group_field: &str,
    criteria: I,
) -> Result<Vec<GroupSupport>, ValidationError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let field = Field::parse(group_field).ok_or_else(|| ValidationError::UnknownGroupField {
        field: group_field.to_string(),
    })?;
    let criteria = FilterCriteria::parse(criteria)?;
    Ok(grouped_summary(dataset, field, &criteria))
}
