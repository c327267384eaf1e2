//! # Support-rate routes
//!
//! - `GET /support`    : overall support rate and respondent count
//! - `GET /support_by` : support rate for respondents matching filters
//! - `GET /grouped`    : support rate per value of `group_by`, optionally filtered
//! - `GET /fields`     : `{<field>: [accepted values...]}`
//!
//! Filters are query parameters named after the survey fields
//! (`gender`, `race`, `age_group`, `education`, `income`). A known field or
//! `group_by` with an empty value is ignored; any other name is rejected
//! whatever its value.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::aggregate::{filtered_rate, grouped_rates, overall_rate, SupportSummary};
use crate::data::filter::ValidationError;
use crate::data::model::Field;
use crate::error::AppError;
use crate::state::AppState;

/// Raw query string as ordered `(name, value)` pairs.
type Params = Query<Vec<(String, String)>>;

const GROUP_BY: &str = "group_by";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SupportResponse {
    pub count: usize,
    pub support_rate: Option<f64>,
}

impl From<SupportSummary> for SupportResponse {
    fn from(s: SupportSummary) -> Self {
        Self {
            count: s.count,
            support_rate: s.support_rate,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/support", get(overall_support))
        .route("/support_by", get(support_by))
        .route("/grouped", get(support_grouped))
        .route("/fields", get(list_fields))
}

/// Drop blank values for recognised parameters only, so an unknown name
/// still reaches validation.
fn without_blanks(params: Vec<(String, String)>) -> impl Iterator<Item = (String, String)> {
    params.into_iter().filter(|(name, value)| {
        let recognised = name == GROUP_BY || Field::parse(name).is_some();
        !(recognised && value.is_empty())
    })
}

fn pairs(params: &[(String, String)]) -> impl Iterator<Item = (&str, &str)> {
    params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
}

/// GET /support
async fn overall_support(State(state): State<AppState>) -> Json<SupportResponse> {
    let summary = overall_rate(&state.dataset);
    log::debug!("overall support: {} respondents", summary.count);
    Json(state.present(summary).into())
}

/// GET /support_by?gender=Female&race=Hispanic
async fn support_by(
    State(state): State<AppState>,
    Query(params): Params,
) -> Result<Json<SupportResponse>, AppError> {
    let criteria: Vec<(String, String)> = without_blanks(params).collect();
    let summary = filtered_rate(&state.dataset, pairs(&criteria))?;
    log::debug!("support_by {criteria:?}: {} respondents", summary.count);
    Ok(Json(state.present(summary).into()))
}

/// GET /grouped?group_by=education[&gender=Female...]
///
/// Each row is `{<group_by>: value, count, support_rate}`.
async fn support_grouped(
    State(state): State<AppState>,
    Query(params): Params,
) -> Result<Json<Vec<Map<String, Value>>>, AppError> {
    let mut group_by: Option<String> = None;
    let mut criteria = Vec::new();
    for (name, value) in without_blanks(params) {
        if name == GROUP_BY {
            if group_by.replace(value).is_some() {
                return Err(ValidationError::DuplicateGroupBy.into());
            }
        } else {
            criteria.push((name, value));
        }
    }
    let group_by = group_by.ok_or(ValidationError::MissingGroupBy)?;

    let groups = grouped_rates(&state.dataset, &group_by, pairs(&criteria))?;
    log::debug!(
        "grouped by {group_by} {criteria:?}: {} groups",
        groups.len()
    );

    let rows = groups
        .into_iter()
        .map(|g| {
            let mut row = Map::new();
            row.insert(
                g.group_value.field().name().to_string(),
                Value::from(g.group_value.label()),
            );
            row.insert("count".to_string(), Value::from(g.count));
            row.insert(
                "support_rate".to_string(),
                Value::from(state.present_rate(g.support_rate)),
            );
            row
        })
        .collect();
    Ok(Json(rows))
}

/// GET /fields
async fn list_fields() -> Json<Map<String, Value>> {
    let fields = Field::ALL
        .iter()
        .map(|f| (f.name().to_string(), Value::from(f.labels())))
        .collect();
    Json(fields)
}
