use std::time::Instant;

use axum::extract::Request;
use axum::http::Uri;
use axum::middleware::{from_fn, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::routes;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Router assembly
// ---------------------------------------------------------------------------

/// Assemble the full application router.
///
/// Health checks sit beside the query routes; unknown paths get a JSON 404.
pub fn app(state: AppState) -> Router {
    let api = routes::router()
        .fallback(not_found)
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    Router::new()
        .merge(health)
        .merge(api)
        .layer(from_fn(access_log))
}

/// Liveness check: 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check. The router is only built after the dataset has loaded,
/// so reaching this handler means queries can be served.
async fn readiness() -> &'static str {
    "ready"
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}

/// One log line per request: method, path, status, latency.
async fn access_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    log::info!(
        "{method} {path} -> {} ({:.1} ms)",
        response.status().as_u16(),
        started.elapsed().as_secs_f64() * 1000.0
    );
    response
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::data::model::{
        AgeGroup, Education, Gender, Income, Race, Respondent, SurveyDataset,
    };
    use crate::routes::SupportResponse;

    /// Six respondents: three Female (two supporters), two Male (one
    /// supporter), one Non-binary (no supporter). Nobody is Asian.
    fn test_state() -> AppState {
        let rows = [
            (1, Gender::Female, Race::Hispanic, Education::Graduate, true),
            (2, Gender::Male, Race::White, Education::SomeCollege, true),
            (3, Gender::Female, Race::Hispanic, Education::SomeCollege, false),
            (4, Gender::NonBinary, Race::Black, Education::Graduate, false),
            (5, Gender::Female, Race::White, Education::Bachelors, true),
            (6, Gender::Male, Race::Other, Education::Graduate, false),
        ];
        let respondents = rows
            .into_iter()
            .map(|(id, gender, race, education, supports_policy)| Respondent {
                id,
                age_group: AgeGroup::From30To44,
                gender,
                race,
                education,
                income: Income::From60kTo100k,
                supports_policy,
            })
            .collect();
        AppState::new(SurveyDataset::from_respondents(respondents).unwrap(), 3)
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app(test_state()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn overall_support() {
        let (status, body) = get_json("/support").await;
        assert_eq!(status, StatusCode::OK);
        let parsed: SupportResponse = serde_json::from_value(body).unwrap();
        assert_eq!(
            parsed,
            SupportResponse {
                count: 6,
                support_rate: Some(0.5)
            }
        );
    }

    #[tokio::test]
    async fn support_by_filters_and_rounds() {
        let (status, body) = get_json("/support_by?gender=Female").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        assert_eq!(body["support_rate"], 0.667);
    }

    #[tokio::test]
    async fn support_by_combines_filters() {
        let (_, a) = get_json("/support_by?gender=Female&race=Hispanic").await;
        let (_, b) = get_json("/support_by?race=Hispanic&gender=Female").await;
        assert_eq!(a, b);
        assert_eq!(a["count"], 2);
        assert_eq!(a["support_rate"], 0.5);
    }

    #[tokio::test]
    async fn support_by_zero_matches_is_ok_with_null_rate() {
        let (status, body) = get_json("/support_by?race=Asian").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
        assert!(body["support_rate"].is_null());
    }

    #[tokio::test]
    async fn support_by_ignores_empty_values() {
        let (status, body) = get_json("/support_by?gender=&race=White").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
    }

    #[tokio::test]
    async fn support_by_rejects_unknown_field_with_blank_value() {
        let (status, body) = get_json("/support_by?political_party=").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"]["field"], "political_party");
        assert_eq!(body["error"]["details"]["value"], "");

        let (status, _) = get_json("/grouped?group_by=gender&political_party=").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn support_by_rejects_invalid_value() {
        let (status, body) = get_json("/support_by?gender=Unknown").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"]["field"], "gender");
        assert_eq!(body["error"]["details"]["value"], "Unknown");
    }

    #[tokio::test]
    async fn support_by_rejects_unknown_field() {
        let (status, body) = get_json("/support_by?gender=Female&political_party=Green").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"]["field"], "political_party");
    }

    #[tokio::test]
    async fn grouped_uses_field_name_as_key() {
        let (status, body) = get_json("/grouped?group_by=gender").await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["gender"], "Female");
        assert_eq!(rows[0]["count"], 3);
        assert_eq!(rows[1]["gender"], "Male");
        assert_eq!(rows[1]["support_rate"], 0.5);
        assert_eq!(rows[2]["gender"], "Non-binary");
        assert_eq!(rows[2]["support_rate"], 0.0);
        let total: u64 = rows.iter().map(|r| r["count"].as_u64().unwrap()).sum();
        assert_eq!(total, 6);
    }

    #[tokio::test]
    async fn grouped_accepts_filters() {
        let (status, body) = get_json("/grouped?group_by=education&gender=Female").await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        let labels: Vec<&str> = rows.iter().map(|r| r["education"].as_str().unwrap()).collect();
        assert_eq!(labels, vec!["Graduate", "Some college", "Bachelor's"]);
    }

    #[tokio::test]
    async fn grouped_requires_valid_group_by() {
        let (status, body) = get_json("/grouped").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"]["field"], "group_by");

        let (status, _) = get_json("/grouped?group_by=political_party").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = get_json("/grouped?group_by=race&group_by=gender").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn fields_lists_closed_sets() {
        let (status, body) = get_json("/fields").await;
        assert_eq!(status, StatusCode::OK);
        let fields = body.as_object().unwrap();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields["gender"], serde_json::json!(["Male", "Female", "Non-binary"]));
        assert_eq!(fields["income"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let (status, body) = get_json("/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn health_endpoints_answer() {
        for (uri, expected) in [("/health/liveness", "ok"), ("/health/readiness", "ready")] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = app(test_state()).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(&body[..], expected.as_bytes());
        }
    }
}
