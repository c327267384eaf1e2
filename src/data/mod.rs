//! Data layer: survey schema, loading, filtering and aggregation.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse + validate file → SurveyDataset (all-or-nothing)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────────┐
//!   │ SurveyDataset  │  immutable Vec<Respondent>
//!   └───────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  validate field=value criteria → FilterCriteria
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ aggregate  │  single pass → count + support rate (overall / grouped)
//!   └───────────┘
//! ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
