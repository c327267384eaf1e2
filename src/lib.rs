//! # policy-survey
//!
//! In-memory query service over a survey of policy support. A respondent
//! table is loaded once at startup ([`data::loader`]), then answered from
//! memory: overall support rate, support rate under demographic filters, and
//! support rate grouped by one demographic field ([`data::aggregate`]).
//!
//! The HTTP surface ([`app`], [`routes`]) is a thin axum layer over the data
//! layer; all validation of field names and category values happens in
//! [`data::filter`].

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod routes;
pub mod state;

pub use app::app;
pub use error::AppError;
pub use state::AppState;
