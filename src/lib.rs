//! Searchlight - a client-facing SEO performance reporting service.
//!
//! # Overview
//!
//! Clients submit a month of daily Search-Console-derived samples (clicks,
//! impressions, CTR, position). Searchlight aggregates them into a period
//! summary with month-over-month and year-over-year comparisons, then runs a
//! fixed set of threshold rules to produce the analysis text,
//! recommendations, forecast, and metric trends shown on the reporting
//! dashboard.
//!
//! The aggregation and rule engine are pure, deterministic functions:
//! regenerating insights for the same summary always yields an identical
//! bundle. Fetching the underlying search data is the caller's concern;
//! Searchlight only consumes samples it is given.
//!
//! # API Endpoints
//!
//! - `POST /clients/{client_id}/reports` - Submit daily samples for a month
//! - `GET /clients/{client_id}/reports` - List stored reports
//! - `GET /clients/{client_id}/reports/{report_id}` - Fetch one summary
//! - `POST /clients/{client_id}/reports/{report_id}/insights` - Generate insights
//! - `GET /clients/{client_id}/reports/{report_id}/insights` - Latest insights
//! - `GET /health` - Health check
//!
//! # Modules
//!
//! - [`model`]: Data types for samples, summaries, and insight bundles
//! - [`storage`]: SQLite storage layer
//! - [`aggregation`]: Sample-window aggregation and delta computation
//! - [`insights`]: Threshold-rule insight engine
//! - [`api`]: HTTP API handlers

pub mod aggregation;
pub mod api;
pub mod insights;
pub mod model;
pub mod storage;
