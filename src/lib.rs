//! Loan Finder API Library
//!
//! Loan product discovery: filtered product lists decorated with badges and
//! a match score, product-grounded Q&A through an LLM provider, and CSV
//! hand-off to the ingestion pipeline.
//!
//! # Modules
//!
//! - `api`: Router assembly and middleware.
//! - `assistant_client`: LLM provider client and grounding prompt.
//! - `badges`: Badge rule table.
//! - `catalog`: Product resolver over live and fixed stores.
//! - `client`: HTTP consumer of this API.
//! - `config`: Configuration management.
//! - `db`: Database connection pool.
//! - `db_storage`: PostgreSQL product store.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `scoring`: Match score and product decoration.
//! - `store`: Store capability and fixed catalog.
//! - `upload_client`: Pre-signed CSV upload.
//! - `validation`: Query and body validation.

pub mod api;

pub mod assistant_client;
pub mod badges;
pub mod catalog;
pub mod client;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod scoring;
pub mod store;
pub mod upload_client;
pub mod validation;
