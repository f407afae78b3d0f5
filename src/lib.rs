//! Recruiter Mailer
//!
//! Queued generation and delivery of personalized job-application emails.
//! Jobs are drained one at a time by a single-flight processor that can be
//! triggered from a timed worker, a cron endpoint, a storage webhook or a
//! manual API call.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
