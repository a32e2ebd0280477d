//! Integration tests against a mock anytask server
//!
//! These tests use wiremock to stand in for anytask.org and Google Drive
//! and drive the public client API end-to-end.

mod auth_tests;
mod common;
mod download_tests;
mod notebook_tests;
mod queue_tests;
mod session_tests;
