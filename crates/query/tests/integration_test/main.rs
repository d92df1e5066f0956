//! Integration tests for lambda-query.
//!
//! Every test drives the real session against a scripted in-memory
//! transport, so no network access or credentials are needed.

mod session;
mod support;
