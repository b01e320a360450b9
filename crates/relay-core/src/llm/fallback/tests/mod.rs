//! Fallback orchestrator tests

mod support;
