//! End-to-end harness: single and multi operations against every dispatch
//! strategy of the in-memory backend.

#[path = "../support/mod.rs"]
mod support;

mod multi;
