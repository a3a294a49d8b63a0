//! jig-lib: Core types and logic for jig
//!
//! This crate provides the fundamental pieces of the build tool:
//! - `manifest`: the build file schema, loading, and validation
//! - `env`: append-only composable process environments
//! - `placeholder`: `$${task}` references to dependency results
//! - `execute`: DAG planning and parallel task execution

pub mod env;
pub mod execute;
pub mod manifest;
pub mod placeholder;
