//! Client modules for the external systems the pipeline drives.
//!
//! - [`git`]: version-control operations against a job's working directory
//! - [`github`]: change-request creation via the GitHub REST API
//! - [`kv`]: curl-based client for the external key-value store backend
//!
//! The git and github modules provide trait-based abstractions with real and
//! mock implementations to support both production use and testing.

pub mod git;
pub mod github;
pub mod kv;
