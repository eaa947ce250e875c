//! Testing infrastructure for the MCP server.
//!
//! - **Mocks**: [`MockSource`], a scripted [`RemoteSource`](crate::fetch::RemoteSource)
//! - **Fixtures**: a sample configuration schema, models catalog and
//!   registry pages shaped like the real upstream documents
//!
//! # Example
//!
//! ```rust,ignore
//! use opencode_mcp::testing::{fixtures, MockSource};
//!
//! let source = MockSource::new()
//!     .with_response("https://example.test/config.json", fixtures::sample_schema())
//!     .with_failure("https://example.test/models.json", "HTTP 503");
//! ```

pub mod fixtures;
pub mod mocks;

pub use mocks::*;
