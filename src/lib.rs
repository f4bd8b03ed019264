//! Convert protobuf text-format documents to canonical proto3 JSON.
//!
//! The [`text`] decoder reads a document into a
//! [`DynamicMessage`](protomon_reflect::DynamicMessage) against a schema from
//! [`schema`] (optionally extended with descriptor sets), and the [`json`]
//! encoder renders it. [`Config`] drives a whole directory tree of documents.
//!
//! ```no_run
//! let report = protomon_json::Config::new()
//!     .input_root("testdata")
//!     .output_dir("out")
//!     .run()?;
//! assert!(report.is_success());
//! # Ok::<(), protomon_json::Error>(())
//! ```

pub mod config;
pub mod driver;
mod error;
pub mod json;
pub mod schema;
pub mod text;

pub use config::Config;
pub use driver::{BatchReport, DocumentFailure};
pub use error::{DocumentError, Error};
