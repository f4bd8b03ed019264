//! Configuration for a batch conversion run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use protomon_reflect::descriptor::decode_file_descriptor_set;
use protomon_reflect::{DescriptorPool, MessageDescriptor};

use crate::driver::{self, BatchReport};
use crate::json::EncodeOptions;
use crate::schema;
use crate::text::DecodeLimits;
use crate::Error;

/// Configuration for converting a tree of text-format documents to JSON.
///
/// The defaults convert every `*.textproto` file under `testdata/` as a
/// `cel.expr.conformance.test.SimpleTestFile` and write `<name>.json` files
/// back into `testdata/`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory searched recursively for input documents.
    pub(crate) input_root: PathBuf,

    /// File extension of input documents, without the dot.
    pub(crate) extension: String,

    /// Directory the JSON files are written to.
    pub(crate) output_dir: PathBuf,

    /// Full name of the top-level message of every document.
    pub(crate) message_type: String,

    /// Serialized FileDescriptorSets merged into the built-in schema.
    pub(crate) descriptor_sets: Vec<PathBuf>,

    pub(crate) encode_options: EncodeOptions,

    pub(crate) decode_limits: DecodeLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from("testdata"),
            extension: "textproto".to_string(),
            output_dir: PathBuf::from("testdata"),
            message_type: schema::SIMPLE_TEST_FILE.to_string(),
            descriptor_sets: Vec::new(),
            encode_options: EncodeOptions::default(),
            decode_limits: DecodeLimits::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory searched for input documents.
    pub fn input_root(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.input_root = path.as_ref().to_path_buf();
        self
    }

    /// Set the input file extension, e.g. `"textproto"` or `"txtpb"`.
    pub fn extension(&mut self, extension: impl Into<String>) -> &mut Self {
        self.extension = extension.into();
        self
    }

    /// Set the directory JSON files are written to. It is created if missing.
    pub fn output_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set the top-level message type of the input documents.
    pub fn message_type(&mut self, name: impl Into<String>) -> &mut Self {
        self.message_type = name.into();
        self
    }

    /// Merge the types of a serialized FileDescriptorSet (as written by
    /// `protoc --descriptor_set_out --include_imports`) into the schema.
    ///
    /// Needed when documents embed `Any` values of types outside the
    /// built-in schema.
    pub fn descriptor_set(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.descriptor_sets.push(path.as_ref().to_path_buf());
        self
    }

    /// Set how JSON output is formatted.
    pub fn encode_options(&mut self, options: EncodeOptions) -> &mut Self {
        self.encode_options = options;
        self
    }

    /// Set the per-document size and nesting limits.
    pub fn decode_limits(&mut self, limits: DecodeLimits) -> &mut Self {
        self.decode_limits = limits;
        self
    }

    /// Convert every document under the input root.
    ///
    /// Failed documents are reported in the returned [`BatchReport`]; only
    /// problems that affect the whole run are returned as an [`Error`].
    pub fn run(&self) -> Result<BatchReport, Error> {
        driver::run(self)
    }

    /// The built-in schema plus every configured descriptor set.
    pub fn build_pool(&self) -> Result<DescriptorPool, Error> {
        let mut pool = schema::builtin_pool()?;
        for path in &self.descriptor_sets {
            let bytes = std::fs::read(path).map_err(|source| Error::DescriptorSet {
                path: path.clone(),
                source,
            })?;
            pool.add_file_descriptor_set(decode_file_descriptor_set(&bytes)?)?;
        }
        Ok(pool)
    }

    /// Resolve the configured top-level message type in `pool`.
    pub(crate) fn root_message(&self, pool: &DescriptorPool) -> Result<Arc<MessageDescriptor>, Error> {
        pool.get_message(&self.message_type)
            .ok_or_else(|| Error::UnknownMessageType(self.message_type.clone()))
    }
}
