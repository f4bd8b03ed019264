//! Batch conversion of a directory tree of text-format documents.
//!
//! Each document is handled on its own: a failure is recorded in the
//! [`BatchReport`] and the run moves on to the next file. An output file is
//! either written completely or not at all.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use protomon_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor, Value};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::DocumentError;
use crate::text::{ParseError, ParseErrorKind, Position};
use crate::{json, text, Error};

/// The outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// JSON files written, in processing order.
    pub written: Vec<PathBuf>,
    /// Documents that produced no output.
    pub failures: Vec<DocumentFailure>,
}

impl BatchReport {
    /// Whether every document was converted.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A document that produced no output, and why.
#[derive(Debug)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub error: DocumentError,
}

pub(crate) fn run(config: &Config) -> Result<BatchReport, Error> {
    let pool = config.build_pool()?;
    let root = config.root_message(&pool)?;

    let mut report = BatchReport::default();
    let inputs = discover(config, &mut report)?;
    debug!(count = inputs.len(), root = %config.input_root.display(), "discovered documents");

    fs::create_dir_all(&config.output_dir).map_err(|source| Error::OutputDir {
        path: config.output_dir.clone(),
        source,
    })?;

    let mut batch = Batch {
        config,
        pool: &pool,
        root,
        names: HashMap::new(),
    };
    for path in inputs {
        match batch.convert(&path) {
            Ok(output) => {
                info!(input = %path.display(), output = %output.display(), "wrote document");
                report.written.push(output);
            }
            Err(err) => {
                log_failure(&path, &err);
                report.failures.push(DocumentFailure { path, error: err });
            }
        }
    }

    Ok(report)
}

/// Every input document under the root, sorted by path.
///
/// Entries that can't be read become failures; an unreadable root is fatal.
fn discover(config: &Config, report: &mut BatchReport) -> Result<Vec<PathBuf>, Error> {
    let mut inputs = Vec::new();
    for entry in WalkDir::new(&config.input_root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(Error::InputRoot {
                    path: config.input_root.clone(),
                    source: io::Error::from(err),
                });
            }
            Err(err) => {
                let path = err
                    .path()
                    .map_or_else(|| config.input_root.clone(), Path::to_path_buf);
                let failure = DocumentFailure {
                    error: DocumentError::Read {
                        path: path.clone(),
                        source: io::Error::from(err),
                    },
                    path,
                };
                log_failure(&failure.path, &failure.error);
                report.failures.push(failure);
                continue;
            }
        };

        let matches_extension = entry
            .path()
            .extension()
            .is_some_and(|ext| ext == config.extension.as_str());
        if entry.file_type().is_file() && matches_extension {
            inputs.push(entry.into_path());
        }
    }
    Ok(inputs)
}

fn log_failure(path: &Path, err: &DocumentError) {
    match err {
        DocumentError::Parse(parse) => error!(
            path = %path.display(),
            line = parse.line,
            column = parse.column,
            "{}",
            parse.kind
        ),
        err => error!(path = %path.display(), "{err}"),
    }
}

struct Batch<'a> {
    config: &'a Config,
    pool: &'a DescriptorPool,
    root: Arc<MessageDescriptor>,
    /// Output names written so far and the document that wrote each.
    names: HashMap<String, PathBuf>,
}

impl Batch<'_> {
    fn convert(&mut self, path: &Path) -> Result<PathBuf, DocumentError> {
        let input = read_input(path, self.config.decode_limits.max_input_bytes)?;
        let message = text::decode(self.pool, &self.root, &input, &self.config.decode_limits)?;
        let json = json::encode(self.pool, &message, &self.config.encode_options)?;

        let name = output_name(path, &message)?;
        if let Some(first) = self.names.get(&name) {
            return Err(DocumentError::DuplicateName {
                name,
                first: first.clone(),
            });
        }

        let output = self.config.output_dir.join(format!("{name}.json"));
        write_atomic(&self.config.output_dir, &output, &json)?;
        self.names.insert(name, path.to_path_buf());
        Ok(output)
    }
}

/// Read `path`, refusing files larger than `limit` bytes before loading them.
fn read_input(path: &Path, limit: usize) -> Result<Vec<u8>, DocumentError> {
    let read_error = |source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = fs::File::open(path).map_err(read_error)?;
    let size = file.metadata().map_err(read_error)?.len();
    if size > limit as u64 {
        let kind = ParseErrorKind::InputTooLarge {
            size: usize::try_from(size).unwrap_or(usize::MAX),
            limit,
        };
        return Err(ParseError::new(kind, Position::start()).into());
    }

    // A file that grows after the size check is cut at `limit + 1` bytes,
    // which the decoder still rejects.
    let mut input = Vec::with_capacity(size as usize);
    file.take(limit as u64 + 1)
        .read_to_end(&mut input)
        .map_err(read_error)?;
    Ok(input)
}

/// The document's top-level `name`, or the input file stem when it has none.
fn output_name(path: &Path, message: &DynamicMessage) -> Result<String, DocumentError> {
    let name = match message.get_field_by_name("name") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        _ => {
            let stem = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            warn!(path = %path.display(), name = %stem, "document has no name, using the file stem");
            stem
        }
    };

    let usable = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0']);
    if usable {
        Ok(name)
    } else {
        Err(DocumentError::InvalidName(name))
    }
}

/// Write `contents` to a temporary file in `dir`, then rename it over `target`.
fn write_atomic(dir: &Path, target: &Path, contents: &str) -> Result<(), DocumentError> {
    let write_error = |source| DocumentError::Write {
        path: target.to_path_buf(),
        source,
    };

    let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
    file.write_all(contents.as_bytes()).map_err(write_error)?;
    file.write_all(b"\n").map_err(write_error)?;
    file.persist(target).map_err(|err| write_error(err.error))?;
    Ok(())
}
