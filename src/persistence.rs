use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::config::{ExportOptions, ImportOptions};
use crate::diagnostics::{ConversionReport, Diagnostics};
use crate::document::Document;
use crate::error::{ConversionError, Result};
use crate::export::Exporter;
use crate::graph::Graph;
use crate::import::Importer;
use crate::registry::NodeTypeRegistry;

/// Byte-level storage used by the file facades
pub trait Persistence {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// Local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystem;

impl Persistence for FileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(contents)?;
        writer.flush()
    }
}

/// Read and parse a document
pub fn load_document<P: Persistence + ?Sized>(store: &P, path: &Path) -> Result<Document> {
    let bytes = store
        .read_file(path)
        .map_err(|err| ConversionError::io(path, err))?;
    Document::from_slice(&bytes)
}

/// Serialize a document as pretty JSON and write it
pub fn save_document<P: Persistence + ?Sized>(store: &P, path: &Path, document: &Document) -> Result<()> {
    let text = document.to_json_pretty()?;
    store
        .write_file(path, text.as_bytes())
        .map_err(|err| ConversionError::io(path, err))
}

/// Export `graph` and write it to `path`
///
/// Never returns `Err`; failures end up in the report status.
pub fn export_to_file<P>(store: &P, graph: &Graph, path: &Path, options: &ExportOptions) -> ConversionReport
where
    P: Persistence + ?Sized,
{
    let mut diagnostics = Diagnostics::new();
    let mut exporter = Exporter::new(options.clone());
    let outcome = exporter
        .export(graph, &mut diagnostics)
        .and_then(|document| save_document(store, path, &document));

    match outcome {
        Ok(()) => {
            log::info!("Wrote {}", path.display());
            ConversionReport::success(exporter.counts(), diagnostics)
        }
        Err(err) => {
            log::error!("Export to {} failed: {}", path.display(), err);
            ConversionReport::failed(err.to_string(), diagnostics)
        }
    }
}

/// Read `path` and import it into `graph`
pub fn import_from_file<P, R>(
    store: &P,
    graph: &mut Graph,
    path: &Path,
    registry: &R,
    options: &ImportOptions,
) -> ConversionReport
where
    P: Persistence + ?Sized,
    R: NodeTypeRegistry + ?Sized,
{
    let mut diagnostics = Diagnostics::new();
    let document = match load_document(store, path) {
        Ok(document) => document,
        Err(err) => {
            log::error!("Import from {} failed: {}", path.display(), err);
            return ConversionReport::failed(err.to_string(), diagnostics);
        }
    };

    let mut importer = Importer::new(registry, options.clone());
    match importer.import(&document, graph, &mut diagnostics) {
        Ok(counts) => ConversionReport::success(counts, diagnostics),
        Err(err) => ConversionReport::failed(err.to_string(), diagnostics),
    }
}
