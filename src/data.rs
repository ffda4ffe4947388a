use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::error::{PipelineError, Result};
use crate::models::{
    ClassificationRecord, ClientRecord, OutputRecord, TransactionEvent, TransferEvent,
};

pub const CLIENTS_FILE: &str = "clients.csv";
pub const TRANSACTIONS_FILE: &str = "all_transactions.csv";
pub const TRANSFERS_FILE: &str = "all_transfers.csv";

#[derive(Debug, Clone)]
pub struct DataPaths {
    pub clients: PathBuf,
    pub transactions: PathBuf,
    pub transfers: PathBuf,
}

impl DataPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            clients: dir.join(CLIENTS_FILE),
            transactions: dir.join(TRANSACTIONS_FILE),
            transfers: dir.join(TRANSFERS_FILE),
        }
    }
}

/// The three read-only input tables of a batch.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub clients: Vec<ClientRecord>,
    pub transactions: Vec<TransactionEvent>,
    pub transfers: Vec<TransferEvent>,
}

impl Dataset {
    pub fn load(paths: &DataPaths) -> Result<Self> {
        let dataset = Self {
            clients: read_table(&paths.clients)?,
            transactions: read_table(&paths.transactions)?,
            transfers: read_table(&paths.transfers)?,
        };
        tracing::info!(
            clients = dataset.clients.len(),
            transactions = dataset.transactions.len(),
            transfers = dataset.transfers.len(),
            "input tables loaded"
        );
        Ok(dataset)
    }

    pub fn client(&self, client_code: i64) -> Option<&ClientRecord> {
        self.clients.iter().find(|client| client.client_code == client_code)
    }

    pub fn client_codes(&self) -> Vec<i64> {
        self.clients.iter().map(|client| client.client_code).collect()
    }
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|err| {
        PipelineError::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {err}", path.display()),
        ))
    })?;
    read_rows(file)
}

pub fn read_rows<T: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    for result in reader.deserialize::<T>() {
        rows.push(result?);
    }
    Ok(rows)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    /// `.json` files get a JSON array, everything else CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Csv,
        }
    }
}

pub fn write_records<W: Write>(
    writer: W,
    records: &[OutputRecord],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Csv => {
            let mut csv_writer = csv::Writer::from_writer(writer);
            for record in records {
                csv_writer.serialize(record)?;
            }
            csv_writer.flush()?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(writer, records)?;
        }
    }
    Ok(())
}

pub fn read_records<R: Read>(reader: R, format: OutputFormat) -> Result<Vec<OutputRecord>> {
    match format {
        OutputFormat::Csv => read_rows(reader),
        OutputFormat::Json => Ok(serde_json::from_reader(reader)?),
    }
}

pub fn save_records(path: &Path, records: &[OutputRecord], format: OutputFormat) -> Result<()> {
    write_atomically(path, |writer| write_records(writer, records, format))
}

pub fn save_classification(path: &Path, records: &[ClassificationRecord]) -> Result<()> {
    write_atomically(path, |writer| Ok(serde_json::to_writer_pretty(writer, records)?))
}

/// Writes into a temporary file next to `path` and renames it into place once
/// complete. On error the temporary file is removed and `path` is untouched.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    staged.persist(path).map_err(|err| err.error)?;
    tracing::debug!(path = %path.display(), "output written");
    Ok(())
}
