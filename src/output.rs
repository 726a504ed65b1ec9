//! Dataset writers.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::models::OutputRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    JsonLines,
    Csv,
}

impl OutputFormat {
    /// `.csv`, `.jsonl`/`.ndjson`, anything else is a JSON array
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("csv") => OutputFormat::Csv,
            Some("jsonl") | Some("ndjson") => OutputFormat::JsonLines,
            _ => OutputFormat::Json,
        }
    }
}

/// Write the joined dataset, picking the format from the file extension.
pub fn write_rows(path: &Path, rows: &[OutputRow]) -> Result<()> {
    let format = OutputFormat::from_path(path);
    let mut writer = BufWriter::new(File::create(path)?);

    match format {
        OutputFormat::Csv => {
            let mut csv_writer = csv::Writer::from_writer(writer);
            for row in rows {
                csv_writer.serialize(row)?;
            }
            csv_writer.flush()?;
        }
        OutputFormat::JsonLines => {
            for row in rows {
                serde_json::to_writer(&mut writer, row)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, rows)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
    }

    info!("Wrote {} rows to {} ({:?})", rows.len(), path.display(), format);
    Ok(())
}

/// Pretty JSON dump of any serializable value
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AddressFields, AddressRecord, Client, GeoPoint};
    use std::fs;

    fn rows() -> Vec<OutputRow> {
        let mut client = Client::with_id("cus-1");
        client.first_name = "Lucía".into();
        let record = AddressRecord {
            client_id: "cus-1".into(),
            address_id: "adr-1".into(),
            neighborhood: "Chamberí".into(),
            coordinates: GeoPoint::new(40.434, -3.703),
            fields: AddressFields {
                road: "Calle de Fuencarral".into(),
                ..Default::default()
            },
        };
        vec![OutputRow::join(&client, &record); 2]
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("out.CSV")), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_path(Path::new("out.ndjson")), OutputFormat::JsonLines);
        assert_eq!(OutputFormat::from_path(Path::new("out.json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_path(Path::new("out")), OutputFormat::Json);
    }

    #[test]
    fn test_csv_has_header_and_empty_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clients_geo.csv");
        write_rows(&path, &rows()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "client_id");
        assert!(headers.iter().any(|h| h == "postcode"));

        let back: Vec<OutputRow> = reader.deserialize().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(back, rows());
        assert_eq!(back[0].postcode, "");
    }

    #[test]
    fn test_json_lines_one_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        write_rows(&path, &rows()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let row: OutputRow = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(row.neighborhood, "Chamberí");
    }

    #[test]
    fn test_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        write_rows(&path, &rows()).unwrap();

        let back: Vec<OutputRow> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].road, "Calle de Fuencarral");
    }
}
