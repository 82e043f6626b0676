//! Input reading and CSV export plumbing.
//!
//! Inputs are read whole (the dashboard never streams) and decoded to UTF-8
//! text via `encoding_rs`; the `-` path reads stdin. Exports go through a
//! `csv::Writer` onto a file or stdout.

use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::error::{DashboardError, Result};

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes()).ok_or_else(|| {
            DashboardError::InvalidArgument(format!("Unknown encoding '{value}'"))
        }),
        None => Ok(UTF_8),
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    // BOM sniffing lets a UTF-8 or UTF-16 file with a BOM override the label.
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(DashboardError::MalformedInput(format!(
            "input is not valid {}",
            encoding.name()
        )))
    } else {
        Ok(text.into_owned())
    }
}

pub fn read_input(path: &Path, encoding_label: Option<&str>) -> Result<String> {
    let encoding = resolve_encoding(encoding_label)?;
    let io_error = |source| DashboardError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut bytes = Vec::new();
    if is_dash(path) {
        io::stdin().lock().read_to_end(&mut bytes).map_err(io_error)?;
    } else {
        File::open(path)
            .and_then(|mut file| file.read_to_end(&mut bytes))
            .map_err(io_error)?;
    }
    decode_bytes(&bytes, encoding)
}

pub fn open_csv_writer(path: Option<&Path>) -> Result<csv::Writer<Box<dyn Write>>> {
    let writer: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(File::create(p).map_err(|source| {
            DashboardError::Io {
                path: p.to_path_buf(),
                source,
            }
        })?)),
        _ => Box::new(io::stdout()),
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(writer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn read_input_decodes_labelled_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.csv");
        fs::write(&path, b"region,revenue\nS\xe3o Paulo,5\n").unwrap();
        let text = read_input(&path, Some("latin1")).unwrap();
        assert!(text.contains("São Paulo"));
        assert!(read_input(&path, None).is_err());
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = read_input(Path::new("no/such/file.csv"), None).unwrap_err();
        assert!(matches!(err, DashboardError::Io { .. }));
    }

    #[test]
    fn unknown_encoding_is_invalid_argument() {
        assert!(matches!(
            resolve_encoding(Some("klingon")),
            Err(DashboardError::InvalidArgument(_))
        ));
    }
}
