//! CSV input and output.
//!
//! Input files have a `Date` column first (ISO `%Y-%m-%d`) followed by one
//! numeric column per asset or feature. Empty cells load as NaN.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use log::{debug, info};
use nanofolio::{Frame, Series};

use crate::error::{Error, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Load a date-indexed table.
pub fn load_frame(path: &Path) -> Result<Frame> {
    info!("Loading data from: {}", path.display());
    let csv_err = |source| Error::Csv {
        path: path.to_path_buf(),
        source,
    };
    let data_err = |reason: String| Error::Data {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = reader.headers().map_err(csv_err)?.clone();
    let mut fields = headers.iter();
    match fields.next() {
        Some(first) if first.eq_ignore_ascii_case("date") => {}
        _ => return Err(data_err("first column must be Date".into())),
    }
    let columns: Vec<String> = fields.map(str::to_string).collect();

    let mut index = Vec::new();
    let mut values = Vec::new();
    for (row_num, result) in reader.records().enumerate() {
        let record = result.map_err(csv_err)?;
        let line = row_num + 2;

        let date_str = record
            .get(0)
            .ok_or_else(|| data_err(format!("line {line}: missing date")))?;
        let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT)
            .map_err(|e| data_err(format!("line {line}: invalid date '{date_str}': {e}")))?;

        let row = record
            .iter()
            .skip(1)
            .map(|cell| parse_cell(cell).map_err(|reason| data_err(format!("line {line}: {reason}"))))
            .collect::<Result<Vec<f64>>>()?;

        index.push(date);
        values.push(row);
    }

    let frame = Frame::new(index, columns, values).map_err(|e| data_err(e.to_string()))?;
    debug!(
        "Loaded {} rows x {} columns from {}",
        frame.len(),
        frame.columns().len(),
        path.display()
    );
    Ok(frame)
}

fn parse_cell(cell: &str) -> std::result::Result<f64, String> {
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    cell.parse()
        .map_err(|e| format!("invalid number '{cell}': {e}"))
}

/// Write a table with a leading `Date` column.
pub fn write_frame(path: &Path, frame: &Frame) -> Result<()> {
    let mut writer = writer(path)?;

    let mut header = vec!["Date".to_string()];
    header.extend(frame.columns().iter().cloned());
    writer.write_record(&header).map_err(|e| csv_write_err(path, e))?;

    for (date, row) in frame.iter() {
        let mut record = vec![date.format(DATE_FORMAT).to_string()];
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record).map_err(|e| csv_write_err(path, e))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a single named series with a leading `Date` column.
pub fn write_series(path: &Path, series: &Series) -> Result<()> {
    let mut writer = writer(path)?;

    writer
        .write_record(["Date", series.name.as_str()])
        .map_err(|e| csv_write_err(path, e))?;
    for (date, value) in series.iter() {
        writer
            .write_record([date.format(DATE_FORMAT).to_string(), value.to_string()])
            .map_err(|e| csv_write_err(path, e))?;
    }
    writer.flush()?;
    Ok(())
}

fn writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    WriterBuilder::new()
        .from_path(path)
        .map_err(|e| csv_write_err(path, e))
}

fn csv_write_err(path: &Path, source: csv::Error) -> Error {
    Error::Csv {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_with_missing_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "r.csv",
            "Date,AAPL,MSFT\n2024-01-02,0.01,0.02\n2024-01-03,,-0.01\n",
        );
        let frame = load_frame(&path).unwrap();
        assert_eq!(frame.columns(), &["AAPL".to_string(), "MSFT".to_string()]);
        assert_eq!(frame.len(), 2);
        let row = frame.row(1).unwrap();
        assert!(row[0].is_nan());
        assert_eq!(row[1], -0.01);
    }

    #[test]
    fn rejects_bad_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "r.csv", "Date,A\n02/01/2024,0.01\n");
        assert!(matches!(load_frame(&path).unwrap_err(), Error::Data { .. }));
    }

    #[test]
    fn rejects_unordered_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "r.csv", "Date,A\n2024-01-03,0.01\n2024-01-02,0.02\n");
        assert!(matches!(load_frame(&path).unwrap_err(), Error::Data { .. }));
    }

    #[test]
    fn rejects_missing_date_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "r.csv", "A,B\n0.1,0.2\n");
        assert!(matches!(load_frame(&path).unwrap_err(), Error::Data { .. }));
    }

    #[test]
    fn ragged_row_is_csv_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "r.csv", "Date,A,B\n2024-01-02,0.1\n");
        assert!(matches!(load_frame(&path).unwrap_err(), Error::Csv { .. }));
    }

    #[test]
    fn missing_file() {
        let err = load_frame(Path::new("/nonexistent/returns.csv")).unwrap_err();
        assert!(matches!(err, Error::Csv { .. }));
    }

    #[test]
    fn written_frame_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(
            dir.path(),
            "r.csv",
            "Date,A,B\n2024-01-02,0.5,0.5\n2024-01-03,0.25,0.75\n",
        );
        let frame = load_frame(&input).unwrap();
        let out = dir.path().join("out/weights.csv");
        write_frame(&out, &frame).unwrap();
        assert_eq!(load_frame(&out).unwrap(), frame);
    }

    #[test]
    fn series_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let series = Series {
            name: "Value".into(),
            index: vec![NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()],
            values: vec![101.5],
        };
        let out = dir.path().join("values.csv");
        write_series(&out, &series).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "Date,Value\n2024-01-02,101.5\n");
    }
}
