//! Chunked readers for trip files: plain CSV, gzip CSV and Parquet.
//!
//! Every reader hands rows to the caller in fixed-size [`Chunk`]s, in file
//! order, so a large file never has to be materialised as one row buffer.

use anyhow::Result;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, TimeDelta};
use flate2::read::GzDecoder;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use std::collections::HashMap;
use std::io::Read;

use crate::source::SourceFormat;
use crate::table::{Chunk, Value};

/// Default number of rows per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Decodes `bytes` according to `format`, calling `on_chunk` for each block
/// of at most `chunk_size` rows. Returns the number of rows read.
///
/// A file with a header but no rows yields one empty chunk so its columns
/// are still known to the caller.
///
/// # Errors
///
/// Returns an error if the content is not valid for `format`.
pub fn read_chunks(
    bytes: Bytes,
    format: SourceFormat,
    chunk_size: usize,
    on_chunk: impl FnMut(Chunk),
) -> Result<usize> {
    match format {
        SourceFormat::Csv => read_csv_chunks(bytes.as_ref(), chunk_size, on_chunk),
        SourceFormat::CsvGzip => {
            read_csv_chunks(GzDecoder::new(bytes.as_ref()), chunk_size, on_chunk)
        }
        SourceFormat::Parquet => read_parquet_chunks(bytes, chunk_size, on_chunk),
    }
}

/// Reads delimited text with a header row.
pub fn read_csv_chunks<R: Read>(
    reader: R,
    chunk_size: usize,
    mut on_chunk: impl FnMut(Chunk),
) -> Result<usize> {
    let chunk_size = chunk_size.max(1);
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let width = headers.len();

    let mut chunk = Chunk::new(headers.clone());
    let mut total = 0;
    let mut emitted = false;

    for result in rdr.records() {
        let record = result?;
        let row = (0..width)
            .map(|i| record.get(i).map_or(Value::Null, Value::parse_cell))
            .collect();
        chunk.push_row(row);
        total += 1;

        if chunk.len() == chunk_size {
            on_chunk(std::mem::replace(&mut chunk, Chunk::new(headers.clone())));
            emitted = true;
        }
    }

    if !chunk.is_empty() || !emitted {
        on_chunk(chunk);
    }

    Ok(total)
}

/// Reads a Parquet file row by row, grouping rows into chunks.
pub fn read_parquet_chunks(
    bytes: Bytes,
    chunk_size: usize,
    mut on_chunk: impl FnMut(Chunk),
) -> Result<usize> {
    let chunk_size = chunk_size.max(1);
    let reader = SerializedFileReader::new(bytes)?;

    let headers: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .root_schema()
        .get_fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    let positions: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    let mut chunk = Chunk::new(headers.clone());
    let mut total = 0;
    let mut emitted = false;

    for row in reader.get_row_iter(None)? {
        let row = row?;
        let mut values = vec![Value::Null; headers.len()];
        for (name, field) in row.get_column_iter() {
            if let Some(&pos) = positions.get(name.as_str()) {
                values[pos] = field_to_value(field);
            }
        }
        chunk.push_row(values);
        total += 1;

        if chunk.len() == chunk_size {
            on_chunk(std::mem::replace(&mut chunk, Chunk::new(headers.clone())));
            emitted = true;
        }
    }

    if !chunk.is_empty() || !emitted {
        on_chunk(chunk);
    }

    Ok(total)
}

fn field_to_value(field: &Field) -> Value {
    match field {
        Field::Null => Value::Null,
        Field::Bool(b) => Value::Int(i64::from(*b)),
        Field::Byte(v) => Value::Int(i64::from(*v)),
        Field::Short(v) => Value::Int(i64::from(*v)),
        Field::Int(v) => Value::Int(i64::from(*v)),
        Field::Long(v) => Value::Int(*v),
        Field::UByte(v) => Value::Int(i64::from(*v)),
        Field::UShort(v) => Value::Int(i64::from(*v)),
        Field::UInt(v) => Value::Int(i64::from(*v)),
        Field::ULong(v) => i64::try_from(*v).map_or(Value::Float(*v as f64), Value::Int),
        Field::Float(v) => Value::Float(f64::from(*v)),
        Field::Double(v) => {
            if v.is_nan() {
                Value::Null
            } else {
                Value::Float(*v)
            }
        }
        Field::Str(s) => Value::Text(s.clone()),
        Field::TimestampMillis(ms) => DateTime::from_timestamp_millis(*ms)
            .map_or(Value::Null, |ts| Value::Timestamp(ts.naive_utc())),
        Field::TimestampMicros(us) => DateTime::from_timestamp_micros(*us)
            .map_or(Value::Null, |ts| Value::Timestamp(ts.naive_utc())),
        Field::Date(days) => NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(TimeDelta::days(i64::from(*days))))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map_or(Value::Null, Value::Timestamp),
        other => Value::parse_cell(&other.to_string()),
    }
}
