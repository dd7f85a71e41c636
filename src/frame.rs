//! Date-indexed numeric tables.
//!
//! [`Frame`] is the single tabular type the pipeline passes around: return
//! series, weight schedules and value breakdowns are all frames. A frame is
//! validated on construction (unique columns, rectangular rows, strictly
//! increasing dates) and immutable afterwards; [`FrameBuilder`] is the
//! append-only way to grow one row at a time.

use std::ops::Range;

use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};

/// A rectangular, date-indexed table of `f64` values.
///
/// Values may be NaN (missing). Whether a NaN is fatal is up to the consumer:
/// the simulator rejects a NaN return on an asset it holds, the optimizer
/// rejects any NaN in its window.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawFrame"))]
pub struct Frame {
    index: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawFrame {
    index: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawFrame> for Frame {
    type Error = Error;

    fn try_from(raw: RawFrame) -> Result<Self> {
        Frame::new(raw.index, raw.columns, raw.values)
    }
}

impl Frame {
    /// Build a frame, validating its shape and index.
    pub fn new(index: Vec<NaiveDate>, columns: Vec<String>, values: Vec<Vec<f64>>) -> Result<Self> {
        check_columns(&columns)?;

        if values.len() != index.len() {
            return Err(Error::ShapeMismatch {
                row: values.len().min(index.len()),
                expected: index.len(),
                found: values.len(),
            });
        }

        for (i, row) in values.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::ShapeMismatch {
                    row: i,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }

        for pair in index.windows(2) {
            if pair[1] <= pair[0] {
                return Err(Error::UnorderedIndex { date: pair[1] });
            }
        }

        Ok(Self {
            index,
            columns,
            values,
        })
    }

    /// An empty frame with the given columns.
    pub fn empty(columns: Vec<String>) -> Result<Self> {
        Self::new(Vec::new(), columns, Vec::new())
    }

    // === Queries ===

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows, in date order.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Row at a position.
    pub fn row(&self, pos: usize) -> Option<&[f64]> {
        self.values.get(pos).map(Vec::as_slice)
    }

    /// Position of an exact date, by binary search over the sorted index.
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.index.binary_search(&date).ok()
    }

    /// Row for an exact date.
    pub fn row_at(&self, date: NaiveDate) -> Option<&[f64]> {
        self.position(date).and_then(|pos| self.row(pos))
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.index.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.index.last().copied()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Copy of a single column.
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let j = self
            .column_index(name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))?;
        Ok(self.values.iter().map(|row| row[j]).collect())
    }

    /// Iterate `(date, row)` pairs in date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[f64])> {
        self.index
            .iter()
            .copied()
            .zip(self.values.iter().map(Vec::as_slice))
    }

    // === Derived frames ===

    /// Rows in a positional range.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn slice(&self, range: Range<usize>) -> Frame {
        Frame {
            index: self.index[range.clone()].to_vec(),
            columns: self.columns.clone(),
            values: self.values[range].to_vec(),
        }
    }

    /// Rows dated on or before `date`.
    pub fn through(&self, date: NaiveDate) -> Frame {
        let end = self.index.partition_point(|d| *d <= date);
        self.slice(0..end)
    }

    /// Rows dated on or after `date`.
    pub fn starting_at(&self, date: NaiveDate) -> Frame {
        let start = self.index.partition_point(|d| *d < date);
        self.slice(start..self.len())
    }

    /// Keep only the named columns, in the given order.
    pub fn select(&self, names: &[String]) -> Result<Frame> {
        check_columns(names)?;
        let lookup: FxHashMap<&str, usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(j, c)| (c.as_str(), j))
            .collect();

        let positions = names
            .iter()
            .map(|name| {
                lookup
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| Error::UnknownColumn(name.clone()))
            })
            .collect::<Result<Vec<usize>>>()?;

        let values = self
            .values
            .iter()
            .map(|row| positions.iter().map(|&j| row[j]).collect())
            .collect();

        Ok(Frame {
            index: self.index.clone(),
            columns: names.to_vec(),
            values,
        })
    }

    /// Drop the named columns. Every name must exist.
    pub fn drop_columns(&self, names: &[String]) -> Result<Frame> {
        for name in names {
            if self.column_index(name).is_none() {
                return Err(Error::UnknownColumn(name.clone()));
            }
        }
        let keep: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !names.contains(c))
            .cloned()
            .collect();
        self.select(&keep)
    }
}

fn check_columns(columns: &[String]) -> Result<()> {
    let mut seen = FxHashSet::default();
    for name in columns {
        if name.is_empty() {
            return Err(Error::InvalidConfig("empty column name".into()));
        }
        if !seen.insert(name.as_str()) {
            return Err(Error::DuplicateColumn(name.clone()));
        }
    }
    Ok(())
}

/// Append-only builder for a [`Frame`].
///
/// Each pushed row must be dated strictly after the previous one and have one
/// value per column, so a finished frame is valid without re-checking.
#[derive(Clone, Debug)]
pub struct FrameBuilder {
    columns: Vec<String>,
    index: Vec<NaiveDate>,
    values: Vec<Vec<f64>>,
}

impl FrameBuilder {
    pub fn new(columns: Vec<String>) -> Result<Self> {
        check_columns(&columns)?;
        Ok(Self {
            columns,
            index: Vec::new(),
            values: Vec::new(),
        })
    }

    pub fn with_capacity(columns: Vec<String>, rows: usize) -> Result<Self> {
        let mut builder = Self::new(columns)?;
        builder.index.reserve(rows);
        builder.values.reserve(rows);
        Ok(builder)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Append a row.
    pub fn push(&mut self, date: NaiveDate, row: Vec<f64>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::ShapeMismatch {
                row: self.index.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        if let Some(&last) = self.index.last() {
            if date <= last {
                return Err(Error::UnorderedIndex { date });
            }
        }
        self.index.push(date);
        self.values.push(row);
        Ok(())
    }

    pub fn finish(self) -> Frame {
        Frame {
            index: self.index,
            columns: self.columns,
            values: self.values,
        }
    }
}

/// A named, date-indexed scalar series.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Series {
    pub name: String,
    pub index: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.index.iter().copied().zip(self.values.iter().copied())
    }
}

/// Sum of a row. The simulator and the reporter both go through this so a
/// breakdown row and its portfolio value are bit-for-bit equal.
#[inline]
pub(crate) fn row_total(row: &[f64]) -> f64 {
    row.iter().sum()
}

#[cfg(test)]
pub(crate) fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(u64::from(day))
}
