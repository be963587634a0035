use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Integer class code stored in a landcover raster.
pub type ClassCode = i32;

/// A 2D grid of categorical class codes, row-major.
/// `nodata` marks cells that carry no classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelGrid {
    /// Row-major class codes, length = `width × height`.
    pub data: Vec<ClassCode>,
    pub width: usize,
    pub height: usize,
    pub nodata: ClassCode,
}

impl LabelGrid {
    /// Create a grid filled with the given code.
    pub fn new(width: usize, height: usize, nodata: ClassCode, fill: ClassCode) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
            nodata,
        }
    }

    /// Wrap an existing row-major buffer. Its length must be `width × height`.
    pub fn from_vec(data: Vec<ClassCode>, width: usize, height: usize, nodata: ClassCode) -> Result<Self> {
        let grid = Self { data, width, height, nodata };
        grid.validate()?;
        Ok(grid)
    }

    /// Build a grid from nested rows. All rows must have the same length.
    pub fn from_rows<R: AsRef<[ClassCode]>>(rows: &[R], nodata: ClassCode) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(width * height);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != width {
                return Err(Error::InvalidGrid(format!(
                    "row {i} has {} columns, expected {width}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self { data, width, height, nodata })
    }

    /// Check the buffer length against the declared dimensions.
    /// Grids deserialized from JSON should be validated before use.
    pub fn validate(&self) -> Result<()> {
        if self.data.len() != self.width * self.height {
            return Err(Error::InvalidGrid(format!(
                "{} cells for a {}×{} grid",
                self.data.len(),
                self.height,
                self.width
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> ClassCode {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, code: ClassCode) {
        self.data[row * self.width + col] = code;
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn is_nodata(&self, code: ClassCode) -> bool {
        code == self.nodata
    }

    /// Switch to a different sentinel, rewriting cells that held the old one.
    pub fn with_nodata(mut self, nodata: ClassCode) -> Self {
        if nodata != self.nodata {
            let old = self.nodata;
            for v in self.data.iter_mut().filter(|v| **v == old) {
                *v = nodata;
            }
            self.nodata = nodata;
        }
        self
    }

    /// Number of cells holding a code other than the sentinel.
    pub fn valid_cells(&self) -> usize {
        self.data.iter().filter(|&&v| v != self.nodata).count()
    }
}
