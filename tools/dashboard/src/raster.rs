//! Label grid loading from single-band GeoTIFF or serialized JSON.
//!
//! TIFF storage order (row 0 = north) is kept as-is: grids of different
//! slices only need to agree with each other, not with a geographic frame.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use landflow_core::{ClassCode, LabelGrid};
use thiserror::Error;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF decoding error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("label grid JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported pixel format {0:?} (expected a single gray band)")]
    UnsupportedPixelFormat(ColorType),

    #[error("unsupported sample type in TIFF")]
    UnsupportedSampleType,

    #[error("pixel value {0} is not an integer class code")]
    NotAClassCode(String),

    #[error("unrecognised grid file extension: {0:?}")]
    UnknownFormat(String),

    #[error(transparent)]
    Grid(#[from] landflow_core::Error),
}

/// Load a grid by file extension. `nodata` becomes the grid's sentinel.
pub fn load_grid(path: &Path, nodata: ClassCode) -> Result<LabelGrid, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "tif" | "tiff" => decode_label_tiff(BufReader::new(File::open(path)?), nodata),
        "json" => read_label_json(BufReader::new(File::open(path)?), nodata),
        _ => Err(LoadError::UnknownFormat(ext)),
    }
}

/// Parse a serialized [`LabelGrid`], moving its sentinel to `nodata`.
pub fn read_label_json<R: Read>(reader: R, nodata: ClassCode) -> Result<LabelGrid, LoadError> {
    let grid: LabelGrid = serde_json::from_reader(reader)?;
    grid.validate()?;
    Ok(grid.with_nodata(nodata))
}

fn int_codes<T>(buf: Vec<T>) -> Result<Vec<ClassCode>, LoadError>
where
    T: Copy + std::fmt::Display + TryInto<ClassCode>,
{
    buf.into_iter()
        .map(|v| v.try_into().map_err(|_| LoadError::NotAClassCode(v.to_string())))
        .collect()
}

/// NaN / infinite samples are nodata; anything else must be a whole number.
fn float_codes(buf: Vec<f64>, nodata: ClassCode) -> Result<Vec<ClassCode>, LoadError> {
    buf.into_iter()
        .map(|v| {
            if !v.is_finite() {
                Ok(nodata)
            } else if v.fract() == 0.0 && v >= ClassCode::MIN as f64 && v <= ClassCode::MAX as f64 {
                Ok(v as ClassCode)
            } else {
                Err(LoadError::NotAClassCode(v.to_string()))
            }
        })
        .collect()
}

/// Decode the first image of a TIFF stream into a label grid.
pub fn decode_label_tiff<R: Read + Seek>(reader: R, nodata: ClassCode) -> Result<LabelGrid, LoadError> {
    let mut decoder = Decoder::new(reader)?;
    let color = decoder.colortype()?;
    if !matches!(color, ColorType::Gray(_)) {
        return Err(LoadError::UnsupportedPixelFormat(color));
    }
    let (width, height) = decoder.dimensions()?;

    let data = match decoder.read_image()? {
        DecodingResult::U8(buf) => int_codes(buf)?,
        DecodingResult::U16(buf) => int_codes(buf)?,
        DecodingResult::U32(buf) => int_codes(buf)?,
        DecodingResult::U64(buf) => int_codes(buf)?,
        DecodingResult::I8(buf) => int_codes(buf)?,
        DecodingResult::I16(buf) => int_codes(buf)?,
        DecodingResult::I32(buf) => buf,
        DecodingResult::I64(buf) => int_codes(buf)?,
        DecodingResult::F32(buf) => float_codes(buf.into_iter().map(f64::from).collect(), nodata)?,
        DecodingResult::F64(buf) => float_codes(buf, nodata)?,
        #[allow(unreachable_patterns)]
        _ => return Err(LoadError::UnsupportedSampleType),
    };

    Ok(LabelGrid::from_vec(data, width as usize, height as usize, nodata)?)
}
