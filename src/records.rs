//! CSV records for per-frame results.
//!
//! Every file starts with a `frame` column. Frames without a face are written
//! with empty cells, or with zeros when the legacy sentinel is requested.
//! Readers treat all-empty rows as missing. All-zero rows are only missing
//! when the reader is told the file uses the legacy sentinel, since a real
//! Gabor vector or face can be all zero.
//!
//! | file      | columns                                                           |
//! |-----------|-------------------------------------------------------------------|
//! | faces     | `frame, face.left, face.top, face.right, face.bottom, mark00.x, mark00.y, ...` |
//! | gabor     | `frame, resp.0000, resp.0001, ...`                                |
//! | emotions  | `frame, neutral, anger, contempt, ...`                            |
//! | blinks    | `frame, blink.count, blink.rate`                                  |
//! | distance  | `frame, face.distance, face.gradient`                             |
//! | training  | `sample, resp.0000, ..., label`                                   |

use crate::constants::NUM_FACIAL_LANDMARKS;
use crate::emotion::{Emotion, EmotionScores};
use crate::face::{Face, Point, Region};
use crate::features::{feature_column, FeatureVector};
use crate::{Error, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Face geometry of one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FaceRecord {
    pub frame: usize,
    pub face: Option<Face>,
}

/// Gabor features of one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub frame: usize,
    pub features: Option<FeatureVector>,
}

/// Emotion probabilities of one frame
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionRecord {
    pub frame: usize,
    pub scores: Option<EmotionScores>,
}

/// Blink count and rate after one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlinkRecord {
    pub frame: usize,
    pub count: usize,
    pub rate: f64,
}

/// Face distance and its rate of change at one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceRecord {
    pub frame: usize,
    pub distance: Option<f64>,
    pub gradient: Option<f64>,
}

/// Labelled feature vectors for classifier training
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub samples: Vec<Vec<f64>>,
    pub labels: Vec<Emotion>,
}

/// Column names of the face file
#[must_use]
pub fn face_header() -> Vec<String> {
    let mut header: Vec<String> = ["frame", "face.left", "face.top", "face.right", "face.bottom"]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    for i in 0..NUM_FACIAL_LANDMARKS {
        header.push(format!("mark{i:02}.x"));
        header.push(format!("mark{i:02}.y"));
    }
    header
}

/// Column names of the emotions file
#[must_use]
pub fn emotion_header() -> Vec<String> {
    std::iter::once("frame".to_string())
        .chain(Emotion::ALL.iter().map(|e| e.name().to_string()))
        .collect()
}

fn missing(count: usize, legacy_zero_sentinel: bool) -> Vec<String> {
    vec![if legacy_zero_sentinel { "0" } else { "" }.to_string(); count]
}

fn optional_value(value: Option<f64>, legacy_zero_sentinel: bool) -> String {
    match value {
        Some(v) => v.to_string(),
        None if legacy_zero_sentinel => "0".to_string(),
        None => String::new(),
    }
}

/// Write face records
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_faces_to<W: Write>(writer: W, records: &[FaceRecord], legacy_zero_sentinel: bool) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(face_header())?;

    for record in records {
        let mut row = vec![record.frame.to_string()];
        match &record.face {
            Some(face) => {
                let r = face.region();
                row.extend([r.left, r.top, r.right, r.bottom].iter().map(ToString::to_string));
                for p in face.landmarks() {
                    row.push(p.x.to_string());
                    row.push(p.y.to_string());
                }
            }
            None => row.extend(missing(4 + 2 * NUM_FACIAL_LANDMARKS, legacy_zero_sentinel)),
        }
        csv.write_record(&row)?;
    }

    csv.flush()?;
    Ok(())
}

/// Write face records to `path`
///
/// # Errors
///
/// Returns an error if the file can't be created or written.
pub fn write_faces<P: AsRef<Path>>(path: P, records: &[FaceRecord], legacy_zero_sentinel: bool) -> Result<()> {
    write_faces_to(File::create(path)?, records, legacy_zero_sentinel)
}

/// Read face records. With `legacy_zero_sentinel`, all-zero rows read as
/// missing.
///
/// # Errors
///
/// Returns [`Error::RecordError`] on a wrong header or malformed row.
pub fn read_faces_from<R: Read>(reader: R, legacy_zero_sentinel: bool) -> Result<Vec<FaceRecord>> {
    let mut csv = csv::Reader::from_reader(reader);
    check_header(&csv.headers()?.clone(), &face_header())?;

    let mut records = Vec::new();
    for (line, row) in csv.records().enumerate() {
        let row = row?;
        let frame = parse_frame(&row, line)?;
        let values = parse_optional_row::<i32>(&row, line, legacy_zero_sentinel)?;
        let face = match values {
            None => None,
            Some(v) => {
                let region = Region::new(v[0], v[1], v[2], v[3]);
                let landmarks = v[4..].chunks_exact(2).map(|c| Point::new(c[0], c[1])).collect();
                let face = Face::new(region, landmarks)
                    .map_err(|e| Error::RecordError(format!("Frame {frame}: {e}")))?;
                Some(face)
            }
        };
        records.push(FaceRecord { frame, face });
    }
    Ok(records)
}

/// Read face records from `path`
///
/// # Errors
///
/// Returns an error if the file can't be opened or is malformed.
pub fn read_faces<P: AsRef<Path>>(path: P, legacy_zero_sentinel: bool) -> Result<Vec<FaceRecord>> {
    read_faces_from(File::open(path)?, legacy_zero_sentinel)
}

/// Write Gabor feature records. The column count follows the first
/// non-empty vector; every vector must have that length.
///
/// # Errors
///
/// Returns an error if vectors differ in length or writing fails.
pub fn write_features_to<W: Write>(writer: W, records: &[FeatureRecord], legacy_zero_sentinel: bool) -> Result<()> {
    let len = records
        .iter()
        .find_map(|r| r.features.as_ref().map(Vec::len))
        .unwrap_or(0);

    let mut csv = csv::Writer::from_writer(writer);
    let header: Vec<String> = std::iter::once("frame".to_string())
        .chain((0..len).map(feature_column))
        .collect();
    csv.write_record(&header)?;

    for record in records {
        let mut row = vec![record.frame.to_string()];
        match &record.features {
            Some(features) if features.len() == len => row.extend(features.iter().map(ToString::to_string)),
            Some(features) => {
                return Err(Error::RecordError(format!(
                    "Frame {}: {} features, expected {len}",
                    record.frame,
                    features.len()
                )))
            }
            None => row.extend(missing(len, legacy_zero_sentinel)),
        }
        csv.write_record(&row)?;
    }

    csv.flush()?;
    Ok(())
}

/// Write Gabor feature records to `path`
///
/// # Errors
///
/// Returns an error if the file can't be created or written.
pub fn write_features<P: AsRef<Path>>(path: P, records: &[FeatureRecord], legacy_zero_sentinel: bool) -> Result<()> {
    write_features_to(File::create(path)?, records, legacy_zero_sentinel)
}

/// Read Gabor feature records. With `legacy_zero_sentinel`, all-zero rows
/// read as missing.
///
/// # Errors
///
/// Returns [`Error::RecordError`] on a wrong header or malformed row.
pub fn read_features_from<R: Read>(reader: R, legacy_zero_sentinel: bool) -> Result<Vec<FeatureRecord>> {
    let mut csv = csv::Reader::from_reader(reader);
    let headers = csv.headers()?.clone();
    let len = headers.len().saturating_sub(1);
    let expected: Vec<String> = std::iter::once("frame".to_string())
        .chain((0..len).map(feature_column))
        .collect();
    check_header(&headers, &expected)?;

    let mut records = Vec::new();
    for (line, row) in csv.records().enumerate() {
        let row = row?;
        let frame = parse_frame(&row, line)?;
        let features = parse_optional_row::<f64>(&row, line, legacy_zero_sentinel)?;
        records.push(FeatureRecord { frame, features });
    }
    Ok(records)
}

/// Read Gabor feature records from `path`
///
/// # Errors
///
/// Returns an error if the file can't be opened or is malformed.
pub fn read_features<P: AsRef<Path>>(path: P, legacy_zero_sentinel: bool) -> Result<Vec<FeatureRecord>> {
    read_features_from(File::open(path)?, legacy_zero_sentinel)
}

/// Write emotion records
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_emotions_to<W: Write>(writer: W, records: &[EmotionRecord], legacy_zero_sentinel: bool) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(emotion_header())?;

    for record in records {
        let mut row = vec![record.frame.to_string()];
        match &record.scores {
            Some(scores) => row.extend(scores.as_array().iter().map(ToString::to_string)),
            None => row.extend(missing(Emotion::ALL.len(), legacy_zero_sentinel)),
        }
        csv.write_record(&row)?;
    }

    csv.flush()?;
    Ok(())
}

/// Write emotion records to `path`
///
/// # Errors
///
/// Returns an error if the file can't be created or written.
pub fn write_emotions<P: AsRef<Path>>(path: P, records: &[EmotionRecord], legacy_zero_sentinel: bool) -> Result<()> {
    write_emotions_to(File::create(path)?, records, legacy_zero_sentinel)
}

/// Read emotion records. With `legacy_zero_sentinel`, all-zero rows read
/// as missing.
///
/// # Errors
///
/// Returns [`Error::RecordError`] on a wrong header or malformed row.
pub fn read_emotions_from<R: Read>(reader: R, legacy_zero_sentinel: bool) -> Result<Vec<EmotionRecord>> {
    let mut csv = csv::Reader::from_reader(reader);
    check_header(&csv.headers()?.clone(), &emotion_header())?;

    let mut records = Vec::new();
    for (line, row) in csv.records().enumerate() {
        let row = row?;
        let frame = parse_frame(&row, line)?;
        let scores = parse_optional_row::<f64>(&row, line, legacy_zero_sentinel)?.map(|v| {
            let mut probabilities = [0.0; 8];
            probabilities.copy_from_slice(&v);
            EmotionScores::new(probabilities)
        });
        records.push(EmotionRecord { frame, scores });
    }
    Ok(records)
}

/// Read emotion records from `path`
///
/// # Errors
///
/// Returns an error if the file can't be opened or is malformed.
pub fn read_emotions<P: AsRef<Path>>(path: P, legacy_zero_sentinel: bool) -> Result<Vec<EmotionRecord>> {
    read_emotions_from(File::open(path)?, legacy_zero_sentinel)
}

/// Write blink records
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_blinks_to<W: Write>(writer: W, records: &[BlinkRecord]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["frame", "blink.count", "blink.rate"])?;
    for record in records {
        csv.write_record([record.frame.to_string(), record.count.to_string(), record.rate.to_string()])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write blink records to `path`
///
/// # Errors
///
/// Returns an error if the file can't be created or written.
pub fn write_blinks<P: AsRef<Path>>(path: P, records: &[BlinkRecord]) -> Result<()> {
    write_blinks_to(File::create(path)?, records)
}

/// Read blink records
///
/// # Errors
///
/// Returns [`Error::RecordError`] on a wrong header or malformed row.
pub fn read_blinks_from<R: Read>(reader: R) -> Result<Vec<BlinkRecord>> {
    let mut csv = csv::Reader::from_reader(reader);
    check_header(
        &csv.headers()?.clone(),
        &["frame".to_string(), "blink.count".to_string(), "blink.rate".to_string()],
    )?;

    let mut records = Vec::new();
    for (line, row) in csv.records().enumerate() {
        let row = row?;
        records.push(BlinkRecord {
            frame: parse_frame(&row, line)?,
            count: parse_cell(&row[1], line)?,
            rate: parse_cell(&row[2], line)?,
        });
    }
    Ok(records)
}

/// Read blink records from `path`
///
/// # Errors
///
/// Returns an error if the file can't be opened or is malformed.
pub fn read_blinks<P: AsRef<Path>>(path: P) -> Result<Vec<BlinkRecord>> {
    read_blinks_from(File::open(path)?)
}

/// Write distance records
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_distances_to<W: Write>(writer: W, records: &[DistanceRecord], legacy_zero_sentinel: bool) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["frame", "face.distance", "face.gradient"])?;
    for record in records {
        csv.write_record([
            record.frame.to_string(),
            optional_value(record.distance, legacy_zero_sentinel),
            optional_value(record.gradient, legacy_zero_sentinel),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write distance records to `path`
///
/// # Errors
///
/// Returns an error if the file can't be created or written.
pub fn write_distances<P: AsRef<Path>>(path: P, records: &[DistanceRecord], legacy_zero_sentinel: bool) -> Result<()> {
    write_distances_to(File::create(path)?, records, legacy_zero_sentinel)
}

/// Write a training set
///
/// # Errors
///
/// Returns an error if samples are ragged, counts differ, or writing fails.
pub fn write_training_to<W: Write>(writer: W, set: &TrainingSet) -> Result<()> {
    if set.samples.len() != set.labels.len() {
        return Err(Error::RecordError(format!(
            "{} samples but {} labels",
            set.samples.len(),
            set.labels.len()
        )));
    }
    let len = set.samples.first().map_or(0, Vec::len);

    let mut csv = csv::Writer::from_writer(writer);
    let header: Vec<String> = std::iter::once("sample".to_string())
        .chain((0..len).map(feature_column))
        .chain(std::iter::once("label".to_string()))
        .collect();
    csv.write_record(&header)?;

    for (i, (sample, label)) in set.samples.iter().zip(&set.labels).enumerate() {
        if sample.len() != len {
            return Err(Error::RecordError(format!("Sample {i}: {} features, expected {len}", sample.len())));
        }
        let row: Vec<String> = std::iter::once(i.to_string())
            .chain(sample.iter().map(ToString::to_string))
            .chain(std::iter::once(label.name().to_string()))
            .collect();
        csv.write_record(&row)?;
    }

    csv.flush()?;
    Ok(())
}

/// Read a training set. Labels are names or legacy integer codes.
///
/// # Errors
///
/// Returns [`Error::RecordError`] on a malformed header, row or label.
pub fn read_training_from<R: Read>(reader: R) -> Result<TrainingSet> {
    let mut csv = csv::Reader::from_reader(reader);
    let headers = csv.headers()?.clone();
    if headers.len() < 3 || &headers[0] != "sample" || &headers[headers.len() - 1] != "label" {
        return Err(Error::RecordError(
            "Training file needs `sample`, feature and `label` columns".to_string(),
        ));
    }
    let last = headers.len() - 1;

    let mut set = TrainingSet::default();
    for (line, row) in csv.records().enumerate() {
        let row = row?;
        let sample = (1..last)
            .map(|i| parse_cell::<f64>(&row[i], line))
            .collect::<Result<Vec<_>>>()?;
        let label = row[last]
            .parse::<Emotion>()
            .map_err(|e| Error::RecordError(format!("Row {}: {e}", line + 1)))?;
        set.samples.push(sample);
        set.labels.push(label);
    }
    Ok(set)
}

/// Read a training set from `path`
///
/// # Errors
///
/// Returns an error if the file can't be opened or is malformed.
pub fn read_training<P: AsRef<Path>>(path: P) -> Result<TrainingSet> {
    read_training_from(File::open(path)?)
}

/// Write a training set to `path`
///
/// # Errors
///
/// Returns an error if the file can't be created or written.
pub fn write_training<P: AsRef<Path>>(path: P, set: &TrainingSet) -> Result<()> {
    write_training_to(File::create(path)?, set)
}

fn check_header(actual: &csv::StringRecord, expected: &[String]) -> Result<()> {
    if actual.len() != expected.len() || actual.iter().zip(expected).any(|(a, e)| a.trim() != e.as_str()) {
        return Err(Error::RecordError(format!(
            "Unexpected header: expected {} columns starting with {:?}",
            expected.len(),
            expected.iter().take(3).collect::<Vec<_>>()
        )));
    }
    Ok(())
}

fn parse_cell<T: std::str::FromStr>(cell: &str, line: usize) -> Result<T> {
    cell.trim()
        .parse::<T>()
        .map_err(|_| Error::RecordError(format!("Row {}: cannot parse `{cell}`", line + 1)))
}

fn parse_frame(row: &csv::StringRecord, line: usize) -> Result<usize> {
    parse_cell(&row[0], line)
}

/// Parse every cell after the frame column. All empty means the frame has
/// no value, as does all zero under the legacy sentinel.
fn parse_optional_row<T>(row: &csv::StringRecord, line: usize, legacy_zero_sentinel: bool) -> Result<Option<Vec<T>>>
where
    T: std::str::FromStr + Default + PartialEq,
{
    let cells: Vec<&str> = row.iter().skip(1).map(str::trim).collect();
    if cells.iter().all(|c| c.is_empty()) {
        return Ok(None);
    }
    let values = cells
        .iter()
        .map(|c| parse_cell::<T>(c, line))
        .collect::<Result<Vec<T>>>()?;
    if legacy_zero_sentinel && values.iter().all(|v| *v == T::default()) {
        return Ok(None);
    }
    Ok(Some(values))
}
