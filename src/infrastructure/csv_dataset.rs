// Normalized generation mix CSV loader
use crate::domain::generation::{GenerationMixRow, GenerationSource};
use crate::domain::utility::Utility;
use anyhow::{Context, Result, ensure};
use chrono::{DateTime, NaiveDateTime};
use std::io::Read;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

pub fn dataset_path(dir: &Path, utility: Utility) -> PathBuf {
    dir.join(format!("{}.csv", utility))
}

pub fn load_dataset(dir: &Path, utility: Utility) -> Result<Vec<GenerationMixRow>> {
    let path = dataset_path(dir, utility);
    let file = std::fs::File::open(&path)
        .with_context(|| format!("Failed to open dataset {}", path.display()))?;
    parse_dataset(file).with_context(|| format!("Failed to parse dataset {}", path.display()))
}

/// Parse rows with a `datetime` column and one `MWh_*` column per source.
/// Unknown columns (demand, throttling) are ignored.
pub fn parse_dataset<R: Read>(reader: R) -> Result<Vec<GenerationMixRow>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = reader.headers().context("Failed to read CSV header")?.clone();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("missing column `{}`", name))
    };
    let datetime_idx = position("datetime")?;
    let source_idx = GenerationSource::ALL
        .into_iter()
        .map(|s| position(s.column()).map(|idx| (s, idx)))
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read record {}", line + 1))?;
        let datetime = parse_timestamp(&record[datetime_idx])
            .with_context(|| format!("record {}", line + 1))?;

        let mut row = GenerationMixRow::new(datetime);
        for (source, idx) in &source_idx {
            let raw = &record[*idx];
            let mwh: f64 = raw.parse().with_context(|| {
                format!("record {}: {} is not a number: `{}`", line + 1, source.column(), raw)
            })?;
            ensure!(
                mwh.is_finite(),
                "record {}: {} is not finite: `{}`",
                line + 1,
                source.column(),
                raw
            );
            row.set(*source, mwh);
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Wall-clock time of the observation; offsets are dropped, not converted
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.naive_local());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .with_context(|| format!("unrecognised timestamp `{}`", raw))
}
