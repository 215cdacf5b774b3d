//! CSV interfaces: trace exports, matching-range round-trip, and the
//! Keysight-style VNA capture import.
//!
//! Exports write plain comma-separated text (magnitudes in dB, phases in
//! degrees). The VNA reader accepts the instrument convention: `!` lines
//! are metadata, the payload sits in a `BEGIN`/`END` block whose header
//! names the frequency column and the measurement kind.

use csv::{ReaderBuilder, WriterBuilder};
use num_complex::Complex64;
use rfcalc_algo::{GammaPath, SweepResult};
use rfcalc_core::{RfError, RfResult};
use std::io::{Read, Write};

fn csv_err(e: csv::Error) -> RfError {
    RfError::Parse(e.to_string())
}

// ---------------------------------------------------------------------------
// Trace exports
// ---------------------------------------------------------------------------

/// Export one S_ij trace: `Frequency (Hz),<p> Magnitude (dB),<p> Phase (deg)`.
pub fn write_single_param_csv<W: Write>(
    w: W,
    result: &SweepResult,
    i: usize,
    j: usize,
) -> RfResult<()> {
    if i >= result.ports || j >= result.ports {
        return Err(RfError::InvalidInput(format!(
            "no S{}{} in a {}-port result",
            i + 1,
            j + 1,
            result.ports
        )));
    }
    let name = format!("S{}{}", i + 1, j + 1);
    let mut writer = WriterBuilder::new().from_writer(w);
    writer
        .write_record([
            "Frequency (Hz)".to_string(),
            format!("{} Magnitude (dB)", name),
            format!("{} Phase (deg)", name),
        ])
        .map_err(csv_err)?;
    let trace = result.trace(i, j);
    for k in 0..result.points() {
        writer
            .write_record([
                format!("{}", result.frequencies[k].value()),
                format!("{}", trace.db[k]),
                format!("{}", trace.phase_deg[k]),
            ])
            .map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

/// Export the full S-matrix: the frequency column plus two columns per
/// S_ij (dB, deg), column-major over the port pairs (S11, S21, ..., S12, ...).
pub fn write_full_csv<W: Write>(w: W, result: &SweepResult) -> RfResult<()> {
    let ports = result.ports;
    let mut writer = WriterBuilder::new().from_writer(w);

    let mut header = vec!["Frequency (Hz)".to_string()];
    for j in 0..ports {
        for i in 0..ports {
            let name = format!("S{}{}", i + 1, j + 1);
            header.push(format!("{} Magnitude (dB)", name));
            header.push(format!("{} Phase (deg)", name));
        }
    }
    writer.write_record(&header).map_err(csv_err)?;

    for k in 0..result.points() {
        let mut row = vec![format!("{}", result.frequencies[k].value())];
        for j in 0..ports {
            for i in 0..ports {
                let trace = result.trace(i, j);
                row.push(format!("{}", trace.db[k]));
                row.push(format!("{}", trace.phase_deg[k]));
            }
        }
        writer.write_record(&row).map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Matching-range CSV
// ---------------------------------------------------------------------------

/// Write a matching-range path:
/// `Matching Range,<Z0 re>,<Z0 im>` then `PathID,Real,Imag` rows.
pub fn write_matching_csv<W: Write>(w: W, path: &GammaPath) -> RfResult<()> {
    let mut writer = WriterBuilder::new().flexible(true).from_writer(w);
    writer
        .write_record([
            "Matching Range".to_string(),
            format!("{}", path.z0),
            format!("{}", 0.0),
        ])
        .map_err(csv_err)?;
    writer
        .write_record(["PathID", "Real", "Imag"])
        .map_err(csv_err)?;
    for (index, gamma) in path.points.iter().enumerate() {
        writer
            .write_record([
                format!("{}", index),
                format!("{}", gamma.re),
                format!("{}", gamma.im),
            ])
            .map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

/// A matching-range path read back from CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingCsv {
    pub z0: Complex64,
    pub points: Vec<Complex64>,
}

/// Read a matching-range CSV written by [`write_matching_csv`] (or the
/// editor). Points are returned in path order.
pub fn read_matching_csv<R: Read>(r: R) -> RfResult<MatchingCsv> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(r);

    let mut records = reader.records();

    let head = records
        .next()
        .ok_or_else(|| RfError::Parse("empty matching-range CSV".into()))?
        .map_err(csv_err)?;
    if head.get(0) != Some("Matching Range") {
        return Err(RfError::Parse("missing 'Matching Range' header".into()));
    }
    let z0_re: f64 = parse_field(head.get(1), "Z0 real")?;
    let z0_im: f64 = parse_field(head.get(2), "Z0 imag")?;

    // Column header line
    let columns = records
        .next()
        .ok_or_else(|| RfError::Parse("missing column header".into()))?
        .map_err(csv_err)?;
    if columns.get(0) != Some("PathID") {
        return Err(RfError::Parse("missing 'PathID' column header".into()));
    }

    let mut points = Vec::new();
    for record in records {
        let record = record.map_err(csv_err)?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let re: f64 = parse_field(record.get(1), "gamma real")?;
        let im: f64 = parse_field(record.get(2), "gamma imag")?;
        points.push(Complex64::new(re, im));
    }

    Ok(MatchingCsv {
        z0: Complex64::new(z0_re, z0_im),
        points,
    })
}

fn parse_field(field: Option<&str>, what: &str) -> RfResult<f64> {
    field
        .map(str::trim)
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| RfError::Parse(format!("bad {what} field")))
}

// ---------------------------------------------------------------------------
// VNA capture import
// ---------------------------------------------------------------------------

/// Measurement kind named by a VNA capture header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VnaKind {
    LogMag,
    LinMag,
    Phase,
    Swr,
    Delay,
}

impl VnaKind {
    fn detect(header: &str) -> Option<Self> {
        let lower = header.to_ascii_lowercase();
        if lower.contains("log mag") {
            Some(VnaKind::LogMag)
        } else if lower.contains("lin mag") {
            Some(VnaKind::LinMag)
        } else if lower.contains("phase") {
            Some(VnaKind::Phase)
        } else if lower.contains("swr") {
            Some(VnaKind::Swr)
        } else if lower.contains("delay") {
            Some(VnaKind::Delay)
        } else {
            None
        }
    }
}

/// One imported VNA trace.
#[derive(Debug, Clone, PartialEq)]
pub struct VnaTrace {
    pub kind: VnaKind,
    pub frequencies: Vec<f64>,
    pub values: Vec<f64>,
}

/// Read a Keysight-style VNA CSV capture: `!` metadata lines, a
/// `BEGIN`/`END` block, a header row naming `freq` and the measurement
/// kind, then `frequency,value` rows.
pub fn read_vna_csv<R: Read>(r: R) -> RfResult<VnaTrace> {
    let mut text = String::new();
    let mut r = r;
    r.read_to_string(&mut text)?;

    let mut in_block = false;
    let mut kind: Option<VnaKind> = None;
    let mut frequencies = Vec::new();
    let mut values = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('!') {
            continue;
        }
        if line.eq_ignore_ascii_case("END") {
            break;
        }
        if line.to_ascii_uppercase().starts_with("BEGIN") {
            in_block = true;
            continue;
        }
        if !in_block {
            continue;
        }

        if kind.is_none() && line.to_ascii_lowercase().contains("freq") {
            kind = Some(VnaKind::detect(line).ok_or_else(|| {
                RfError::Parse(format!("unknown measurement kind in header '{line}'"))
            })?);
            continue;
        }

        let mut fields = line.split(',').map(str::trim);
        let (Some(f), Some(v)) = (fields.next(), fields.next()) else {
            return Err(RfError::Parse(format!("short data row '{line}'")));
        };
        let f: f64 = f
            .parse()
            .map_err(|_| RfError::Parse(format!("bad frequency '{f}'")))?;
        let v: f64 = v
            .parse()
            .map_err(|_| RfError::Parse(format!("bad value '{v}'")))?;
        frequencies.push(f);
        values.push(v);
    }

    let kind = kind.ok_or_else(|| RfError::Parse("no data header found".into()))?;
    Ok(VnaTrace {
        kind,
        frequencies,
        values,
    })
}
