//! Touchstone (`.s{N}p`) export.
//!
//! One comment line, the option line `# Hz S RI R <z0>`, then one row per
//! frequency: the frequency in hertz followed by `2·N²` real/imaginary
//! pairs in row-major port order.

use rfcalc_algo::SweepResult;
use rfcalc_core::RfResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Comment placed on the first line of every export.
const BANNER: &str = "! RF Circuit Calculator";

/// Conventional extension for the port count, e.g. `s2p`.
pub fn touchstone_extension(ports: usize) -> String {
    format!("s{}p", ports)
}

/// Format a value like `1.000000e+06` (sign-and-two-digit exponent).
fn fmt_exp(value: f64, precision: usize) -> String {
    let s = format!("{:.*e}", precision, value);
    match s.find('e') {
        Some(pos) => {
            let (mantissa, exp) = s.split_at(pos);
            let exp = &exp[1..];
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ("-", d),
                None => ("+", exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => s,
    }
}

/// Write a sweep result as Touchstone data.
pub fn write_touchstone<W: Write>(mut w: W, result: &SweepResult) -> RfResult<()> {
    writeln!(w, "{}", BANNER)?;
    writeln!(w, "# Hz S RI R {}", result.z0)?;

    let ports = result.ports;
    for k in 0..result.points() {
        let mut row = fmt_exp(result.frequencies[k].value(), 6);
        for i in 0..ports {
            for j in 0..ports {
                let s = result.trace(i, j).s[k];
                row.push_str(&format!(" {:.8} {:.8}", s.re, s.im));
            }
        }
        writeln!(w, "{}", row)?;
    }
    Ok(())
}

/// Render to a string (plots, clipboard export).
pub fn touchstone_string(result: &SweepResult) -> RfResult<String> {
    let mut buffer = Vec::new();
    write_touchstone(&mut buffer, result)?;
    String::from_utf8(buffer).map_err(|e| rfcalc_core::RfError::Parse(e.to_string()))
}

/// Export to a file.
pub fn export_touchstone(result: &SweepResult, path: impl AsRef<Path>) -> RfResult<()> {
    let file = File::create(path)?;
    write_touchstone(BufWriter::new(file), result)
}
