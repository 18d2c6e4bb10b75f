use std::collections::HashMap;
use std::path::Path;

use num_complex::Complex;
use seq_tools::adc_event::AdcEvent;
use seq_tools::constants::GAMMA_BAR;
use seq_tools::gradient_event::GradEvent;
use seq_tools::rf_event::RfEvent;
use seq_tools::sequence::{Block, Sequence};

use crate::shape::{decompress_shape, CompressedShape};
use crate::{supported, Error, Result};

const TIME_UNIT: f64 = 1e-6;
const DWELL_UNIT: f64 = 1e-9;

pub fn read_file(path: &Path) -> Result<Sequence> {
    let text = std::fs::read_to_string(path)?;
    parse_str(&text)
}

/// Parse a `.seq` document. Nothing is returned on any malformation; the
/// whole file either loads or fails.
pub fn parse_str(text: &str) -> Result<Sequence> {
    let sections = split_sections(text)?;

    let version = sections
        .get("VERSION")
        .ok_or_else(|| Error::InvalidFormat("missing [VERSION] section".to_string()))?;
    let (major, minor, revision) = parse_version(version)?;
    if !supported(major, minor) {
        return Err(Error::UnsupportedVersion {
            major,
            minor,
            revision,
        });
    }
    let v14 = minor >= 4;

    let definitions = parse_definitions(sections.get("DEFINITIONS"));
    let def_f64 = |key: &str, fallback: f64| {
        definitions
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.parse::<f64>().ok())
            .unwrap_or(fallback)
    };
    let rf_raster = def_f64("RadiofrequencyRasterTime", 1e-7);
    let grad_raster = def_f64("GradientRasterTime", 1e-6);
    let block_raster = def_f64("BlockDurationRaster", 1e-6);
    if rf_raster <= 0.0 || grad_raster <= 0.0 || block_raster <= 0.0 {
        return Err(Error::InvalidFormat(
            "raster definitions must be positive".to_string(),
        ));
    }

    let shapes = parse_shapes(sections.get("SHAPES"))?;
    let shape = |id: usize| -> Result<Vec<f64>> {
        shapes
            .get(&id)
            .map(decompress_shape)
            .ok_or(Error::DanglingReference {
                section: "shape",
                id,
            })
    };

    let rf_table = parse_rows(sections.get("RF"), "RF")?;
    let grad_table = parse_rows(sections.get("GRADIENTS"), "GRADIENTS")?;
    let trap_table = parse_rows(sections.get("TRAP"), "TRAP")?;
    let adc_table = parse_rows(sections.get("ADC"), "ADC")?;
    let delay_table = parse_rows(sections.get("DELAYS"), "DELAYS")?;

    let mut block_rows: Vec<Vec<f64>> = Vec::new();
    if let Some(rows) = sections.get("BLOCKS") {
        for row in rows {
            block_rows.push(parse_numbers(row, "BLOCKS")?);
        }
    }
    block_rows.sort_by(|a, b| a[0].total_cmp(&b[0]));

    let mut seq = Sequence::new();
    seq.definitions = definitions;

    for row in &block_rows {
        let want = if v14 { 8 } else { 7 };
        if row.len() < want {
            return Err(Error::InvalidFormat(format!(
                "block row has {} columns, expected {}",
                row.len(),
                want
            )));
        }
        let mut block = Block::default();
        let col = |i: usize| row[i] as usize;

        let (extension, ids_at) = if v14 {
            (row[1] * block_raster, 2usize)
        } else {
            // v1.2 keeps block dead time in a delay table
            let delay_id = col(1);
            let d = if delay_id == 0 {
                0.0
            } else {
                let drow = delay_table.get(&delay_id).ok_or(Error::DanglingReference {
                    section: "DELAYS",
                    id: delay_id,
                })?;
                drow[1] * TIME_UNIT
            };
            (d, 2usize)
        };
        block.extension = extension;

        let rf_id = col(ids_at);
        if rf_id != 0 {
            let row = rf_table.get(&rf_id).ok_or(Error::DanglingReference {
                section: "RF",
                id: rf_id,
            })?;
            block.rf = Some(build_rf(row, v14, rf_raster, &shape)?);
        }

        for (slot, target) in [&mut block.gx, &mut block.gy, &mut block.gz]
            .into_iter()
            .enumerate()
        {
            let gid = col(ids_at + 1 + slot);
            if gid == 0 {
                continue;
            }
            let g = if let Some(row) = trap_table.get(&gid) {
                build_trap(row)?
            } else if let Some(row) = grad_table.get(&gid) {
                build_arb(row, grad_raster, &shape)?
            } else {
                return Err(Error::DanglingReference {
                    section: "GRADIENTS",
                    id: gid,
                });
            };
            *target = Some(g);
        }

        let adc_id = col(ids_at + 4);
        if adc_id != 0 {
            let row = adc_table.get(&adc_id).ok_or(Error::DanglingReference {
                section: "ADC",
                id: adc_id,
            })?;
            block.adc = Some(build_adc(row)?);
        }

        seq.push(block);
    }

    Ok(seq)
}

fn build_rf<F>(row: &[f64], v14: bool, raster: f64, shape: &F) -> Result<RfEvent>
where
    F: Fn(usize) -> Result<Vec<f64>>,
{
    // v1.4: id amp mag phase time delay freq phase; v1.2 has no time column
    let want = if v14 { 8 } else { 7 };
    if row.len() < want {
        return Err(Error::InvalidFormat(format!(
            "RF row has {} columns, expected {}",
            row.len(),
            want
        )));
    }
    let amp = row[1];
    let mag_id = row[2] as usize;
    let phase_id = row[3] as usize;
    let (delay, freq, phase) = if v14 {
        (row[5], row[6], row[7])
    } else {
        (row[4], row[5], row[6])
    };
    let mag = shape(mag_id)?;
    let pha = shape(phase_id)?;
    if mag.is_empty() {
        return Err(Error::InvalidFormat("empty RF envelope shape".to_string()));
    }
    if mag.len() != pha.len() {
        return Err(Error::InvalidFormat(format!(
            "RF magnitude and phase shapes disagree: {} vs {}",
            mag.len(),
            pha.len()
        )));
    }
    if delay < 0.0 {
        return Err(Error::InvalidFormat("negative RF delay".to_string()));
    }
    let peak = amp / GAMMA_BAR;
    let amplitude: Vec<Complex<f64>> = mag
        .iter()
        .zip(pha.iter())
        .map(|(m, p)| Complex::from_polar(peak * m, std::f64::consts::TAU * p))
        .collect();
    Ok(RfEvent::new(
        amplitude,
        raster,
        delay * TIME_UNIT,
        freq,
        phase,
    ))
}

fn build_trap(row: &[f64]) -> Result<GradEvent> {
    if row.len() < 6 {
        return Err(Error::InvalidFormat(
            "TRAP row needs 6 columns".to_string(),
        ));
    }
    if row[2] < 0.0 || row[3] < 0.0 || row[4] < 0.0 || row[5] < 0.0 {
        return Err(Error::InvalidFormat(
            "negative trapezoid timing".to_string(),
        ));
    }
    Ok(GradEvent::trap(
        row[1],
        row[5] * TIME_UNIT,
        row[2] * TIME_UNIT,
        row[3] * TIME_UNIT,
        row[4] * TIME_UNIT,
    ))
}

fn build_arb<F>(row: &[f64], raster: f64, shape: &F) -> Result<GradEvent>
where
    F: Fn(usize) -> Result<Vec<f64>>,
{
    // id amp shape [time] delay; the trailing column is always the delay
    if row.len() < 4 {
        return Err(Error::InvalidFormat(
            "GRADIENTS row needs at least 4 columns".to_string(),
        ));
    }
    let amp = row[1];
    let shape_id = row[2] as usize;
    let delay = row[row.len() - 1] * TIME_UNIT;
    if delay < 0.0 {
        return Err(Error::InvalidFormat(
            "negative gradient delay".to_string(),
        ));
    }
    let norm = shape(shape_id)?;
    if norm.is_empty() {
        return Err(Error::InvalidFormat(
            "empty gradient waveform shape".to_string(),
        ));
    }
    let samples: Vec<f64> = norm.iter().map(|v| amp * v).collect();
    Ok(GradEvent::arbitrary(samples, raster, delay))
}

fn build_adc(row: &[f64]) -> Result<AdcEvent> {
    if row.len() < 6 {
        return Err(Error::InvalidFormat("ADC row needs 6 columns".to_string()));
    }
    if row[2] <= 0.0 || row[3] < 0.0 {
        return Err(Error::InvalidFormat("bad ADC timing".to_string()));
    }
    // id num dwell delay freq phase; the frequency column is not modeled
    Ok(AdcEvent::new(
        row[1] as usize,
        row[2] * DWELL_UNIT,
        row[3] * TIME_UNIT,
        row[5],
    ))
}

fn split_sections(text: &str) -> Result<HashMap<String, Vec<String>>> {
    let mut sections: HashMap<String, Vec<String>> = HashMap::new();
    let mut current: Option<String> = None;
    for raw in text.lines() {
        let line = match raw.find('#') {
            Some(i) => &raw[..i],
            None => raw,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('[') {
            if !line.ends_with(']') {
                return Err(Error::InvalidFormat(format!(
                    "malformed section header '{}'",
                    raw.trim()
                )));
            }
            let name = line[1..line.len() - 1].trim().to_uppercase();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }
        match &current {
            Some(name) => sections.get_mut(name).unwrap().push(line.to_string()),
            None => {
                return Err(Error::InvalidFormat(format!(
                    "content before first section: '{}'",
                    line
                )))
            }
        }
    }
    Ok(sections)
}

fn parse_version(rows: &[String]) -> Result<(i32, i32, i32)> {
    let mut major = None;
    let mut minor = None;
    let mut revision = None;
    for row in rows {
        let mut it = row.split_whitespace();
        let key = it.next().unwrap_or("");
        let val: i32 = it
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| Error::InvalidFormat(format!("bad version row '{}'", row)))?;
        match key {
            "major" => major = Some(val),
            "minor" => minor = Some(val),
            "revision" => revision = Some(val),
            _ => {
                return Err(Error::InvalidFormat(format!(
                    "unknown version field '{}'",
                    key
                )))
            }
        }
    }
    match (major, minor, revision) {
        (Some(a), Some(b), Some(c)) => Ok((a, b, c)),
        _ => Err(Error::InvalidFormat(
            "incomplete [VERSION] section".to_string(),
        )),
    }
}

fn parse_definitions(rows: Option<&Vec<String>>) -> Vec<(String, String)> {
    let mut defs = Vec::new();
    if let Some(rows) = rows {
        for row in rows {
            let mut it = row.splitn(2, char::is_whitespace);
            if let Some(key) = it.next() {
                let value = it.next().unwrap_or("").trim().to_string();
                defs.push((key.to_string(), value));
            }
        }
    }
    defs
}

fn parse_rows(
    rows: Option<&Vec<String>>,
    section: &'static str,
) -> Result<HashMap<usize, Vec<f64>>> {
    let mut table = HashMap::new();
    if let Some(rows) = rows {
        for row in rows {
            let vals = parse_numbers(row, section)?;
            if vals.is_empty() {
                continue;
            }
            table.insert(vals[0] as usize, vals);
        }
    }
    Ok(table)
}

fn parse_numbers(row: &str, section: &'static str) -> Result<Vec<f64>> {
    row.split_whitespace()
        .map(|tok| {
            tok.parse::<f64>().map_err(|_| {
                Error::InvalidFormat(format!("bad number '{}' in [{}]", tok, section))
            })
        })
        .collect()
}

fn parse_shapes(rows: Option<&Vec<String>>) -> Result<HashMap<usize, CompressedShape>> {
    let mut shapes = HashMap::new();
    let Some(rows) = rows else {
        return Ok(shapes);
    };
    let mut id: Option<usize> = None;
    let mut num_samples: Option<usize> = None;
    let mut data: Vec<f64> = Vec::new();
    let mut flush = |id: &mut Option<usize>,
                     num: &mut Option<usize>,
                     data: &mut Vec<f64>|
     -> Result<()> {
        if let Some(i) = id.take() {
            let num_samples = num.take().ok_or_else(|| {
                Error::InvalidFormat(format!("shape {} has no num_samples", i))
            })?;
            shapes.insert(
                i,
                CompressedShape {
                    num_samples,
                    data: std::mem::take(data),
                },
            );
        }
        Ok(())
    };
    for row in rows {
        let mut it = row.split_whitespace();
        let head = it.next().unwrap_or("");
        match head {
            "shape_id" => {
                flush(&mut id, &mut num_samples, &mut data)?;
                let v = it
                    .next()
                    .and_then(|v| v.parse::<usize>().ok())
                    .ok_or_else(|| Error::InvalidFormat(format!("bad shape_id row '{}'", row)))?;
                id = Some(v);
            }
            "num_samples" => {
                let v = it
                    .next()
                    .and_then(|v| v.parse::<usize>().ok())
                    .ok_or_else(|| {
                        Error::InvalidFormat(format!("bad num_samples row '{}'", row))
                    })?;
                num_samples = Some(v);
            }
            tok => {
                let v: f64 = tok.parse().map_err(|_| {
                    Error::InvalidFormat(format!("bad shape sample '{}'", tok))
                })?;
                data.push(v);
                for tok in it {
                    let v: f64 = tok.parse().map_err(|_| {
                        Error::InvalidFormat(format!("bad shape sample '{}'", tok))
                    })?;
                    data.push(v);
                }
            }
        }
    }
    flush(&mut id, &mut num_samples, &mut data)?;
    Ok(shapes)
}
