use std::collections::HashMap;
use std::fs::File;
use std::io::Write as IoWrite;
use std::path::Path;

use seq_tools::constants::GAMMA_BAR;
use seq_tools::gradient_event::GradEvent;
use seq_tools::scanner::Scanner;
use seq_tools::sequence::{GradAxis, Sequence};

use crate::shape::{compress_shape, CompressedShape};
use crate::Result;

// delay and trapezoid columns are stored in these units
const TIME_UNIT: f64 = 1e-6;
const DWELL_UNIT: f64 = 1e-9;

const RASTER_KEYS: [&str; 4] = [
    "AdcRasterTime",
    "BlockDurationRaster",
    "GradientRasterTime",
    "RadiofrequencyRasterTime",
];

/// interns shapes, deduplicating identical compressed data
struct ShapeRegistry {
    shapes: Vec<CompressedShape>,
    seen: HashMap<String, usize>,
}

impl ShapeRegistry {
    fn new() -> ShapeRegistry {
        ShapeRegistry {
            shapes: Vec::new(),
            seen: HashMap::new(),
        }
    }

    fn intern(&mut self, samples: &[f64]) -> usize {
        let c = compress_shape(samples);
        let key = shape_key(&c);
        if let Some(&id) = self.seen.get(&key) {
            return id;
        }
        self.shapes.push(c);
        let id = self.shapes.len();
        self.seen.insert(key, id);
        id
    }
}

fn shape_key(c: &CompressedShape) -> String {
    let mut key = format!("{}:", c.num_samples);
    for v in &c.data {
        key.push_str(&format!("{:x},", v.to_bits()));
    }
    key
}

fn round_units(t: f64, unit: f64) -> i64 {
    (t / unit).round() as i64
}

/// resample a waveform defined on one raster onto another by linear
/// interpolation; identity when the rasters already agree
fn resample(samples: &[f64], from: f64, to: f64) -> Vec<f64> {
    if (from - to).abs() < f64::EPSILON * from.max(to) || samples.len() < 2 {
        return samples.to_vec();
    }
    let span = (samples.len() - 1) as f64 * from;
    let t: Vec<f64> = (0..samples.len()).map(|i| i as f64 * from).collect();
    let n = (span / to).round() as usize + 1;
    (0..n)
        .map(|i| utils::interp1(&t, samples, (i as f64 * to).min(span)))
        .collect()
}

/// Serialize a sequence as a v1.4.0 `.seq` document.
pub fn write_str(seq: &Sequence, scanner: &Scanner) -> String {
    let mut shapes = ShapeRegistry::new();
    let mut rf_rows: Vec<String> = Vec::new();
    let mut grad_rows: Vec<String> = Vec::new();
    let mut trap_rows: Vec<String> = Vec::new();
    let mut adc_rows: Vec<String> = Vec::new();
    let mut block_rows: Vec<String> = Vec::new();

    for (bi, block) in seq.blocks.iter().enumerate() {
        let mut ids = [0usize; 6]; // rf gx gy gz adc ext

        if let Some(rf) = block.rf.as_ref().filter(|rf| rf.is_on()) {
            let re: Vec<f64> = rf.amplitude.iter().map(|a| a.re).collect();
            let im: Vec<f64> = rf.amplitude.iter().map(|a| a.im).collect();
            let re = resample(&re, rf.raster, scanner.rf_raster);
            let im = resample(&im, rf.raster, scanner.rf_raster);
            let peak = re
                .iter()
                .zip(im.iter())
                .map(|(r, i)| (r * r + i * i).sqrt())
                .fold(0.0, f64::max);
            let scale = if peak > 0.0 { 1.0 / peak } else { 0.0 };
            let mag: Vec<f64> = re
                .iter()
                .zip(im.iter())
                .map(|(r, i)| (r * r + i * i).sqrt() * scale)
                .collect();
            let phase: Vec<f64> = re
                .iter()
                .zip(im.iter())
                .map(|(r, i)| i.atan2(*r) / std::f64::consts::TAU)
                .collect();
            let mag_id = shapes.intern(&mag);
            let phase_id = shapes.intern(&phase);
            rf_rows.push(format!(
                "{} {} {} {} 0 {} {} {}",
                rf_rows.len() + 1,
                GAMMA_BAR * peak,
                mag_id,
                phase_id,
                round_units(rf.delay, TIME_UNIT),
                rf.freq_offset,
                rf.phase_offset,
            ));
            ids[0] = rf_rows.len();
        }

        for (slot, axis) in GradAxis::ALL.iter().enumerate() {
            let Some(g) = block.grad(*axis).filter(|g| g.is_on()) else {
                continue;
            };
            match g {
                GradEvent::Trap(t) => {
                    trap_rows.push(format!(
                        "{} {} {} {} {} {}",
                        grad_rows.len() + trap_rows.len() + 1,
                        t.amplitude,
                        round_units(t.rise, TIME_UNIT),
                        round_units(t.flat, TIME_UNIT),
                        round_units(t.fall, TIME_UNIT),
                        round_units(t.delay, TIME_UNIT),
                    ));
                }
                GradEvent::Arbitrary(a) => {
                    let samples = resample(&a.samples, a.raster, scanner.grad_raster);
                    let peak = samples.iter().map(|v| v.abs()).fold(0.0, f64::max);
                    let scale = if peak > 0.0 { 1.0 / peak } else { 0.0 };
                    let norm: Vec<f64> = samples.iter().map(|v| v * scale).collect();
                    let shape_id = shapes.intern(&norm);
                    grad_rows.push(format!(
                        "{} {} {} 0 {}",
                        grad_rows.len() + trap_rows.len() + 1,
                        peak,
                        shape_id,
                        round_units(a.delay, TIME_UNIT),
                    ));
                }
            }
            ids[1 + slot] = grad_rows.len() + trap_rows.len();
        }

        if let Some(adc) = block.adc.as_ref().filter(|a| a.is_on()) {
            adc_rows.push(format!(
                "{} {} {} {} 0 {}",
                adc_rows.len() + 1,
                adc.n,
                round_units(adc.dwell, DWELL_UNIT),
                round_units(adc.delay, TIME_UNIT),
                adc.phase,
            ));
            ids[4] = adc_rows.len();
        }

        block_rows.push(format!(
            "{} {} {} {} {} {} {} {}",
            bi + 1,
            round_units(block.duration(), scanner.block_raster),
            ids[0],
            ids[1],
            ids[2],
            ids[3],
            ids[4],
            ids[5],
        ));
    }

    let mut out = String::new();
    out.push_str("# Pulseq sequence file\n\n");

    out.push_str("[VERSION]\nmajor 1\nminor 4\nrevision 0\n\n");

    out.push_str("[DEFINITIONS]\n");
    for (k, v) in &seq.definitions {
        out.push_str(&format!("{} {}\n", k, v));
    }
    let raster_values = [
        scanner.adc_raster,
        scanner.block_raster,
        scanner.grad_raster,
        scanner.rf_raster,
    ];
    for (key, value) in RASTER_KEYS.iter().zip(raster_values.iter()) {
        if !seq.definitions.iter().any(|(k, _)| k == key) {
            out.push_str(&format!("{} {}\n", key, value));
        }
    }
    out.push('\n');

    out.push_str("[BLOCKS]\n");
    for row in &block_rows {
        out.push_str(row);
        out.push('\n');
    }
    out.push('\n');

    if !rf_rows.is_empty() {
        out.push_str("[RF]\n");
        for row in &rf_rows {
            out.push_str(row);
            out.push('\n');
        }
        out.push('\n');
    }

    if !grad_rows.is_empty() {
        out.push_str("[GRADIENTS]\n");
        for row in &grad_rows {
            out.push_str(row);
            out.push('\n');
        }
        out.push('\n');
    }

    if !trap_rows.is_empty() {
        out.push_str("[TRAP]\n");
        for row in &trap_rows {
            out.push_str(row);
            out.push('\n');
        }
        out.push('\n');
    }

    if !adc_rows.is_empty() {
        out.push_str("[ADC]\n");
        for row in &adc_rows {
            out.push_str(row);
            out.push('\n');
        }
        out.push('\n');
    }

    if !shapes.shapes.is_empty() {
        out.push_str("[SHAPES]\n\n");
        for (i, c) in shapes.shapes.iter().enumerate() {
            out.push_str(&format!("shape_id {}\n", i + 1));
            out.push_str(&format!("num_samples {}\n", c.num_samples));
            for v in &c.data {
                out.push_str(&format!("{}\n", v));
            }
            out.push('\n');
        }
    }

    out
}

pub fn write_file(seq: &Sequence, scanner: &Scanner, path: &Path) -> Result<()> {
    let mut f = File::create(path)?;
    f.write_all(write_str(seq, scanner).as_bytes())?;
    Ok(())
}
