use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Hardware context carried through a simulation run: field strength,
/// amplifier limits and the raster times the file codec rounds to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scanner {
    /// main field in T
    pub b0: f64,
    /// peak B1 in T
    pub b1_max: f64,
    /// peak gradient in T/m
    pub g_max: f64,
    /// peak slew rate in T/m/s
    pub s_max: f64,
    /// gradient raster in s
    pub grad_raster: f64,
    /// RF raster in s
    pub rf_raster: f64,
    /// ADC dwell raster in s
    pub adc_raster: f64,
    /// block duration raster in s
    pub block_raster: f64,
}

impl Default for Scanner {
    fn default() -> Scanner {
        Scanner {
            b0: 7.0,
            b1_max: 25e-6,
            g_max: 0.15,
            s_max: 3000.0,
            grad_raster: 1e-6,
            rf_raster: 1e-7,
            adc_raster: 1e-9,
            block_raster: 1e-6,
        }
    }
}

impl Scanner {
    pub fn to_file(&self, file_path: &Path) {
        let mut f = File::create(file_path).expect(&format!("cannot create file {:?}", file_path));
        let str = serde_json::to_string_pretty(&self).expect("cannot serialize struct");
        f.write_all(str.as_bytes()).expect("trouble writing to file");
    }
    pub fn from_file(file_path: &Path) -> Self {
        let mut f = File::open(file_path).expect(&format!("cannot open file {:?}", file_path));
        let mut in_str = String::new();
        f.read_to_string(&mut in_str).expect("trouble reading file");
        serde_json::from_str(&in_str).expect("cannot deserialize struct")
    }

    /// shortest ramp that reaches the given amplitude within the slew limit
    pub fn min_rise_time(&self, amplitude: f64) -> f64 {
        amplitude.abs() / self.s_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let s = Scanner::default();
        let p = std::env::temp_dir().join("scanner_roundtrip.json");
        s.to_file(&p);
        let s2 = Scanner::from_file(&p);
        assert_eq!(s.b0, s2.b0);
        assert_eq!(s.grad_raster, s2.grad_raster);
    }

    #[test]
    fn rise_time_respects_slew() {
        let s = Scanner::default();
        let rise = s.min_rise_time(0.15);
        assert!((rise - 0.15 / 3000.0).abs() < 1e-12);
    }
}
