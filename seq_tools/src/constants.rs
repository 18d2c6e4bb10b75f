use std::f64::consts::PI;

// gyromagnetic ratio of 1H. All flip-angle and phase math runs through these
pub const GAMMA_BAR: f64 = 42.58e6; // Hz/T
pub const GAMMA: f64 = 2.0 * PI * GAMMA_BAR; // rad s^-1 T^-1

// global time fuzz. Samples landing exactly on an event boundary are nudged
// by this so interval assignment is unambiguous; never compare grid times
// for equality without it
pub const EPS_TIME: f64 = f64::EPSILON;
