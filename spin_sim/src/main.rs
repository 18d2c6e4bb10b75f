use std::f64::consts::FRAC_PI_2;

use phantom::Phantom;
use seq_tools::adc_event::AdcEvent;
use seq_tools::rf_event::RfEvent;
use seq_tools::scanner::Scanner;
use seq_tools::sequence::{Block, Sequence};
use spin_sim::{simulate, SimOutput, SimParams};

// free-induction decay of a single spin, printed as json
fn main() {
    tracing_subscriber::fmt().init();

    let scanner = Scanner::default();
    let rf = RfEvent::hard(FRAC_PI_2, 1e-3, scanner.rf_raster, 0.0);
    let adc = AdcEvent::new(100, 1e-3, 0.0, 0.0);
    let mut seq = Sequence::new();
    seq.push(Block::with_rf(rf));
    seq.push(Block::with_adc(adc));

    let phantom = Phantom::point(0.0, 0.0, 0.0, 1.0, 1.0, 0.1);

    let result = simulate(&phantom, &seq, &scanner, &SimParams::default())
        .expect("fid simulation failed");

    if let SimOutput::Signal(s) = result.output {
        let mag: Vec<f64> = s.iter().map(|v| v.norm()).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&mag).expect("cannot serialize signal")
        );
    }
}
