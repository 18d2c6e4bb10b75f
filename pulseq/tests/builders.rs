// every library sequence must survive the codec: read(write(seq)) has to
// drive the scanner the same way, so the comparison samples the waveforms
// the integrator would see

use pulseq::{parse_str, write_str};
use seq_lib::epi::EpiParams;
use seq_lib::one_pulse::OnePulseParams;
use seq_lib::pgse::PgseParams;
use seq_lib::spin_echo::SpinEchoParams;
use seq_lib::SequenceParameters;
use seq_tools::scanner::Scanner;
use seq_tools::sequence::{GradAxis, Sequence};

fn assert_waveform_equivalent(a: &Sequence, b: &Sequence, label: &str) {
    assert_eq!(a.len(), b.len(), "{}: block count", label);
    let dur_a = a.duration();
    let dur_b = b.duration();
    assert!(
        (dur_a - dur_b).abs() <= 2e-6 * a.len() as f64,
        "{}: duration {} vs {}",
        label,
        dur_a,
        dur_b
    );

    let starts_a = a.block_starts();
    let starts_b = b.block_starts();
    let n_probe = 800;
    let mut worst_g = 0.0f64;
    let mut worst_b1 = 0.0f64;
    for i in 0..n_probe {
        let t = dur_a * (i as f64 + 0.5) / n_probe as f64;
        for axis in GradAxis::ALL {
            let ga = a.grad_at(t, axis, &starts_a);
            let gb = b.grad_at(t, axis, &starts_b);
            worst_g = worst_g.max((ga - gb).abs());
        }
        let ba = a.b1_at(t, &starts_a).norm();
        let bb = b.b1_at(t, &starts_b).norm();
        worst_b1 = worst_b1.max((ba - bb).abs());
    }
    // gradients within a ramp-step of a raster, B1 within amplitude noise
    assert!(worst_g < 1e-4, "{}: gradient deviation {}", label, worst_g);
    assert!(worst_b1 < 1e-9, "{}: b1 deviation {}", label, worst_b1);

    let adc_a = a.adc_sample_times();
    let adc_b = b.adc_sample_times();
    assert_eq!(adc_a.len(), adc_b.len(), "{}: adc sample count", label);
    for (ta, tb) in adc_a.iter().zip(adc_b.iter()) {
        assert!(
            (ta - tb).abs() < 3e-6,
            "{}: adc time {} vs {}",
            label,
            ta,
            tb
        );
    }
}

fn round_trip(seq: &Sequence, scanner: &Scanner, label: &str) {
    let text = write_str(seq, scanner);
    let back = parse_str(&text).unwrap_or_else(|e| panic!("{}: {}", label, e));
    assert_waveform_equivalent(seq, &back, label);
    // and once more through the codec
    let again = parse_str(&write_str(&back, scanner)).unwrap();
    assert_waveform_equivalent(&back, &again, label);
}

#[test]
fn one_pulse_round_trip() {
    let scanner = Scanner::default();
    round_trip(
        &OnePulseParams::default().build(&scanner),
        &scanner,
        "one_pulse",
    );
}

#[test]
fn spin_echo_round_trip() {
    let scanner = Scanner::default();
    round_trip(
        &SpinEchoParams::default().build(&scanner),
        &scanner,
        "spin_echo",
    );
}

#[test]
fn pgse_sweep_round_trip() {
    let scanner = Scanner::default();
    for (i, amp) in [0.01, 0.05, 0.12].iter().enumerate() {
        let p = PgseParams {
            amplitude: *amp,
            direction: (1.0, 1.0, 1.0),
            ..PgseParams::default()
        };
        round_trip(&p.build(&scanner), &scanner, &format!("pgse[{}]", i));
    }
}

#[test]
fn epi_round_trip() {
    let scanner = Scanner::default();
    let p = EpiParams {
        n_read: 32,
        n_phase: 16,
        ..EpiParams::default()
    };
    round_trip(&p.build(&scanner), &scanner, "epi");
}
