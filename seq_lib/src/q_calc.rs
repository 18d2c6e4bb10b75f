use seq_tools::constants::GAMMA;
use seq_tools::sequence::{GradAxis, Sequence};

/// Effective gradient on one axis: the played waveform with its sign
/// flipped after every refocusing pulse.
pub fn effective_gradient(
    seq: &Sequence,
    axis: GradAxis,
    t: &[f64],
    t_inv: &[f64],
) -> Vec<f64> {
    let starts = seq.block_starts();
    t.iter()
        .map(|&ti| {
            let flips = t_inv.iter().filter(|&&inv| ti > inv).count();
            let sign = if flips % 2 == 0 { 1.0 } else { -1.0 };
            sign * seq.grad_at(ti, axis, &starts)
        })
        .collect()
}

/// Diffusion weighting of a sequence up to the echo time, in SI (s/m^2):
/// b = gamma^2 * integral |F(t)|^2 dt with F the cumulative moment of the
/// effective gradient.
pub fn b_value(seq: &Sequence, t_inv: &[f64], t_echo: f64, n: usize) -> f64 {
    let t = utils::linspace(0.0, t_echo, n);
    let dt = t[1] - t[0];
    let fx = utils::cumtrapz(&effective_gradient(seq, GradAxis::X, &t, t_inv), dt);
    let fy = utils::cumtrapz(&effective_gradient(seq, GradAxis::Y, &t, t_inv), dt);
    let fz = utils::cumtrapz(&effective_gradient(seq, GradAxis::Z, &t, t_inv), dt);
    let fsq: Vec<f64> = (0..n)
        .map(|i| fx[i] * fx[i] + fy[i] * fy[i] + fz[i] * fz[i])
        .collect();
    GAMMA * GAMMA * utils::trapz(&fsq, dt)
}

/// s/m^2 -> s/mm^2
pub fn b_si_to_smm2(b: f64) -> f64 {
    b * 1e-6
}

#[cfg(test)]
mod tests {
    use super::*;
    use seq_tools::gradient_event::GradEvent;
    use seq_tools::sequence::Block;

    #[test]
    fn rectangular_pgse_matches_stejskal_tanner() {
        // two rectangle-ish lobes delta apart; b = g^2 G^2 d^2 (D - d/3)
        let g = 0.05;
        let d = 5e-3;
        let sep = 12e-3;
        let ramp = 1e-5; // sharp ramps approximate rectangles
        let mut seq = Sequence::new();
        seq.push(Block {
            gz: Some(GradEvent::trap(g, 0.0, ramp, d - 2.0 * ramp, ramp)),
            extension: sep,
            ..Block::default()
        });
        seq.push(Block {
            gz: Some(GradEvent::trap(g, 0.0, ramp, d - 2.0 * ramp, ramp)),
            extension: d + 2e-3,
            ..Block::default()
        });
        let t_inv = [sep - (sep - d) / 2.0];
        let b = b_value(&seq, &t_inv, sep + d + 2e-3, 40_000);
        let expected = GAMMA * GAMMA * g * g * d * d * (sep - d / 3.0);
        assert!(
            (b - expected).abs() / expected < 1e-2,
            "b {} vs {}",
            b,
            expected
        );
    }

    #[test]
    fn balanced_pair_without_inversion_cancels() {
        let g = 0.05;
        let mut seq = Sequence::new();
        seq.push(Block {
            gx: Some(GradEvent::trap(g, 0.0, 1e-4, 4e-3, 1e-4)),
            ..Block::default()
        });
        seq.push(Block {
            gx: Some(GradEvent::trap(-g, 0.0, 1e-4, 4e-3, 1e-4)),
            ..Block::default()
        });
        // the moment refocuses, so late dephasing contributes nothing
        let b_short = b_value(&seq, &[], seq.duration(), 10_000);
        let b_long = b_value(&seq, &[], seq.duration() + 20e-3, 10_000);
        assert!((b_long - b_short) / b_short < 0.2);
    }
}
