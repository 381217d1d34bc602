//! Parameter sweeps: the same workload replayed over a grid of quanta and
//! seeds, summarized by mean READY wait.

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::config::SimConfig;
use crate::dispatcher::simulate;
use crate::types::{Burst, Tick};

/// Quanta swept by default.
pub const SWEEP_QUANTA: [Burst; 5] = [1, 2, 3, 4, 5];
/// Seeds swept by default.
pub const SWEEP_SEEDS: [u32; 5] = [42, 52, 62, 72, 82];

#[derive(Debug, Clone, PartialEq)]
pub struct SweepRow {
    pub quantum: Burst,
    pub seed: u32,
    pub mean_wait: f64,
    pub ticks: Tick,
}

/// Run `base` once per (quantum, seed) pair. For policies that ignore the
/// quantum, only the configured quantum is run.
pub fn run_sweep(base: &SimConfig, quanta: &[Burst], seeds: &[u32]) -> Result<Vec<SweepRow>> {
    let quanta: Vec<Burst> = if base.policy.uses_quantum() {
        quanta.to_vec()
    } else {
        vec![base.effective_quantum()]
    };

    let mut rows = Vec::with_capacity(quanta.len() * seeds.len());
    for &quantum in &quanta {
        for &seed in seeds {
            let config = SimConfig {
                quantum: Some(quantum),
                seed,
                ..base.clone()
            };
            let result = simulate(config)
                .with_context(|| format!("sweep run quantum={quantum} seed={seed} failed"))?;
            let row = SweepRow {
                quantum,
                seed,
                mean_wait: result.report.mean_wait(),
                ticks: result.ticks(),
            };
            info!(quantum, seed, mean_wait = row.mean_wait, ticks = row.ticks, "sweep run");
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Mean of the per-run means for one quantum.
pub fn mean_for_quantum(rows: &[SweepRow], quantum: Burst) -> Option<f64> {
    let means: Vec<f64> = rows
        .iter()
        .filter(|r| r.quantum == quantum)
        .map(|r| r.mean_wait)
        .collect();
    if means.is_empty() {
        None
    } else {
        Some(means.iter().sum::<f64>() / means.len() as f64)
    }
}

pub fn write_table<W: Write>(rows: &[SweepRow], w: &mut W) -> io::Result<()> {
    writeln!(w, "quantum\tseed\tmean wait\tticks")?;
    for r in rows {
        writeln!(w, "{}\t{}\t{:.2}\t{}", r.quantum, r.seed, r.mean_wait, r.ticks)?;
    }

    let mut quanta: Vec<Burst> = rows.iter().map(|r| r.quantum).collect();
    quanta.dedup();
    writeln!(w)?;
    writeln!(w, "quantum\tmean wait over seeds")?;
    for q in quanta {
        if let Some(mean) = mean_for_quantum(rows, q) {
            writeln!(w, "{q}\t{mean:.2}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyKind;
    use crate::pool::Runtime;

    fn base(policy: PolicyKind) -> SimConfig {
        SimConfig::builder()
            .policy(policy)
            .runtime(Runtime::Inline)
            .max_ticks(10_000)
            .build()
    }

    #[test]
    fn test_grid_shape() {
        let rows = run_sweep(&base(PolicyKind::Rr), &[1, 2], &[42, 52, 62]).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].quantum, 1);
        assert_eq!(rows[3].quantum, 2);
        assert_eq!(rows[4].seed, 52);
    }

    #[test]
    fn test_srtf_collapses_quanta() {
        let rows = run_sweep(&base(PolicyKind::Srtf), &SWEEP_QUANTA, &[42, 82]).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.quantum == 1));
    }

    #[test]
    fn test_table() {
        let rows = vec![
            SweepRow { quantum: 1, seed: 42, mean_wait: 2.0, ticks: 10 },
            SweepRow { quantum: 1, seed: 52, mean_wait: 4.0, ticks: 12 },
        ];
        assert_eq!(mean_for_quantum(&rows, 1), Some(3.0));
        assert_eq!(mean_for_quantum(&rows, 2), None);
        let mut out = Vec::new();
        write_table(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1\t42\t2.00\t10\n"));
        assert!(text.contains("1\t3.00\n"));
    }
}
