use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

/// Write a synthetic batch of simulation runs for trying out runview.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Output directory (created if needed)
    #[arg(long, default_value = "sample-runs")]
    out_dir: PathBuf,

    /// Number of runs in the batch
    #[arg(long, default_value = "100")]
    runs: u32,

    /// Run index to leave out, to exercise the missing-file path (0 keeps all)
    #[arg(long, default_value = "37")]
    skip: u32,

    /// Write .parquet instead of .csv
    #[arg(long)]
    parquet: bool,

    #[arg(long, default_value = "42")]
    seed: u64,
}

/// Years simulated, in half-year steps.
const YEARS: f64 = 100.0;
const STEP: f64 = 0.5;

/// Unoccupied buildings over time: a baseline, a logistic rise as flooding
/// sets in around `midpoint`, and per-step noise. Counts are whole numbers.
fn generate_run(midpoint: f64, rise: f64, rng: &mut SimpleRng) -> (Vec<f64>, Vec<i64>) {
    let steps = (YEARS / STEP) as usize + 1;
    let time: Vec<f64> = (0..steps).map(|i| i as f64 * STEP).collect();
    let unoccupied = time
        .iter()
        .map(|&t| {
            let trend = 700.0 + rise / (1.0 + (-(t - midpoint) / 6.0).exp());
            (trend + rng.gauss(0.0, 25.0)).round().max(0.0) as i64
        })
        .collect();
    (time, unoccupied)
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn write_csv(path: &Path, time: &[f64], unoccupied: &[i64]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["time", "n_unoccupied"])?;
    for (t, n) in time.iter().zip(unoccupied) {
        writer.write_record([t.to_string(), n.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, time: &[f64], unoccupied: &[i64]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("time", DataType::Float64, false),
        Field::new("n_unoccupied", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(time.to_vec())),
            Arc::new(Int64Array::from(unoccupied.to_vec())),
        ],
    )
    .context("building record batch")?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);
    let ext = if args.parquet { "parquet" } else { "csv" };

    let batch_dir = args.out_dir.join("status-quo").join("output");
    std::fs::create_dir_all(&batch_dir)
        .with_context(|| format!("creating {}", batch_dir.display()))?;

    let write = |path: &Path, time: &[f64], unoccupied: &[i64]| {
        if args.parquet {
            write_parquet(path, time, unoccupied)
        } else {
            write_csv(path, time, unoccupied)
        }
    };

    let mut written = 0;
    for i in 1..=args.runs {
        let midpoint = 50.0 + rng.gauss(0.0, 4.0);
        let rise = 1500.0 + rng.gauss(0.0, 150.0);
        let (time, unoccupied) = generate_run(midpoint, rise, &mut rng);
        if args.skip == i {
            continue;
        }
        let path = batch_dir.join(format!("df_model_{i}_scInt_ne0.5.{ext}"));
        write(&path, &time, &unoccupied)?;
        written += 1;
    }

    // A reference scenario with an earlier, steeper rise.
    let reference_dir = args.out_dir.join("previous");
    std::fs::create_dir_all(&reference_dir)
        .with_context(|| format!("creating {}", reference_dir.display()))?;
    let (time, unoccupied) = generate_run(45.0, 1700.0, &mut rng);
    let reference = reference_dir.join(format!("df_model_1_scInt_ne0.5_RLModel.{ext}"));
    write(&reference, &time, &unoccupied)?;

    println!(
        "Wrote {written} runs ({} points each) to {} and a reference run to {}",
        time.len(),
        batch_dir.display(),
        reference.display()
    );
    Ok(())
}
