//! Criterion benches for the accumulation and reassignment kernels.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cocl_core::DenseMatrix;
use cocl_kernels::{accumulate_blocks, assign_cols, assign_rows};

const ROWS: usize = 512;
const COLS: usize = 512;
const R: usize = 8;
const C: usize = 8;

fn fixture(seed: u64) -> (DenseMatrix, Vec<u32>, Vec<u32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<f32> = (0..ROWS * COLS)
        .map(|_| rng.gen_range(-1.0f32..1.0f32))
        .collect();
    let matrix = DenseMatrix::from_vec(ROWS, COLS, data).unwrap();
    let rl: Vec<u32> = (0..ROWS).map(|_| rng.gen_range(0..R as u32)).collect();
    let cl: Vec<u32> = (0..COLS).map(|_| rng.gen_range(0..C as u32)).collect();
    (matrix, rl, cl)
}

fn bench_accumulate(c: &mut Criterion) {
    let (matrix, rl, cl) = fixture(7);
    c.bench_with_input(
        BenchmarkId::new("accumulate_blocks", format!("{ROWS}x{COLS}")),
        &matrix,
        |b, m| b.iter(|| accumulate_blocks(m, &rl, &cl, 0..ROWS, R, C)),
    );
}

fn bench_assign(c: &mut Criterion) {
    let (matrix, rl, cl) = fixture(11);
    let (sums, counts) = accumulate_blocks(&matrix, &rl, &cl, 0..ROWS, R, C);
    let averages: Vec<f32> = sums
        .iter()
        .zip(counts.iter())
        .map(|(&s, &n)| if n > 0 { (s / n as f64) as f32 } else { 0.0 })
        .collect();

    c.bench_function("assign_rows/512x512", |b| {
        b.iter_batched(
            || rl.clone(),
            |mut slab| assign_rows(&matrix, &averages, R, C, &cl, 0..ROWS, &mut slab),
            criterion::BatchSize::SmallInput,
        );
    });
    c.bench_function("assign_cols/512x512", |b| {
        b.iter_batched(
            || cl.clone(),
            |mut slab| assign_cols(&matrix, &averages, R, C, &rl, 0..COLS, &mut slab),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_accumulate, bench_assign);
criterion_main!(benches);
