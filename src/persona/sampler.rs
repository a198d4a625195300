use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

/// The run's single generator. Index sampling draws from it first, then
/// every per-record prompt choice in sampled order.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Pick `min(requested, population)` distinct indices in `0..population`
/// without replacement. The returned order is the processing order.
pub fn sample_indices<R: Rng + ?Sized>(
    rng: &mut R,
    population: usize,
    requested: usize,
) -> Vec<usize> {
    let amount = requested.min(population);
    index::sample(rng, population, amount).into_vec()
}
