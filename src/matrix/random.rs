use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::matrix_block::MatrixBlock;

#[derive(Clone, Debug)]
pub struct RandomSpec {
    pub min: f64,
    pub max: f64,
    // Fraction of cells that end up non-zero, 1.0 is fully dense
    pub sparsity: f64,
    pub seed: Option<u64>,
}

impl Default for RandomSpec {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1.0,
            sparsity: 1.0,
            seed: None,
        }
    }
}

impl MatrixBlock {
    pub fn random(rows: usize, cols: usize, spec: &RandomSpec) -> Self {
        let mut rng = match spec.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // Uniform::new panics on an empty range
        let dist = if spec.min < spec.max {
            Some(Uniform::new(spec.min, spec.max))
        } else {
            None
        };
        let sparsity = spec.sparsity.clamp(0.0, 1.0);

        let mut block = MatrixBlock::new(rows, cols);
        for cell in block.values_mut().iter_mut() {
            if sparsity < 1.0 && rng.gen::<f64>() >= sparsity {
                continue;
            }
            *cell = match &dist {
                Some(dist) => dist.sample(&mut rng),
                None => spec.min,
            };
        }
        block
    }
}
