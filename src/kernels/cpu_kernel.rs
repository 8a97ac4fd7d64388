use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    config::RuntimeConfig,
    error::KernelError,
    instructions::operator::{QuaternaryOp, QuaternaryOperator, WDivMMType, WSigmoidType, WUMMType, WeightsType},
    matrix::MatrixBlock,
};

use super::{
    kernel::QuaternaryKernel,
    unary::{sigmoid, UnaryOp},
};

// Dense reference implementation of the weighted quaternary operators.
// Every operator works on a m x n matrix (X or W) and the factors U (m x k)
// and V (n x k), never materializing U %*% t(V)
pub struct CpuKernel {
    config: RuntimeConfig,
    // One pool per resolved size, built on first use
    pools: Mutex<HashMap<usize, Arc<ThreadPool>>>,
}

// Either runs on the calling thread or inside a pool sized from the thread hint
struct Parallelism {
    pool: Option<Arc<ThreadPool>>,
}

impl Parallelism {
    fn sum_rows<F>(&self, rows: usize, f: F) -> f64
    where
        F: Fn(usize) -> f64 + Sync + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(|| (0..rows).into_par_iter().map(&f).sum()),
            None => (0..rows).map(f).sum(),
        }
    }

    fn fill_rows<F>(&self, out: &mut MatrixBlock, f: F)
    where
        F: Fn(usize, &mut [f64]) + Sync + Send,
    {
        let cols = out.cols();
        // chunks_mut panics on a zero chunk size
        if cols == 0 || out.is_empty() {
            return;
        }
        let values = out.values_mut();
        match &self.pool {
            Some(pool) => pool.install(|| {
                values.par_chunks_mut(cols)
                    .enumerate()
                    .for_each(|(row, cells)| f(row, cells))
            }),
            None => values.chunks_mut(cols)
                .enumerate()
                .for_each(|(row, cells)| f(row, cells)),
        }
    }
}

// Shapes shared by every operator, validated once per call
struct Dims {
    m: usize,
    n: usize,
    k: usize,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl CpuKernel {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            pools: Mutex::new(HashMap::new()),
        }
    }

    fn check_dims(
        m1: &MatrixBlock,
        u: &MatrixBlock,
        v: &MatrixBlock,
        m4: Option<&MatrixBlock>,
    ) -> Result<Dims, KernelError> {
        let (m, n) = (m1.rows(), m1.cols());
        if u.rows() != m {
            return Err(KernelError::DimensionMismatch(
                format!("U has {} rows but the weighted matrix has {}", u.rows(), m)
            ));
        }
        if v.rows() != n {
            return Err(KernelError::DimensionMismatch(
                format!("V has {} rows but the weighted matrix has {} columns", v.rows(), n)
            ));
        }
        if u.cols() != v.cols() {
            return Err(KernelError::DimensionMismatch(
                format!("U and V ranks differ: {} vs {}", u.cols(), v.cols())
            ));
        }
        if let Some(m4) = m4 {
            if (m4.rows(), m4.cols()) != (m, n) {
                return Err(KernelError::DimensionMismatch(
                    format!("Fourth input is {}x{}, expected {}x{}", m4.rows(), m4.cols(), m, n)
                ));
            }
        }
        Ok(Dims { m, n, k: u.cols() })
    }

    fn parallelism(&self, num_threads: i32, cells: usize) -> Result<Parallelism, KernelError> {
        let threads = self.config.resolve_threads(num_threads);
        if threads <= 1 || cells < self.config.parallel_threshold {
            return Ok(Parallelism { pool: None });
        }

        // Only insert touches the map, so a poisoned lock still holds valid pools
        let mut pools = self.pools.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let pool = match pools.get(&threads) {
            Some(pool) => Arc::clone(pool),
            None => {
                debug!("Building rayon pool with {} thread(s)", threads);
                let pool = Arc::new(ThreadPoolBuilder::new().num_threads(threads).build()?);
                pools.insert(threads, Arc::clone(&pool));
                pool
            },
        };
        Ok(Parallelism { pool: Some(pool) })
    }

    fn wsloss(
        par: &Parallelism,
        wtype: WeightsType,
        x: &MatrixBlock,
        u: &MatrixBlock,
        v: &MatrixBlock,
        w: Option<&MatrixBlock>,
        dims: &Dims,
        mut out: MatrixBlock,
    ) -> Result<MatrixBlock, KernelError> {
        let w = match (wtype.has_four_inputs(), w) {
            (true, None) => return Err(KernelError::DimensionMismatch(
                format!("wsloss {} requires a weight matrix", wtype.name())
            )),
            (_, w) => w,
        };

        let loss = par.sum_rows(dims.m, |i| {
            let urow = u.row(i);
            let mut acc = 0.0;
            for j in 0..dims.n {
                let xij = x.get(i, j);
                acc += match (wtype, w) {
                    (WeightsType::Post, Some(w)) => {
                        let wij = w.get(i, j);
                        if wij == 0.0 { continue; }
                        let diff = xij - dot(urow, v.row(j));
                        wij * diff * diff
                    },
                    (WeightsType::Pre, Some(w)) => {
                        let diff = xij - w.get(i, j) * dot(urow, v.row(j));
                        diff * diff
                    },
                    (WeightsType::PostNz, _) => {
                        if xij == 0.0 { continue; }
                        let diff = xij - dot(urow, v.row(j));
                        diff * diff
                    },
                    _ => {
                        let diff = xij - dot(urow, v.row(j));
                        diff * diff
                    },
                };
            }
            acc
        });

        out.reset(1, 1);
        out.set(0, 0, loss);
        Ok(out)
    }

    fn wsigmoid(
        par: &Parallelism,
        wtype: WSigmoidType,
        w: &MatrixBlock,
        u: &MatrixBlock,
        v: &MatrixBlock,
        dims: &Dims,
        mut out: MatrixBlock,
    ) -> MatrixBlock {
        out.reset(dims.m, dims.n);
        par.fill_rows(&mut out, |i, cells| {
            let urow = u.row(i);
            for (j, cell) in cells.iter_mut().enumerate() {
                let wij = w.get(i, j);
                if wij == 0.0 {
                    continue;
                }
                let mut uv = dot(urow, v.row(j));
                if wtype.is_minus() {
                    uv = -uv;
                }
                let mut s = sigmoid(uv);
                if wtype.is_log() {
                    s = s.ln();
                }
                *cell = wij * s;
            }
        });
        out
    }

    fn wdivmm(
        par: &Parallelism,
        wtype: WDivMMType,
        w: &MatrixBlock,
        u: &MatrixBlock,
        v: &MatrixBlock,
        x: Option<&MatrixBlock>,
        dims: &Dims,
        mut out: MatrixBlock,
    ) -> Result<MatrixBlock, KernelError> {
        if wtype.has_four_inputs() && x.is_none() {
            return Err(KernelError::DimensionMismatch(
                format!("wdivmm {} requires a fourth input", wtype.name())
            ));
        }

        // Weighted cell (i, j) of the intermediate m x n matrix
        let cell = |i: usize, j: usize| -> f64 {
            let wij = w.get(i, j);
            if wij == 0.0 {
                return 0.0;
            }
            let uv = dot(u.row(i), v.row(j));
            match wtype {
                WDivMMType::MultBasic | WDivMMType::MultLeft | WDivMMType::MultRight => wij * uv,
                WDivMMType::DivLeft | WDivMMType::DivRight => wij / uv,
                WDivMMType::MultMinusLeft | WDivMMType::MultMinusRight => {
                    let xij = x.map(|x| x.get(i, j)).unwrap_or(0.0);
                    wij * (uv - xij)
                },
            }
        };

        if wtype.is_basic() {
            out.reset(dims.m, dims.n);
            par.fill_rows(&mut out, |i, cells| {
                for (j, value) in cells.iter_mut().enumerate() {
                    *value = cell(i, j);
                }
            });
        } else if wtype.is_left() {
            // t(t(U) %*% A) == t(A) %*% U, one output row per column of A
            out.reset(dims.n, dims.k);
            par.fill_rows(&mut out, |j, acc| {
                for i in 0..dims.m {
                    let a = cell(i, j);
                    if a == 0.0 {
                        continue;
                    }
                    for (l, value) in acc.iter_mut().enumerate() {
                        *value += a * u.get(i, l);
                    }
                }
            });
        } else {
            // A %*% V, one output row per row of A
            out.reset(dims.m, dims.k);
            par.fill_rows(&mut out, |i, acc| {
                for j in 0..dims.n {
                    let a = cell(i, j);
                    if a == 0.0 {
                        continue;
                    }
                    for (l, value) in acc.iter_mut().enumerate() {
                        *value += a * v.get(j, l);
                    }
                }
            });
        }
        Ok(out)
    }

    fn wcemm(
        par: &Parallelism,
        x: &MatrixBlock,
        u: &MatrixBlock,
        v: &MatrixBlock,
        dims: &Dims,
        mut out: MatrixBlock,
    ) -> MatrixBlock {
        let ce = par.sum_rows(dims.m, |i| {
            let urow = u.row(i);
            x.row(i)
                .iter()
                .enumerate()
                .filter(|(_, xij)| **xij != 0.0)
                .map(|(j, xij)| xij * dot(urow, v.row(j)).ln())
                .sum::<f64>()
        });
        out.reset(1, 1);
        out.set(0, 0, ce);
        out
    }

    fn wumm(
        par: &Parallelism,
        wtype: WUMMType,
        uop: UnaryOp,
        x: &MatrixBlock,
        u: &MatrixBlock,
        v: &MatrixBlock,
        dims: &Dims,
        mut out: MatrixBlock,
    ) -> MatrixBlock {
        out.reset(dims.m, dims.n);
        par.fill_rows(&mut out, |i, cells| {
            let urow = u.row(i);
            for (j, cell) in cells.iter_mut().enumerate() {
                let xij = x.get(i, j);
                if xij == 0.0 {
                    continue;
                }
                let f = uop.apply(dot(urow, v.row(j)));
                *cell = match wtype {
                    WUMMType::Mult => xij * f,
                    WUMMType::Div => xij / f,
                };
            }
        });
        out
    }
}

impl Default for CpuKernel {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl QuaternaryKernel for CpuKernel {
    fn compute(
        &self,
        op: &QuaternaryOperator,
        m1: &MatrixBlock,
        m2: &MatrixBlock,
        m3: &MatrixBlock,
        m4: Option<&MatrixBlock>,
        out: MatrixBlock,
        num_threads: i32,
    ) -> Result<MatrixBlock, KernelError> {
        let dims = Self::check_dims(m1, m2, m3, m4)?;
        let par = self.parallelism(num_threads, dims.m * dims.n)?;

        debug!(
            "{} on {}x{} rank {} ({})",
            op, dims.m, dims.n, dims.k,
            if par.pool.is_some() { "parallel" } else { "sequential" }
        );

        match op.op() {
            QuaternaryOp::WeightedSquaredLoss(wtype) => Self::wsloss(&par, *wtype, m1, m2, m3, m4, &dims, out),
            QuaternaryOp::WeightedDivMM(wtype) => Self::wdivmm(&par, *wtype, m1, m2, m3, m4, &dims, out),
            QuaternaryOp::WeightedSigmoid(wtype) => Ok(Self::wsigmoid(&par, *wtype, m1, m2, m3, &dims, out)),
            QuaternaryOp::WeightedCrossEntropy(_) => Ok(Self::wcemm(&par, m1, m2, m3, &dims, out)),
            QuaternaryOp::WeightedUnaryMM { wumm_type, unary_op } => {
                let uop = UnaryOp::parse(unary_op)?;
                Ok(Self::wumm(&par, *wumm_type, uop, m1, m2, m3, &dims, out))
            },
        }
    }
}
