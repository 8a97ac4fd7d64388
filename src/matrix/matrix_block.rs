use std::fmt;

use crate::error::KernelError;

// Dense row-major block of doubles. Always works in cell counts unless the
// function name says bytes
#[derive(Clone, Debug, PartialEq)]
pub struct MatrixBlock {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl MatrixBlock {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![0.0; rows * cols],
        }
    }

    // Zero sized block handed to kernels as the output buffer
    pub fn empty() -> Self {
        Self::new(0, 0)
    }

    pub fn from_rows(rows: &[&[f64]]) -> Result<Self, KernelError> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut values = Vec::with_capacity(rows.len() * cols);
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(KernelError::DimensionMismatch(
                    format!("Row {} has {} columns, expected {}", idx, row.len(), cols)
                ));
            }
            values.extend_from_slice(row);
        }
        Ok(Self { rows: rows.len(), cols, values })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn num_cells(&self) -> usize {
        self.rows * self.cols
    }

    pub fn size_in_bytes(&self) -> u64 {
        (self.num_cells() * std::mem::size_of::<f64>()) as u64
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[row * self.cols + col] = value;
    }

    // Out of range reads give 0, matching how an empty output block reads
    pub fn value(&self, row: usize, col: usize) -> f64 {
        if row < self.rows && col < self.cols {
            self.get(row, col)
        } else {
            0.0
        }
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.cols;
        &self.values[start..start + self.cols]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn nnz(&self) -> usize {
        self.values.iter().filter(|v| **v != 0.0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.num_cells() == 0
    }

    // Reshape in place to rows x cols and zero every cell, reusing the allocation
    pub fn reset(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
        self.values.clear();
        self.values.resize(rows * cols, 0.0);
    }
}

impl fmt::Display for MatrixBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MatrixBlock {}x{} (nnz={})", self.rows, self.cols, self.nnz())?;
        // Print at most an 8x8 corner
        let max_items = 8;
        for r in 0..self.rows.min(max_items) {
            let cells = self.row(r)
                .iter()
                .take(max_items)
                .map(|v| format!("{:.6}", v))
                .collect::<Vec<_>>()
                .join(", ");
            let suffix = if self.cols > max_items { ", ..." } else { "" };
            writeln!(f, "[{}{}]", cells, suffix)?;
        }
        if self.rows > max_items {
            writeln!(f, "...")?;
        }
        Ok(())
    }
}
