//! Per-feature standardization.
//!
//! ```text
//! z_j = (x_j - mean_j) / scale_j
//! ```
//!
//! `scale_j` is the population standard deviation of column `j`; a constant
//! column gets a scale of 1.0 so it maps to zero instead of NaN.
//!
//! A scaler only exists once it has been fit: there is no empty constructor,
//! so the classifier can never transform with unfit parameters.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

pub const N_FEATURES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: [f64; N_FEATURES],
    scale: [f64; N_FEATURES],
}

impl StandardScaler {
    /// Fit on a set of rows. Returns `None` for an empty set.
    pub fn fit(rows: &[[f64; N_FEATURES]]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let n = rows.len();
        let x = DMatrix::from_fn(n, N_FEATURES, |i, j| rows[i][j]);

        let mut mean = [0.0; N_FEATURES];
        let mut scale = [1.0; N_FEATURES];
        for (j, col) in x.column_iter().enumerate() {
            let m = col.sum() / n as f64;
            let var = col.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n as f64;
            let sd = var.sqrt();
            mean[j] = m;
            scale[j] = if sd.is_finite() && sd > f64::EPSILON { sd } else { 1.0 };
        }
        Some(Self { mean, scale })
    }

    pub fn transform(&self, row: &[f64; N_FEATURES]) -> [f64; N_FEATURES] {
        let mut out = [0.0; N_FEATURES];
        for j in 0..N_FEATURES {
            out[j] = (row[j] - self.mean[j]) / self.scale[j];
        }
        out
    }

    pub fn transform_all(&self, rows: &[[f64; N_FEATURES]]) -> Vec<[f64; N_FEATURES]> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    pub fn mean(&self) -> &[f64; N_FEATURES] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64; N_FEATURES] {
        &self.scale
    }

    /// Parameters read back from storage must transform to finite values.
    pub fn validate(&self) -> Result<(), String> {
        for j in 0..N_FEATURES {
            if !self.mean[j].is_finite() {
                return Err(format!("mean of feature {j} is not finite"));
            }
            if !(self.scale[j].is_finite() && self.scale[j] > 0.0) {
                return Err(format!("scale of feature {j} must be finite and > 0, got {}", self.scale[j]));
            }
        }
        Ok(())
    }
}
