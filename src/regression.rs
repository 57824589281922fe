use serde::Serialize;
use thiserror::Error;

/// Pivot magnitude below which a diagonal entry is treated as zero.
pub const PIVOT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegressionError {
    #[error("need more rows than columns (rows={rows}, cols={cols})")]
    Underdetermined { rows: usize, cols: usize },
    #[error("normal matrix is singular (no pivot for column {column})")]
    Singular { column: usize },
    #[error("dimension mismatch (expected {expected}, got {found})")]
    DimensionMismatch { expected: usize, found: usize },
}

/// Dense row-major matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Rows must all have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, RegressionError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(RegressionError::DimensionMismatch {
                    expected: cols,
                    found: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    fn set(&mut self, r: usize, c: usize, value: f64) {
        self.data[r * self.cols + c] = value;
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for c in 0..self.cols {
            self.data.swap(a * self.cols + c, b * self.cols + c);
        }
    }

    pub fn transpose(&self) -> Self {
        let mut out = Self::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.set(c, r, self.get(r, c));
            }
        }
        out
    }

    pub fn mul(&self, other: &Matrix) -> Result<Self, RegressionError> {
        if self.cols != other.rows {
            return Err(RegressionError::DimensionMismatch {
                expected: self.cols,
                found: other.rows,
            });
        }
        let mut out = Self::zeros(self.rows, other.cols);
        for r in 0..self.rows {
            for k in 0..self.cols {
                let lhs = self.get(r, k);
                if lhs == 0.0 {
                    continue;
                }
                for c in 0..other.cols {
                    let idx = r * out.cols + c;
                    out.data[idx] += lhs * other.get(k, c);
                }
            }
        }
        Ok(out)
    }

    pub fn mul_vec(&self, v: &[f64]) -> Result<Vec<f64>, RegressionError> {
        if self.cols != v.len() {
            return Err(RegressionError::DimensionMismatch {
                expected: self.cols,
                found: v.len(),
            });
        }
        Ok((0..self.rows)
            .map(|r| (0..self.cols).map(|c| self.get(r, c) * v[c]).sum())
            .collect())
    }

    /// Gauss-Jordan inverse. A row swap happens only when the current
    /// diagonal entry is below [`PIVOT_EPSILON`]; the largest remaining entry
    /// in the column is then chosen.
    pub fn invert(&self) -> Result<Self, RegressionError> {
        if self.rows != self.cols {
            return Err(RegressionError::DimensionMismatch {
                expected: self.rows,
                found: self.cols,
            });
        }
        let n = self.rows;
        let mut aug = Self::zeros(n, 2 * n);
        for r in 0..n {
            for c in 0..n {
                aug.set(r, c, self.get(r, c));
            }
            aug.set(r, n + r, 1.0);
        }

        for col in 0..n {
            if aug.get(col, col).abs() < PIVOT_EPSILON {
                let best = (col + 1..n)
                    .max_by(|&a, &b| aug.get(a, col).abs().total_cmp(&aug.get(b, col).abs()))
                    .filter(|&r| aug.get(r, col).abs() >= PIVOT_EPSILON)
                    .ok_or(RegressionError::Singular { column: col })?;
                aug.swap_rows(col, best);
            }

            let pivot = aug.get(col, col);
            for c in 0..2 * n {
                let v = aug.get(col, c) / pivot;
                aug.set(col, c, v);
            }

            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = aug.get(r, col);
                if factor == 0.0 {
                    continue;
                }
                for c in 0..2 * n {
                    let v = aug.get(r, c) - factor * aug.get(col, c);
                    aug.set(r, c, v);
                }
            }
        }

        let mut inverse = Self::zeros(n, n);
        for r in 0..n {
            for c in 0..n {
                inverse.set(r, c, aug.get(r, n + c));
            }
        }
        Ok(inverse)
    }
}

/// Fitted weights, one per feature column. Never updated in place; a refit
/// produces a new model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearModel {
    weights: Vec<f64>,
}

impl LinearModel {
    pub fn from_weights(weights: Vec<f64>) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn predict(&self, features: &[f64]) -> Result<f64, RegressionError> {
        if features.len() != self.weights.len() {
            return Err(RegressionError::DimensionMismatch {
                expected: self.weights.len(),
                found: features.len(),
            });
        }
        Ok(self.weights.iter().zip(features).map(|(w, x)| w * x).sum())
    }

    /// Prediction clamped at zero and rounded to a whole listener count.
    pub fn predict_headcount(&self, features: &[f64]) -> Result<u32, RegressionError> {
        Ok(to_headcount(self.predict(features)?))
    }
}

pub fn to_headcount(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    value.max(0.0).round().min(u32::MAX as f64) as u32
}

/// Fit OLS by the normal equations, `w = (XᵗX)⁻¹ Xᵗy`, inverting with
/// Gauss-Jordan. Requires strictly more rows than columns.
pub fn fit(x_rows: &[Vec<f64>], y: &[f64]) -> Result<LinearModel, RegressionError> {
    if x_rows.len() != y.len() {
        return Err(RegressionError::DimensionMismatch {
            expected: x_rows.len(),
            found: y.len(),
        });
    }
    let x = Matrix::from_rows(x_rows)?;
    if x.rows() <= x.cols() {
        return Err(RegressionError::Underdetermined {
            rows: x.rows(),
            cols: x.cols(),
        });
    }
    let xt = x.transpose();
    let normal = xt.mul(&x)?;
    let inverse = normal.invert()?;
    let xty = xt.mul_vec(y)?;
    let weights = inverse.mul_vec(&xty)?;
    Ok(LinearModel { weights })
}
