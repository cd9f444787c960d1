//! Linear least squares with intercept
//!
//! Solved on centred data through the normal equations
//! `(XcᵀXc + λI) w = Xcᵀyc` with a Cholesky factorisation. The one-hot blocks
//! are collinear with the intercept, so λ must stay strictly positive.
//! λ is scaled by the mean diagonal of the Gram matrix so the configured
//! penalty is independent of the feature magnitudes.

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    intercept: f64,
    coefficients: Vec<f64>,
}

impl LinearRegression {
    /// Build from known parameters
    pub fn from_parts(intercept: f64, coefficients: Vec<f64>) -> Self {
        Self {
            intercept,
            coefficients,
        }
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Fit to `rows` (all of equal width) and `targets`
    pub fn fit(rows: &[Vec<f64>], targets: &[f64], l2_penalty: f64) -> Result<Self, EngineError> {
        if rows.is_empty() {
            return Err(EngineError::Training("no training rows".to_string()));
        }
        if rows.len() != targets.len() {
            return Err(EngineError::Training(format!(
                "{} rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        if !l2_penalty.is_finite() || l2_penalty <= 0.0 {
            return Err(EngineError::Training(
                "l2 penalty must be a finite number > 0".to_string(),
            ));
        }

        let width = rows[0].len();
        if rows.iter().any(|r| r.len() != width) {
            return Err(EngineError::Training("rows have unequal width".to_string()));
        }
        if targets.iter().any(|t| !t.is_finite()) {
            return Err(EngineError::Training("non-finite target value".to_string()));
        }
        if rows.iter().flatten().any(|x| !x.is_finite()) {
            return Err(EngineError::Training("non-finite feature value".to_string()));
        }

        let n = rows.len() as f64;
        let mut x_mean = vec![0.0; width];
        for row in rows {
            for (m, x) in x_mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        x_mean.iter_mut().for_each(|m| *m /= n);
        let y_mean = targets.iter().sum::<f64>() / n;

        // Upper triangle of the centred Gram matrix, then mirrored
        let mut gram = vec![vec![0.0; width]; width];
        let mut rhs = vec![0.0; width];
        let mut centred = vec![0.0; width];
        for (row, y) in rows.iter().zip(targets) {
            for (c, (x, m)) in centred.iter_mut().zip(row.iter().zip(&x_mean)) {
                *c = x - m;
            }
            let yc = y - y_mean;
            for i in 0..width {
                let ci = centred[i];
                if ci == 0.0 {
                    continue;
                }
                rhs[i] += ci * yc;
                for j in i..width {
                    gram[i][j] += ci * centred[j];
                }
            }
        }
        for i in 0..width {
            for j in 0..i {
                gram[i][j] = gram[j][i];
            }
        }

        let mean_diagonal = if width == 0 {
            0.0
        } else {
            (0..width).map(|i| gram[i][i]).sum::<f64>() / width as f64
        };
        let ridge = l2_penalty * mean_diagonal.max(1.0);
        for (i, row) in gram.iter_mut().enumerate() {
            row[i] += ridge;
        }

        let coefficients = solve_cholesky(gram, rhs)?;
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&x_mean)
                .map(|(w, m)| w * m)
                .sum::<f64>();

        if !intercept.is_finite() || coefficients.iter().any(|w| !w.is_finite()) {
            return Err(EngineError::Training(
                "solver produced non-finite coefficients".to_string(),
            ));
        }

        Ok(Self {
            intercept,
            coefficients,
        })
    }

    /// Raw model output for one encoded row
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

/// Solve `a x = b` for symmetric positive definite `a`
fn solve_cholesky(mut a: Vec<Vec<f64>>, b: Vec<f64>) -> Result<Vec<f64>, EngineError> {
    let n = b.len();

    // In-place lower factor: a = L Lᵀ
    for j in 0..n {
        let mut diag = a[j][j];
        for k in 0..j {
            diag -= a[j][k] * a[j][k];
        }
        if !diag.is_finite() || diag <= 0.0 {
            return Err(EngineError::Training(
                "normal equations are not positive definite".to_string(),
            ));
        }
        let diag = diag.sqrt();
        a[j][j] = diag;

        for i in (j + 1)..n {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= a[i][k] * a[j][k];
            }
            a[i][j] = sum / diag;
        }
    }

    // Forward: L z = b
    let mut z = b;
    for i in 0..n {
        let mut sum = z[i];
        for k in 0..i {
            sum -= a[i][k] * z[k];
        }
        z[i] = sum / a[i][i];
    }

    // Back: Lᵀ x = z
    let mut x = z;
    for i in (0..n).rev() {
        let mut sum = x[i];
        for k in (i + 1)..n {
            sum -= a[k][i] * x[k];
        }
        x[i] = sum / a[i][i];
    }

    Ok(x)
}
