//! ## Regression model
//!
//! The regression model trained on the preprocessed features:
//!
//! - [`StandardScaler`]: per-feature centring and scaling.
//! - [`RidgeRegression`]: closed-form ridge regression on scaled features.
//! - [`ModelArtifact`]: scaler and regression bundled into one serializable artifact.
//! - [`train_test_split`], [`rmse`] and [`r2_score`] for evaluation.

use crate::exceptions::{ImmoError, ImmoResult};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Version written into every model artifact.
pub const MODEL_VERSION: u32 = 1;

const PIVOT_EPSILON: f64 = 1e-12;

/// Centres each feature on its mean and divides by its standard deviation. Constant features keep
/// a scale of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> ImmoResult<Self> {
        let mean = x.mean_axis(Axis(0)).ok_or_else(|| {
            ImmoError::InvalidParameter("Cannot fit a scaler on zero rows".to_string())
        })?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > PIVOT_EPSILON { s } else { 1.0 });
        Ok(Self {
            mean: mean.to_vec(),
            scale: scale.to_vec(),
        })
    }

    pub fn transform(&self, x: &Array2<f64>) -> ImmoResult<Array2<f64>> {
        if x.ncols() != self.mean.len() {
            return Err(ImmoError::ValidationFailure(format!(
                "scaler was fitted on {} features, got {}",
                self.mean.len(),
                x.ncols()
            )));
        }
        let mean = Array1::from_vec(self.mean.clone());
        let scale = Array1::from_vec(self.scale.clone());
        Ok((x - &mean) / &scale)
    }
}

/// Solves `a · w = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> ImmoResult<Array1<f64>> {
    let n = b.len();
    for k in 0..n {
        let pivot = (k..n)
            .max_by(|&i, &j| a[[i, k]].abs().total_cmp(&a[[j, k]].abs()))
            .unwrap_or(k);
        if a[[pivot, k]].abs() < PIVOT_EPSILON {
            return Err(ImmoError::InvalidParameter(
                "Normal equations are singular; use a positive ridge alpha".to_string(),
            ));
        }
        if pivot != k {
            for c in 0..n {
                a.swap([k, c], [pivot, c]);
            }
            b.swap(k, pivot);
        }
        for i in (k + 1)..n {
            let factor = a[[i, k]] / a[[k, k]];
            if factor == 0.0 {
                continue;
            }
            for c in k..n {
                a[[i, c]] -= factor * a[[k, c]];
            }
            b[i] -= factor * b[k];
        }
    }
    let mut w = Array1::<f64>::zeros(n);
    for k in (0..n).rev() {
        let tail: f64 = ((k + 1)..n).map(|c| a[[k, c]] * w[c]).sum();
        w[k] = (b[k] - tail) / a[[k, k]];
    }
    Ok(w)
}

/// Linear regression with an L2 penalty, fitted in closed form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub alpha: f64,
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl RidgeRegression {
    /// Solves `(XᵀX + αI) w = Xᵀ(y − ȳ)`; the intercept is `ȳ - x̄·w`.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> ImmoResult<Self> {
        if x.nrows() != y.len() {
            return Err(ImmoError::InvalidParameter(format!(
                "{} feature rows but {} targets",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() == 0 {
            return Err(ImmoError::InvalidParameter(
                "Cannot fit a regression on zero rows".to_string(),
            ));
        }
        let x_mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
        let y_mean = y.mean().unwrap_or(0.0);
        let xc = x - &x_mean;
        let yc = y - y_mean;

        let mut gram = xc.t().dot(&xc);
        for i in 0..gram.nrows() {
            gram[[i, i]] += alpha;
        }
        let moment = xc.t().dot(&yc);
        let weights = solve(gram, moment)?;
        let intercept = y_mean - x_mean.dot(&weights);
        Ok(Self {
            alpha,
            weights: weights.to_vec(),
            intercept,
        })
    }

    pub fn predict(&self, x: &Array2<f64>) -> ImmoResult<Array1<f64>> {
        if x.ncols() != self.weights.len() {
            return Err(ImmoError::ValidationFailure(format!(
                "model expects {} features, got {}",
                self.weights.len(),
                x.ncols()
            )));
        }
        Ok(x.dot(&Array1::from_vec(self.weights.clone())) + self.intercept)
    }
}

/// Scaler and regression as persisted next to the training schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub scaler: StandardScaler,
    pub regression: RidgeRegression,
}

impl ModelArtifact {
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> ImmoResult<Self> {
        let scaler = StandardScaler::fit(x)?;
        let regression = RidgeRegression::fit(&scaler.transform(x)?, y, alpha)?;
        Ok(Self {
            version: MODEL_VERSION,
            scaler,
            regression,
        })
    }

    pub fn n_features(&self) -> usize {
        self.regression.weights.len()
    }

    pub fn predict(&self, x: &Array2<f64>) -> ImmoResult<Array1<f64>> {
        self.regression.predict(&self.scaler.transform(x)?)
    }

    pub fn save(&self, path: &Path) -> ImmoResult<()> {
        crate::io::write_json_atomic(self, path)
    }

    pub fn load(path: &Path) -> ImmoResult<Self> {
        let model: ModelArtifact = crate::io::read_json(path)?;
        if model.version != MODEL_VERSION {
            return Err(ImmoError::ValidationFailure(format!(
                "model artifact {} has version {}, expected {}",
                path.display(),
                model.version,
                MODEL_VERSION
            )));
        }
        Ok(model)
    }
}

/// Rows of a train/test split.
pub struct Split {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

/// Shuffles the rows with a seeded generator and holds out `test_size` of them. Both sides keep
/// at least one row when there are two or more rows.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_size: f64,
    seed: u64,
) -> ImmoResult<Split> {
    let n = x.nrows();
    if n < 2 || y.len() != n {
        return Err(ImmoError::InvalidParameter(format!(
            "Cannot split {} rows with {} targets",
            n,
            y.len()
        )));
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ImmoError::InvalidParameter(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let n_test = ((n as f64 * test_size).round() as usize).clamp(1, n - 1);
    let (test_idx, train_idx) = indices.split_at(n_test);
    Ok(Split {
        x_train: x.select(Axis(0), train_idx),
        x_test: x.select(Axis(0), test_idx),
        y_train: y.select(Axis(0), train_idx),
        y_test: y.select(Axis(0), test_idx),
    })
}

/// Root mean squared error.
pub fn rmse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let diff = y_true - y_pred;
    diff.mapv(|d| d * d).mean().unwrap_or(0.0).sqrt()
}

/// Coefficient of determination.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_res: f64 = (y_true - y_pred).mapv(|d| d * d).sum();
    let ss_tot: f64 = y_true.mapv(|v| (v - mean) * (v - mean)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
