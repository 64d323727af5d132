use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::descriptor::FeatureConfig;
use crate::{FeatureError, ModelError};

/// Standardizes features by removing the mean and scaling to unit variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Per feature mean.
    pub mean: Vec<f64>,
    /// Per feature scale. A zero scale leaves the centered value untouched.
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Number of features the scaler was fitted on.
    pub fn num_features(&self) -> usize {
        self.mean.len()
    }

    /// Compute `(x - mean) / scale` for every feature.
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, FeatureError> {
        if features.len() != self.mean.len() {
            return Err(FeatureError::DimensionMismatch {
                expected: self.mean.len(),
                actual: features.len(),
            });
        }

        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| {
                let s = if *s == 0.0 { 1.0 } else { *s };
                (x - m) / s
            })
            .collect())
    }
}

/// Maps class codes back to class names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Create an encoder from class names ordered by class code.
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    /// The known class names.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Map a class code to its name.
    pub fn inverse_transform(&self, code: usize) -> Result<&str, FeatureError> {
        self.classes
            .get(code)
            .map(String::as_str)
            .ok_or(FeatureError::UnknownClass(code))
    }
}

/// Kernel function of a support vector classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Kernel {
    /// `<x, y>`
    Linear,
    /// `exp(-gamma * |x - y|^2)`
    Rbf {
        /// Kernel coefficient.
        gamma: f64,
    },
    /// `(gamma * <x, y> + coef0)^degree`
    Poly {
        /// Kernel coefficient.
        gamma: f64,
        /// Independent term.
        coef0: f64,
        /// Polynomial degree.
        degree: i32,
    },
    /// `tanh(gamma * <x, y> + coef0)`
    Sigmoid {
        /// Kernel coefficient.
        gamma: f64,
        /// Independent term.
        coef0: f64,
    },
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl Kernel {
    /// Evaluate the kernel on two vectors of the same length.
    pub fn eval(&self, a: &[f64], b: &[f64]) -> f64 {
        match *self {
            Kernel::Linear => dot(a, b),
            Kernel::Rbf { gamma } => {
                let d2: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
                (-gamma * d2).exp()
            }
            Kernel::Poly {
                gamma,
                coef0,
                degree,
            } => (gamma * dot(a, b) + coef0).powi(degree),
            Kernel::Sigmoid { gamma, coef0 } => (gamma * dot(a, b) + coef0).tanh(),
        }
    }
}

/// A one-vs-rest linear classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSvm {
    /// Weights, one row per class. A binary problem may carry a single row.
    pub coef: Vec<Vec<f64>>,
    /// Bias, one per row of `coef`.
    pub intercept: Vec<f64>,
}

impl LinearSvm {
    fn predict(&self, x: &[f64]) -> usize {
        let decisions = self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(w, b)| dot(w, x) + b);

        if self.coef.len() == 1 {
            // binary problem: positive side is class 1
            return decisions.map(|d| usize::from(d > 0.0)).next().unwrap_or(0);
        }

        argmax(decisions)
    }
}

/// A one-vs-one kernel support vector classifier in the libsvm layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSvm {
    /// Kernel function.
    pub kernel: Kernel,
    /// Support vectors grouped by class, in class order.
    pub support_vectors: Vec<Vec<f64>>,
    /// Number of support vectors of each class.
    pub n_support: Vec<usize>,
    /// Dual coefficients, `n_classes - 1` rows of `support_vectors.len()` values.
    pub dual_coef: Vec<Vec<f64>>,
    /// Bias of each class pair `(i, j)`, `i < j`, in lexicographic order.
    pub intercept: Vec<f64>,
}

impl KernelSvm {
    fn num_classes(&self) -> usize {
        self.n_support.len()
    }

    fn predict(&self, x: &[f64]) -> Result<usize, FeatureError> {
        let n = self.num_classes();
        let kvalues: Vec<f64> = self
            .support_vectors
            .iter()
            .map(|sv| self.kernel.eval(sv, x))
            .collect();

        // support vector ranges of each class
        let mut ranges = Vec::with_capacity(n);
        let mut offset = 0;
        for count in &self.n_support {
            ranges.push(offset..offset + count);
            offset += count;
        }
        if offset > kvalues.len() {
            return Err(FeatureError::MalformedModel(format!(
                "n_support adds up to {offset}, found {} support vectors",
                kvalues.len()
            )));
        }

        let mut votes = vec![0usize; n];
        let mut pair = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                let intercept = self.intercept.get(pair).ok_or_else(|| {
                    FeatureError::MalformedModel(format!("no intercept for class pair {pair}"))
                })?;
                let sum = intercept
                    + self.weighted_sum(j - 1, ranges[i].clone(), &kvalues)?
                    + self.weighted_sum(i, ranges[j].clone(), &kvalues)?;

                if sum > 0.0 {
                    votes[i] += 1;
                } else {
                    votes[j] += 1;
                }
                pair += 1;
            }
        }

        // ties go to the lowest class code
        let mut best = 0;
        for (code, v) in votes.iter().enumerate() {
            if *v > votes[best] {
                best = code;
            }
        }
        Ok(best)
    }

    fn weighted_sum(
        &self,
        row: usize,
        range: std::ops::Range<usize>,
        kvalues: &[f64],
    ) -> Result<f64, FeatureError> {
        let coef = self
            .dual_coef
            .get(row)
            .and_then(|coef| coef.get(range.clone()))
            .ok_or_else(|| {
                FeatureError::MalformedModel(format!(
                    "dual_coef row {row} does not cover support vectors {range:?}"
                ))
            })?;
        Ok(coef.iter().zip(&kvalues[range]).map(|(c, k)| c * k).sum())
    }

    fn validate(&self, num_features: usize) -> Result<(), ModelError> {
        let n = self.num_classes();
        let num_sv = self.support_vectors.len();
        if n < 2 {
            return Err(ModelError::Invalid("svc needs at least two classes".into()));
        }
        if self.n_support.iter().sum::<usize>() != num_sv {
            return Err(ModelError::Invalid(format!(
                "n_support adds up to {}, found {num_sv} support vectors",
                self.n_support.iter().sum::<usize>()
            )));
        }
        if let Some(sv) = self.support_vectors.iter().find(|sv| sv.len() != num_features) {
            return Err(ModelError::Invalid(format!(
                "support vector has {} features, expected {num_features}",
                sv.len()
            )));
        }
        if self.dual_coef.len() != n - 1 || self.dual_coef.iter().any(|row| row.len() != num_sv) {
            return Err(ModelError::Invalid(format!(
                "dual_coef must be {} x {num_sv}",
                n - 1
            )));
        }
        if self.intercept.len() != n * (n - 1) / 2 {
            return Err(ModelError::Invalid(format!(
                "svc expects {} intercepts, found {}",
                n * (n - 1) / 2,
                self.intercept.len()
            )));
        }
        Ok(())
    }
}

fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, v) in values.enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }
    best.0
}

/// A trained support vector classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Svm {
    /// One-vs-rest linear classifier.
    Linear(LinearSvm),
    /// One-vs-one kernel classifier.
    Svc(KernelSvm),
}

impl Svm {
    /// Predict the class code of a scaled feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::MalformedModel`] when the kernel classifier's coefficients do not
    /// cover its support vectors. Models loaded through [`Model::from_json_str`] or
    /// [`Model::from_json_file`] are validated and never hit this.
    pub fn predict(&self, x: &[f64]) -> Result<usize, FeatureError> {
        match self {
            Svm::Linear(svm) => Ok(svm.predict(x)),
            Svm::Svc(svm) => svm.predict(x),
        }
    }

    fn num_classes(&self) -> usize {
        match self {
            Svm::Linear(svm) if svm.coef.len() == 1 => 2,
            Svm::Linear(svm) => svm.coef.len(),
            Svm::Svc(svm) => svm.num_classes(),
        }
    }

    fn validate(&self, num_features: usize) -> Result<(), ModelError> {
        match self {
            Svm::Linear(svm) => {
                if svm.coef.is_empty() || svm.coef.len() != svm.intercept.len() {
                    return Err(ModelError::Invalid(format!(
                        "linear classifier has {} weight rows and {} intercepts",
                        svm.coef.len(),
                        svm.intercept.len()
                    )));
                }
                if let Some(row) = svm.coef.iter().find(|row| row.len() != num_features) {
                    return Err(ModelError::Invalid(format!(
                        "weight row has {} features, expected {num_features}",
                        row.len()
                    )));
                }
                Ok(())
            }
            Svm::Svc(svm) => svm.validate(num_features),
        }
    }
}

/// The trained artefacts needed to label a cluster.
///
/// The model is stored as JSON:
///
/// ```json
/// {
///   "features": { "color_bins": 32, "normal_bins": 32, "color_space": "hsv" },
///   "scaler": { "mean": [...], "scale": [...] },
///   "classifier": { "kind": "svc", "kernel": { "type": "linear" }, ... },
///   "classes": ["biscuits", "soap", "soap2"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Descriptor layout the model was trained on.
    #[serde(default)]
    pub features: FeatureConfig,
    /// Feature scaler.
    pub scaler: StandardScaler,
    /// Classifier.
    pub classifier: Svm,
    /// Label encoder.
    #[serde(rename = "classes")]
    pub encoder: LabelEncoder,
}

impl Model {
    /// Parse and validate a model from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let model: Model = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Read and validate a model from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let file = std::fs::File::open(path.as_ref())?;
        let model: Model = serde_json::from_reader(std::io::BufReader::new(file))?;
        model.validate()?;
        log::debug!(
            "loaded model from {}: {} classes, {} features",
            path.as_ref().display(),
            model.encoder.classes().len(),
            model.features.len()
        );
        Ok(model)
    }

    /// Check that the scaler, classifier and encoder agree with the descriptor layout.
    pub fn validate(&self) -> Result<(), ModelError> {
        let num_features = self.features.len();
        if num_features == 0 {
            return Err(ModelError::Invalid("descriptor has no bins".into()));
        }
        if self.scaler.mean.len() != num_features || self.scaler.scale.len() != num_features {
            return Err(ModelError::Invalid(format!(
                "scaler has {}/{} entries, descriptor has {num_features} features",
                self.scaler.mean.len(),
                self.scaler.scale.len()
            )));
        }
        self.classifier.validate(num_features)?;
        if self.classifier.num_classes() != self.encoder.classes().len() {
            return Err(ModelError::Invalid(format!(
                "classifier has {} classes, encoder has {}",
                self.classifier.num_classes(),
                self.encoder.classes().len()
            )));
        }
        Ok(())
    }

    /// Scale a feature vector and map the predicted class code to its name.
    pub fn predict(&self, features: &[f64]) -> Result<&str, FeatureError> {
        let scaled = self.scaler.transform(features)?;
        let code = self.classifier.predict(&scaled)?;
        self.encoder.inverse_transform(code)
    }
}
