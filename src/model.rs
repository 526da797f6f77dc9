use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path};

use crate::error::PredictError;
use crate::features::{Cell, Column, FeatureRecord};
use crate::service::Regressor;

// ---------- On-disk artifact ----------

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    /// Unknown levels encode as an all-zero block.
    Ignore,
    #[default]
    Error,
}

#[derive(Debug, Deserialize)]
struct CategoricalJson {
    column: String,
    categories: Vec<String>,
    #[serde(default)]
    handle_unknown: HandleUnknown,
}

#[derive(Debug, Deserialize)]
struct NumericJson {
    column: String,
    impute: Option<f64>,
    mean: Option<f64>,
    std: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Sum,
    Mean,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EstimatorJson {
    Linear {
        intercept: f64,
        coefficients: Vec<f64>,
    },
    TreeEnsemble {
        #[serde(default)]
        aggregation: Aggregation,
        #[serde(default)]
        base_score: f64,
        #[serde(default = "one")]
        learning_rate: f64,
        trees: Vec<Tree>,
    },
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetTransform {
    #[default]
    Identity,
    /// Model was fitted on `ln(1 + y)`.
    Log1p,
}

#[derive(Debug, Deserialize)]
struct ArtifactJson {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    categorical: Vec<CategoricalJson>,
    #[serde(default)]
    numeric: Vec<NumericJson>,
    estimator: EstimatorJson,
    #[serde(default)]
    target_transform: TargetTransform,
}

// ---------- Loaded pipeline ----------

#[derive(Debug)]
struct OneHot {
    column: Column,
    categories: Vec<String>,
    index: HashMap<String, usize>,
    handle_unknown: HandleUnknown,
}

#[derive(Debug)]
struct NumericColumn {
    column: Column,
    impute: Option<f64>,
    mean: f64,
    std: f64,
}

#[derive(Debug)]
enum Estimator {
    Linear {
        intercept: f64,
        coefficients: Vec<f64>,
    },
    Trees {
        aggregation: Aggregation,
        base_score: f64,
        learning_rate: f64,
        trees: Vec<Tree>,
    },
}

impl Estimator {
    fn kind(&self) -> &'static str {
        match self {
            Estimator::Linear { .. } => "linear",
            Estimator::Trees { .. } => "tree_ensemble",
        }
    }

    fn predict(&self, x: &[f64]) -> f64 {
        match self {
            Estimator::Linear {
                intercept,
                coefficients,
            } => intercept + coefficients.iter().zip(x).map(|(w, v)| w * v).sum::<f64>(),
            Estimator::Trees {
                aggregation,
                base_score,
                learning_rate,
                trees,
            } => {
                let total: f64 = trees.iter().map(|t| t.eval(x)).sum();
                let raw = match aggregation {
                    Aggregation::Sum => total,
                    Aggregation::Mean if trees.is_empty() => 0.0,
                    Aggregation::Mean => total / trees.len() as f64,
                };
                base_score + learning_rate * raw
            }
        }
    }
}

impl Tree {
    /// Children always sit after their parent (checked at load), so the
    /// walk terminates.
    fn eval(&self, x: &[f64]) -> f64 {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    i = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    fn validate(&self, width: usize, tree_no: usize) -> Result<()> {
        ensure!(!self.nodes.is_empty(), "tree {} has no nodes", tree_no);
        for (i, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                left,
                right,
                threshold,
            } = node
            {
                ensure!(
                    *feature < width,
                    "tree {} node {}: feature {} out of range (encoded width {})",
                    tree_no,
                    i,
                    feature,
                    width
                );
                ensure!(
                    threshold.is_finite(),
                    "tree {} node {}: non-finite threshold",
                    tree_no,
                    i
                );
                for child in [*left, *right] {
                    ensure!(
                        child > i && child < self.nodes.len(),
                        "tree {} node {}: child {} must point forward inside the tree",
                        tree_no,
                        i,
                        child
                    );
                }
            }
        }
        Ok(())
    }
}

/// Summary of the loaded artifact, reported by the health endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    pub estimator: &'static str,
    pub features: Vec<String>,
    pub encoded_width: usize,
}

/// A fitted preprocessing + estimator pipeline.
///
/// Encoded layout: one-hot blocks in declaration order, then the numeric
/// columns.
#[derive(Debug)]
pub struct Pipeline {
    name: String,
    version: String,
    encoders: Vec<OneHot>,
    numeric: Vec<NumericColumn>,
    estimator: Estimator,
    target: TargetTransform,
    width: usize,
}

impl Pipeline {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let txt = fs::read_to_string(path)
            .with_context(|| format!("failed to read model artifact at {}", path.display()))?;
        Self::from_json(&txt)
            .with_context(|| format!("invalid model artifact {}", path.display()))
    }

    pub fn from_json(txt: &str) -> Result<Self> {
        let raw: ArtifactJson =
            serde_json::from_str(txt).context("failed to parse model artifact JSON")?;
        Self::from_artifact(raw)
    }

    fn from_artifact(raw: ArtifactJson) -> Result<Self> {
        let mut encoders = Vec::with_capacity(raw.categorical.len());
        for c in raw.categorical {
            let column = lookup_column(&c.column)?;
            if column.is_numeric() {
                bail!("column {} is numeric and cannot be one-hot encoded", column);
            }
            ensure!(
                !c.categories.is_empty(),
                "encoder for {} has no categories",
                column
            );
            let mut index = HashMap::with_capacity(c.categories.len());
            for (i, cat) in c.categories.iter().enumerate() {
                if index.insert(cat.clone(), i).is_some() {
                    bail!("encoder for {} lists category '{}' twice", column, cat);
                }
            }
            encoders.push(OneHot {
                column,
                categories: c.categories,
                index,
                handle_unknown: c.handle_unknown,
            });
        }

        let mut numeric = Vec::with_capacity(raw.numeric.len());
        for n in raw.numeric {
            let column = lookup_column(&n.column)?;
            if !column.is_numeric() {
                bail!("column {} is categorical and cannot be used as numeric", column);
            }
            let std = n.std.unwrap_or(1.0);
            ensure!(
                std.is_finite() && std > 0.0,
                "std for {} must be positive, got {}",
                column,
                std
            );
            if let Some(v) = n.impute {
                ensure!(v.is_finite(), "impute value for {} must be finite", column);
            }
            numeric.push(NumericColumn {
                column,
                impute: n.impute,
                mean: n.mean.unwrap_or(0.0),
                std,
            });
        }

        let width =
            encoders.iter().map(|e| e.categories.len()).sum::<usize>() + numeric.len();
        ensure!(width > 0, "pipeline selects no input columns");

        let estimator = match raw.estimator {
            EstimatorJson::Linear {
                intercept,
                coefficients,
            } => {
                ensure!(
                    coefficients.len() == width,
                    "linear estimator has {} coefficients, encoded width is {}",
                    coefficients.len(),
                    width
                );
                Estimator::Linear {
                    intercept,
                    coefficients,
                }
            }
            EstimatorJson::TreeEnsemble {
                aggregation,
                base_score,
                learning_rate,
                trees,
            } => {
                ensure!(!trees.is_empty(), "tree ensemble has no trees");
                for (i, t) in trees.iter().enumerate() {
                    t.validate(width, i)?;
                }
                Estimator::Trees {
                    aggregation,
                    base_score,
                    learning_rate,
                    trees,
                }
            }
        };

        Ok(Self {
            name: raw.name.unwrap_or_else(|| "crop-production".to_string()),
            version: raw.version.unwrap_or_else(|| "unversioned".to_string()),
            encoders,
            numeric,
            estimator,
            target: raw.target_transform,
            width,
        })
    }

    /// A record every encoder recognises, used as the startup warmup input.
    pub fn probe_record(&self) -> FeatureRecord {
        let mut rec = FeatureRecord {
            state_name: String::new(),
            district_name: String::new(),
            season: String::new(),
            crop: String::new(),
            area: Some(1.0),
        };
        for enc in &self.encoders {
            rec.set_text(enc.column, &enc.categories[0]);
        }
        rec
    }

    fn encode(&self, record: &FeatureRecord) -> Result<Vec<f64>, PredictError> {
        let mut x = vec![0.0; self.width];
        let mut offset = 0;

        for enc in &self.encoders {
            let value = match record.get(enc.column) {
                Cell::Text(s) => s,
                Cell::Number(_) => {
                    return Err(PredictError::ShapeMismatch(format!(
                        "column {} is not categorical",
                        enc.column
                    )))
                }
            };
            match enc.index.get(value) {
                Some(i) => x[offset + i] = 1.0,
                None if enc.handle_unknown == HandleUnknown::Ignore => {}
                None => {
                    return Err(PredictError::UnseenCategory {
                        column: enc.column.name().to_string(),
                        value: value.to_string(),
                    })
                }
            }
            offset += enc.categories.len();
        }

        for num in &self.numeric {
            let value = match record.get(num.column) {
                Cell::Number(v) => v,
                Cell::Text(_) => {
                    return Err(PredictError::ShapeMismatch(format!(
                        "column {} is not numeric",
                        num.column
                    )))
                }
            };
            let value = value.or(num.impute).ok_or_else(|| {
                PredictError::ShapeMismatch(format!(
                    "Input contains NaN in column {} and the pipeline has no imputer",
                    num.column
                ))
            })?;
            if !value.is_finite() {
                return Err(PredictError::ShapeMismatch(format!(
                    "Input contains infinity in column {}",
                    num.column
                )));
            }
            x[offset] = (value - num.mean) / num.std;
            offset += 1;
        }

        if offset != self.width {
            return Err(PredictError::Internal(format!(
                "encoded {} features, estimator expects {}",
                offset, self.width
            )));
        }
        Ok(x)
    }
}

fn lookup_column(name: &str) -> Result<Column> {
    Column::from_name(name).with_context(|| {
        format!(
            "unknown column '{}' (expected one of State_Name, District_Name, Season, Crop, Area)",
            name
        )
    })
}

impl Regressor for Pipeline {
    fn predict(&self, record: &FeatureRecord) -> Result<f64, PredictError> {
        let x = self.encode(record)?;
        let raw = self.estimator.predict(&x);
        let y = match self.target {
            TargetTransform::Identity => raw,
            TargetTransform::Log1p => raw.exp_m1(),
        };
        if !y.is_finite() {
            return Err(PredictError::Internal(format!(
                "model produced a non-finite prediction ({})",
                y
            )));
        }
        Ok(y)
    }

    fn info(&self) -> ModelInfo {
        let mut features: Vec<String> = self
            .encoders
            .iter()
            .map(|e| e.column.name().to_string())
            .collect();
        features.extend(self.numeric.iter().map(|n| n.column.name().to_string()));
        ModelInfo {
            name: self.name.clone(),
            version: self.version.clone(),
            estimator: self.estimator.kind(),
            features,
            encoded_width: self.width,
        }
    }
}
