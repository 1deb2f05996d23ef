use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use voxmetric::{KernelStrategy, MetricConfig, Mode};

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModeConfig {
    #[default]
    Approximate,
    Hybrid,
    Exact,
}

impl From<ModeConfig> for Mode {
    fn from(value: ModeConfig) -> Self {
        match value {
            ModeConfig::Approximate => Mode::Approximate,
            ModeConfig::Hybrid => Mode::Hybrid,
            ModeConfig::Exact => Mode::Exact,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyConfig {
    #[default]
    Scalar,
    Simd,
}

impl From<StrategyConfig> for KernelStrategy {
    fn from(value: StrategyConfig) -> Self {
        match value {
            StrategyConfig::Scalar => KernelStrategy::Scalar,
            StrategyConfig::Simd => KernelStrategy::Simd,
        }
    }
}

/// Exact-MI backends selectable from a config file.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExactMiConfig {
    Empirical,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MetricConfigJson {
    pub radius: usize,
    pub mode: ModeConfig,
    pub bins: usize,
    pub strategy: StrategyConfig,
    pub threads: Option<usize>,
    pub min_variance: f64,
}

impl Default for MetricConfigJson {
    fn default() -> Self {
        let cfg = MetricConfig::default();
        Self {
            radius: cfg.radius,
            mode: ModeConfig::Approximate,
            bins: cfg.bins,
            strategy: StrategyConfig::Scalar,
            threads: cfg.threads,
            min_variance: cfg.min_variance,
        }
    }
}

impl From<&MetricConfigJson> for MetricConfig {
    fn from(value: &MetricConfigJson) -> Self {
        Self {
            radius: value.radius,
            mode: value.mode.into(),
            bins: value.bins,
            strategy: value.strategy.into(),
            threads: value.threads,
            min_variance: value.min_variance,
        }
    }
}

/// Joins a relative `path` onto `base`; absolute paths are kept.
pub fn anchor(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Configuration of a single `run`.
///
/// Relative paths are relative to the directory of the config file.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub volume_a_path: PathBuf,
    pub volume_b_path: PathBuf,
    pub mask_path: Option<PathBuf>,
    pub shape: [usize; 3],
    pub output_prefix: PathBuf,
    pub exact_mi: Option<ExactMiConfig>,
    pub metrics: MetricConfigJson,
}

impl RunConfig {
    /// Checks fields the library cannot see.
    pub fn check_paths(&self) -> Result<(), String> {
        if self.volume_a_path.as_os_str().is_empty() || self.volume_b_path.as_os_str().is_empty()
        {
            return Err("volume_a_path and volume_b_path must be set in the config".into());
        }
        if self.output_prefix.as_os_str().is_empty() {
            return Err("output_prefix must be set in the config".into());
        }
        Ok(())
    }

    /// Rebases every relative input and output path onto `config_dir`.
    pub fn resolve_relative_to(&mut self, config_dir: &Path) {
        self.volume_a_path = anchor(config_dir, &self.volume_a_path);
        self.volume_b_path = anchor(config_dir, &self.volume_b_path);
        if let Some(mask) = &self.mask_path {
            self.mask_path = Some(anchor(config_dir, mask));
        }
        self.output_prefix = anchor(config_dir, &self.output_prefix);
    }

    pub fn output_path(&self, metric: &str) -> PathBuf {
        let mut name = self.output_prefix.clone().into_os_string();
        name.push(format!("_{metric}.f32"));
        PathBuf::from(name)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Subject {
    pub id: String,
    pub config: PathBuf,
}

/// List of subjects processed by `batch`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Manifest {
    pub processes: Option<usize>,
    pub subjects: Vec<Subject>,
}
