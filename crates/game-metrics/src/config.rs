use serde::{Deserialize, Serialize};

use crate::classify::Thresholds;
use crate::eval::NormalizerConfig;

/// Everything the metric pipeline needs besides the games themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub normalizer: NormalizerConfig,
    pub thresholds: Thresholds,
}
