use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::analyzer::AnalyzerConfig;
use crate::constant::{AnalyzeError, Freq};

/// 编排层配置，可从 YAML 加载。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 参与分析的级别名（"1分钟"、"5分钟"……或 "1m"、"5m"……）。
    pub freqs: Vec<String>,
    /// 生成器每个级别保留的最大K线数。
    pub max_count: usize,
    /// 各级别分析器的公共配置；名称会被替换为级别名。
    pub analyzer: AnalyzerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            freqs: Freq::ALL.iter().map(|x| x.label().to_string()).collect(),
            max_count: 5_000,
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, AnalyzeError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AnalyzeError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn parsed_freqs(&self) -> Result<Vec<Freq>, AnalyzeError> {
        self.freqs.iter().map(|x| Freq::parse(x)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::BiMode;

    #[test]
    fn yaml_patch_overrides_defaults() {
        let config = EngineConfig::from_yaml_str(
            "freqs: [\"1分钟\", \"5m\"]\nmax_count: 800\nanalyzer:\n  bi_mode: new\n  max_raw_len: 2000\n",
        )
        .unwrap();
        assert_eq!(config.max_count, 800);
        assert_eq!(config.parsed_freqs().unwrap(), vec![Freq::M1, Freq::M5]);
        assert_eq!(config.analyzer.bi_mode, BiMode::New);
        assert_eq!(config.analyzer.max_raw_len, 2000);
        // untouched field keeps its default
        assert_eq!(config.analyzer.ma_params, vec![5, 20, 120]);
    }
}
