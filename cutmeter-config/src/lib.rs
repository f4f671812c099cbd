use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use cutmeter_core::geometry::Tolerance;
use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV_VAR: &str = "CUTMETER_CONFIG";

/// 报告中长度允许的最大小数位数。
pub const MAX_PRECISION: u32 = 12;

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `CUTMETER_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// 容差必须是非负有限值，精度不得超过 [`MAX_PRECISION`]。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tolerances = [
            ("analysis.relative_tolerance", self.analysis.relative_tolerance),
            ("analysis.absolute_tolerance", self.analysis.absolute_tolerance),
        ];
        for (key, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    key,
                    message: format!("容差必须是非负有限数，实际为 {value}"),
                });
            }
        }
        if self.report.precision > MAX_PRECISION {
            return Err(ConfigError::Invalid {
                key: "report.precision",
                message: format!(
                    "小数位数不能超过 {MAX_PRECISION}，实际为 {}",
                    self.report.precision
                ),
            });
        }
        Ok(())
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 端点比较使用的容差。
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "AnalysisConfig::default_relative")]
    pub relative_tolerance: f64,
    #[serde(default = "AnalysisConfig::default_absolute")]
    pub absolute_tolerance: f64,
}

impl AnalysisConfig {
    fn default_relative() -> f64 {
        Tolerance::DEFAULT_RELATIVE
    }

    fn default_absolute() -> f64 {
        Tolerance::DEFAULT_ABSOLUTE
    }

    pub fn tolerance(&self) -> Tolerance {
        Tolerance::new(self.relative_tolerance, self.absolute_tolerance)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            relative_tolerance: Self::default_relative(),
            absolute_tolerance: Self::default_absolute(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportFormat::Text => "text",
            ReportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub format: ReportFormat,
    #[serde(default = "ReportConfig::default_precision")]
    pub precision: u32,
}

impl ReportConfig {
    fn default_precision() -> u32 {
        3
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::default(),
            precision: Self::default_precision(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置项 {key} 无效: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
