use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use cutmeter_config::{AppConfig, ConfigError, MAX_PRECISION, ReportFormat};
use cutmeter_frontend::CliRequest;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// 统计 DXF 图纸的激光切割指标：切割总长度、下刀次数与转向次数。
#[derive(Debug, Parser)]
#[command(name = "cutmeter", version)]
struct Cli {
    /// 待分析的 DXF 文件
    file: PathBuf,

    /// 输出格式，缺省时取配置文件中的 `report.format`
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// 额外输出规范化实体、邻接矩阵和连通分量
    #[arg(short, long)]
    verbose: bool,

    /// 配置文件路径，优先于 `CUTMETER_CONFIG` 和 `./config/default.toml`
    #[arg(long)]
    config: Option<PathBuf>,

    /// 日志等级或过滤表达式，覆盖配置文件中的 `logging.level`
    #[arg(long)]
    log_level: Option<String>,

    /// 长度保留的小数位数
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=MAX_PRECISION as i64))]
    precision: Option<u32>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, fallback) = load_configuration(cli.config.clone());
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_logging(&level);
    if let Some(fallback) = fallback {
        fallback.warn();
    }
    info!(file = %cli.file.display(), "启动 cutmeter");

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "分析失败");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, config: &AppConfig) -> anyhow::Result<()> {
    let mut request = CliRequest::from_config(&cli.file, config);
    if let Some(format) = cli.format {
        request.format = format.into();
    }
    if let Some(precision) = cli.precision {
        request.precision = precision;
    }
    request.verbose = cli.verbose;

    let output = cutmeter_frontend::run(&request)
        .with_context(|| format!("无法分析 {}", cli.file.display()))?;
    println!("{}", output.trim_end());
    Ok(())
}

/// 配置加载失败的原因。日志初始化之后才输出，否则警告会丢失。
enum ConfigFallback {
    Explicit { path: PathBuf, error: ConfigError },
    Discovered(ConfigError),
}

impl ConfigFallback {
    fn warn(&self) {
        match self {
            ConfigFallback::Explicit { path, error } => {
                warn!(path = %path.display(), error = %error, "加载指定配置失败，使用默认配置");
            }
            ConfigFallback::Discovered(
                error @ (ConfigError::Io { path, .. } | ConfigError::Parse { path, .. }),
            ) => {
                warn!(path = %path.display(), error = %error, "加载默认配置失败，使用内建默认值");
            }
            ConfigFallback::Discovered(error) => {
                warn!(error = %error, "加载默认配置失败，使用内建默认值");
            }
        }
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> (AppConfig, Option<ConfigFallback>) {
    let loaded = match override_path {
        Some(path) => {
            AppConfig::from_file(&path).map_err(|error| ConfigFallback::Explicit { path, error })
        }
        None => AppConfig::discover().map_err(ConfigFallback::Discovered),
    };
    match loaded {
        Ok(config) => (config, None),
        Err(fallback) => (AppConfig::default(), Some(fallback)),
    }
}

/// 日志写到 stderr，stdout 只留给报告。
fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
