use std::path::PathBuf;

use cutmeter_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("加载图纸 {path:?} 失败")]
    Load {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    #[error("生成 JSON 报告失败")]
    Render(#[from] serde_json::Error),
}
