use std::path::{Path, PathBuf};

use cutmeter_core::document::Document;
use cutmeter_core::geometry::Tolerance;
use cutmeter_engine::Analysis;
use cutmeter_io::{DocumentLoader, DxfFacade};
use tracing::info;

use crate::errors::FrontendError;

/// 已加载的图纸及其来源路径。
#[derive(Debug)]
pub struct LoadedDrawing {
    pub path: PathBuf,
    pub document: Document,
}

impl LoadedDrawing {
    /// 报告中展示的来源名称，优先使用文件名。
    pub fn source_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn analyse(&self, tolerance: Tolerance) -> Analysis {
        Analysis::from_document(&self.document, tolerance)
    }
}

/// 通过 DXF 适配层读取图纸；失败时不产生任何部分结果。
pub fn load_drawing(path: impl AsRef<Path>) -> Result<LoadedDrawing, FrontendError> {
    load_with(&DxfFacade::new(), path.as_ref())
}

pub fn load_with(
    loader: &dyn DocumentLoader,
    path: &Path,
) -> Result<LoadedDrawing, FrontendError> {
    let document = loader.load(path).map_err(|source| FrontendError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        path = %path.display(),
        entities = document.len(),
        layers = document.layers().count(),
        "从 DXF 加载文档成功"
    );
    Ok(LoadedDrawing {
        path: path.to_path_buf(),
        document,
    })
}
