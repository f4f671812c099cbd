//! 切割指标引擎：实体规范化、邻接矩阵构建与图遍历统计。

pub mod adjacency;
pub mod analysis;
pub mod normalize;
pub mod report;
pub mod traversal;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error, PartialEq, Eq)]
    pub enum EngineError {
        #[error("adjacency index ({row}, {column}) out of range for {size} entities")]
        IndexOutOfRange {
            row: usize,
            column: usize,
            size: usize,
        },
    }
}

pub use adjacency::AdjacencyMatrix;
pub use analysis::Analysis;
pub use errors::EngineError;
pub use normalize::{CutEntity, CutKind, Normalized, normalize_document};
pub use report::{AnalysisReport, AnalysisResult, KindCounts};
