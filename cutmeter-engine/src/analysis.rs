use cutmeter_core::document::Document;
use cutmeter_core::geometry::Tolerance;
use tracing::debug;

use crate::adjacency::AdjacencyMatrix;
use crate::normalize::{CutEntity, normalize_document};
use crate::report::{AnalysisReport, AnalysisResult, DEFAULT_PRECISION, KindCounts, round_to};
use crate::traversal;

/// 一次分析会话：持有规范化后的实体和一次性构建的邻接矩阵，所有指标都从这里只读计算。
#[derive(Debug, Clone)]
pub struct Analysis {
    entities: Vec<CutEntity>,
    matrix: AdjacencyMatrix,
    tolerance: Tolerance,
    dropped: usize,
}

impl Analysis {
    pub fn new(entities: Vec<CutEntity>, tolerance: Tolerance) -> Self {
        let matrix = AdjacencyMatrix::build(&entities, tolerance);
        Self {
            entities,
            matrix,
            tolerance,
            dropped: 0,
        }
    }

    /// 先规范化图纸实体，再构建会话。
    pub fn from_document(document: &Document, tolerance: Tolerance) -> Self {
        let normalized = normalize_document(document, tolerance);
        let mut analysis = Self::new(normalized.entities, tolerance);
        analysis.dropped = normalized.dropped;
        analysis
    }

    #[inline]
    pub fn entities(&self) -> &[CutEntity] {
        &self.entities
    }

    #[inline]
    pub fn matrix(&self) -> &AdjacencyMatrix {
        &self.matrix
    }

    #[inline]
    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// 规范化时未产生任何切割实体的原始实体个数。
    #[inline]
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }

    /// 未取整的总长度，按实体顺序累加。
    pub fn total_length(&self) -> f64 {
        let mut total = 0.0;
        for entity in &self.entities {
            total += entity.length();
        }
        total
    }

    pub fn cut_ins_count(&self) -> usize {
        traversal::count_components(&self.matrix)
    }

    pub fn turns_count(&self) -> usize {
        traversal::count_turns(&self.matrix)
    }

    pub fn components(&self) -> Vec<Vec<usize>> {
        traversal::connected_components(&self.matrix)
    }

    pub fn kind_counts(&self) -> KindCounts {
        self.entities.iter().map(CutEntity::kind).collect()
    }

    pub fn result(&self) -> AnalysisResult {
        self.result_with_precision(DEFAULT_PRECISION)
    }

    pub fn result_with_precision(&self, digits: u32) -> AnalysisResult {
        let result = AnalysisResult {
            total_length: round_to(self.total_length(), digits),
            cut_ins_count: self.cut_ins_count(),
            turns_count: self.turns_count(),
            entity_count: self.entities.len(),
        };
        debug!(
            total_length = result.total_length,
            cut_ins = result.cut_ins_count,
            turns = result.turns_count,
            entities = result.entity_count,
            "分析完成"
        );
        result
    }

    pub fn report(&self, source: impl Into<String>, digits: u32) -> AnalysisReport {
        AnalysisReport {
            source: source.into(),
            result: self.result_with_precision(digits),
            kinds: self.kind_counts(),
            dropped_entities: self.dropped,
            components: self.components(),
        }
    }
}
