use serde::Serialize;

use crate::normalize::CutKind;

/// 默认保留的小数位数。
pub const DEFAULT_PRECISION: u32 = 3;
const MAX_PRECISION: u32 = 12;

/// 一次分析的汇总指标。`total_length` 已按精度取整。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub total_length: f64,
    pub cut_ins_count: usize,
    pub turns_count: usize,
    pub entity_count: usize,
}

/// 规范化实体按类型计数。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub lines: usize,
    pub arcs: usize,
    pub circles: usize,
    pub splines: usize,
    pub poly_segments: usize,
}

impl KindCounts {
    pub fn record(&mut self, kind: CutKind) {
        match kind {
            CutKind::Line => self.lines += 1,
            CutKind::Arc => self.arcs += 1,
            CutKind::Circle => self.circles += 1,
            CutKind::Spline => self.splines += 1,
            CutKind::PolySegment => self.poly_segments += 1,
        }
    }

    pub fn get(&self, kind: CutKind) -> usize {
        match kind {
            CutKind::Line => self.lines,
            CutKind::Arc => self.arcs,
            CutKind::Circle => self.circles,
            CutKind::Spline => self.splines,
            CutKind::PolySegment => self.poly_segments,
        }
    }

    pub fn total(&self) -> usize {
        self.lines + self.arcs + self.circles + self.splines + self.poly_segments
    }
}

impl FromIterator<CutKind> for KindCounts {
    fn from_iter<I: IntoIterator<Item = CutKind>>(iter: I) -> Self {
        let mut counts = Self::default();
        for kind in iter {
            counts.record(kind);
        }
        counts
    }
}

/// 带来源信息的完整报告，供命令行详细输出和 JSON 导出使用。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub source: String,
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub kinds: KindCounts,
    pub dropped_entities: usize,
    pub components: Vec<Vec<usize>>,
}

/// 四舍五入到 `digits` 位小数；位数上限为 12。
pub fn round_to(value: f64, digits: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10_f64.powi(digits.min(MAX_PRECISION) as i32);
    let scaled = value * factor;
    // 极大的值放大后溢出，此时已无小数部分可舍入
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}
