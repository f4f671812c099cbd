use cutmeter_core::geometry::Tolerance;
use tracing::debug;

use crate::errors::EngineError;
use crate::normalize::CutEntity;

/// 实体两两之间的连接关系，按行优先存放在一维数组中。
///
/// 矩阵只在构造时计算一次，之后只读；对角线恒为 `true`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyMatrix {
    size: usize,
    cells: Vec<bool>,
}

impl AdjacencyMatrix {
    pub fn build(entities: &[CutEntity], tolerance: Tolerance) -> Self {
        let size = entities.len();
        let mut cells = vec![false; size * size];
        for i in 0..size {
            cells[i * size + i] = true;
            for j in (i + 1)..size {
                let (a, b) = (&entities[i], &entities[j]);
                let linked = a.is_connectable()
                    && b.is_connectable()
                    && (a.is_connected(b, tolerance) || b.is_connected(a, tolerance));
                cells[i * size + j] = linked;
                cells[j * size + i] = linked;
            }
        }
        let matrix = Self { size, cells };
        debug!(size, edges = matrix.edge_count(), "邻接矩阵构建完成");
        matrix
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// 带边界检查的读取。
    pub fn get(&self, row: usize, column: usize) -> Result<bool, EngineError> {
        if row >= self.size || column >= self.size {
            return Err(EngineError::IndexOutOfRange {
                row,
                column,
                size: self.size,
            });
        }
        Ok(self.cells[row * self.size + column])
    }

    /// 第 `index` 行；越界时返回空切片。
    pub fn row(&self, index: usize) -> &[bool] {
        let start = index.saturating_mul(self.size);
        self.cells
            .get(start..start.saturating_add(self.size))
            .filter(|_| index < self.size)
            .unwrap_or(&[])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> + '_ {
        (0..self.size).map(move |index| self.row(index))
    }

    #[inline]
    pub(crate) fn connected(&self, row: usize, column: usize) -> bool {
        self.row(row).get(column).copied().unwrap_or(false)
    }

    /// 无向边数量，不含对角线。
    pub fn edge_count(&self) -> usize {
        (0..self.size)
            .map(|i| self.row(i)[i + 1..].iter().filter(|&&linked| linked).count())
            .sum()
    }
}
