//! 基于邻接矩阵的图遍历：连通分量（下刀次数）与转向次数。
//!
//! 两种遍历都用显式栈模拟递归深度优先搜索，邻居按下标升序访问，
//! 与递归写法的访问顺序完全一致，但不受调用栈深度限制。

use crate::adjacency::AdjacencyMatrix;

/// 一层"递归调用"：当前节点以及下一个待检查的邻居下标。
#[derive(Debug, Clone, Copy)]
struct Frame {
    node: usize,
    cursor: usize,
}

impl Frame {
    fn new(node: usize) -> Self {
        Self { node, cursor: 0 }
    }
}

/// 从 `frame.cursor` 开始查找下一个未访问的相邻节点，并推进游标。
fn next_unvisited(
    matrix: &AdjacencyMatrix,
    frame: &mut Frame,
    visited: &[bool],
) -> Option<usize> {
    while frame.cursor < matrix.size() {
        let candidate = frame.cursor;
        frame.cursor += 1;
        if candidate != frame.node
            && !visited[candidate]
            && matrix.connected(frame.node, candidate)
        {
            return Some(candidate);
        }
    }
    None
}

/// 所有连通分量。根按实体顺序出现，分量内成员按访问顺序排列。
pub fn connected_components(matrix: &AdjacencyMatrix) -> Vec<Vec<usize>> {
    let size = matrix.size();
    let mut visited = vec![false; size];
    let mut components = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for root in 0..size {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        let mut members = vec![root];
        stack.push(Frame::new(root));

        while let Some(frame) = stack.last_mut() {
            match next_unvisited(matrix, frame, &visited) {
                Some(next) => {
                    visited[next] = true;
                    members.push(next);
                    stack.push(Frame::new(next));
                }
                None => {
                    stack.pop();
                }
            }
        }
        components.push(members);
    }
    components
}

/// 下刀次数，即连通分量个数。
pub fn count_components(matrix: &AdjacencyMatrix) -> usize {
    connected_components(matrix).len()
}

/// 转向次数。
///
/// 每走入一个未访问的相邻实体记一次转向；若该实体既不是起点、也不是从起点直接
/// 走入，且与起点相连（回到起点形成闭环），再记一次并停止从它继续深入。
/// 这是一种近似：复杂拓扑（分叉、多重闭环）下结果可能偏少，这里保持原样。
pub fn count_turns(matrix: &AdjacencyMatrix) -> usize {
    let size = matrix.size();
    let mut visited = vec![false; size];
    let mut turns = 0;
    let mut stack: Vec<Frame> = Vec::new();

    for start in 0..size {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        stack.push(Frame::new(start));

        while let Some(frame) = stack.last_mut() {
            let current = frame.node;
            match next_unvisited(matrix, frame, &visited) {
                Some(next) => {
                    visited[next] = true;
                    turns += 1;
                    if current != start && matrix.connected(next, start) {
                        turns += 1;
                        continue;
                    }
                    stack.push(Frame::new(next));
                }
                None => {
                    stack.pop();
                }
            }
        }
    }
    turns
}
