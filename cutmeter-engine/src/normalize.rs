//! 将图纸实体统一为切割路径实体。
//!
//! 多段线在这里被拆成逐段的 [`CutEntity::PolySegment`]，之后的邻接矩阵和遍历
//! 只看到扁平的实体序列，序号即矩阵下标。

use std::f64::consts::TAU;

use cutmeter_core::document::{Arc, Circle, Document, Entity, Line, Polyline, Spline};
use cutmeter_core::geometry::{Point2, Tolerance};
use serde::Serialize;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CutKind {
    Line,
    Arc,
    Circle,
    Spline,
    PolySegment,
}

impl CutKind {
    pub const ALL: [CutKind; 5] = [
        CutKind::Line,
        CutKind::Arc,
        CutKind::Circle,
        CutKind::Spline,
        CutKind::PolySegment,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CutKind::Line => "线段",
            CutKind::Arc => "圆弧",
            CutKind::Circle => "圆",
            CutKind::Spline => "样条",
            CutKind::PolySegment => "多段线边",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Segment {
    pub start: Point2,
    pub end: Point2,
}

impl Segment {
    #[inline]
    pub fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

/// 圆弧，角度单位为度；端点在构造时由圆心、半径和角度算出。
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ArcPath {
    pub center: Point2,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub start: Point2,
    pub end: Point2,
}

impl ArcPath {
    pub fn new(center: Point2, radius: f64, start_angle: f64, end_angle: f64) -> Self {
        Self {
            center,
            radius,
            start_angle,
            end_angle,
            start: Point2::on_circle(center, radius, start_angle),
            end: Point2::on_circle(center, radius, end_angle),
        }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        arc_length(self.radius, self.start_angle, self.end_angle)
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CirclePath {
    pub center: Point2,
    pub radius: f64,
}

impl CirclePath {
    #[inline]
    pub fn length(&self) -> f64 {
        TAU * self.radius
    }
}

/// 以控制点近似的样条；控制点至少一个。
#[derive(Debug, Clone, Serialize)]
pub struct SplinePath {
    points: Vec<Point2>,
}

impl SplinePath {
    pub fn new(points: Vec<Point2>) -> Option<Self> {
        if points.is_empty() {
            None
        } else {
            Some(Self { points })
        }
    }

    #[inline]
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    #[inline]
    pub fn first(&self) -> Point2 {
        self.points[0]
    }

    #[inline]
    pub fn last(&self) -> Point2 {
        self.points[self.points.len() - 1]
    }

    /// 相邻控制点距离之和，是折线近似而非样条的真实弧长。
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].distance(pair[1]))
            .sum()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CutEntity {
    Line(Segment),
    PolySegment(Segment),
    Arc(ArcPath),
    Circle(CirclePath),
    Spline(SplinePath),
}

impl CutEntity {
    pub fn kind(&self) -> CutKind {
        match self {
            CutEntity::Line(_) => CutKind::Line,
            CutEntity::PolySegment(_) => CutKind::PolySegment,
            CutEntity::Arc(_) => CutKind::Arc,
            CutEntity::Circle(_) => CutKind::Circle,
            CutEntity::Spline(_) => CutKind::Spline,
        }
    }

    pub fn start_point(&self) -> Option<Point2> {
        match self {
            CutEntity::Line(segment) | CutEntity::PolySegment(segment) => Some(segment.start),
            CutEntity::Arc(arc) => Some(arc.start),
            CutEntity::Spline(spline) => Some(spline.first()),
            CutEntity::Circle(_) => None,
        }
    }

    pub fn end_point(&self) -> Option<Point2> {
        match self {
            CutEntity::Line(segment) | CutEntity::PolySegment(segment) => Some(segment.end),
            CutEntity::Arc(arc) => Some(arc.end),
            CutEntity::Spline(spline) => Some(spline.last()),
            CutEntity::Circle(_) => None,
        }
    }

    /// 圆没有可衔接的端点，其余类型都可以参与邻接。
    #[inline]
    pub fn is_connectable(&self) -> bool {
        !matches!(self, CutEntity::Circle(_))
    }

    pub fn length(&self) -> f64 {
        match self {
            CutEntity::Line(segment) | CutEntity::PolySegment(segment) => segment.length(),
            CutEntity::Arc(arc) => arc.length(),
            CutEntity::Circle(circle) => circle.length(),
            CutEntity::Spline(spline) => spline.length(),
        }
    }

    /// 判断 `self` 是否与 `other` 共享端点。
    ///
    /// 样条用全部控制点去匹配对方的起点和终点，因此该关系对样条不对称；
    /// 邻接矩阵会同时检查两个方向。
    pub fn is_connected(&self, other: &CutEntity, tolerance: Tolerance) -> bool {
        if !self.is_connectable() || !other.is_connectable() {
            return false;
        }
        let (Some(other_start), Some(other_end)) = (other.start_point(), other.end_point()) else {
            return false;
        };
        let touches = |point: Point2| {
            tolerance.points_coincide(point, other_start)
                || tolerance.points_coincide(point, other_end)
        };
        match self {
            CutEntity::Spline(spline) => spline.points().iter().copied().any(touches),
            _ => match (self.start_point(), self.end_point()) {
                (Some(start), Some(end)) => touches(start) || touches(end),
                _ => false,
            },
        }
    }
}

/// 圆弧长度：终止角小于起始角时先加 360°，处理跨越 0° 的情况。
pub fn arc_length(radius: f64, start_angle: f64, end_angle: f64) -> f64 {
    let mut end_angle = end_angle;
    if end_angle - start_angle < 0.0 {
        end_angle += 360.0;
    }
    radius * (end_angle - start_angle).abs().to_radians()
}

/// 规范化结果：扁平实体序列，以及未产生任何切割实体的原始实体个数。
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub entities: Vec<CutEntity>,
    pub dropped: usize,
}

pub fn normalize_document(document: &Document, tolerance: Tolerance) -> Normalized {
    let mut normalized = Normalized::default();
    for (id, entity) in document.entities() {
        let before = normalized.entities.len();
        normalize_entity(entity, tolerance, &mut normalized.entities);
        if normalized.entities.len() == before {
            trace!(id = id.get(), kind = entity.type_name(), "实体未产生切割路径");
            normalized.dropped += 1;
        }
    }
    debug!(
        raw = document.len(),
        normalized = normalized.entities.len(),
        dropped = normalized.dropped,
        "实体规范化完成"
    );
    normalized
}

/// 把单个图纸实体追加到 `out`。无法识别或缺少几何数据的实体不追加任何内容。
pub fn normalize_entity(entity: &Entity, tolerance: Tolerance, out: &mut Vec<CutEntity>) {
    match entity {
        Entity::Line(Line { start, end, .. }) => {
            out.push(CutEntity::Line(Segment::new(*start, *end)));
        }
        Entity::Arc(Arc {
            center,
            radius,
            start_angle,
            end_angle,
            ..
        }) => {
            out.push(CutEntity::Arc(ArcPath::new(
                *center,
                *radius,
                *start_angle,
                *end_angle,
            )));
        }
        Entity::Circle(Circle { center, radius, .. }) => {
            out.push(CutEntity::Circle(CirclePath {
                center: *center,
                radius: *radius,
            }));
        }
        Entity::Spline(Spline {
            control_points,
            layer,
            ..
        }) => match SplinePath::new(control_points.clone()) {
            Some(spline) => out.push(CutEntity::Spline(spline)),
            None => debug!(layer = %layer, "样条没有控制点，已跳过"),
        },
        Entity::Polyline(polyline) => {
            if polyline.vertices.is_empty() {
                debug!(layer = %polyline.layer, "多段线没有顶点，已跳过");
                return;
            }
            out.extend(explode_polyline(polyline, tolerance));
        }
        Entity::Unsupported(_) => {}
    }
}

/// 拆分多段线：`k` 个去重后的顶点得到 `k - 1` 条边；闭合且首尾不重合时再补一条闭合边。
pub fn explode_polyline(polyline: &Polyline, tolerance: Tolerance) -> Vec<CutEntity> {
    let points = dedup_consecutive(polyline.points(), tolerance);
    let mut segments: Vec<CutEntity> = points
        .windows(2)
        .map(|pair| CutEntity::PolySegment(Segment::new(pair[0], pair[1])))
        .collect();
    if polyline.is_closed && points.len() > 1 {
        let first = points[0];
        let last = points[points.len() - 1];
        if !tolerance.points_coincide(last, first) {
            segments.push(CutEntity::PolySegment(Segment::new(last, first)));
        }
    }
    segments
}

/// 合并相邻的重复顶点，每个点只与上一个保留下来的点比较。
pub fn dedup_consecutive<I>(points: I, tolerance: Tolerance) -> Vec<Point2>
where
    I: IntoIterator<Item = Point2>,
{
    let mut kept: Vec<Point2> = Vec::new();
    for point in points {
        match kept.last() {
            Some(&previous) if tolerance.points_coincide(previous, point) => {}
            _ => kept.push(point),
        }
    }
    kept
}
