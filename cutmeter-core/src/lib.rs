pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 坐标比较所用的容差，规则与常见的 `isclose` 一致：
    /// `|a - b| <= max(relative * max(|a|, |b|), absolute)`。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Tolerance {
        pub relative: f64,
        pub absolute: f64,
    }

    impl Tolerance {
        pub const DEFAULT_RELATIVE: f64 = 1e-9;
        pub const DEFAULT_ABSOLUTE: f64 = 1e-9;

        #[inline]
        pub const fn new(relative: f64, absolute: f64) -> Self {
            Self { relative, absolute }
        }

        /// 单个坐标分量是否近似相等。
        #[inline]
        pub fn is_close(&self, a: f64, b: f64) -> bool {
            if a == b {
                return true;
            }
            if !a.is_finite() || !b.is_finite() {
                return false;
            }
            let diff = (a - b).abs();
            diff <= (self.relative * a.abs().max(b.abs())).max(self.absolute)
        }

        /// 两点在 X、Y 两个方向上都近似相等时视为同一位置。
        #[inline]
        pub fn points_coincide(&self, a: Point2, b: Point2) -> bool {
            self.is_close(a.x(), b.x()) && self.is_close(a.y(), b.y())
        }
    }

    impl Default for Tolerance {
        fn default() -> Self {
            Self::new(Self::DEFAULT_RELATIVE, Self::DEFAULT_ABSOLUTE)
        }
    }

    /// 二维点，内部以 `glam::DVec2` 表示。
    ///
    /// `==` 按默认 [`Tolerance`] 比较，而不是逐位比较；
    /// 需要自定义容差时使用 [`Tolerance::points_coincide`]。
    #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        /// 欧氏距离。
        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        /// 以 `center` 为圆心、`radius` 为半径，取角度（度）处的圆周点。
        #[inline]
        pub fn on_circle(center: Point2, radius: f64, angle_degrees: f64) -> Self {
            let (sin, cos) = angle_degrees.to_radians().sin_cos();
            center.translate(Vector2::new(radius * cos, radius * sin))
        }
    }

    impl PartialEq for Point2 {
        fn eq(&self, other: &Self) -> bool {
            Tolerance::default().points_coincide(*self, *other)
        }
    }

    /// 二维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }
    }

}

pub mod document {
    use std::collections::HashMap;

    use serde::{Deserialize, Serialize};

    use crate::geometry::Point2;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self { name: name.into() }
        }
    }

    /// 图纸中按原始顺序读出的实体。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Circle(Circle),
        Arc(Arc),
        Polyline(Polyline),
        Spline(Spline),
        /// 不参与切割计算的实体类型，只保留类型名。
        Unsupported(UnsupportedEntity),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Line(line) => &line.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::Arc(arc) => &arc.layer,
                Entity::Polyline(polyline) => &polyline.layer,
                Entity::Spline(spline) => &spline.layer,
                Entity::Unsupported(other) => &other.layer,
            }
        }

        /// DXF 类型名，例如 `LINE`、`LWPOLYLINE`。
        pub fn type_name(&self) -> &str {
            match self {
                Entity::Line(_) => "LINE",
                Entity::Circle(_) => "CIRCLE",
                Entity::Arc(_) => "ARC",
                Entity::Polyline(polyline) => match polyline.source {
                    PolylineSource::Polyline => "POLYLINE",
                    PolylineSource::LightWeight => "LWPOLYLINE",
                },
                Entity::Spline(_) => "SPLINE",
                Entity::Unsupported(other) => &other.kind,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
    }

    /// 圆弧实体，角度以度储存，与 DXF 组码 50/51 保持一致，按逆时针方向从起始角到终止角。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        pub layer: String,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub enum PolylineSource {
        #[default]
        LightWeight,
        Polyline,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<PolylineVertex>,
        pub is_closed: bool,
        #[serde(default)]
        pub source: PolylineSource,
        pub layer: String,
    }

    impl Polyline {
        /// 顶点坐标（忽略 bulge）。
        pub fn points(&self) -> impl Iterator<Item = Point2> + '_ {
            self.vertices.iter().map(|vertex| vertex.position)
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Spline {
        pub degree: i32,
        pub is_closed: bool,
        pub control_points: Vec<Point2>,
        pub fit_points: Vec<Point2>,
        pub knot_values: Vec<f64>,
        pub weights: Vec<f64>,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PolylineVertex {
        pub position: Point2,
        pub bulge: f64,
    }

    impl PolylineVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self {
                position,
                bulge: 0.0,
            }
        }

        #[inline]
        pub fn with_bulge(position: Point2, bulge: f64) -> Self {
            Self { position, bulge }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct UnsupportedEntity {
        pub kind: String,
        pub layer: String,
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Document {
        layers: HashMap<String, Layer>,
        entities: Vec<(EntityId, Entity)>,
        next_entity_id: u64,
    }

    impl Document {
        pub fn new() -> Self {
            let mut doc = Self::default();
            doc.ensure_layer("0");
            doc
        }

        pub fn ensure_layer(&mut self, name: impl AsRef<str>) {
            let key = name.as_ref();
            self.layers
                .entry(key.to_string())
                .or_insert_with(|| Layer::new(key));
        }

        pub fn add_line(
            &mut self,
            start: Point2,
            end: Point2,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.push(Entity::Line(Line { start, end, layer }))
        }

        pub fn add_circle(
            &mut self,
            center: Point2,
            radius: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.push(Entity::Circle(Circle {
                center,
                radius,
                layer,
            }))
        }

        /// 添加圆弧，角度单位为度。
        pub fn add_arc(
            &mut self,
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.push(Entity::Arc(Arc {
                center,
                radius,
                start_angle,
                end_angle,
                layer,
            }))
        }

        pub fn add_polyline<I>(
            &mut self,
            points: I,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = Point2>,
        {
            self.add_polyline_with_vertices(
                points.into_iter().map(PolylineVertex::new),
                is_closed,
                PolylineSource::LightWeight,
                layer,
            )
        }

        pub fn add_polyline_with_vertices<I>(
            &mut self,
            vertices: I,
            is_closed: bool,
            source: PolylineSource,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = PolylineVertex>,
        {
            let layer = layer.into();
            self.push(Entity::Polyline(Polyline {
                vertices: vertices.into_iter().collect(),
                is_closed,
                source,
                layer,
            }))
        }

        /// 仅以控制点构造样条，其余参数取默认值（三阶、开放）。
        pub fn add_spline<I>(&mut self, control_points: I, layer: impl Into<String>) -> EntityId
        where
            I: IntoIterator<Item = Point2>,
        {
            let layer = layer.into();
            self.push(Entity::Spline(Spline {
                degree: 3,
                is_closed: false,
                control_points: control_points.into_iter().collect(),
                fit_points: Vec::new(),
                knot_values: Vec::new(),
                weights: Vec::new(),
                layer,
            }))
        }

        pub fn add_unsupported(
            &mut self,
            kind: impl Into<String>,
            layer: impl Into<String>,
        ) -> EntityId {
            self.push(Entity::Unsupported(UnsupportedEntity {
                kind: kind.into(),
                layer: layer.into(),
            }))
        }

        pub fn add_entity(&mut self, entity: Entity) -> EntityId {
            self.push(entity)
        }

        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.values()
        }

        /// 按插入顺序遍历实体。
        pub fn entities(&self) -> impl Iterator<Item = &(EntityId, Entity)> {
            self.entities.iter()
        }

        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            self.entities
                .iter()
                .find(|(entity_id, _)| *entity_id == id)
                .map(|(_, entity)| entity)
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entities.is_empty()
        }

        fn push(&mut self, entity: Entity) -> EntityId {
            self.ensure_layer(entity.layer_name());
            let id = self.next_id();
            self.entities.push((id, entity));
            id
        }

        fn next_id(&mut self) -> EntityId {
            let id = EntityId::new(self.next_entity_id);
            self.next_entity_id += 1;
            id
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::geometry::Point2;

        #[test]
        fn document_stores_entities() {
            let mut doc = Document::new();
            let id = doc.add_line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), "0");
            let circle_id = doc.add_circle(Point2::new(5.0, 5.0), 2.0, "HOLES");
            let arc_id = doc.add_arc(Point2::new(5.0, 0.0), 3.5, 0.0, 90.0, "GEOM");
            let polyline_id = doc.add_polyline(
                [
                    Point2::new(0.0, 0.0),
                    Point2::new(2.0, 2.0),
                    Point2::new(4.0, 0.0),
                ],
                true,
                "SHAPE",
            );
            let spline_id = doc.add_spline(
                [Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)],
                "GEOM",
            );
            let text_id = doc.add_unsupported("TEXT", "ANNOT");

            assert_eq!(id.get(), 0);
            assert_eq!(circle_id.get(), 1);
            assert_eq!(arc_id.get(), 2);
            assert_eq!(polyline_id.get(), 3);
            assert_eq!(spline_id.get(), 4);
            assert_eq!(text_id.get(), 5);
            assert_eq!(doc.len(), 6);
            assert!(!doc.is_empty());

            let layers: Vec<_> = doc.layers().map(|l| l.name.clone()).collect();
            for expected in ["0", "HOLES", "GEOM", "SHAPE", "ANNOT"] {
                assert!(layers.contains(&expected.to_string()), "missing layer {expected}");
            }

            match doc.entity(arc_id) {
                Some(Entity::Arc(arc)) => {
                    assert_eq!(arc.layer, "GEOM");
                    assert!((arc.end_angle - 90.0).abs() < f64::EPSILON);
                }
                other => panic!("unexpected entity lookup result: {other:?}"),
            }

            match doc.entity(polyline_id) {
                Some(Entity::Polyline(polyline)) => {
                    assert!(polyline.is_closed);
                    assert_eq!(polyline.points().count(), 3);
                }
                other => panic!("unexpected entity lookup result: {other:?}"),
            }

            assert!(doc.entity(EntityId::new(42)).is_none());
        }

        #[test]
        fn entities_keep_insertion_order() {
            let mut doc = Document::new();
            doc.add_circle(Point2::new(0.0, 0.0), 1.0, "0");
            doc.add_unsupported("MTEXT", "0");
            doc.add_line(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), "0");

            let kinds: Vec<&str> = doc.entities().map(|(_, e)| e.type_name()).collect();
            assert_eq!(kinds, vec!["CIRCLE", "MTEXT", "LINE"]);
        }

        #[test]
        fn polyline_source_is_reported_in_type_name() {
            let mut doc = Document::new();
            let lw = doc.add_polyline([Point2::new(0.0, 0.0)], false, "0");
            let heavy = doc.add_polyline_with_vertices(
                [PolylineVertex::with_bulge(Point2::new(0.0, 0.0), 0.5)],
                false,
                PolylineSource::Polyline,
                "0",
            );
            assert_eq!(doc.entity(lw).map(Entity::type_name), Some("LWPOLYLINE"));
            assert_eq!(doc.entity(heavy).map(Entity::type_name), Some("POLYLINE"));
        }
    }
}
