use std::fs;
use std::path::{Path, PathBuf};

use cutmeter_core::{
    document::{
        Arc, Circle, Document, Entity, Line, Polyline, PolylineSource, PolylineVertex, Spline,
        UnsupportedEntity,
    },
    geometry::Point2,
};
use glam::DVec3;
use thiserror::Error;
use tracing::{debug, trace, warn};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported drawing format for {path:?}: only ASCII .dxf files can be analysed")]
    UnsupportedFormat { path: PathBuf },
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

/// DXF 读取入口。只解析模型空间（ENTITIES 段）中的实体，其余段整体跳过。
#[derive(Debug, Default, Clone, Copy)]
pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }

    /// 直接解析内存中的 DXF 文本。
    pub fn parse_str(&self, source: &str) -> Result<Document, IoError> {
        DxfParser::new(source).parse().map_err(|err| match err {
            DxfError::Invalid { message } => IoError::InvalidDocument(message),
            // 单个实体的错误在 parse_entities 内部已被吸收，这里只可能来自段结构。
            DxfError::Malformed { message } => IoError::InvalidDocument(message),
        })
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        if !has_dxf_extension(path) {
            return Err(IoError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }
        let bytes = fs::read(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        // 旧版 DXF 常用本地代码页保存图层名，按有损 UTF-8 解码，坐标数据不受影响。
        let data = String::from_utf8_lossy(&bytes);
        let document = self.parse_str(&data)?;
        debug!(path = %path.display(), entities = document.len(), "DXF 解析完成");
        Ok(document)
    }
}

fn has_dxf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dxf"))
}

#[derive(Debug)]
enum DxfError {
    /// 文件结构损坏，整个解析中止。
    Invalid { message: String },
    /// 单个实体缺少或重复了必要的组码，跳过该实体。
    Malformed { message: String },
}

impl DxfError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
        }
    }

    fn parse(mut self) -> Result<Document, DxfError> {
        let mut document = Document::new();
        let mut section_count = 0usize;
        while let Some((code, value)) = self.reader.next_pair()? {
            if code == 999 {
                continue;
            }
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "意外的组码 {code}（期望 0 表示 SECTION/EOF）"
                )));
            }
            match value.trim() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    section_count += 1;
                    match name.trim() {
                        "ENTITIES" => self.parse_entities(&mut document)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::invalid(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        if section_count == 0 {
            return Err(DxfError::invalid("未找到任何 SECTION，文件不是 DXF 图纸"));
        }
        Ok(document)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::invalid("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    fn parse_entities(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.trim() {
                "ENDSEC" => break,
                "SEQEND" | "VERTEX" => {
                    // 游离的序列记录，没有所属的 POLYLINE
                    self.skip_entity_body()?;
                }
                "POLYLINE" => match self.parse_polyline_entity() {
                    Ok(entity) => {
                        document.add_entity(entity);
                    }
                    Err(DxfError::Malformed { message }) => {
                        warn!(kind = "POLYLINE", reason = %message, "跳过不完整的实体");
                        self.skip_entity_body()?;
                    }
                    Err(err) => return Err(err),
                },
                kind => {
                    let kind = kind.to_string();
                    match self.parse_entity(&kind) {
                        Ok(entity) => {
                            document.add_entity(entity);
                        }
                        Err(DxfError::Malformed { message }) => {
                            warn!(kind = %kind, reason = %message, "跳过不完整的实体");
                            self.skip_entity_body()?;
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }
        Ok(())
    }

    fn parse_entity(&mut self, kind: &str) -> Result<Entity, DxfError> {
        match kind {
            "LINE" => self.parse_line(),
            "CIRCLE" => self.parse_circle(),
            "ARC" => self.parse_arc(),
            "LWPOLYLINE" => self.parse_lwpolyline(),
            "SPLINE" => self.parse_spline(),
            other => self.parse_unsupported(other),
        }
    }

    fn parse_line(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut start_x = None;
        let mut start_y = None;
        let mut end_x = None;
        let mut end_y = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => assign_coord(&mut start_x, &value, "LINE 起点 X（组码 10）")?,
                    20 => assign_coord(&mut start_y, &value, "LINE 起点 Y（组码 20）")?,
                    11 => assign_coord(&mut end_x, &value, "LINE 终点 X（组码 11）")?,
                    21 => assign_coord(&mut end_y, &value, "LINE 终点 Y（组码 21）")?,
                    30 | 31 => {} // 忽略 Z 坐标
                    _ => {}
                },
                None => return Err(DxfError::invalid("LINE 未正确结束")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let sx = start_x.ok_or_else(|| DxfError::malformed("LINE 缺少起点 X（组码 10）"))?;
        let sy = start_y.ok_or_else(|| DxfError::malformed("LINE 缺少起点 Y（组码 20）"))?;
        let ex = end_x.ok_or_else(|| DxfError::malformed("LINE 缺少终点 X（组码 11）"))?;
        let ey = end_y.ok_or_else(|| DxfError::malformed("LINE 缺少终点 Y（组码 21）"))?;

        Ok(Entity::Line(Line {
            start: Point2::new(sx, sy),
            end: Point2::new(ex, ey),
            layer,
        }))
    }

    fn parse_circle(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut center_x = None;
        let mut center_y = None;
        let mut radius = None;
        let mut extrusion = DVec3::Z;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => assign_coord(&mut center_x, &value, "CIRCLE 圆心 X（组码 10）")?,
                    20 => assign_coord(&mut center_y, &value, "CIRCLE 圆心 Y（组码 20）")?,
                    40 => assign_coord(&mut radius, &value, "CIRCLE 半径（组码 40）")?,
                    210 | 220 | 230 => assign_extrusion(&mut extrusion, code, &value)?,
                    _ => {}
                },
                None => return Err(DxfError::invalid("CIRCLE 未正确结束")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let cx = center_x.ok_or_else(|| DxfError::malformed("CIRCLE 缺少圆心 X（组码 10）"))?;
        let cy = center_y.ok_or_else(|| DxfError::malformed("CIRCLE 缺少圆心 Y（组码 20）"))?;
        let radius = radius.ok_or_else(|| DxfError::malformed("CIRCLE 缺少半径（组码 40）"))?;

        let center = match Ocs::from_extrusion(extrusion) {
            Some(ocs) => ocs.point(Point2::new(cx, cy)),
            None => Point2::new(cx, cy),
        };
        Ok(Entity::Circle(Circle {
            center,
            radius,
            layer,
        }))
    }

    fn parse_arc(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut center_x = None;
        let mut center_y = None;
        let mut radius = None;
        let mut start_angle = None;
        let mut end_angle = None;
        let mut extrusion = DVec3::Z;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => assign_coord(&mut center_x, &value, "ARC 圆心 X（组码 10）")?,
                    20 => assign_coord(&mut center_y, &value, "ARC 圆心 Y（组码 20）")?,
                    40 => assign_coord(&mut radius, &value, "ARC 半径（组码 40）")?,
                    50 => assign_coord(&mut start_angle, &value, "ARC 起始角（组码 50）")?,
                    51 => assign_coord(&mut end_angle, &value, "ARC 终止角（组码 51）")?,
                    210 | 220 | 230 => assign_extrusion(&mut extrusion, code, &value)?,
                    _ => {}
                },
                None => return Err(DxfError::invalid("ARC 未正确结束")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let cx = center_x.ok_or_else(|| DxfError::malformed("ARC 缺少圆心 X（组码 10）"))?;
        let cy = center_y.ok_or_else(|| DxfError::malformed("ARC 缺少圆心 Y（组码 20）"))?;
        let radius = radius.ok_or_else(|| DxfError::malformed("ARC 缺少半径（组码 40）"))?;
        let start_angle =
            start_angle.ok_or_else(|| DxfError::malformed("ARC 缺少起始角（组码 50）"))?;
        let end_angle =
            end_angle.ok_or_else(|| DxfError::malformed("ARC 缺少终止角（组码 51）"))?;

        let center = Point2::new(cx, cy);
        let (center, start_angle, end_angle) = match Ocs::from_extrusion(extrusion) {
            Some(ocs) => ocs.arc(center, start_angle, end_angle),
            None => (center, start_angle, end_angle),
        };
        Ok(Entity::Arc(Arc {
            center,
            radius,
            start_angle,
            end_angle,
            layer,
        }))
    }

    fn parse_lwpolyline(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut is_closed = false;
        let mut vertices: Vec<PolylineVertex> = Vec::new();
        let mut pending_x: Option<f64> = None;
        let mut pending_y: Option<f64> = None;
        let mut extrusion = DVec3::Z;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    70 => {
                        let flag = parse_i32(&value, "LWPOLYLINE 标志（组码 70）")?;
                        is_closed = flag & 0x01 == 0x01;
                    }
                    10 => {
                        let x = parse_f64(&value, "LWPOLYLINE 顶点 X（组码 10）")?;
                        if let Some(y) = pending_y.take() {
                            vertices.push(PolylineVertex::new(Point2::new(x, y)));
                        } else if pending_x.replace(x).is_some() {
                            return Err(DxfError::malformed(
                                "LWPOLYLINE 顶点缺少对应的 Y（组码 20）",
                            ));
                        }
                    }
                    20 => {
                        let y = parse_f64(&value, "LWPOLYLINE 顶点 Y（组码 20）")?;
                        if let Some(x) = pending_x.take() {
                            vertices.push(PolylineVertex::new(Point2::new(x, y)));
                        } else if pending_y.replace(y).is_some() {
                            return Err(DxfError::malformed(
                                "LWPOLYLINE 顶点缺少对应的 X（组码 10）",
                            ));
                        }
                    }
                    210 | 220 | 230 => assign_extrusion(&mut extrusion, code, &value)?,
                    42 => {
                        let bulge = parse_f64(&value, "LWPOLYLINE 顶点 bulge（组码 42）")?;
                        match vertices.last_mut() {
                            Some(vertex) => vertex.bulge = bulge,
                            None => {
                                return Err(DxfError::malformed(
                                    "LWPOLYLINE 在定义首个顶点前遇到 bulge（组码 42）",
                                ));
                            }
                        }
                    }
                    _ => {}
                },
                None => return Err(DxfError::invalid("LWPOLYLINE 未正确结束")),
            }
        }

        if pending_x.is_some() || pending_y.is_some() {
            return Err(DxfError::malformed(
                "LWPOLYLINE 顶点坐标成对出现（组码 10/20），检测到不完整的顶点",
            ));
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        if let Some(ocs) = Ocs::from_extrusion(extrusion) {
            ocs.map_vertices(&mut vertices);
        }
        Ok(Entity::Polyline(Polyline {
            vertices,
            is_closed,
            source: PolylineSource::LightWeight,
            layer,
        }))
    }

    /// 经典 POLYLINE：头部之后跟随若干 VERTEX，以 SEQEND 结束。
    /// 网格（组码 70 含 0x10）与多面网格（0x40）属于三维对象，仅记录类型。
    fn parse_polyline_entity(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut flags: i16 = 0;
        let mut extrusion = DVec3::Z;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    70 => flags = parse_i16(&value, "POLYLINE 标志（组码 70）")?,
                    210 | 220 | 230 => assign_extrusion(&mut extrusion, code, &value)?,
                    _ => {}
                },
                None => return Err(DxfError::invalid("POLYLINE 未正确结束")),
            }
        }

        let mut vertices = self.parse_vertex_sequence()?;
        let layer = layer.unwrap_or_else(|| "0".to_string());
        if flags & (0x10 | 0x40) != 0 {
            trace!(flags, "POLYLINE 网格不参与切割计算");
            return Ok(Entity::Unsupported(UnsupportedEntity {
                kind: "POLYLINE".to_string(),
                layer,
            }));
        }

        if let Some(ocs) = Ocs::from_extrusion(extrusion) {
            ocs.map_vertices(&mut vertices);
        }
        Ok(Entity::Polyline(Polyline {
            vertices,
            is_closed: flags & 0x01 != 0,
            source: PolylineSource::Polyline,
            layer,
        }))
    }

    fn parse_vertex_sequence(&mut self) -> Result<Vec<PolylineVertex>, DxfError> {
        let mut vertices = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "VERTEX" => {
                        if let Some(vertex) = self.parse_vertex()? {
                            vertices.push(vertex);
                        }
                    }
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        // 缺少 SEQEND，交还给 ENTITIES 循环
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some(_) => continue,
                None => return Err(DxfError::invalid("POLYLINE 顶点序列未正确结束")),
            }
        }
        Ok(vertices)
    }

    fn parse_vertex(&mut self) -> Result<Option<PolylineVertex>, DxfError> {
        let mut x = None;
        let mut y = None;
        let mut bulge = 0.0;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    10 => x = Some(parse_f64(&value, "VERTEX X（组码 10）")?),
                    20 => y = Some(parse_f64(&value, "VERTEX Y（组码 20）")?),
                    42 => bulge = parse_f64(&value, "VERTEX bulge（组码 42）")?,
                    _ => {}
                },
                None => return Err(DxfError::invalid("VERTEX 未正确结束")),
            }
        }
        match (x, y) {
            (Some(x), Some(y)) => Ok(Some(PolylineVertex::with_bulge(Point2::new(x, y), bulge))),
            _ => {
                debug!("VERTEX 缺少坐标，已忽略");
                Ok(None)
            }
        }
    }

    fn parse_spline(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut flags: i16 = 0;
        let mut degree: Option<i16> = None;
        let mut knot_values: Vec<f64> = Vec::new();
        let mut weights: Vec<f64> = Vec::new();
        let mut control_points: Vec<Point2> = Vec::new();
        let mut fit_points: Vec<Point2> = Vec::new();
        let mut pending_control_x: Option<f64> = None;
        let mut pending_fit_x: Option<f64> = None;

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    70 => flags = parse_i16(&value, "SPLINE 类型标志（组码 70）")?,
                    71 => degree = Some(parse_i16(&value, "SPLINE 阶数（组码 71）")?),
                    40 => knot_values.push(parse_f64(&value, "SPLINE 节点值（组码 40）")?),
                    41 => weights.push(parse_f64(&value, "SPLINE 权重（组码 41）")?),
                    10 => {
                        if pending_control_x
                            .replace(parse_f64(&value, "SPLINE 控制点 X（组码 10）")?)
                            .is_some()
                        {
                            return Err(DxfError::malformed(
                                "SPLINE 控制点 X（组码 10）在未提供 Y 之前重复出现",
                            ));
                        }
                    }
                    20 => {
                        let y = parse_f64(&value, "SPLINE 控制点 Y（组码 20）")?;
                        let x = pending_control_x.take().ok_or_else(|| {
                            DxfError::malformed("SPLINE 控制点 Y（组码 20）缺少对应的 X")
                        })?;
                        control_points.push(Point2::new(x, y));
                    }
                    11 => {
                        if pending_fit_x
                            .replace(parse_f64(&value, "SPLINE 拟合点 X（组码 11）")?)
                            .is_some()
                        {
                            return Err(DxfError::malformed(
                                "SPLINE 拟合点 X（组码 11）在未提供 Y 之前重复出现",
                            ));
                        }
                    }
                    21 => {
                        let y = parse_f64(&value, "SPLINE 拟合点 Y（组码 21）")?;
                        let x = pending_fit_x.take().ok_or_else(|| {
                            DxfError::malformed("SPLINE 拟合点 Y（组码 21）缺少对应的 X")
                        })?;
                        fit_points.push(Point2::new(x, y));
                    }
                    _ => {
                        // Z 分量、切向量、法向量、公差等不参与二维分析
                    }
                },
                None => return Err(DxfError::invalid("SPLINE 未正确结束")),
            }
        }

        if let Some(x) = pending_control_x {
            return Err(DxfError::malformed(format!(
                "SPLINE 控制点 X={x} 缺少对应的 Y（组码 20）"
            )));
        }
        if let Some(x) = pending_fit_x {
            return Err(DxfError::malformed(format!(
                "SPLINE 拟合点 X={x} 缺少对应的 Y（组码 21）"
            )));
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let degree = degree.ok_or_else(|| DxfError::malformed("SPLINE 缺少阶数（组码 71）"))?;

        Ok(Entity::Spline(Spline {
            degree: i32::from(degree),
            is_closed: flags & 0x01 != 0,
            control_points,
            fit_points,
            knot_values,
            weights,
            layer,
        }))
    }

    fn parse_unsupported(&mut self, kind: &str) -> Result<Entity, DxfError> {
        let mut layer = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((8, value)) => layer = Some(value.trim().to_string()),
                Some(_) => continue,
                None => break,
            }
        }
        trace!(kind, "记录不参与计算的实体类型");
        Ok(Entity::Unsupported(UnsupportedEntity {
            kind: kind.to_string(),
            layer: layer.unwrap_or_else(|| "0".to_string()),
        }))
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }
}

struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        let code_line = loop {
            match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    // 文件末尾的空行不构成组码
                    if line.trim().is_empty() && self.at_trailing_blank() {
                        return Ok(None);
                    }
                    break line;
                }
                None => return Ok(None),
            }
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(DxfError::invalid(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::invalid(format!(
                "第 {} 行的组码 \"{}\" 无法解析为整数",
                self.line_number - 1,
                code_line.trim()
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }

    fn at_trailing_blank(&self) -> bool {
        self.lines.clone().all(|line| line.trim().is_empty())
    }

    fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "DXF pair 只能回退一次");
        self.buffer = Some(pair);
    }
}

fn assign_extrusion(extrusion: &mut DVec3, code: i32, raw: &str) -> Result<(), DxfError> {
    let value = parse_f64(raw, "拉伸方向（组码 210/220/230）")?;
    match code {
        210 => extrusion.x = value,
        220 => extrusion.y = value,
        _ => extrusion.z = value,
    }
    Ok(())
}

/// 低于该阈值时，任意轴算法以世界 Y 轴而不是 Z 轴构造 OCS 的 X 轴。
const ARBITRARY_AXIS_LIMIT: f64 = 1.0 / 64.0;

/// 实体坐标系（OCS），由拉伸方向按 DXF 任意轴算法确定。
/// 圆、圆弧和二维多段线的坐标存放在 OCS 中，读入时统一换算为世界坐标的 XY 投影。
#[derive(Debug, Clone, Copy)]
struct Ocs {
    x_axis: DVec3,
    y_axis: DVec3,
    z_axis: DVec3,
}

impl Ocs {
    /// 拉伸方向为 +Z（或为零向量）时 OCS 与世界坐标系重合，返回 `None`。
    fn from_extrusion(extrusion: DVec3) -> Option<Self> {
        let z_axis = extrusion.try_normalize()?;
        if z_axis.abs_diff_eq(DVec3::Z, 1e-12) {
            return None;
        }
        let reference = if z_axis.x.abs() < ARBITRARY_AXIS_LIMIT
            && z_axis.y.abs() < ARBITRARY_AXIS_LIMIT
        {
            DVec3::Y
        } else {
            DVec3::Z
        };
        let x_axis = reference.cross(z_axis).normalize();
        let y_axis = z_axis.cross(x_axis).normalize();
        Some(Self {
            x_axis,
            y_axis,
            z_axis,
        })
    }

    fn point(&self, p: Point2) -> Point2 {
        let world = self.x_axis * p.x() + self.y_axis * p.y();
        Point2::new(world.x, world.y)
    }

    /// OCS 中的方向角（度）在世界 XY 平面上的方向角。
    fn angle(&self, degrees: f64) -> f64 {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let direction = self.x_axis * cos + self.y_axis * sin;
        direction.y.atan2(direction.x).to_degrees()
    }

    /// 法向朝 -Z 时，OCS 中的逆时针在世界坐标中变为顺时针。
    fn is_mirrored(&self) -> bool {
        self.z_axis.z < 0.0
    }

    /// 换算圆弧：圆心映射到世界坐标，角度按世界坐标中的逆时针方向重排。
    /// 扫掠角保持不变，因此弧长不受影响。
    fn arc(&self, center: Point2, start_angle: f64, end_angle: f64) -> (Point2, f64, f64) {
        let sweep = end_angle - start_angle;
        let first = if self.is_mirrored() {
            end_angle
        } else {
            start_angle
        };
        let start = self.angle(first);
        (self.point(center), start, start + sweep)
    }

    /// 镜像时凸度反号，保持弧段在世界坐标中的走向。
    fn map_vertices(&self, vertices: &mut [PolylineVertex]) {
        let mirrored = self.is_mirrored();
        for vertex in vertices {
            vertex.position = self.point(vertex.position);
            if mirrored {
                vertex.bulge = -vertex.bulge;
            }
        }
    }
}

fn assign_coord(slot: &mut Option<f64>, raw: &str, context: &str) -> Result<(), DxfError> {
    if slot.is_some() {
        return Err(DxfError::malformed(format!("{context} 出现重复值")));
    }
    *slot = Some(parse_f64(raw, context)?);
    Ok(())
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DxfError::malformed(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::malformed(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i16(raw: &str, context: &str) -> Result<i16, DxfError> {
    let value = parse_i32(raw, context)?;
    i16::try_from(value)
        .map_err(|_| DxfError::malformed(format!("{context} 超出 i16 范围（值：{value}）")))
}
