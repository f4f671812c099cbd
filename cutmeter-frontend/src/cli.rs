use std::fmt::Write as _;
use std::path::PathBuf;

use cutmeter_config::{AppConfig, ReportFormat};
use cutmeter_core::geometry::{Point2, Tolerance};
use cutmeter_engine::normalize::CutKind;
use cutmeter_engine::{Analysis, AnalysisReport, CutEntity};
use tracing::debug;

use crate::errors::FrontendError;
use crate::loader::load_drawing;

/// 一次命令行分析所需的全部参数。
#[derive(Debug, Clone)]
pub struct CliRequest {
    pub path: PathBuf,
    pub format: ReportFormat,
    pub verbose: bool,
    pub precision: u32,
    pub tolerance: Tolerance,
}

impl CliRequest {
    /// 以配置文件中的报告格式、精度和容差为默认值。
    pub fn from_config(path: impl Into<PathBuf>, config: &AppConfig) -> Self {
        Self {
            path: path.into(),
            format: config.report.format,
            verbose: false,
            precision: config.report.precision,
            tolerance: config.analysis.tolerance(),
        }
    }
}

/// 加载图纸、执行分析并返回渲染好的报告文本。
pub fn run(request: &CliRequest) -> Result<String, FrontendError> {
    let drawing = load_drawing(&request.path)?;
    let analysis = drawing.analyse(request.tolerance);
    let report = analysis.report(drawing.source_name(), request.precision);
    debug!(format = %request.format, verbose = request.verbose, "渲染分析报告");
    match request.format {
        ReportFormat::Text => Ok(render_text(&analysis, &report, request.verbose)),
        ReportFormat::Json => render_json(&analysis, &report, request.verbose),
    }
}

/// JSON 报告：默认只输出四项指标，详细模式输出完整报告和实体列表。
pub fn render_json(
    analysis: &Analysis,
    report: &AnalysisReport,
    verbose: bool,
) -> Result<String, FrontendError> {
    let value = if verbose {
        let mut value = serde_json::to_value(report)?;
        if let Some(object) = value.as_object_mut() {
            object.insert(
                "entities".to_string(),
                serde_json::to_value(analysis.entities())?,
            );
        }
        value
    } else {
        serde_json::to_value(report.result)?
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

pub fn render_text(analysis: &Analysis, report: &AnalysisReport, verbose: bool) -> String {
    let result = &report.result;
    let digits = decimal_places(result.total_length);
    let mut out = String::new();
    let _ = writeln!(out, "文件: {}", report.source);
    let _ = writeln!(out, "切割总长度: {:.*}", digits, result.total_length);
    let _ = writeln!(out, "下刀次数: {}", result.cut_ins_count);
    let _ = writeln!(out, "转向次数: {}", result.turns_count);
    let _ = writeln!(out, "实体数量: {}", result.entity_count);

    if !verbose {
        return out;
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "实体类型统计：");
    for kind in CutKind::ALL {
        let count = report.kinds.get(kind);
        if count > 0 {
            let _ = writeln!(out, "  - {}: {}", kind.label(), count);
        }
    }
    if report.dropped_entities > 0 {
        let _ = writeln!(out, "  - 已忽略的图元: {}", report.dropped_entities);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "规范化实体：");
    for (index, entity) in analysis.entities().iter().enumerate() {
        let _ = writeln!(out, "  [{index}] {}", describe_entity(entity));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "邻接矩阵：");
    for row in analysis.matrix().rows() {
        let cells: Vec<&str> = row
            .iter()
            .map(|&linked| if linked { "1" } else { "0" })
            .collect();
        let _ = writeln!(out, "  {}", cells.join(" "));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "连通分量：");
    for (index, members) in report.components.iter().enumerate() {
        let members: Vec<String> = members.iter().map(|member| member.to_string()).collect();
        let _ = writeln!(out, "  #{}: {}", index + 1, members.join(", "));
    }
    out
}

fn describe_entity(entity: &CutEntity) -> String {
    let label = entity.kind().label();
    let length = entity.length();
    match entity {
        CutEntity::Circle(circle) => format!(
            "{label} 圆心={}, 半径={:.3}, 长度={length:.3}",
            point(circle.center),
            circle.radius
        ),
        CutEntity::Arc(arc) => format!(
            "{label} 圆心={}, 半径={:.3}, 角度={:.1}°→{:.1}°, 长度={length:.3}",
            point(arc.center),
            arc.radius,
            arc.start_angle,
            arc.end_angle
        ),
        CutEntity::Spline(spline) => format!(
            "{label} 控制点数={}, {} -> {}, 长度={length:.3}",
            spline.points().len(),
            point(spline.first()),
            point(spline.last())
        ),
        CutEntity::Line(segment) | CutEntity::PolySegment(segment) => format!(
            "{label} {} -> {}, 长度={length:.3}",
            point(segment.start),
            point(segment.end)
        ),
    }
}

fn point(p: Point2) -> String {
    format!("({:.3}, {:.3})", p.x(), p.y())
}

/// 取整后的长度至少保留一位小数，多余的零不显示。
fn decimal_places(value: f64) -> usize {
    let text = format!("{value}");
    text.split_once('.')
        .map(|(_, fraction)| fraction.len())
        .unwrap_or(0)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutmeter_core::document::Document;

    fn l_shape() -> Analysis {
        let mut document = Document::new();
        document.add_line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), "0");
        document.add_line(Point2::new(10.0, 0.0), Point2::new(10.0, 10.0), "0");
        document.add_circle(Point2::new(40.0, 40.0), 5.0, "0");
        Analysis::from_document(&document, Tolerance::default())
    }

    #[test]
    fn text_report_lists_metrics() {
        let analysis = l_shape();
        let report = analysis.report("l.dxf", 3);
        let text = render_text(&analysis, &report, false);
        assert!(text.contains("文件: l.dxf"));
        assert!(text.contains("切割总长度: 51.416"));
        assert!(text.contains("下刀次数: 2"));
        assert!(text.contains("转向次数: 1"));
        assert!(text.contains("实体数量: 3"));
        assert!(!text.contains("邻接矩阵"));
    }

    #[test]
    fn verbose_text_includes_matrix_and_components() {
        let analysis = l_shape();
        let report = analysis.report("l.dxf", 3);
        let text = render_text(&analysis, &report, true);
        assert!(text.contains("邻接矩阵"));
        assert!(text.contains("  1 1 0\n"));
        assert!(text.contains("  0 0 1\n"));
        assert!(text.contains("#1: 0, 1"));
        assert!(text.contains("#2: 2"));
        assert!(text.contains("[2] 圆"));
    }

    #[test]
    fn json_report_has_metric_fields() {
        let analysis = l_shape();
        let report = analysis.report("l.dxf", 3);
        let json = render_json(&analysis, &report, false).expect("render json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse json");
        assert_eq!(value["cut_ins_count"], 2);
        assert_eq!(value["entity_count"], 3);
        assert!(value.get("source").is_none());

        let verbose = render_json(&analysis, &report, true).expect("render json");
        let value: serde_json::Value = serde_json::from_str(&verbose).expect("parse json");
        assert_eq!(value["source"], "l.dxf");
        assert_eq!(value["entities"][2]["kind"], "circle");
        assert_eq!(value["components"][1][0], 2);
    }

    #[test]
    fn whole_lengths_print_one_decimal() {
        assert_eq!(decimal_places(20.0), 1);
        assert_eq!(decimal_places(31.416), 3);
        assert_eq!(decimal_places(0.5), 1);
    }

    #[test]
    fn request_takes_defaults_from_config() {
        let request = CliRequest::from_config("a.dxf", &AppConfig::default());
        assert_eq!(request.format, ReportFormat::Text);
        assert_eq!(request.precision, 3);
        assert!(!request.verbose);
    }
}
