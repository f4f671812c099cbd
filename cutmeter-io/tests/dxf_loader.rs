use std::fs;
use std::path::PathBuf;

use cutmeter_core::document::{Entity, PolylineSource};
use cutmeter_io::{DocumentLoader, DxfFacade, IoError};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

/// 以 (组码, 值) 列表拼出 DXF 文本，省去手写换行。
fn dxf_text(pairs: &[(i32, &str)]) -> String {
    let mut text = String::new();
    for (code, value) in pairs {
        text.push_str(&format!("{code:>3}\n{value}\n"));
    }
    text
}

fn entities_section(body: &[(i32, &str)]) -> String {
    let mut pairs = vec![(0, "SECTION"), (2, "ENTITIES")];
    pairs.extend_from_slice(body);
    pairs.extend_from_slice(&[(0, "ENDSEC"), (0, "EOF")]);
    dxf_text(&pairs)
}

#[test]
fn load_l_shape_lines() {
    let loader = DxfFacade::new();
    let doc = loader.load(&fixture("l_shape.dxf")).expect("读取 DXF 失败");
    assert_eq!(doc.len(), 2);

    let lines: Vec<_> = doc
        .entities()
        .filter_map(|(_, entity)| match entity {
            Entity::Line(line) => Some(line),
            _ => None,
        })
        .collect();
    assert_eq!(lines.len(), 2);
    assert!((lines[0].end.x() - 10.0).abs() < 1e-9);
    assert!(lines[0].end.y().abs() < 1e-9);
    assert!((lines[1].end.y() - 10.0).abs() < 1e-9);
    assert_eq!(lines[1].layer, "CUT");
}

#[test]
fn load_mixed_entities_in_drawing_order() {
    let loader = DxfFacade::new();
    let doc = loader
        .load(&fixture("mixed_entities.dxf"))
        .expect("读取混合实体 DXF 失败");

    let kinds: Vec<&str> = doc.entities().map(|(_, e)| e.type_name()).collect();
    assert_eq!(
        kinds,
        vec!["LWPOLYLINE", "POLYLINE", "ARC", "CIRCLE", "SPLINE", "TEXT", "LINE"],
        "块定义中的实体不应出现在模型空间，缺少组码的 LINE 应被跳过"
    );

    let mut entities = doc.entities().map(|(_, e)| e);
    match entities.next() {
        Some(Entity::Polyline(polyline)) => {
            assert!(polyline.is_closed);
            assert_eq!(polyline.source, PolylineSource::LightWeight);
            assert_eq!(polyline.vertices.len(), 5);
            assert_eq!(polyline.layer, "CUT");
        }
        other => panic!("期望 LWPOLYLINE，实际为 {other:?}"),
    }
    match entities.next() {
        Some(Entity::Polyline(polyline)) => {
            assert!(!polyline.is_closed);
            assert_eq!(polyline.source, PolylineSource::Polyline);
            let xs: Vec<f64> = polyline.points().map(|p| p.x()).collect();
            assert_eq!(xs, vec![30.0, 40.0, 40.0]);
        }
        other => panic!("期望 POLYLINE，实际为 {other:?}"),
    }
    match entities.next() {
        Some(Entity::Arc(arc)) => {
            assert!((arc.radius - 5.0).abs() < 1e-9);
            assert!(arc.start_angle.abs() < 1e-9);
            assert!((arc.end_angle - 180.0).abs() < 1e-9, "角度应保持为度");
        }
        other => panic!("期望 ARC，实际为 {other:?}"),
    }
    match entities.next() {
        Some(Entity::Circle(circle)) => {
            assert!((circle.radius - 2.0).abs() < 1e-9);
            assert_eq!(circle.layer, "HOLES");
        }
        other => panic!("期望 CIRCLE，实际为 {other:?}"),
    }
    match entities.next() {
        Some(Entity::Spline(spline)) => {
            assert_eq!(spline.degree, 3);
            assert!(!spline.is_closed);
            assert_eq!(spline.control_points.len(), 4);
            assert_eq!(spline.knot_values.len(), 8);
            assert!(spline.fit_points.is_empty());
        }
        other => panic!("期望 SPLINE，实际为 {other:?}"),
    }
    match entities.next() {
        Some(Entity::Unsupported(text)) => {
            assert_eq!(text.kind, "TEXT");
            assert_eq!(text.layer, "ANNOT");
        }
        other => panic!("期望 TEXT，实际为 {other:?}"),
    }
    match entities.next() {
        Some(Entity::Line(line)) => {
            assert!((line.start.x() - 100.0).abs() < 1e-9);
        }
        other => panic!("期望 LINE，实际为 {other:?}"),
    }
}

#[test]
fn rejects_non_dxf_extension() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("part.dwg");
    fs::write(&path, "AC1032 binary").expect("write temp file");

    let err = DxfFacade::new().load(&path).unwrap_err();
    assert!(matches!(err, IoError::UnsupportedFormat { .. }), "{err}");
}

#[test]
fn accepts_uppercase_extension() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("PART.DXF");
    fs::write(&path, entities_section(&[])).expect("write temp file");

    let doc = DxfFacade::new().load(&path).expect("大写扩展名也应可读取");
    assert!(doc.is_empty());
}

#[test]
fn missing_file_is_read_error() {
    let err = DxfFacade::new()
        .load(&fixture("does_not_exist.dxf"))
        .unwrap_err();
    assert!(matches!(err, IoError::ReadError { .. }), "{err}");
}

#[test]
fn garbage_content_is_invalid_document() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("notes.dxf");
    fs::write(&path, "hello\nworld\n").expect("write temp file");

    let err = DxfFacade::new().load(&path).unwrap_err();
    assert!(matches!(err, IoError::InvalidDocument(_)), "{err}");
}

#[test]
fn empty_content_is_invalid_document() {
    let err = DxfFacade::new().parse_str("").unwrap_err();
    assert!(matches!(err, IoError::InvalidDocument(_)), "{err}");
}

#[test]
fn truncated_entities_section_is_invalid_document() {
    let text = dxf_text(&[
        (0, "SECTION"),
        (2, "ENTITIES"),
        (0, "LINE"),
        (10, "0.0"),
        (20, "0.0"),
    ]);
    let err = DxfFacade::new().parse_str(&text).unwrap_err();
    assert!(matches!(err, IoError::InvalidDocument(_)), "{err}");
}

#[test]
fn unparsable_coordinate_skips_only_that_entity() {
    let text = entities_section(&[
        (0, "CIRCLE"),
        (10, "abc"),
        (20, "0.0"),
        (40, "1.0"),
        (0, "LINE"),
        (10, "0.0"),
        (20, "0.0"),
        (11, "1.0"),
        (21, "0.0"),
    ]);
    let doc = DxfFacade::new().parse_str(&text).expect("单个实体的坏数据不应中止解析");
    let kinds: Vec<&str> = doc.entities().map(|(_, e)| e.type_name()).collect();
    assert_eq!(kinds, vec!["LINE"]);
}

#[test]
fn empty_lwpolyline_is_kept_for_normalization() {
    let text = entities_section(&[(0, "LWPOLYLINE"), (8, "CUT"), (90, "0"), (70, "1")]);
    let doc = DxfFacade::new().parse_str(&text).expect("解析失败");
    match doc.entities().next() {
        Some((_, Entity::Polyline(polyline))) => {
            assert!(polyline.vertices.is_empty());
            assert!(polyline.is_closed);
        }
        other => panic!("期望空多段线，实际为 {other:?}"),
    }
}

#[test]
fn polyface_mesh_is_recorded_as_unsupported() {
    let text = entities_section(&[
        (0, "POLYLINE"),
        (8, "MESH"),
        (66, "1"),
        (70, "64"),
        (0, "VERTEX"),
        (10, "0.0"),
        (20, "0.0"),
        (30, "1.0"),
        (70, "192"),
        (0, "SEQEND"),
        (0, "LINE"),
        (10, "0.0"),
        (20, "0.0"),
        (11, "5.0"),
        (21, "0.0"),
    ]);
    let doc = DxfFacade::new().parse_str(&text).expect("解析失败");
    let kinds: Vec<(&str, bool)> = doc
        .entities()
        .map(|(_, e)| (e.type_name(), matches!(e, Entity::Unsupported(_))))
        .collect();
    assert_eq!(kinds, vec![("POLYLINE", true), ("LINE", false)]);
}

#[test]
fn polyline_without_seqend_still_terminates() {
    let text = entities_section(&[
        (0, "POLYLINE"),
        (70, "1"),
        (0, "VERTEX"),
        (10, "0.0"),
        (20, "0.0"),
        (0, "VERTEX"),
        (10, "5.0"),
        (20, "0.0"),
        (42, "0.5"),
        (0, "CIRCLE"),
        (10, "0.0"),
        (20, "0.0"),
        (40, "1.0"),
    ]);
    let doc = DxfFacade::new().parse_str(&text).expect("解析失败");
    let mut entities = doc.entities().map(|(_, e)| e);
    match entities.next() {
        Some(Entity::Polyline(polyline)) => {
            assert!(polyline.is_closed);
            assert_eq!(polyline.vertices.len(), 2);
            assert!((polyline.vertices[1].bulge - 0.5).abs() < 1e-9);
        }
        other => panic!("期望 POLYLINE，实际为 {other:?}"),
    }
    assert!(matches!(entities.next(), Some(Entity::Circle(_))));
}

#[test]
fn windows_line_endings_are_accepted() {
    let text = entities_section(&[
        (0, "LINE"),
        (8, "CUT"),
        (10, "1.5"),
        (20, "2.5"),
        (11, "3.5"),
        (21, "4.5"),
    ])
    .replace('\n', "\r\n");
    let doc = DxfFacade::new().parse_str(&text).expect("CRLF 文件解析失败");
    match doc.entities().next() {
        Some((_, Entity::Line(line))) => {
            assert_eq!(line.layer, "CUT");
            assert!((line.end.y() - 4.5).abs() < 1e-9);
        }
        other => panic!("期望 LINE，实际为 {other:?}"),
    }
}

#[test]
fn mirrored_extrusion_maps_entities_to_world_coordinates() {
    let text = entities_section(&[
        (0, "ARC"),
        (10, "10.0"),
        (20, "0.0"),
        (40, "5.0"),
        (50, "0.0"),
        (51, "180.0"),
        (210, "0.0"),
        (220, "0.0"),
        (230, "-1.0"),
        (0, "CIRCLE"),
        (10, "3.0"),
        (20, "4.0"),
        (40, "1.0"),
        (230, "-1.0"),
        (0, "LWPOLYLINE"),
        (90, "2"),
        (70, "0"),
        (10, "1.0"),
        (20, "2.0"),
        (42, "0.5"),
        (10, "3.0"),
        (20, "4.0"),
        (230, "-1.0"),
    ]);
    let doc = DxfFacade::new().parse_str(&text).expect("解析失败");
    let entities: Vec<&Entity> = doc.entities().map(|(_, e)| e).collect();

    match entities[0] {
        Entity::Arc(arc) => {
            assert!((arc.center.x() + 10.0).abs() < 1e-9);
            assert!(arc.center.y().abs() < 1e-9);
            // OCS 中 0°→180° 的上半圆在世界坐标中仍是上半圆，起点变为 0°
            assert!(arc.start_angle.abs() < 1e-9, "起始角 {}", arc.start_angle);
            assert!((arc.end_angle - 180.0).abs() < 1e-9, "终止角 {}", arc.end_angle);
        }
        other => panic!("期望 ARC，实际为 {other:?}"),
    }
    match entities[1] {
        Entity::Circle(circle) => {
            assert!((circle.center.x() + 3.0).abs() < 1e-9);
            assert!((circle.center.y() - 4.0).abs() < 1e-9);
        }
        other => panic!("期望 CIRCLE，实际为 {other:?}"),
    }
    match entities[2] {
        Entity::Polyline(polyline) => {
            let first = &polyline.vertices[0];
            assert!((first.position.x() + 1.0).abs() < 1e-9);
            assert!((first.position.y() - 2.0).abs() < 1e-9);
            assert!((first.bulge + 0.5).abs() < 1e-12);
            assert!((polyline.vertices[1].position.x() + 3.0).abs() < 1e-9);
        }
        other => panic!("期望 LWPOLYLINE，实际为 {other:?}"),
    }
}

#[test]
fn default_extrusion_leaves_coordinates_untouched() {
    let text = entities_section(&[
        (0, "CIRCLE"),
        (10, "3.0"),
        (20, "4.0"),
        (40, "1.0"),
        (210, "0.0"),
        (220, "0.0"),
        (230, "1.0"),
    ]);
    let doc = DxfFacade::new().parse_str(&text).expect("解析失败");
    match doc.entities().next() {
        Some((_, Entity::Circle(circle))) => {
            assert_eq!(circle.center.x(), 3.0);
            assert_eq!(circle.center.y(), 4.0);
        }
        other => panic!("期望 CIRCLE，实际为 {other:?}"),
    }
}
