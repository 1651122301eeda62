//! Integration tests: scene file → SceneGraph → scene file.
//!
//! Ids are regenerated on every decode, so entities are compared by their
//! persisted fields and connections by their endpoint names.

use pretty_assertions::assert_eq;
use wd_core::codec::{SceneMetadata, decode_scene, encode_scene};
use wd_core::config::EditorConfig;
use wd_core::geometry::Point;
use wd_core::model::{Routing, SceneGraph};
use wd_core::{Color, InstanceId};

type NodeRow = (String, Point, String, Color, Option<String>, bool);
type ConnRow = (String, String, Color, Routing, Vec<Point>);
type ImageRow = (String, Point, f32, f32, f32, Option<String>);

fn node_rows(scene: &SceneGraph) -> Vec<NodeRow> {
    scene
        .nodes()
        .map(|n| {
            (
                n.name.clone(),
                n.pos,
                n.class.clone(),
                n.color,
                n.module_id.map(|m| m.as_str().to_string()),
                n.locked,
            )
        })
        .collect()
}

fn conn_rows(scene: &SceneGraph) -> Vec<ConnRow> {
    scene
        .connections()
        .map(|c| {
            let name = |id| scene.node(id).map(|n| n.name.clone()).unwrap_or_default();
            (
                name(c.node1),
                name(c.node2),
                c.color,
                c.routing,
                c.waypoints.to_vec(),
            )
        })
        .collect()
}

fn image_rows(scene: &SceneGraph) -> Vec<ImageRow> {
    scene
        .images
        .iter()
        .map(|i| {
            (
                i.path.clone(),
                i.pos,
                i.width,
                i.height,
                i.rotation,
                i.module_instance_id.map(|m| m.as_str().to_string()),
            )
        })
        .collect()
}

#[test]
fn fixture_decodes_with_defaults_and_skips() {
    let config = EditorConfig::default();
    let (scene, meta) = decode_scene(include_str!("fixtures/board.json"), &config).unwrap();

    assert_eq!(scene.node_count(), 4);
    // The third connection points past the node list.
    assert_eq!(scene.connection_count(), 2);
    assert_eq!(scene.image_count(), 2);

    let gnd2 = scene.nodes().find(|n| n.name == "GND2").unwrap();
    assert_eq!(gnd2.color, Color::rgb(0, 0, 0));
    assert_eq!(gnd2.module_id, Some(InstanceId::intern("ab12cd34_inst_1")));

    let logo = &scene.images[1];
    assert_eq!((logo.width, logo.height, logo.rotation), (100.0, 100.0, 0.0));
    assert_eq!(logo.module_instance_id, None);

    assert_eq!(
        meta,
        SceneMetadata {
            grid_enabled: true,
            grid_size: 20.0,
            snap_to_grid: true,
            zoom_level: 1.5,
            pan_offset: Point::new(-40.0, 12.0),
        }
    );
}

#[test]
fn encode_then_decode_preserves_scene() {
    let config = EditorConfig::default();
    let (original, meta) = decode_scene(include_str!("fixtures/board.json"), &config).unwrap();

    let text = encode_scene(&original, &meta).unwrap();
    let (decoded, decoded_meta) = decode_scene(&text, &config).unwrap();

    assert_eq!(node_rows(&decoded), node_rows(&original));
    assert_eq!(conn_rows(&decoded), conn_rows(&original));
    assert_eq!(image_rows(&decoded), image_rows(&original));
    assert_eq!(decoded_meta, meta);

    let ortho = conn_rows(&decoded)
        .into_iter()
        .find(|c| c.3 == Routing::Orthogonal)
        .unwrap();
    assert_eq!(ortho.4, vec![Point::new(200.0, 100.0), Point::new(200.0, 180.0)]);
}

#[test]
fn encoded_document_uses_index_references() {
    let config = EditorConfig::default();
    let (scene, meta) = decode_scene(include_str!("fixtures/board.json"), &config).unwrap();
    let text = encode_scene(&scene, &meta).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(value["connections"][0]["node1"], 0);
    assert_eq!(value["connections"][0]["node2"], 1);
    assert_eq!(value["connections"][1]["node1"], 2);
    assert_eq!(value["images"][0]["type"], "image");
    assert_eq!(value["nodes"][1]["module_id"], "ab12cd34_inst_1");
}
