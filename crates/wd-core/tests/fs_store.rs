//! Integration tests: module templates stored as files.

use pretty_assertions::assert_eq;
use wd_core::geometry::Point;
use wd_core::model::Node;
use wd_core::store::{FsModuleStore, ModuleStore, ModuleSummary};
use wd_core::{Color, Module, StoreError};

fn sample(id: &str, name: &str) -> Module {
    let a = Node::new("SDA", Point::new(0.0, 0.0), "SDA", Color::rgb(0, 0, 255));
    let b = Node::new("SCL", Point::new(30.0, 0.0), "SCL", Color::rgb(0, 255, 0));
    Module::from_selection(id, name, [&a, &b], []).unwrap()
}

#[test]
fn save_load_list_delete() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FsModuleStore::new(dir.path().join("Modules")).unwrap();
    assert!(store.dir().is_dir());
    assert!(store.list().is_empty());

    let bus = sample("aaaa1111", "I2C bus");
    let amp = sample("bbbb2222", "Amp");
    store.save(&bus).unwrap();
    store.save(&amp).unwrap();
    assert!(store.dir().join("aaaa1111.json").is_file());

    assert_eq!(store.load("aaaa1111").unwrap(), bus);
    assert_eq!(
        store.list(),
        vec![
            ModuleSummary {
                id: "bbbb2222".into(),
                name: "Amp".into()
            },
            ModuleSummary {
                id: "aaaa1111".into(),
                name: "I2C bus".into()
            },
        ]
    );

    assert!(store.delete("bbbb2222"));
    assert!(!store.delete("bbbb2222"));
    assert!(matches!(store.load("bbbb2222"), Err(StoreError::ModuleNotFound(_))));
    assert_eq!(store.list().len(), 1);
}

#[test]
fn list_skips_unreadable_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FsModuleStore::new(dir.path()).unwrap();
    store.save(&sample("cccc3333", "Good")).unwrap();
    std::fs::write(dir.path().join("broken.json"), "{ nope").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let listed = store.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Good");

    assert!(matches!(store.load("broken"), Err(StoreError::Codec(_))));
}
