// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Folder-level differencing and tile merging against real files on disk.

use labelme_reconcile::{
    Error,
    labelme::{
        AnnotationDocument, DiffMode, DiffOptions, DiffStatus, LabelmeReader, LabelmeWriter,
        MergeStatus, Shape, diff_folders, merge_images,
    },
};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};
use tempfile::TempDir;

#[ctor::ctor]
fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn write_image(path: &Path, width: u32, height: u32) {
    image::RgbImage::new(width, height).save(path).unwrap();
}

fn write_document(dir: &Path, name: &str, image_path: &str, shapes: Vec<Shape>) -> PathBuf {
    let mut doc = AnnotationDocument::new(image_path, 100, 100);
    doc.shapes = shapes;
    let path = dir.join(name);
    LabelmeWriter::new().write_json(&doc, &path).unwrap();
    path
}

fn rect(label: &str, x: f64, y: f64, size: f64) -> Shape {
    Shape::rectangle(label, [x, y], [x + size, y + size])
}

/// Two model outputs over the same four images:
/// - `same`: boxes agree
/// - `moved`: boxes do not overlap at all
/// - `lonely`: no document in the second folder
/// - `imageless`: no image next to the first document
struct Folders {
    _root: TempDir,
    a: PathBuf,
    b: PathBuf,
    out: PathBuf,
}

fn setup() -> Folders {
    let root = TempDir::new().unwrap();
    let a = root.path().join("model_a");
    let b = root.path().join("model_b");
    let out = root.path().join("review");
    fs::create_dir_all(&a).unwrap();
    fs::create_dir_all(&b).unwrap();

    write_image(&a.join("same.png"), 100, 100);
    write_document(&a, "same.json", "same.png", vec![rect("car", 10.0, 10.0, 20.0)]);
    write_document(&b, "same.json", "same.png", vec![rect("car", 11.0, 11.0, 20.0)]);

    // imagePath from another machine, only its extension matters
    write_image(&a.join("moved.png"), 100, 100);
    write_document(
        &a,
        "moved.json",
        "D:\\exports\\moved.png",
        vec![rect("car", 0.0, 0.0, 10.0), rect("tree", 40.0, 40.0, 10.0)],
    );
    write_document(&b, "moved.json", "moved.png", vec![rect("car", 70.0, 70.0, 10.0)]);

    write_image(&a.join("lonely.png"), 100, 100);
    write_document(&a, "lonely.json", "lonely.png", vec![rect("car", 0.0, 0.0, 5.0)]);

    write_document(&a, "imageless.json", "imageless.png", vec![rect("car", 0.0, 0.0, 5.0)]);
    write_document(&b, "imageless.json", "imageless.png", vec![]);

    Folders {
        _root: root,
        a,
        b,
        out,
    }
}

#[test]
fn test_diff_folders_end_to_end() -> Result<(), Error> {
    let f = setup();
    let seen = AtomicUsize::new(0);

    let report = diff_folders(&f.a, &f.b, &f.out, &DiffOptions::default(), |_| {
        seen.fetch_add(1, Ordering::Relaxed);
    })?;

    assert_eq!(seen.load(Ordering::Relaxed), 4);
    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.written(), 1);
    assert_eq!(report.unchanged(), 1);

    let names: Vec<&str> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["imageless", "lonely", "moved", "same"]);

    let skipped = report.skipped();
    assert_eq!(skipped.len(), 2);
    assert!(
        skipped
            .iter()
            .all(|(_, err)| matches!(err, Error::MissingCounterpart(_)))
    );

    match &report.outcomes[2].status {
        DiffStatus::Written {
            shapes,
            image,
            document,
        } => {
            assert_eq!(*shapes, 3);
            assert_eq!(image, &f.out.join("moved.png"));
            assert_eq!(document, &f.out.join("moved.json"));
        }
        other => panic!("unexpected status {:?}", other),
    }

    let written = LabelmeReader::new().read_json(f.out.join("moved.json"))?;
    assert_eq!(written.image_path, "moved.png");
    assert!(written.image_data.is_none());
    let labels: Vec<&str> = written.shapes.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["car", "tree", "car"]);
    assert!(f.out.join("moved.png").is_file());

    assert!(!f.out.join("same.json").exists());
    assert!(!f.out.join("lonely.json").exists());
    assert!(!f.out.join("imageless.json").exists());
    assert!(report.to_string().starts_with("4 images compared"));
    Ok(())
}

#[test]
fn test_diff_folders_only_first() -> Result<(), Error> {
    let f = setup();
    let options = DiffOptions {
        mode: DiffMode::OnlyFirst,
        ..Default::default()
    };

    diff_folders(&f.a, &f.b, &f.out, &options, |_| {})?;

    let written = LabelmeReader::new().read_json(f.out.join("moved.json"))?;
    assert_eq!(written.shapes.len(), 2);
    assert_eq!(written.shapes[1].label, "tree");
    Ok(())
}

#[test]
fn test_diff_folders_rolls_back_image_on_write_failure() -> Result<(), Error> {
    let f = setup();
    // A directory where the document should go makes the write fail.
    fs::create_dir_all(f.out.join("moved.json"))?;

    let report = diff_folders(&f.a, &f.b, &f.out, &DiffOptions::default(), |_| {})?;

    let moved = report
        .outcomes
        .iter()
        .find(|o| o.name == "moved")
        .unwrap();
    assert!(matches!(moved.status, DiffStatus::Skipped(Error::IoError(_))));
    assert!(!f.out.join("moved.png").exists());
    assert_eq!(report.written(), 0);
    Ok(())
}

#[test]
fn test_diff_folders_setup_errors() {
    let f = setup();

    let missing = f.b.join("does_not_exist");
    assert!(diff_folders(&f.a, &missing, &f.out, &DiffOptions::default(), |_| {}).is_err());
    assert!(diff_folders(&missing, &f.b, &f.out, &DiffOptions::default(), |_| {}).is_err());

    let options = DiffOptions {
        threshold: 1.5,
        ..Default::default()
    };
    assert!(matches!(
        diff_folders(&f.a, &f.b, &f.out, &options, |_| {}),
        Err(Error::InvalidParameters(_))
    ));
    assert!(!f.out.exists());
}

#[test]
fn test_diff_folders_rejects_input_as_output() -> Result<(), Error> {
    let f = setup();
    let image = fs::read(f.a.join("moved.png"))?;
    let document = fs::read(f.a.join("moved.json"))?;

    for output in [&f.a, &f.b] {
        assert!(matches!(
            diff_folders(&f.a, &f.b, output, &DiffOptions::default(), |_| {}),
            Err(Error::InvalidParameters(_))
        ));
    }
    // Same folder through a different spelling
    let dotted = f.a.join(".");
    assert!(diff_folders(&f.a, &f.b, &dotted, &DiffOptions::default(), |_| {}).is_err());

    assert_eq!(fs::read(f.a.join("moved.png"))?, image);
    assert_eq!(fs::read(f.a.join("moved.json"))?, document);
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn test_diff_folders_duplicate_names_compared_once() -> Result<(), Error> {
    let f = setup();
    // Sorts before moved.json and shares its name
    write_document(
        &f.a,
        "moved.JSON",
        "moved.png",
        vec![rect("boat", 60.0, 0.0, 10.0)],
    );

    let report = diff_folders(&f.a, &f.b, &f.out, &DiffOptions::default(), |_| {})?;

    let moved: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| o.name == "moved")
        .collect();
    assert_eq!(moved.len(), 2);
    assert!(matches!(moved[0].status, DiffStatus::Written { .. }));
    assert!(matches!(
        moved[1].status,
        DiffStatus::Skipped(Error::InvalidParameters(_))
    ));

    let written = LabelmeReader::new().read_json(f.out.join("moved.json"))?;
    let labels: Vec<&str> = written.shapes.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["boat", "car"]);
    Ok(())
}

fn setup_tiles() -> (TempDir, PathBuf, PathBuf) {
    let root = TempDir::new().unwrap();
    let tiles = root.path().join("tiles");
    let images = root.path().join("images");
    fs::create_dir_all(&tiles).unwrap();
    fs::create_dir_all(&images).unwrap();

    write_image(&images.join("scene.png"), 200, 100);
    write_image(&images.join("empty.png"), 50, 50);

    write_document(
        &tiles,
        "scene_x_100_y_0.json",
        "scene_x_100_y_0.png",
        vec![rect("car", 10.0, 10.0, 10.0)],
    );
    write_document(
        &tiles,
        "scene_x_0_y_0.json",
        "scene_x_0_y_0.png",
        vec![rect("tree", 10.0, 10.0, 10.0), rect("car", 95.0, 10.0, 10.0)],
    );
    // Different image whose name starts with the same base name
    write_document(
        &tiles,
        "scene2_x_0_y_0.json",
        "scene2_x_0_y_0.png",
        vec![rect("boat", 0.0, 0.0, 1.0)],
    );
    fs::write(tiles.join("scene_x_0_y_100.json"), "{ not json").unwrap();
    // Offset beyond u32
    write_document(
        &tiles,
        "scene_x_99999999999_y_0.json",
        "scene_x_99999999999_y_0.png",
        vec![rect("car", 0.0, 0.0, 1.0)],
    );

    (root, tiles, images)
}

#[test]
fn test_merge_images_end_to_end() -> Result<(), Error> {
    let (root, tiles, images) = setup_tiles();
    let out = root.path().join("merged");
    let inputs = vec![images.join("scene.png"), images.join("empty.png")];
    let reader = LabelmeReader::new();
    let writer = LabelmeWriter::new();

    let outcomes = merge_images(&reader, &writer, &tiles, &inputs, &out, |_| {})?;
    assert_eq!(outcomes.len(), 2);

    match &outcomes[0].status {
        MergeStatus::Written {
            document,
            tiles,
            shapes,
            skipped_tiles,
        } => {
            assert_eq!(document, &out.join("scene.json"));
            assert_eq!(*tiles, 2);
            assert_eq!(*shapes, 3);
            assert_eq!(*skipped_tiles, 2);
        }
        other => panic!("unexpected status {:?}", other),
    }
    assert!(matches!(
        outcomes[1].status,
        MergeStatus::Failed(Error::NoMatchingTiles(_))
    ));

    let merged = reader.read_json(out.join("scene.json"))?;
    assert_eq!((merged.image_width, merged.image_height), (200, 100));
    assert_eq!(merged.image_path, images.join("scene.png").display().to_string());
    assert!(merged.image_data.is_none());
    assert_eq!(merged.shapes[0].label, "tree");
    assert_eq!(merged.shapes[2].points[0], [110.0, 10.0]);
    assert!(merged.shapes.iter().all(|s| s.label != "boat"));

    // Rerunning produces the same bytes
    let first = fs::read(out.join("scene.json"))?;
    merge_images(&reader, &writer, &tiles, &inputs, &out, |_| {})?;
    assert_eq!(first, fs::read(out.join("scene.json"))?);
    Ok(())
}

#[test]
fn test_merge_images_missing_tile_dir() {
    let (root, _tiles, images) = setup_tiles();
    let result = merge_images(
        &LabelmeReader::new(),
        &LabelmeWriter::new(),
        &root.path().join("nowhere"),
        &[images.join("scene.png")],
        &root.path().join("merged"),
        |_| {},
    );
    assert!(matches!(result, Err(Error::InvalidParameters(_))));
}
