use std::fs;
use std::path::Path;

use ai_vision::adapters::ml::dataset::YoloDataset;
use ai_vision::adapters::ml::transform::ImageTransform;
use image::RgbImage;

fn write_image(dir: &Path, name: &str) {
    RgbImage::from_fn(8, 6, |x, y| image::Rgb([(x * 30) as u8, (y * 40) as u8, 90]))
        .save(dir.join(name))
        .unwrap();
}

fn layout() -> (tempfile::TempDir, std::path::PathBuf, std::path::PathBuf) {
    let root = tempfile::tempdir().unwrap();
    let images = root.path().join("images");
    let labels = root.path().join("labels");
    fs::create_dir_all(&images).unwrap();
    fs::create_dir_all(&labels).unwrap();
    (root, images, labels)
}

#[test]
fn lists_images_by_extension_in_sorted_order() {
    let (_root, images, labels) = layout();
    write_image(&images, "b.png");
    write_image(&images, "a.jpg");
    fs::write(images.join("notes.txt"), "x").unwrap();
    fs::write(images.join("upper.PNG"), "x").unwrap();

    let ds = YoloDataset::open(&images, &labels, ImageTransform::new(16)).unwrap();
    assert_eq!(ds.image_files(), ["a.jpg", "b.png"]);
}

#[test]
fn labels_become_corner_boxes() {
    let (_root, images, labels) = layout();
    write_image(&images, "img.png");
    fs::write(labels.join("img.txt"), "3 0.5 0.5 0.2 0.4\n\n1 0.1 0.2 0.2 0.2\n").unwrap();

    let ds = YoloDataset::open(&images, &labels, ImageTransform::new(16)).unwrap();
    let sample = ds.get(0).unwrap();
    assert_eq!(sample.image.dims(), [3, 16, 16]);
    assert_eq!(sample.target.labels, vec![3, 1]);

    let b = sample.target.boxes[0];
    assert!((b.x1 - 0.4).abs() < 1e-6);
    assert!((b.y1 - 0.3).abs() < 1e-6);
    assert!((b.x2 - 0.6).abs() < 1e-6);
    assert!((b.y2 - 0.7).abs() < 1e-6);
}

#[test]
fn missing_label_file_means_no_objects() {
    let (_root, images, labels) = layout();
    write_image(&images, "empty.jpg");

    let ds = YoloDataset::open(&images, &labels, ImageTransform::native()).unwrap();
    let sample = ds.get(0).unwrap();
    assert!(sample.target.is_empty());
    assert_eq!(sample.image.dims(), [3, 6, 8]);
}

#[test]
fn malformed_label_names_the_file() {
    let (_root, images, labels) = layout();
    write_image(&images, "bad.png");
    fs::write(labels.join("bad.txt"), "0 0.5 0.5 0.1\n").unwrap();

    let ds = YoloDataset::open(&images, &labels, ImageTransform::new(16)).unwrap();
    let err = ds.get(0).unwrap_err();
    assert!(format!("{err:#}").contains("bad.txt"));
}

#[test]
fn missing_image_dir_is_an_error() {
    let root = tempfile::tempdir().unwrap();
    let res = YoloDataset::from_split_dir(&root.path().join("nope"), ImageTransform::new(16));
    assert!(res.is_err());
}
