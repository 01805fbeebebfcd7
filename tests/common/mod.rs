#![allow(dead_code)]

use std::fs;
use std::path::Path;

use image::RgbImage;

/// Crea `dir/images` + `dir/labels` con `count` imágenes de `size`x`size` y un objeto cada una.
pub fn write_split(dir: &Path, count: usize, size: u32) {
    let images = dir.join("images");
    let labels = dir.join("labels");
    fs::create_dir_all(&images).unwrap();
    fs::create_dir_all(&labels).unwrap();
    for i in 0..count {
        let img = RgbImage::from_fn(size, size, |x, y| {
            let inside = x >= size / 4 && x < size / 2 && y >= size / 4 && y < size / 2;
            if inside {
                image::Rgb([220, 30, (i * 40) as u8])
            } else {
                image::Rgb([20, 120, 20])
            }
        });
        img.save(images.join(format!("img_{i}.png"))).unwrap();
        fs::write(labels.join(format!("img_{i}.txt")), format!("{} 0.375 0.375 0.25 0.25\n", i % 2)).unwrap();
    }
}
