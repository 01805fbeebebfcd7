use image::{imageops::FilterType, RgbImage};

use crate::domain::dataset::ImageTensor;

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Redimensiona (si procede), escala a [0,1] y normaliza por canal.
/// Entrenamiento e inferencia deben usar la misma instancia de configuración.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTransform {
    pub size: Option<u32>,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl ImageTransform {
    pub fn new(size: u32) -> Self {
        Self { size: Some(size), mean: IMAGENET_MEAN, std: IMAGENET_STD }
    }

    /// Sin redimensionado: cada imagen conserva su tamaño.
    pub fn native() -> Self {
        Self { size: None, mean: IMAGENET_MEAN, std: IMAGENET_STD }
    }

    pub fn apply(&self, rgb: &RgbImage) -> ImageTensor {
        let resized;
        let img = match self.size {
            Some(s) if rgb.dimensions() != (s, s) => {
                resized = image::imageops::resize(rgb, s, s, FilterType::Triangle);
                &resized
            }
            _ => rgb,
        };

        let (width, height) = img.dimensions();
        let plane = (width * height) as usize;
        let mut data = vec![0.0f32; 3 * plane];
        for (x, y, pixel) in img.enumerate_pixels() {
            let idx = (y * width + x) as usize;
            for c in 0..3 {
                let v = pixel[c] as f32 / 255.0;
                data[c * plane + idx] = (v - self.mean[c]) / self.std[c];
            }
        }

        ImageTensor { data, channels: 3, height: height as usize, width: width as usize }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resizes_and_normalizes_chw() {
        let img = RgbImage::from_fn(4, 2, |_, _| image::Rgb([255, 0, 128]));
        let t = ImageTransform::new(8).apply(&img);
        assert_eq!(t.dims(), [3, 8, 8]);
        let red = t.data[0];
        assert!((red - (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0]).abs() < 1e-4);
        let green = t.data[64];
        assert!((green - (0.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1]).abs() < 1e-4);
    }

    #[test]
    fn native_keeps_size() {
        let img = RgbImage::new(5, 3);
        let t = ImageTransform::native().apply(&img);
        assert_eq!(t.dims(), [3, 3, 5]);
    }
}
