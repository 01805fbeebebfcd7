use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::transform::ImageTransform;
use crate::domain::dataset::{Sample, Target};
use crate::domain::label::parse_labels;

/// Extensiones aceptadas (comparación literal sobre el final del nombre).
pub const IMAGE_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// Dataset en formato YOLO: una imagen por fichero en `image_dir` y, opcionalmente,
/// un `.txt` con el mismo nombre base en `labels_dir`.
#[derive(Debug, Clone)]
pub struct YoloDataset {
    image_dir: PathBuf,
    labels_dir: PathBuf,
    transform: ImageTransform,
    image_files: Vec<String>,
}

impl YoloDataset {
    pub fn open(image_dir: &Path, labels_dir: &Path, transform: ImageTransform) -> Result<Self> {
        let entries = fs::read_dir(image_dir)
            .with_context(|| format!("failed to list images in {}", image_dir.display()))?;

        let mut image_files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
                image_files.push(name);
            }
        }
        image_files.sort();

        Ok(Self {
            image_dir: image_dir.to_path_buf(),
            labels_dir: labels_dir.to_path_buf(),
            transform,
            image_files,
        })
    }

    /// `<dir>/images` + `<dir>/labels`.
    pub fn from_split_dir(dir: &Path, transform: ImageTransform) -> Result<Self> {
        Self::open(&dir.join("images"), &dir.join("labels"), transform)
    }

    pub fn len(&self) -> usize {
        self.image_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image_files.is_empty()
    }

    pub fn image_files(&self) -> &[String] {
        &self.image_files
    }

    pub fn label_path(&self, image_name: &str) -> PathBuf {
        let stem = Path::new(image_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| image_name.to_string());
        self.labels_dir.join(format!("{stem}.txt"))
    }

    /// Sin fichero de etiquetas la imagen no tiene objetos; no es un error.
    pub fn load_target(&self, idx: usize) -> Result<Target> {
        let name = self.name(idx)?;
        let path = self.label_path(name);
        if !path.exists() {
            return Ok(Target::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read labels {}", path.display()))?;
        let records = parse_labels(&content)
            .with_context(|| format!("malformed labels {}", path.display()))?;

        let mut target = Target::default();
        for rec in records {
            target.boxes.push(rec.to_box());
            target.labels.push(rec.class_id);
        }
        Ok(target)
    }

    pub fn get(&self, idx: usize) -> Result<Sample> {
        let name = self.name(idx)?;
        let path = self.image_dir.join(name);
        let rgb = image::open(&path)
            .with_context(|| format!("failed to open image {}", path.display()))?
            .to_rgb8();
        let image = self.transform.apply(&rgb);
        let target = self.load_target(idx)?;
        Ok(Sample { image, target })
    }

    fn name(&self, idx: usize) -> Result<&str> {
        self.image_files
            .get(idx)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("sample index {idx} out of range (len {})", self.len()))
    }
}
