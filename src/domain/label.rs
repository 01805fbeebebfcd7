// src/domain/label.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Una línea de etiqueta en formato YOLO: `class_id x_center y_center width height`,
/// con las coordenadas normalizadas a [0,1] respecto al tamaño de la imagen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub class_id: usize,
    pub x_center: f32,
    pub y_center: f32,
    pub width: f32,
    pub height: f32,
}

/// Caja en esquinas (x1, y1, x2, y2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

#[derive(Debug, Error, PartialEq)]
pub enum LabelError {
    #[error("línea {line}: se esperaban 5 campos, hay {found}")]
    MissingFields { line: usize, found: usize },
    #[error("línea {line}: class_id inválido '{value}'")]
    InvalidClass { line: usize, value: String },
    #[error("línea {line}: coordenada inválida '{value}'")]
    InvalidCoordinate { line: usize, value: String },
}

impl LabelRecord {
    pub fn to_box(&self) -> BoundingBox {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        BoundingBox {
            x1: self.x_center - half_w,
            y1: self.y_center - half_h,
            x2: self.x_center + half_w,
            y2: self.y_center + half_h,
        }
    }
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = ix * iy;
        let denom = self.area() + other.area() - inter;
        if denom <= 0.0 {
            0.0
        } else {
            inter / denom
        }
    }
}

/// Parsea una línea. `line` es 1-based y solo se usa para los mensajes de error.
/// Los campos a partir del sexto se ignoran.
pub fn parse_line(text: &str, line: usize) -> Result<LabelRecord, LabelError> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() < 5 {
        return Err(LabelError::MissingFields { line, found: fields.len() });
    }

    let class_id = fields[0]
        .parse::<usize>()
        .map_err(|_| LabelError::InvalidClass { line, value: fields[0].to_string() })?;

    let coord = |raw: &str| {
        raw.parse::<f32>()
            .map_err(|_| LabelError::InvalidCoordinate { line, value: raw.to_string() })
    };

    Ok(LabelRecord {
        class_id,
        x_center: coord(fields[1])?,
        y_center: coord(fields[2])?,
        width: coord(fields[3])?,
        height: coord(fields[4])?,
    })
}

/// Parsea el contenido completo de un fichero de etiquetas. Las líneas en blanco se saltan.
pub fn parse_labels(content: &str) -> Result<Vec<LabelRecord>, LabelError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| parse_line(l, i + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_is_center_plus_minus_half_extent() {
        let rec = parse_line("3 0.5 0.4 0.2 0.6", 1).unwrap();
        assert_eq!(rec.class_id, 3);
        let b = rec.to_box();
        assert!((b.x1 - 0.4).abs() < 1e-6);
        assert!((b.y1 - 0.1).abs() < 1e-6);
        assert!((b.x2 - 0.6).abs() < 1e-6);
        assert!((b.y2 - 0.7).abs() < 1e-6);
        assert!(b.x1 <= b.x2 && b.y1 <= b.y2);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let rec = parse_line("0 0.5 0.5 0.1 0.1 0.9 0.3", 1).unwrap();
        assert_eq!(rec.width, 0.1);
    }

    #[test]
    fn short_line_is_rejected() {
        assert_eq!(
            parse_line("1 0.5 0.5", 7),
            Err(LabelError::MissingFields { line: 7, found: 3 })
        );
    }

    #[test]
    fn non_numeric_fields_are_rejected() {
        assert!(matches!(
            parse_line("cat 0.5 0.5 0.1 0.1", 1),
            Err(LabelError::InvalidClass { .. })
        ));
        assert!(matches!(
            parse_line("1 0.5 abc 0.1 0.1", 2),
            Err(LabelError::InvalidCoordinate { line: 2, .. })
        ));
    }

    #[test]
    fn file_parsing_skips_blank_lines_and_reports_line_numbers() {
        let recs = parse_labels("0 0.5 0.5 0.2 0.2\n\n1 0.1 0.1 0.05 0.05\n").unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[1].class_id, 1);

        let err = parse_labels("0 0.5 0.5 0.2 0.2\n\n1 0.1\n").unwrap_err();
        assert_eq!(err, LabelError::MissingFields { line: 3, found: 2 });
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let b = BoundingBox { x1: 0.0, y1: 0.0, x2: 2.0, y2: 2.0 };
        assert!((b.iou(&b) - 1.0).abs() < 1e-6);
        let far = BoundingBox { x1: 5.0, y1: 5.0, x2: 6.0, y2: 6.0 };
        assert_eq!(b.iou(&far), 0.0);
    }
}
