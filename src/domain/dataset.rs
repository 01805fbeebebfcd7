use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::DomainError;
use super::label::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetSplit {
    Train,
    Valid,
    Test,
}

impl DatasetSplit {
    pub const ALL: [DatasetSplit; 3] = [DatasetSplit::Train, DatasetSplit::Valid, DatasetSplit::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetSplit::Train => "train",
            DatasetSplit::Valid => "valid",
            DatasetSplit::Test => "test",
        }
    }
}

impl fmt::Display for DatasetSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetSplit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(DatasetSplit::Train),
            "valid" => Ok(DatasetSplit::Valid),
            "test" => Ok(DatasetSplit::Test),
            other => Err(DomainError::InvalidInput(format!("Invalid dataset type: {other}"))),
        }
    }
}

/// Resumen de una carpeta de subida.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitStats {
    pub file_count: usize,
    pub total_size: u64,
}

/// `None` se serializa como `null`: la carpeta no contiene ficheros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub train: Option<SplitStats>,
    pub valid: Option<SplitStats>,
    pub test: Option<SplitStats>,
}

impl DatasetInfo {
    pub fn set(&mut self, split: DatasetSplit, stats: Option<SplitStats>) {
        match split {
            DatasetSplit::Train => self.train = stats,
            DatasetSplit::Valid => self.valid = stats,
            DatasetSplit::Test => self.test = stats,
        }
    }
}

/// Fichero recibido en una subida, tal y como llega del cliente.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Imagen ya transformada, en orden CHW.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub data: Vec<f32>,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl ImageTensor {
    pub fn dims(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }
}

/// Anotaciones de una imagen: `boxes[i]` corresponde a `labels[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Target {
    pub boxes: Vec<BoundingBox>,
    pub labels: Vec<usize>,
}

impl Target {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Sample {
    pub image: ImageTensor,
    pub target: Target,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_names_round_trip() {
        for split in DatasetSplit::ALL {
            assert_eq!(split.as_str().parse::<DatasetSplit>().unwrap(), split);
        }
        assert!(matches!("bogus".parse::<DatasetSplit>(), Err(DomainError::InvalidInput(_))));
        assert!("Train".parse::<DatasetSplit>().is_err());
    }

    #[test]
    fn empty_split_serializes_as_null() {
        let mut info = DatasetInfo::default();
        info.set(DatasetSplit::Valid, Some(SplitStats { file_count: 2, total_size: 10 }));
        let json = serde_json::to_value(&info).unwrap();
        assert!(json["train"].is_null());
        assert_eq!(json["valid"]["fileCount"], 2);
        assert_eq!(json["valid"]["totalSize"], 10);
    }
}
