use geo::Polygon;

/// Entity categories a plan symbol can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Pole,
    Fat,
    Fdt,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Pole => write!(f, "POLE"),
            Category::Fat => write!(f, "FAT"),
            Category::Fdt => write!(f, "FDT"),
        }
    }
}

/// A classified, georeferenced marker. Immutable once emitted; consumed by the
/// map renderer and the placemark exporter.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedEntity {
    pub category: Category,
    pub label: String,
    pub lat: f64,
    pub lon: f64,
}

/// A cleaned OCR token with its pixel centroid and confidence in [0, 100].
#[derive(Debug, Clone, PartialEq)]
pub struct TextToken {
    pub text: String,
    pub cx: f32,
    pub cy: f32,
    pub confidence: f32,
}

/// A circular glyph proposed by the symbol detector, not yet classified.
/// The radius only reflects detection support and is not used downstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateSymbol {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// A word box proposed by the detection model, in original-image coordinates.
#[derive(Debug, Clone)]
pub struct TextBox {
    pub score: f32,
    pub rect: Polygon<f32>,
}

/// Decoded text for one word box, with per-character CTC scores.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub text: String,
    pub character_scores: Vec<f32>,
}
