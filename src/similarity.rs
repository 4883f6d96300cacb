//! Similarity measures for embedding vectors.

/// Supported similarity measures, selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimilarityMeasure {
    /// Cosine similarity (normalized dot product).
    #[default]
    Cosine,
    /// Raw dot product.
    Dot,
}

impl SimilarityMeasure {
    /// Parse a configured measure name; unknown names fall back to cosine.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "dot" => Self::Dot,
            _ => Self::Cosine,
        }
    }

    /// Compute the similarity between two vectors.
    #[must_use]
    pub fn compute(self, x: &[f32], y: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(x, y),
            Self::Dot => dot_product(x, y),
        }
    }
}

fn dot_product(x: &[f32], y: &[f32]) -> f32 {
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}

fn cosine_similarity(x: &[f32], y: &[f32]) -> f32 {
    let dot = dot_product(x, y);
    let norm_x: f32 = x.iter().map(|a| a * a).sum::<f32>().sqrt();
    let norm_y: f32 = y.iter().map(|a| a * a).sum::<f32>().sqrt();

    if norm_x == 0.0 || norm_y == 0.0 {
        return 0.0;
    }

    dot / (norm_x * norm_y)
}
