use rig::embeddings::Embedding;

/// Helper functions for converting rig embeddings into stored vectors
pub trait EmbeddingConversion {
    fn to_vec(&self) -> Vec<f32>;
    fn to_normalized_vec(&self) -> Vec<f32>;
}

impl EmbeddingConversion for Embedding {
    fn to_vec(&self) -> Vec<f32> {
        self.vec.iter().map(|f| *f as f32).collect()
    }

    fn to_normalized_vec(&self) -> Vec<f32> {
        let mut vec = self.to_vec();
        l2_normalize(&mut vec);
        vec
    }
}

/// Scale `vec` to unit length; the zero vector is left unchanged
pub fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        vec.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Inner product of two vectors of equal length
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
