//! Embedder port - turns text into a vector for memory search.

use async_trait::async_trait;

use super::AIError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f64>, AIError>;

    /// Length of the vectors this embedder produces.
    fn dimensions(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedder_is_object_safe() {
        fn _accepts_dyn(_: &dyn Embedder) {}
    }
}
