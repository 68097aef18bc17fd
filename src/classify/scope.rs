//! Project-vs-user scope classification by exemplar similarity.
//!
//! Two fixed phrase sets — project-indicative and user-indicative — are
//! embedded once at construction. New content is scored by its maximum
//! cosine similarity against each set; the higher maximum wins. Ambiguous
//! content (confidence below the threshold) is routed to the user store so
//! the project store never accumulates questionable entries.

use crate::embedding::{cosine, EmbeddingProvider};
use crate::error::Result;
use crate::memory::types::Scope;
use serde::Serialize;

/// Phrases indicative of project-scoped knowledge.
pub const PROJECT_EXEMPLARS: &[&str] = &[
    "This codebase uses FastAPI for REST APIs",
    "Bug in the auth module line 42 causing a panic",
    "The MemoryStore struct handles all storage operations",
    "Dependencies are managed via the workspace manifest",
    "We use Redis for caching in this project",
    "The server module implements the wire protocol",
    "Tests are located in the tests/ directory",
    "The project requires the 2021 edition toolchain",
    "Memory leak in the background indexing job",
    "The /users API endpoint returns a 500 error",
];

/// Phrases indicative of user-scoped knowledge.
pub const USER_EXEMPLARS: &[&str] = &[
    "I prefer pytest over unittest for testing",
    "I like clean code with explicit type annotations",
    "I always write doc comments for public functions",
    "I prefer functional programming patterns",
    "I use clippy for linting on every commit",
    "I like VS Code as my primary editor",
    "I commit frequently with small atomic changes",
    "I prefer reviewing pull requests in the morning",
    "Rust uses traits for polymorphism",
    "REST APIs should be stateless",
];

/// Default confidence floor below which content is forced to the user store.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.65;

/// Outcome of a scope classification.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScopeDecision {
    pub scope: Scope,
    /// Winning maximum similarity, clamped to `[0.0, 1.0]`.
    pub confidence: f64,
}

/// Classifies content into [`Scope::Project`] or [`Scope::User`].
pub struct ScopeClassifier {
    project: Vec<Vec<f32>>,
    user: Vec<Vec<f32>>,
    threshold: f64,
}

impl ScopeClassifier {
    /// Embed both exemplar sets through the provider. Fails with
    /// `EmbeddingUnavailable` if the backend is unreachable.
    pub fn new(embedder: &dyn EmbeddingProvider, threshold: f64) -> Result<Self> {
        let project = embedder.embed_batch(PROJECT_EXEMPLARS)?;
        let user = embedder.embed_batch(USER_EXEMPLARS)?;
        Ok(Self {
            project,
            user,
            threshold,
        })
    }

    /// Classify a pre-computed content embedding.
    ///
    /// Below-threshold confidence always resolves to [`Scope::User`],
    /// regardless of which exemplar set scored higher. This is a documented
    /// default, not an error.
    pub fn classify(&self, embedding: &[f32]) -> ScopeDecision {
        let project_max = max_similarity(&self.project, embedding);
        let user_max = max_similarity(&self.user, embedding);

        let (scope, confidence) = if project_max > user_max {
            (Scope::Project, project_max)
        } else {
            (Scope::User, user_max)
        };
        let confidence = confidence.clamp(0.0, 1.0);

        if confidence < self.threshold {
            tracing::debug!(
                confidence,
                threshold = self.threshold,
                "ambiguous scope, defaulting to user"
            );
            return ScopeDecision {
                scope: Scope::User,
                confidence,
            };
        }

        ScopeDecision { scope, confidence }
    }

    /// Embed `content` and classify it in one step.
    pub fn classify_text(
        &self,
        embedder: &dyn EmbeddingProvider,
        content: &str,
    ) -> Result<ScopeDecision> {
        let embedding = embedder.embed(content)?;
        Ok(self.classify(&embedding))
    }
}

fn max_similarity(exemplars: &[Vec<f32>], embedding: &[f32]) -> f64 {
    exemplars
        .iter()
        .map(|e| cosine(e, embedding))
        .fold(f64::MIN, f64::max)
}
