//! Cognitive sector classification.
//!
//! Content is scored per sector by weighted keyword/pattern matches plus
//! cosine similarity to a small exemplar set, and the best-scoring sector
//! wins. Ties break by the priority order semantic > episodic > procedural
//! > reflective > emotional, so factual content prevails over narrative when
//! ambiguous. There is no "unknown" outcome: content that matches nothing is
//! semantic.

use crate::embedding::{cosine, EmbeddingProvider};
use crate::error::Result;
use crate::memory::types::Sector;
use regex::Regex;

/// Tie-break and default order. Earlier entries win equal scores.
const PRIORITY: [Sector; 5] = [
    Sector::Semantic,
    Sector::Episodic,
    Sector::Procedural,
    Sector::Reflective,
    Sector::Emotional,
];

/// Contribution of exemplar similarity relative to one pattern hit.
const EXEMPLAR_SCALE: f64 = 2.0;

/// Pattern table per sector: (weight, patterns). Matched against lowercased
/// content, so the patterns are written in lowercase.
fn pattern_table(sector: Sector) -> (f64, &'static [&'static str]) {
    match sector {
        Sector::Episodic => (
            1.2,
            &[
                r"\b(today|yesterday|tomorrow|last\s+week|next\s+week)\b",
                r"\b(remember\s+when|recall|that\s+time)\b",
                r"\b(went|saw|met|heard|visited|attended)\b",
                r"\b(at\s+\d{1,2}:\d{2}|on\s+(monday|tuesday|wednesday|thursday|friday|saturday|sunday))\b",
                r"\b(event|moment|experience|incident|happened|occurred)\b",
            ],
        ),
        Sector::Semantic => (
            1.0,
            &[
                r"\b(is\s+a|represents|means|defined\s+as|refers\s+to)\b",
                r"\b(concept|theory|principle|law|rule|definition)\b",
                r"\b(fact|statistic|data|evidence|information)\b",
                r"\b(history|science|geography|math|physics|chemistry)\b",
                r"\b(know|understand|learn|study)\b",
            ],
        ),
        Sector::Procedural => (
            1.1,
            &[
                r"\b(how\s+to|step\s+by\s+step|guide|tutorial|instructions)\b",
                r"\b(first|second|third|then|next|finally|lastly)\b",
                r"\b(install|run|execute|compile|build|deploy|configure)\b",
                r"\b(click|press|type|enter|select|choose|drag)\b",
                r"\b(method|function|algorithm|procedure|process)\b",
            ],
        ),
        Sector::Emotional => (
            1.3,
            &[
                r"\b(feel|feeling|emotions?|mood)\b",
                r"\b(happy|sad|angry|excited|scared|anxious|nervous)\b",
                r"\b(love|hate|like|dislike|enjoy|prefer)\b",
                r"\b(amazing|terrible|awesome|awful|wonderful|horrible)\b",
                r"\b(frustrated|confused|overwhelmed|relieved|grateful)\b",
                r"[!]{2,}",
            ],
        ),
        Sector::Reflective => (
            0.8,
            &[
                r"\b(realize|realization|insight|epiphany|discovered)\b",
                r"\b(think|thought|ponder|contemplate|reflect)\b",
                r"\b(grasp|comprehend|see\s+now)\b",
                r"\b(pattern|trend|connection|relationship)\b",
                r"\b(lesson|moral|takeaway|conclusion|summary)\b",
                r"\b(feedback|review|analysis|evaluation|assessment)\b",
                r"\b(improve|grow|adapt|evolve)\b",
            ],
        ),
    }
}

/// Exemplar sentences per sector, embedded once at construction.
fn exemplar_table(sector: Sector) -> &'static [&'static str] {
    match sector {
        Sector::Episodic => &[
            "Yesterday we met to review the launch plan",
            "I attended the standup this morning",
            "That time the deploy failed on a Friday evening",
        ],
        Sector::Semantic => &[
            "A mutex guarantees mutually exclusive access",
            "This service uses Postgres for persistent storage",
            "HTTP is a stateless request-response protocol",
        ],
        Sector::Procedural => &[
            "First run the build, then execute the test suite",
            "How to configure the linter step by step",
            "Install the toolchain and compile the project",
        ],
        Sector::Emotional => &[
            "I feel really frustrated with this flaky test",
            "I love how clean this API turned out",
            "That outage was absolutely terrifying",
        ],
        Sector::Reflective => &[
            "I realize I should write tests before refactoring",
            "The lesson from this incident is to automate rollbacks",
            "Looking back, the root cause was our own assumptions",
        ],
    }
}

/// Cross-sector affinity for query scoring. A memory whose sector differs
/// from the query's is penalized by this multiplier; related sectors
/// (e.g. episodic ↔ reflective) are penalized less than distant ones.
pub fn sector_affinity(query: Sector, memory: Sector) -> f64 {
    use Sector::*;
    if query == memory {
        return 1.0;
    }
    match (query, memory) {
        (Semantic, Procedural) | (Procedural, Semantic) => 0.8,
        (Semantic, Reflective) | (Reflective, Semantic) => 0.7,
        (Semantic, Episodic) | (Episodic, Semantic) => 0.6,
        (Semantic, Emotional) => 0.4,
        (Procedural, Episodic) | (Episodic, Procedural) => 0.6,
        (Procedural, Reflective) | (Reflective, Procedural) => 0.6,
        (Procedural, Emotional) => 0.3,
        (Episodic, Reflective) | (Reflective, Episodic) => 0.8,
        (Episodic, Emotional) | (Emotional, Episodic) => 0.7,
        (Reflective, Emotional) | (Emotional, Reflective) => 0.6,
        (Emotional, Semantic) => 0.4,
        (Emotional, Procedural) => 0.3,
        _ => 0.3,
    }
}

struct SectorRules {
    sector: Sector,
    weight: f64,
    patterns: Vec<Regex>,
    exemplars: Vec<Vec<f32>>,
}

/// Assigns exactly one [`Sector`] to a piece of content.
pub struct SectorClassifier {
    rules: Vec<SectorRules>,
}

impl SectorClassifier {
    /// Compile the pattern tables and embed the exemplar sets.
    pub fn new(embedder: &dyn EmbeddingProvider) -> Result<Self> {
        let mut rules = Vec::with_capacity(PRIORITY.len());
        for sector in PRIORITY {
            let (weight, patterns) = pattern_table(sector);
            let patterns = patterns
                .iter()
                .map(|p| Regex::new(p).expect("sector pattern must compile"))
                .collect();
            let exemplars = embedder.embed_batch(exemplar_table(sector))?;
            rules.push(SectorRules {
                sector,
                weight,
                patterns,
                exemplars,
            });
        }
        Ok(Self { rules })
    }

    /// Classify content, optionally reusing an already-computed embedding of
    /// it. With `None`, only the pattern rules contribute.
    pub fn classify(&self, content: &str, embedding: Option<&[f32]>) -> Sector {
        let lowered = content.to_lowercase();

        let mut best = Sector::Semantic;
        let mut best_score = 0.0f64;

        // PRIORITY order plus strict inequality makes ties resolve to the
        // earlier (higher-priority) sector.
        for rules in &self.rules {
            let mut score = 0.0;
            for pattern in &rules.patterns {
                score += pattern.find_iter(&lowered).count() as f64 * rules.weight;
            }
            if let Some(embedding) = embedding {
                let sim = rules
                    .exemplars
                    .iter()
                    .map(|e| cosine(e, embedding))
                    .fold(0.0f64, f64::max);
                score += EXEMPLAR_SCALE * sim;
            }
            if score > best_score {
                best = rules.sector;
                best_score = score;
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::hashed::HashedEmbedder;

    fn classifier() -> SectorClassifier {
        SectorClassifier::new(&HashedEmbedder::default()).unwrap()
    }

    #[test]
    fn past_narrative_is_episodic() {
        let c = classifier();
        let sector = c.classify("Yesterday I went to the conference and met the platform team", None);
        assert_eq!(sector, Sector::Episodic);
    }

    #[test]
    fn declarative_facts_are_semantic() {
        let c = classifier();
        let sector = c.classify("A semaphore is a synchronization primitive, which is a known fact", None);
        assert_eq!(sector, Sector::Semantic);
    }

    #[test]
    fn how_to_phrasing_is_procedural() {
        let c = classifier();
        let sector = c.classify("How to deploy: first build the image, then run the release step", None);
        assert_eq!(sector, Sector::Procedural);
    }

    #[test]
    fn affect_laden_content_is_emotional() {
        let c = classifier();
        let sector = c.classify("I feel so frustrated and angry about this!!", None);
        assert_eq!(sector, Sector::Emotional);
    }

    #[test]
    fn self_evaluation_is_reflective() {
        let c = classifier();
        let sector = c.classify("In retrospect I realize the takeaway is to reflect on feedback", None);
        assert_eq!(sector, Sector::Reflective);
    }

    #[test]
    fn unmatched_content_defaults_to_semantic() {
        let c = classifier();
        assert_eq!(c.classify("zzz qqq", None), Sector::Semantic);
        assert_eq!(c.classify("", None), Sector::Semantic);
    }

    #[test]
    fn embedding_similarity_breaks_pattern_silence() {
        let c = classifier();
        let embedder = HashedEmbedder::default();
        // No pattern keywords, but token overlap with an episodic exemplar
        let text = "we review the launch plan";
        let emb = embedder.embed(text).unwrap();
        assert_eq!(c.classify(text, Some(&emb)), Sector::Episodic);
    }

    #[test]
    fn affinity_matrix_is_symmetric_where_documented() {
        assert_eq!(
            sector_affinity(Sector::Semantic, Sector::Procedural),
            sector_affinity(Sector::Procedural, Sector::Semantic)
        );
        assert_eq!(sector_affinity(Sector::Episodic, Sector::Episodic), 1.0);
        assert!(sector_affinity(Sector::Emotional, Sector::Procedural) < 0.5);
    }
}
