use serde::{Deserialize, Serialize};

/// Result of a similarity search, normalized for prompt construction
///
/// `contexts` keeps one entry per matching chunk, in descending similarity
/// order. `sources` lists each distinct source once, in order of first
/// appearance among the ranked chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedContexts {
    pub contexts: Vec<String>,
    pub sources: Vec<String>,
}

impl RetrievedContexts {
    /// Collects ranked `(text, source)` chunks
    ///
    /// Chunks without text are skipped. Duplicate texts are kept, duplicate
    /// sources are not.
    pub fn from_ranked_chunks(chunks: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut contexts = Vec::new();
        let mut sources: Vec<String> = Vec::new();

        for (text, source) in chunks {
            if text.is_empty() {
                continue;
            }

            contexts.push(text);

            if !source.is_empty() && !sources.contains(&source) {
                sources.push(source);
            }
        }

        Self { contexts, sources }
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
