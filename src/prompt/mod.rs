
/// Sentence the model must emit verbatim when the context lacks the answer.
/// Callers and tests pattern-match on this exact string; do not reword it.
pub const FALLBACK_SENTENCE: &str = "The document does not contain this information.";

/// Answer returned without invoking the model when retrieval comes back
/// empty, in both the blocking and streaming paths.
pub const NO_CONTEXT_ANSWER: &str = "No context available from the document.";

/// Render retrieved chunks and the question into a single generation prompt.
///
/// Deterministic and free of I/O. Chunk texts are concatenated in
/// retrieval-rank order with no separator; a word run-on across a chunk
/// boundary is cosmetic and does not invalidate the prompt.
#[inline]
pub fn build_prompt(chunks: &[String], question: &str) -> String {
    let context = chunks.concat();
    format!(
        "You are a helpful assistant trained on the provided training document context below.\n\
         Answer the question using ONLY the information in the DOCUMENT_CONTEXT. If the information is not present, respond exactly:\n\
         \"{FALLBACK_SENTENCE}\"\n\
         \n\
         DOCUMENT_CONTEXT:\n\
         {context}\n\
         \n\
         QUESTION:\n\
         {question}\n\
         \n\
         Provide a concise, accurate answer. If steps are requested, use bullets or numbered steps."
    )
}
