
use std::fs;
use tracing::{debug, info};

use crate::config::Config;
use crate::embeddings::OllamaClient;
use crate::generation::{AnswerStream, GenerationClient};
use crate::prompt::{NO_CONTEXT_ANSWER, build_prompt};
use crate::retriever::Retriever;
use crate::{AskdocError, Result};

/// Marker events wrapped around the streamed answer fragments, letting a
/// consumer distinguish "model is thinking" from "model finished".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Emitted exactly once, before the first fragment.
    Started,
    /// One answer fragment, in generation order.
    Fragment(String),
    /// Emitted exactly once, after the last fragment.
    Done,
}

/// Composition root for the query pipeline: one shared embedder, one
/// retrieval index, one generation client, all constructed before any query
/// traffic is accepted.
pub struct QueryPipeline {
    retriever: Retriever,
    generation: GenerationClient,
    top_k: usize,
}

impl QueryPipeline {
    /// Read the training document, build the retrieval index, and construct
    /// the generation client, failing fast on any misconfiguration.
    #[inline]
    pub fn build(config: &Config) -> Result<Self> {
        let document_path = &config.document.path;
        info!("Loading training document from {}", document_path.display());
        let text = fs::read_to_string(document_path).map_err(|e| {
            AskdocError::Document(format!(
                "failed to read training document {}: {}",
                document_path.display(),
                e
            ))
        })?;

        let embedder = OllamaClient::new(&config.embedding)
            .map_err(|e| AskdocError::Embedding(format!("{e:#}")))?;
        let retriever = Retriever::build(&text, &config.chunking, Box::new(embedder))?;
        let generation = GenerationClient::new(&config.generation)?;

        Ok(Self {
            retriever,
            generation,
            top_k: config.retrieval.top_k,
        })
    }

    /// Assemble a pipeline from prebuilt parts. Used by tests and callers
    /// that construct their own embedder or backend.
    #[inline]
    pub fn from_parts(retriever: Retriever, generation: GenerationClient, top_k: usize) -> Self {
        Self {
            retriever,
            generation,
            top_k,
        }
    }

    /// Answer a question in one blocking call.
    #[inline]
    pub fn answer_once(&self, question: &str) -> Result<String> {
        let context = self.retriever.query(question, self.top_k)?;
        if context.is_empty() {
            debug!("Retrieval returned no context; answering with the sentinel");
            return Ok(NO_CONTEXT_ANSWER.to_string());
        }

        let prompt = build_prompt(&context, question);
        debug!("Prompt for generation:\n{}", prompt);
        self.generation.generate(&prompt)
    }

    /// Streamed variant of [`QueryPipeline::answer_once`].
    ///
    /// Yields [`StreamEvent::Started`] exactly once, then answer fragments,
    /// then [`StreamEvent::Done`] exactly once. Empty retrieval
    /// short-circuits to the same sentinel answer as the blocking path,
    /// delivered as a single fragment between the markers.
    #[inline]
    pub fn answer_streaming(&self, question: &str) -> Result<AnswerEvents<'_>> {
        let context = self.retriever.query(question, self.top_k)?;

        let body = if context.is_empty() {
            debug!("Retrieval returned no context; streaming the sentinel");
            AnswerBody::Sentinel(Some(NO_CONTEXT_ANSWER.to_string()))
        } else {
            let prompt = build_prompt(&context, question);
            debug!("Prompt for streamed generation:\n{}", prompt);
            AnswerBody::Stream(self.generation.stream_generate(&prompt))
        };

        Ok(AnswerEvents {
            started: false,
            done: false,
            body,
        })
    }

    #[inline]
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    #[inline]
    pub fn generation(&self) -> &GenerationClient {
        &self.generation
    }
}

/// Event sequence for one streamed answer. Dropping the iterator cancels
/// the underlying stream; no explicit release is needed.
pub struct AnswerEvents<'a> {
    started: bool,
    done: bool,
    body: AnswerBody<'a>,
}

enum AnswerBody<'a> {
    Sentinel(Option<String>),
    Stream(AnswerStream<'a>),
}

impl Iterator for AnswerEvents<'_> {
    type Item = StreamEvent;

    #[inline]
    fn next(&mut self) -> Option<StreamEvent> {
        if !self.started {
            self.started = true;
            return Some(StreamEvent::Started);
        }
        if self.done {
            return None;
        }

        let fragment = match &mut self.body {
            AnswerBody::Sentinel(answer) => answer.take(),
            AnswerBody::Stream(stream) => stream.next(),
        };

        fragment.map_or_else(
            || {
                self.done = true;
                Some(StreamEvent::Done)
            },
            |text| Some(StreamEvent::Fragment(text)),
        )
    }
}
