#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end pipeline tests against a mocked Ollama embedding server.
// The generation side runs the deterministic dev backend, so no model
// credentials are needed.

use askdoc::chunker::ChunkingConfig;
use askdoc::config::{
    Config, DocumentConfig, EmbeddingConfig, GenerationConfig, RetrievalConfig,
};
use askdoc::embeddings::{Embedder, OllamaClient};
use askdoc::pipeline::{QueryPipeline, StreamEvent};
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const DIM: usize = 32;

fn embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIM];
    for (i, byte) in text.bytes().enumerate() {
        vector[(byte as usize + i) % DIM] += 1.0;
    }
    vector
}

/// Answers both request shapes of the Ollama embed API with deterministic
/// vectors, so retrieval behaves like a real (if simple-minded) model.
struct EmbedResponder;

impl Respond for EmbedResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value =
            serde_json::from_slice(&request.body).expect("request body should be JSON");

        if let Some(prompt) = body.get("prompt").and_then(|v| v.as_str()) {
            return ResponseTemplate::new(200).set_body_json(json!({ "embedding": embed(prompt) }));
        }

        let embeddings: Vec<Vec<f32>> = body
            .get("input")
            .and_then(|v| v.as_array())
            .map(|inputs| {
                inputs
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(embed)
                    .collect()
            })
            .unwrap_or_default();
        ResponseTemplate::new(200).set_body_json(json!({ "embeddings": embeddings }))
    }
}

fn start_embed_server() -> (tokio::runtime::Runtime, MockServer) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime should start");
    let server = runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(EmbedResponder)
            .mount(&server)
            .await;
        server
    });
    (runtime, server)
}

fn test_config(server: &MockServer, document_dir: &TempDir) -> Config {
    Config {
        document: DocumentConfig {
            path: document_dir.path().join("training.txt"),
        },
        chunking: ChunkingConfig {
            chunk_size: 120,
            chunk_overlap: 20,
        },
        embedding: EmbeddingConfig {
            protocol: "http".to_string(),
            host: "127.0.0.1".to_string(),
            port: server.address().port(),
            model: "nomic-embed-text:latest".to_string(),
            batch_size: 4,
        },
        retrieval: RetrievalConfig { top_k: 3 },
        generation: GenerationConfig {
            dev: true,
            ..GenerationConfig::default()
        },
        ..Config::default()
    }
}

fn write_training_document(dir: &TempDir) {
    let text = "Every employee completes the onboarding checklist during the first \
                week. The checklist covers badge setup, security training, and an \
                introduction to the incident reporting process. Managers review \
                completed checklists at the end of the month and file them with HR.";
    fs::write(dir.path().join("training.txt"), text).expect("should write training document");
}

#[test]
fn pipeline_answers_a_question_end_to_end() {
    let (_runtime, server) = start_embed_server();
    let document_dir = TempDir::new().expect("should create TempDir");
    write_training_document(&document_dir);

    let config = test_config(&server, &document_dir);
    let pipeline = QueryPipeline::build(&config).expect("pipeline should build");

    assert!(pipeline.retriever().chunk_count() > 1);
    assert_eq!(pipeline.retriever().dimension(), DIM);
    assert!(pipeline.generation().is_dev());

    let answer = pipeline
        .answer_once("What does the onboarding checklist cover?")
        .expect("should answer");
    assert!(answer.starts_with("[DEV] Mock answer for prompt: "));
}

#[test]
fn pipeline_streams_with_markers_end_to_end() {
    let (_runtime, server) = start_embed_server();
    let document_dir = TempDir::new().expect("should create TempDir");
    write_training_document(&document_dir);

    let config = test_config(&server, &document_dir);
    let pipeline = QueryPipeline::build(&config).expect("pipeline should build");

    let question = "Who reviews completed checklists?";
    let events: Vec<StreamEvent> = pipeline
        .answer_streaming(question)
        .expect("should stream")
        .collect();

    assert_eq!(events.first(), Some(&StreamEvent::Started));
    assert_eq!(events.last(), Some(&StreamEvent::Done));

    let streamed: String = events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::Fragment(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    let blocking = pipeline.answer_once(question).expect("should answer");
    assert_eq!(streamed, blocking);
}

#[test]
fn pipeline_build_fails_on_missing_document() {
    let (_runtime, server) = start_embed_server();
    let document_dir = TempDir::new().expect("should create TempDir");
    // No training.txt written

    let config = test_config(&server, &document_dir);
    assert!(QueryPipeline::build(&config).is_err());
}

#[test]
fn pipeline_build_fails_on_empty_document() {
    let (_runtime, server) = start_embed_server();
    let document_dir = TempDir::new().expect("should create TempDir");
    fs::write(document_dir.path().join("training.txt"), "   \n  \t ")
        .expect("should write empty document");

    let config = test_config(&server, &document_dir);
    assert!(QueryPipeline::build(&config).is_err());
}

#[test]
fn ollama_client_preserves_batch_order() {
    let (_runtime, server) = start_embed_server();
    let document_dir = TempDir::new().expect("should create TempDir");
    let config = test_config(&server, &document_dir);

    let client = OllamaClient::new(&config.embedding).expect("client should build");
    let texts: Vec<String> = (0..10).map(|i| format!("text number {i}")).collect();

    let vectors = client.embed_batch(&texts).expect("embedding should succeed");

    assert_eq!(vectors.len(), texts.len());
    for (text, vector) in texts.iter().zip(&vectors) {
        assert_eq!(vector, &embed(text));
    }
}
