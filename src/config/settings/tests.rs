use super::*;
use serial_test::serial;
use tempfile::TempDir;

fn clear_env() {
    for name in [
        ENV_TRAINING_PATH,
        ENV_GEMINI_API_KEY,
        ENV_GOOGLE_API_KEY,
        ENV_GEMINI_MODEL,
        ENV_USE_DEV_LLM,
    ] {
        // SAFETY: env-mutating tests are marked #[serial], so no other
        // thread reads or writes the environment concurrently.
        unsafe { env::remove_var(name) };
    }
}

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.document.path, PathBuf::from("./data/training.txt"));
    assert_eq!(config.chunking.chunk_size, 1000);
    assert_eq!(config.chunking.chunk_overlap, 150);
    assert_eq!(config.embedding.protocol, "http");
    assert_eq!(config.embedding.host, "localhost");
    assert_eq!(config.embedding.port, 11434);
    assert_eq!(config.embedding.model, "nomic-embed-text:latest");
    assert_eq!(config.embedding.batch_size, 16);
    assert_eq!(config.retrieval.top_k, 6);
    assert_eq!(config.generation.model, "gemini-2.0-flash-lite");
    assert_eq!(config.generation.max_retries, 3);
    assert_eq!(config.generation.max_output_tokens, 512);
    assert!(!config.generation.dev);
    assert!(config.generation.api_key.is_none());
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.embedding.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.batch_size = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.retrieval.top_k = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.generation.model = "   ".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.generation.max_output_tokens = 0;
    assert!(invalid_config.validate().is_err());
}

#[test]
fn chunking_validation() {
    let mut config = Config::default();
    config.chunking.chunk_overlap = config.chunking.chunk_size;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::OverlapTooLarge(_, _))
    ));

    let mut config = Config::default();
    config.chunking.chunk_overlap = config.chunking.chunk_size + 1;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.chunking.chunk_size = 0;
    config.chunking.chunk_overlap = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidChunkSize(0))
    ));
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .embedding
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn api_key_is_never_serialized() {
    let config = Config {
        generation: GenerationConfig {
            api_key: Some("secret".to_string()),
            ..GenerationConfig::default()
        },
        ..Config::default()
    };

    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    assert!(!toml_str.contains("secret"));
    assert!(!toml_str.contains("api_key"));
}

#[test]
fn partial_toml_uses_defaults() {
    let partial = r#"
        [embedding]
        host = "custom-host"
    "#;

    let config: Config = toml::from_str(partial).expect("partial config should parse");
    assert_eq!(config.embedding.host, "custom-host");
    assert_eq!(config.embedding.port, 11434);
    assert_eq!(config.retrieval.top_k, 6);
}

#[test]
#[serial]
fn load_from_missing_file_yields_defaults() {
    clear_env();
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    let config = Config::load_from(temp_dir.path()).expect("load should succeed");
    assert_eq!(config.embedding, EmbeddingConfig::default());
    assert_eq!(config.base_dir, temp_dir.path());
}

#[test]
#[serial]
fn config_round_trips_through_save_and_load() {
    clear_env();
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    let mut config = Config::load_from(temp_dir.path()).expect("load should succeed");
    config.embedding.host = "round-trip-host".to_string();
    config.retrieval.top_k = 4;
    config.save().expect("save should succeed");

    let loaded = Config::load_from(temp_dir.path()).expect("reload should succeed");
    assert_eq!(loaded.embedding.host, "round-trip-host");
    assert_eq!(loaded.retrieval.top_k, 4);
}

#[test]
#[serial]
fn invalid_config_file_fails_to_load() {
    clear_env();
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    fs::write(temp_dir.path().join("config.toml"), "[embedding\nhost = 3")
        .expect("should write config file");

    assert!(Config::load_from(temp_dir.path()).is_err());
}

#[test]
#[serial]
fn env_overrides_apply_at_load_time() {
    clear_env();
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    // SAFETY: test is #[serial]; no concurrent env access.
    unsafe {
        env::set_var(ENV_TRAINING_PATH, "/tmp/override.txt");
        env::set_var(ENV_GEMINI_MODEL, "gemini-override");
        env::set_var(ENV_USE_DEV_LLM, "true");
    }

    let config = Config::load_from(temp_dir.path()).expect("load should succeed");
    assert_eq!(config.document.path, PathBuf::from("/tmp/override.txt"));
    assert_eq!(config.generation.model, "gemini-override");
    assert!(config.generation.dev);

    clear_env();
}

#[test]
#[serial]
fn api_key_comes_from_the_environment() {
    clear_env();
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    // SAFETY: test is #[serial]; no concurrent env access.
    unsafe { env::set_var(ENV_GEMINI_API_KEY, "key-from-env") };
    let config = Config::load_from(temp_dir.path()).expect("load should succeed");
    assert_eq!(config.generation.api_key.as_deref(), Some("key-from-env"));

    // GOOGLE_API_KEY is the fallback credential variable
    // SAFETY: test is #[serial]; no concurrent env access.
    unsafe {
        env::remove_var(ENV_GEMINI_API_KEY);
        env::set_var(ENV_GOOGLE_API_KEY, "fallback-key");
    }
    let config = Config::load_from(temp_dir.path()).expect("load should succeed");
    assert_eq!(config.generation.api_key.as_deref(), Some("fallback-key"));

    clear_env();
}

#[test]
#[serial]
fn dev_flag_accepts_common_truthy_values() {
    clear_env();
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    for value in ["1", "true", "yes", "TRUE", "Yes"] {
        // SAFETY: test is #[serial]; no concurrent env access.
        unsafe { env::set_var(ENV_USE_DEV_LLM, value) };
        let config = Config::load_from(temp_dir.path()).expect("load should succeed");
        assert!(config.generation.dev, "{value} should enable dev mode");
    }

    // SAFETY: test is #[serial]; no concurrent env access.
    unsafe { env::set_var(ENV_USE_DEV_LLM, "0") };
    let config = Config::load_from(temp_dir.path()).expect("load should succeed");
    assert!(!config.generation.dev);

    clear_env();
}
