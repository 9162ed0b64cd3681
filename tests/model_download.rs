//! Model Download Tests
//!
//! Run `init` against a mock ModelScope registry.

use serde_json::json;
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cosyvoice_server::{
    ServerConfig,
    core::model::{ModelConfig, assets},
    init,
};

const MODEL_ID: &str = "test/TinyVoice";
const LIST_PATH: &str = "/api/v1/models/test/TinyVoice/repo/files";
const FILE_PATH: &str = "/api/v1/models/test/TinyVoice/repo";

const CONFIG_BODY: &[u8] = b"sample_rate: 24000\n";
const WEIGHTS_BODY: &[u8] = b"\x00\x01\x02\x03not really weights";

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn model_config(server: &MockServer, dir: &TempDir) -> ModelConfig {
    ModelConfig {
        model_dir: dir.path().join("CosyVoice2-0.5B"),
        model_id: MODEL_ID.to_string(),
        revision: "master".to_string(),
        registry_url: server.uri(),
        ..ModelConfig::default()
    }
}

fn listing(files: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "Code": 200,
        "Message": "success",
        "Data": { "Files": files },
    }))
}

async fn mount_listing(server: &MockServer, files: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(query_param("Revision", "master"))
        .and(query_param("Recursive", "true"))
        .respond_with(listing(files))
        .mount(server)
        .await;
}

async fn mount_file(server: &MockServer, file_path: &str, body: &[u8], expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(FILE_PATH))
        .and(query_param("FilePath", file_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn standard_files() -> serde_json::Value {
    json!([
        { "Path": "cosyvoice2.yaml", "Type": "blob", "Size": CONFIG_BODY.len(), "Sha256": sha256_hex(CONFIG_BODY) },
        { "Path": "CosyVoice-BlankEN", "Type": "tree", "Size": 0 },
        { "Path": "CosyVoice-BlankEN/model.safetensors", "Type": "blob", "Size": WEIGHTS_BODY.len(), "Sha256": sha256_hex(WEIGHTS_BODY) },
    ])
}

#[tokio::test]
async fn test_download_fetches_every_blob() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_listing(&server, standard_files()).await;
    mount_file(&server, "cosyvoice2.yaml", CONFIG_BODY, 1).await;
    mount_file(&server, "CosyVoice-BlankEN/model.safetensors", WEIGHTS_BODY, 1).await;

    let config = model_config(&server, &dir);
    let summary = assets::download_assets(&config).await.unwrap();

    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.bytes, (CONFIG_BODY.len() + WEIGHTS_BODY.len()) as u64);

    assert_eq!(
        std::fs::read(config.model_dir.join("cosyvoice2.yaml")).unwrap(),
        CONFIG_BODY
    );
    assert_eq!(
        std::fs::read(config.model_dir.join("CosyVoice-BlankEN/model.safetensors")).unwrap(),
        WEIGHTS_BODY
    );
    assert!(!config.model_dir.join("cosyvoice2.yaml.part").exists());

    assert_eq!(assets::ensure_model_present(&config).unwrap(), config.model_dir);
}

#[tokio::test]
async fn test_rerun_skips_files_already_present() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_listing(&server, standard_files()).await;
    // Each file is fetched by the first run only
    mount_file(&server, "cosyvoice2.yaml", CONFIG_BODY, 1).await;
    mount_file(&server, "CosyVoice-BlankEN/model.safetensors", WEIGHTS_BODY, 1).await;

    let config = model_config(&server, &dir);
    assets::download_assets(&config).await.unwrap();
    let second = assets::download_assets(&config).await.unwrap();

    assert_eq!(second.downloaded, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.bytes, 0);
}

#[tokio::test]
async fn test_rerun_refetches_corrupted_file_of_same_size() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_listing(&server, standard_files()).await;
    mount_file(&server, "cosyvoice2.yaml", CONFIG_BODY, 1).await;
    mount_file(&server, "CosyVoice-BlankEN/model.safetensors", WEIGHTS_BODY, 0).await;

    let config = model_config(&server, &dir);
    std::fs::create_dir_all(config.model_dir.join("CosyVoice-BlankEN")).unwrap();
    std::fs::write(config.model_dir.join("CosyVoice-BlankEN/model.safetensors"), WEIGHTS_BODY).unwrap();
    // Same length, different bytes
    let corrupted = vec![b'x'; CONFIG_BODY.len()];
    std::fs::write(config.model_dir.join("cosyvoice2.yaml"), &corrupted).unwrap();

    let summary = assets::download_assets(&config).await.unwrap();

    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        std::fs::read(config.model_dir.join("cosyvoice2.yaml")).unwrap(),
        CONFIG_BODY
    );
}

#[tokio::test]
async fn test_checksum_mismatch_leaves_nothing_behind() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_listing(
        &server,
        json!([
            { "Path": "llm.pt", "Type": "blob", "Size": WEIGHTS_BODY.len(), "Sha256": sha256_hex(b"something else") },
        ]),
    )
    .await;
    mount_file(&server, "llm.pt", WEIGHTS_BODY, 1).await;

    let config = model_config(&server, &dir);
    let err = assets::download_assets(&config).await.unwrap_err();

    assert!(err.to_string().contains("Checksum mismatch"));
    assert!(!config.model_dir.join("llm.pt").exists());
    assert!(!config.model_dir.join("llm.pt.part").exists());
}

#[tokio::test]
async fn test_registry_error_code_is_reported() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Code": 10010205001_i64,
            "Message": "model not found",
        })))
        .mount(&server)
        .await;

    let err = assets::download_assets(&model_config(&server, &dir))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("model not found"));
}

#[tokio::test]
async fn test_http_failure_on_listing_is_reported() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = assets::download_assets(&model_config(&server, &dir))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_escaping_paths_are_refused() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_listing(
        &server,
        json!([{ "Path": "../outside.txt", "Type": "blob", "Size": 3 }]),
    )
    .await;
    mount_file(&server, "../outside.txt", b"bad", 0).await;

    let err = assets::download_assets(&model_config(&server, &dir))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("unsafe path"));
    assert!(!dir.path().join("outside.txt").exists());
}

#[tokio::test]
async fn test_init_command_uses_server_config() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_listing(&server, standard_files()).await;
    mount_file(&server, "cosyvoice2.yaml", CONFIG_BODY, 1).await;
    mount_file(&server, "CosyVoice-BlankEN/model.safetensors", WEIGHTS_BODY, 1).await;

    let config = ServerConfig {
        model_dir: dir.path().join("models"),
        model_id: MODEL_ID.to_string(),
        registry_url: server.uri(),
        ..ServerConfig::default()
    };

    let summary = init::run(&config).await.unwrap();

    assert_eq!(summary.downloaded, 2);
    assert!(dir.path().join("models/cosyvoice2.yaml").is_file());
}

#[test]
fn test_missing_model_dir_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = ModelConfig {
        model_dir: dir.path().join("absent"),
        ..ModelConfig::default()
    };

    let err = assets::ensure_model_present(&config).unwrap_err();
    assert!(err.to_string().contains("cosyvoice-server init"));
}
