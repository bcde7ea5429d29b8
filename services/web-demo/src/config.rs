use std::net::SocketAddr;
use std::path::PathBuf;

use bear_classifier::ClassifierConfig;

/// Runtime configuration. Everything has a working default; env vars are
/// optional overrides (BEAR__WEB__BIND, BEAR__MODEL__PATH, BEAR__MODEL__LABELS,
/// BEAR__MODEL__SHA256, BEAR__WEB__EXAMPLE).
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub bind: SocketAddr,
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    pub model_sha256: Option<String>,
    pub example_image: Option<PathBuf>,
}

impl DemoConfig {
    pub fn from_env() -> Self {
        Self::build(
            std::env::var("BEAR__WEB__BIND").ok(),
            std::env::var("BEAR__MODEL__PATH").ok(),
            std::env::var("BEAR__MODEL__LABELS").ok(),
            std::env::var("BEAR__MODEL__SHA256").ok(),
            std::env::var("BEAR__WEB__EXAMPLE").ok(),
        )
    }

    fn build(
        bind: Option<String>,
        model: Option<String>,
        labels: Option<String>,
        sha256: Option<String>,
        example: Option<String>,
    ) -> Self {
        let bind = bind
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 7860)));
        let example = PathBuf::from(example.unwrap_or_else(|| "assets/grizzly.jpg".into()));
        Self {
            bind,
            model_path: PathBuf::from(model.unwrap_or_else(|| "models/model.onnx".into())),
            labels_path: PathBuf::from(labels.unwrap_or_else(|| "models/labels.json".into())),
            model_sha256: sha256.filter(|s| !s.is_empty()),
            example_image: example.is_file().then_some(example),
        }
    }

    pub fn classifier(&self) -> ClassifierConfig {
        ClassifierConfig {
            model_path: self.model_path.clone(),
            labels_path: self.labels_path.clone(),
            model_sha256: self.model_sha256.clone(),
            ..Default::default()
        }
    }
}
