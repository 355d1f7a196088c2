//! Shared application state.

use std::sync::Arc;

use bienlai_classify::{ClassifierChain, LabelClassifier, RekognitionLabelClassifier, VisionReceiptClassifier};
use bienlai_core::GatewayConfig;
use bienlai_storage::{create_storage, Storage};

/// State shared by all handlers.
///
/// `classifier` is optional by design: a deployment without classifier
/// bindings has explicitly opted out of content checking, and uploads
/// skip that stage instead of failing.
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub classifier: Option<Arc<ClassifierChain>>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub async fn from_config(config: &GatewayConfig) -> Result<Self, anyhow::Error> {
        let storage = create_storage(config).await?;
        let classifier = build_classifier(config).await?;

        Ok(AppState {
            storage,
            classifier,
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}

async fn build_classifier(
    config: &GatewayConfig,
) -> Result<Option<Arc<ClassifierChain>>, anyhow::Error> {
    let Some(api_key) = &config.anthropic_api_key else {
        if config.rekognition_region.is_some() {
            tracing::warn!(
                "REKOGNITION_REGION is set but ANTHROPIC_API_KEY is not; \
                 the fallback cannot run without a primary classifier"
            );
        }
        tracing::warn!("No classifier configured, uploads will not be content-checked");
        return Ok(None);
    };

    let primary = Arc::new(VisionReceiptClassifier::new(
        api_key.clone(),
        config.anthropic_vision_model.clone(),
    )?);

    let fallback: Option<Arc<dyn LabelClassifier>> = match &config.rekognition_region {
        Some(region) => Some(Arc::new(RekognitionLabelClassifier::new(region).await)),
        None => None,
    };

    tracing::info!(
        model = %config.anthropic_vision_model,
        has_fallback = fallback.is_some(),
        "Classifier chain initialized"
    );

    Ok(Some(Arc::new(ClassifierChain::new(primary, fallback))))
}
