pub mod cli;
pub mod page;

use config::ReportConfig;
use inference_providers::{ExternalProvider, ExternalProviderConfig, ProviderConfig};
use page::ReportPage;
use services::{ReportGenerator, ReportGeneratorConfig};
use std::sync::Arc;

/// Wire a Gemini-backed generator to the given page
pub fn build_generator(
    config: &ReportConfig,
    page: &Arc<ReportPage>,
) -> anyhow::Result<ReportGenerator> {
    let provider = ExternalProvider::new(ExternalProviderConfig {
        provider_config: ProviderConfig::Gemini {
            base_url: config.gemini.base_url.clone(),
        },
        timeout_seconds: config.gemini.timeout_seconds,
    })?;

    tracing::debug!(
        backend = provider.backend_type(),
        base_url = %config.gemini.base_url,
        model = %config.gemini.model,
        "Created inference provider"
    );

    Ok(ReportGenerator::new(
        Arc::new(provider),
        page.surfaces(),
        ReportGeneratorConfig::from_config(config)?,
    ))
}
