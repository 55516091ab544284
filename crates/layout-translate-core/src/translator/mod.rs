mod batch;
mod handle;
mod openai;
mod traits;

pub use batch::{BatchTranslator, Translation};
pub use handle::TranslatorHandle;
pub use openai::OpenAiTranslator;
pub use traits::{Translator, TranslatorInfo};

use crate::config::TranslatorConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create a translator from configuration
pub fn create_translator(config: &TranslatorConfig) -> Result<Arc<dyn Translator>> {
    Ok(Arc::new(OpenAiTranslator::new(config)?))
}
