use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use super::{Translator, create_translator};
use crate::config::TranslatorConfig;
use crate::error::{Error, Result};

/// Owned, lazily-initialized translation backend.
///
/// The backend is built on first use and then shared by every document the
/// handle is used for. Concurrent first uses wait for the same initialization.
pub struct TranslatorHandle {
    config: Option<TranslatorConfig>,
    cell: OnceCell<Arc<dyn Translator>>,
}

impl TranslatorHandle {
    /// Build the backend from `config` on first use.
    pub fn lazy(config: TranslatorConfig) -> Self {
        Self {
            config: Some(config),
            cell: OnceCell::new(),
        }
    }

    /// Wrap an already constructed backend.
    pub fn ready(translator: Arc<dyn Translator>) -> Self {
        Self {
            config: None,
            cell: OnceCell::from(translator),
        }
    }

    /// Get the backend, initializing it if needed.
    ///
    /// Initialization failure is returned to the caller; a later call retries.
    pub async fn get(&self) -> Result<Arc<dyn Translator>> {
        self.cell
            .get_or_try_init(|| async {
                let config = self.config.as_ref().ok_or_else(|| {
                    Error::TranslatorInit("no translator configured".to_string())
                })?;
                let translator = create_translator(config)?;
                info!("Initialized {} translator ({})", translator.name(), config.model);
                Ok::<_, Error>(translator)
            })
            .await
            .cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lazy_handle_initializes_once() {
        let handle = TranslatorHandle::lazy(TranslatorConfig::default());
        assert!(!handle.is_initialized());

        let first = handle.get().await.unwrap();
        let second = handle.get().await.unwrap();
        assert!(handle.is_initialized());
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_ready_handle_returns_backend() {
        let backend = create_translator(&TranslatorConfig::default()).unwrap();
        let handle = TranslatorHandle::ready(Arc::clone(&backend));
        assert!(handle.is_initialized());
        assert!(Arc::ptr_eq(&handle.get().await.unwrap(), &backend));
    }
}
