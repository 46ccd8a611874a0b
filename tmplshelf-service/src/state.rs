use std::sync::Arc;
use tmplshelf_core::{Config, Generation, TemplateError, TemplateIndex};
use tokio::sync::{Mutex, RwLock};

pub type SharedState = Arc<AppState>;

/// Process-wide state: configuration plus the currently published index.
///
/// The published index is an `Arc` swapped as a whole on rebuild; readers
/// clone it once per request and never see a half-built index. Builds are
/// serialized by `build_lock`, which also holds the last generation issued.
pub struct AppState {
    config: Config,
    published: RwLock<Option<Arc<TemplateIndex>>>,
    build_lock: Mutex<Generation>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            published: RwLock::new(None),
            build_lock: Mutex::new(Generation::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current snapshot, if one has been published.
    pub async fn snapshot(&self) -> Option<Arc<TemplateIndex>> {
        self.published.read().await.clone()
    }

    /// Current snapshot, building the first one if needed.
    ///
    /// Concurrent first requests coalesce: only one of them walks the tree.
    pub async fn ensure_index(&self) -> Result<Arc<TemplateIndex>, TemplateError> {
        if let Some(index) = self.snapshot().await {
            return Ok(index);
        }

        let mut generation = self.build_lock.lock().await;
        if let Some(index) = self.snapshot().await {
            return Ok(index);
        }
        self.build_and_publish(&mut generation).await
    }

    /// Force a full rebuild. On failure the previous index stays published.
    pub async fn rebuild(&self) -> Result<Arc<TemplateIndex>, TemplateError> {
        let mut generation = self.build_lock.lock().await;
        self.build_and_publish(&mut generation).await
    }

    async fn build_and_publish(
        &self,
        generation: &mut Generation,
    ) -> Result<Arc<TemplateIndex>, TemplateError> {
        let next = generation.next();
        let index_config = self.config.index.clone();
        let root = index_config.root.clone();

        let built = tokio::task::spawn_blocking(move || TemplateIndex::build(&index_config, next))
            .await
            .map_err(|err| TemplateError::IndexBuild {
                root,
                message: format!("index task failed: {err}"),
            })
            .and_then(|result| result);

        match built {
            Ok(index) => {
                let index = Arc::new(index);
                *generation = next;
                *self.published.write().await = Some(Arc::clone(&index));
                Ok(index)
            }
            Err(err) => {
                tracing::warn!(error = %err, "index build failed; keeping previous index");
                Err(err)
            }
        }
    }
}
