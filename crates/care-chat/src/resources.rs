/// Lazily constructed, process-wide generation resources.
///
/// Loading the embedding model and opening LanceDB take seconds, so the
/// handles are built once on first demand and shared for the process
/// lifetime. `tokio::sync::OnceCell` provides the single-initialization
/// guarantee: concurrent first callers block until the one running
/// construction finishes, then share the result; after that, reads are
/// lock-free. Construction failure propagates to the caller — no answer can
/// be produced without these resources.
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use care_common::embedding::Embedder;
use care_common::ollama::{OllamaClient, OllamaClientConfig};
use care_common::vectordb::VectorDb;

use crate::config::Config;
use crate::error::AppError;
use crate::rag::{GenerationChain, LanceIndex, RagChain, RetrievalIndex, PASSAGE_TABLE};

/// The memoized pair: generation chain plus the retrieval index it searches.
/// The index is exposed separately because the topic short-circuit queries it
/// directly without invoking generation.
pub struct ChainHandles {
    pub chain: Arc<dyn GenerationChain>,
    pub index: Arc<dyn RetrievalIndex>,
}

type ResourceFuture = Pin<Box<dyn Future<Output = Result<ChainHandles, AppError>> + Send>>;
type ResourceFactory = Box<dyn Fn() -> ResourceFuture + Send + Sync>;

pub struct ResourceCache {
    cell: OnceCell<Arc<ChainHandles>>,
    factory: ResourceFactory,
}

impl ResourceCache {
    /// Build a cache around an injected async factory. The factory runs at
    /// most once per successful construction.
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ChainHandles, AppError>> + Send + 'static,
    {
        Self {
            cell: OnceCell::new(),
            factory: Box::new(move || Box::pin(factory())),
        }
    }

    /// Get the shared handles, constructing them on first call.
    pub async fn get(&self) -> Result<Arc<ChainHandles>, AppError> {
        self.cell
            .get_or_try_init(|| async { Ok(Arc::new((self.factory)().await?)) })
            .await
            .cloned()
    }
}

/// Production factory: loads the embedder, connects LanceDB, verifies the
/// passage table exists, and binds the Ollama-backed chain.
pub fn production_cache(config: &Config) -> ResourceCache {
    let lancedb_path = config.lancedb_path.clone();
    ResourceCache::new(move || {
        let lancedb_path = lancedb_path.clone();
        async move {
            info!("initializing generation resources");

            let embedder = Arc::new(Embedder::new().await?);
            info!("embedding model ready");

            let vectordb = Arc::new(VectorDb::connect(&lancedb_path).await?);
            if !vectordb.table_exists(PASSAGE_TABLE).await? {
                return Err(AppError::Index(format!(
                    "table '{PASSAGE_TABLE}' not found at {lancedb_path}; run `care-chat index` first"
                )));
            }
            info!(path = %lancedb_path, "lancedb connected");

            let index: Arc<dyn RetrievalIndex> = Arc::new(LanceIndex::new(embedder, vectordb));

            let llm = OllamaClient::new(OllamaClientConfig::from_env())?;
            info!(model = %llm.config().model, "generation model bound");

            let chain: Arc<dyn GenerationChain> =
                Arc::new(RagChain::new(Arc::clone(&index), llm));

            Ok(ChainHandles { chain, index })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::rag::Passage;

    struct StubChain;

    #[async_trait]
    impl GenerationChain for StubChain {
        async fn invoke(&self, _query: &str) -> Result<String, AppError> {
            Ok("stub".to_string())
        }
    }

    struct StubIndex;

    #[async_trait]
    impl RetrievalIndex for StubIndex {
        async fn similarity_search(
            &self,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<Passage>, AppError> {
            Ok(Vec::new())
        }
    }

    fn counting_cache(counter: Arc<AtomicUsize>) -> ResourceCache {
        ResourceCache::new(move || {
            let counter = Arc::clone(&counter);
            async move {
                // Yield so concurrent callers pile up on the cell.
                tokio::task::yield_now().await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(ChainHandles {
                    chain: Arc::new(StubChain),
                    index: Arc::new(StubIndex),
                })
            }
        })
    }

    #[tokio::test]
    async fn concurrent_first_calls_construct_exactly_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(counting_cache(Arc::clone(&counter)));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            tasks.push(tokio::spawn(async move { cache.get().await.is_ok() }));
        }
        for task in tasks {
            assert!(task.await.unwrap());
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn later_calls_reuse_the_same_handles() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cache = counting_cache(Arc::clone(&counter));

        let first = cache.get().await.unwrap();
        let second = cache.get().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn construction_failure_propagates() {
        let cache = ResourceCache::new(|| async {
            Err::<ChainHandles, _>(AppError::Index("missing table".to_string()))
        });
        assert!(cache.get().await.is_err());
    }
}
