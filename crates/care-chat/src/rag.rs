/// Retrieval-augmented generation chain.
///
/// `RetrievalIndex` and `GenerationChain` are the seams the pipeline depends
/// on; the production implementations below wire them to LanceDB and Ollama.
/// Tests substitute mocks.
use std::sync::Arc;

use arrow_array::{RecordBatch, StringArray};
use async_trait::async_trait;
use tracing::{info, warn};

use care_common::embedding::Embedder;
use care_common::ollama::OllamaClient;
use care_common::vectordb::VectorDb;

use crate::error::AppError;

/// LanceDB table holding the embedded WHO iSupport passages.
pub const PASSAGE_TABLE: &str = "passages";

/// Passages retrieved per generation query.
const RETRIEVAL_K: usize = 4;

/// Fixed assistant persona, bound once when the chain is constructed.
pub const SYSTEM_PROMPT: &str = "\
You are CareAssist, a warm, supportive, bilingual assistant for dementia caregivers.

Your role is to provide helpful, emotionally supportive guidance strictly related to \
dementia, memory loss, or caregiving. Do not answer unrelated questions (for example \
about travel, news, general health, or entertainment).

Only respond using the information retrieved from the caregiver support documents. \
Never guess or invent answers.

If the user's question is off-topic, gently reply:
\"I'm here to support dementia caregivers. For other topics, I recommend using a \
general-purpose assistant.\"

Every response must be empathetic. Speak with kindness, patience, and clarity, like a \
trusted companion. Use simple, gentle language that comforts and encourages.

You do not have memory. If the user refers to something earlier (for example \"what \
about that?\"), try to infer the intent from this message alone.

Keep your replies focused and grounded. Share one helpful point at a time. Avoid \
over-explaining.";

/// A retrieved corpus passage.
#[derive(Debug, Clone)]
pub struct Passage {
    pub id: String,
    pub text: String,
}

/// Similarity search over the embedded corpus.
#[async_trait]
pub trait RetrievalIndex: Send + Sync {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Passage>, AppError>;
}

/// Retrieval-augmented completion: retrieves context for the query and runs
/// the generation model over it, returning raw English text.
#[async_trait]
pub trait GenerationChain: Send + Sync {
    async fn invoke(&self, query: &str) -> Result<String, AppError>;
}

/// Production `RetrievalIndex` over LanceDB + fastembed.
pub struct LanceIndex {
    embedder: Arc<Embedder>,
    vectordb: Arc<VectorDb>,
}

impl LanceIndex {
    pub fn new(embedder: Arc<Embedder>, vectordb: Arc<VectorDb>) -> Self {
        Self { embedder, vectordb }
    }
}

#[async_trait]
impl RetrievalIndex for LanceIndex {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Passage>, AppError> {
        let query_embedding = self.embedder.embed_query(query).await?;
        let batches = self
            .vectordb
            .search(PASSAGE_TABLE, &query_embedding, k)
            .await?;
        Ok(extract_passages(&batches))
    }
}

/// Extract `Passage` values from LanceDB search result batches.
///
/// Expected columns: id (Utf8), text (Utf8). Extra columns (embedding,
/// _distance) are ignored.
fn extract_passages(batches: &[RecordBatch]) -> Vec<Passage> {
    let mut passages = Vec::new();

    for batch in batches {
        let schema = batch.schema();
        let id_col = get_string_column(batch, &schema, "id");
        let text_col = get_string_column(batch, &schema, "text");

        let (Some(id_col), Some(text_col)) = (id_col, text_col) else {
            warn!("search result batch missing expected columns");
            continue;
        };

        for row in 0..batch.num_rows() {
            passages.push(Passage {
                id: id_col.value(row).to_string(),
                text: text_col.value(row).to_string(),
            });
        }
    }

    passages
}

fn get_string_column<'a>(
    batch: &'a RecordBatch,
    schema: &arrow_schema::Schema,
    name: &str,
) -> Option<&'a StringArray> {
    let idx = schema.index_of(name).ok()?;
    batch.column(idx).as_any().downcast_ref::<StringArray>()
}

/// Production `GenerationChain`: stuffs retrieved passages into the prompt
/// and calls Ollama.
pub struct RagChain {
    index: Arc<dyn RetrievalIndex>,
    llm: OllamaClient,
}

impl RagChain {
    pub fn new(index: Arc<dyn RetrievalIndex>, llm: OllamaClient) -> Self {
        Self { index, llm }
    }

    fn build_prompt(context: &[Passage], question: &str) -> String {
        let context_block = context
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        format!("Context:\n{context_block}\n\nQuestion:\n{question}")
    }
}

#[async_trait]
impl GenerationChain for RagChain {
    async fn invoke(&self, query: &str) -> Result<String, AppError> {
        let passages = self.index.similarity_search(query, RETRIEVAL_K).await?;
        info!(query, passages = passages.len(), "invoking generation chain");

        let prompt = Self::build_prompt(&passages, query);
        let result = self.llm.generate(SYSTEM_PROMPT, &prompt).await?;
        Ok(result)
    }
}
