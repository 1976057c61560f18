//! BM25 lexical index on tantivy: build, persist, restore.
//!
//! An index is built from an ordered list of [`Document`]s; a document's id
//! is its position in that list and is stored alongside its path and text.
//! tantivy keeps the postings, field norms and corpus statistics and does
//! the BM25 scoring, so a restored index can score and return passages
//! without the original corpus.
//!
//! # Artifact layout
//!
//! `<path>/` is a tantivy index directory (`meta.json` plus segment files).
//! Its schema has three fields:
//!
//! | Field | Options | Content |
//! |-------|---------|---------|
//! | `id` | stored | build position |
//! | `path` | stored | POSIX path relative to the corpus root |
//! | `text` | indexed (freqs), stored | document text, analyzed by the named analyzer |
//!
//! The analyzer name on `text` records the stop-word setting.
//!
//! [`save_index`] writes into a sibling staging directory and swaps it into
//! place, so readers never see a half-written artifact at `<path>`.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tantivy::collector::TopDocs;
use tantivy::query::{AllQuery, BooleanQuery, BoostQuery, Occur, Query, TermQuery};
use tantivy::schema::{
    Field, FieldType, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, STORED,
};
use tantivy::{
    doc, DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, Score, TantivyDocument, Term,
};
use tracing::debug;

use crate::config::IndexParams;
use crate::error::{IndexError, IndexResult};
use crate::models::Document;
use crate::tokenize::{analyzer, collect_tokens, Stopwords};

const ID_FIELD: &str = "id";
const PATH_FIELD: &str = "path";
const TEXT_FIELD: &str = "text";
const META_FILE: &str = "meta.json";

/// A single writer thread keeps one segment per build, in insertion order.
const WRITER_THREADS: usize = 1;
const WRITER_MEMORY_BYTES: usize = 50_000_000;

#[derive(Debug, Clone, Copy)]
struct Fields {
    id: Field,
    path: Field,
    text: Field,
}

impl Fields {
    fn from_schema(schema: &Schema) -> tantivy::Result<Self> {
        Ok(Self {
            id: schema.get_field(ID_FIELD)?,
            path: schema.get_field(PATH_FIELD)?,
            text: schema.get_field(TEXT_FIELD)?,
        })
    }
}

fn build_schema(stopwords: Stopwords) -> Schema {
    let mut builder = Schema::builder();
    builder.add_u64_field(ID_FIELD, STORED);
    builder.add_text_field(PATH_FIELD, STORED);
    let indexing = TextFieldIndexing::default()
        .set_tokenizer(stopwords.analyzer_name())
        .set_index_option(IndexRecordOption::WithFreqs);
    builder.add_text_field(
        TEXT_FIELD,
        TextOptions::default()
            .set_indexing_options(indexing)
            .set_stored(),
    );
    builder.build()
}

fn register_analyzer(index: &Index, stopwords: Stopwords) -> tantivy::Result<()> {
    index
        .tokenizers()
        .register(stopwords.analyzer_name(), analyzer(stopwords)?);
    Ok(())
}

fn write_documents(index: &Index, docs: &[Document]) -> tantivy::Result<()> {
    let fields = Fields::from_schema(&index.schema())?;
    let mut writer: IndexWriter =
        index.writer_with_num_threads(WRITER_THREADS, WRITER_MEMORY_BYTES)?;
    for (id, document) in docs.iter().enumerate() {
        writer.add_document(doc!(
            fields.id => id as u64,
            fields.path => document.path.clone(),
            fields.text => document.text.clone()
        ))?;
    }
    writer.commit()?;
    writer.wait_merging_threads()
}

/// Searchable BM25 index over a fixed document set.
pub struct LexicalIndex {
    index: Index,
    reader: IndexReader,
    fields: Fields,
    params: IndexParams,
    origin: PathBuf,
    docs: Vec<Document>,
    /// Build id per `[segment_ord][doc_id]`.
    ids: Vec<Vec<u32>>,
    terms: usize,
}

impl fmt::Debug for LexicalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LexicalIndex")
            .field("origin", &self.origin)
            .field("params", &self.params)
            .field("documents", &self.docs.len())
            .field("terms", &self.terms)
            .finish()
    }
}

impl LexicalIndex {
    /// Analyze and index `docs` in memory. Ids follow the order of `docs`.
    pub fn build(docs: Vec<Document>, params: IndexParams) -> IndexResult<Self> {
        let index = Index::create_in_ram(build_schema(params.stopwords));
        register_analyzer(&index, params.stopwords)?;
        write_documents(&index, &docs)?;
        let built = Self::restore(index, Path::new(":memory:"))?;
        debug!(
            "built index: {} documents, {} terms",
            built.len(),
            built.vocab_size()
        );
        Ok(built)
    }

    /// Wrap a committed tantivy index, reading back its settings and
    /// stored documents.
    fn restore(index: Index, origin: &Path) -> IndexResult<Self> {
        let corrupt = |reason: String| IndexError::corrupt(origin, reason);

        let schema = index.schema();
        let fields = Fields::from_schema(&schema).map_err(|e| corrupt(e.to_string()))?;
        let analyzer_name = match schema.get_field_entry(fields.text).field_type() {
            FieldType::Str(options) => options
                .get_indexing_options()
                .map(|indexing| indexing.tokenizer().to_string()),
            _ => None,
        }
        .ok_or_else(|| corrupt(format!("field '{}' is not indexed text", TEXT_FIELD)))?;
        let stopwords = Stopwords::from_analyzer_name(&analyzer_name)
            .ok_or_else(|| corrupt(format!("unknown analyzer '{}'", analyzer_name)))?;
        register_analyzer(&index, stopwords)?;

        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let searcher = reader.searcher();

        let mut slots: Vec<Option<Document>> = vec![None; searcher.num_docs() as usize];
        let mut ids = Vec::with_capacity(searcher.segment_readers().len());
        let mut terms = 0;
        for (segment_ord, segment) in searcher.segment_readers().iter().enumerate() {
            terms += segment.inverted_index(fields.text)?.terms().num_terms();

            let mut segment_ids = Vec::with_capacity(segment.max_doc() as usize);
            for doc_id in 0..segment.max_doc() {
                let stored: TantivyDocument =
                    searcher.doc(DocAddress::new(segment_ord as u32, doc_id))?;
                let id = stored
                    .get_first(fields.id)
                    .and_then(|v| v.as_u64())
                    .ok_or_else(|| corrupt(format!("document {} has no id", doc_id)))?;
                let path = stored.get_first(fields.path).and_then(|v| v.as_str());
                let text = stored.get_first(fields.text).and_then(|v| v.as_str());
                let (Some(path), Some(text)) = (path, text) else {
                    return Err(corrupt(format!("document {} is missing stored fields", id)));
                };

                let slot = slots
                    .get_mut(id as usize)
                    .filter(|slot| slot.is_none())
                    .ok_or_else(|| corrupt(format!("document id {} out of sequence", id)))?;
                *slot = Some(Document::new(path, text));
                segment_ids.push(id as u32);
            }
            ids.push(segment_ids);
        }
        let docs = slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| corrupt("document ids are not contiguous".to_string()))?;

        Ok(Self {
            index,
            reader,
            fields,
            params: IndexParams { stopwords },
            origin: origin.to_path_buf(),
            docs,
            ids,
            terms,
        })
    }

    pub fn params(&self) -> IndexParams {
        self.params
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Distinct indexed terms.
    pub fn vocab_size(&self) -> usize {
        self.terms
    }

    pub fn document(&self, id: u32) -> Option<&Document> {
        self.docs.get(id as usize)
    }

    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    /// Distinct query terms after analysis.
    pub fn query_terms(&self, query: &str) -> IndexResult<BTreeSet<String>> {
        let mut analyzer = self.index.tokenizer_for_field(self.fields.text)?;
        Ok(collect_tokens(&mut analyzer, query).into_iter().collect())
    }

    /// BM25 score of `query` against every document, as `(id, score)`
    /// pairs in no particular order.
    ///
    /// Each distinct query term counts once. Documents matching no term are
    /// included with a score of `0.0`.
    pub fn scores(&self, query: &str) -> IndexResult<Vec<(u32, Score)>> {
        if self.docs.is_empty() {
            return Ok(Vec::new());
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = self
            .query_terms(query)?
            .iter()
            .map(|token| {
                let term = Term::from_field_text(self.fields.text, token);
                let query: Box<dyn Query> =
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
                (Occur::Should, query)
            })
            .collect();
        // Zero-weight clause so non-matching documents still rank.
        let everything: Box<dyn Query> = Box::new(BoostQuery::new(Box::new(AllQuery), 0.0));
        clauses.push((Occur::Should, everything));

        let searcher = self.reader.searcher();
        let hits = searcher.search(
            &BooleanQuery::new(clauses),
            &TopDocs::with_limit(self.docs.len()),
        )?;
        hits.into_iter()
            .map(|(score, address)| self.id_of(address).map(|id| (id, score)))
            .collect()
    }

    fn id_of(&self, address: DocAddress) -> IndexResult<u32> {
        self.ids
            .get(address.segment_ord as usize)
            .and_then(|segment| segment.get(address.doc_id as usize))
            .copied()
            .ok_or_else(|| {
                IndexError::corrupt(
                    &self.origin,
                    format!(
                        "unknown document address {}:{}",
                        address.segment_ord, address.doc_id
                    ),
                )
            })
    }
}

/// Persist `index` as a directory at `path`, replacing any previous artifact.
pub fn save_index(index: &LexicalIndex, path: &Path) -> IndexResult<()> {
    let staging = staging_path(path);
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    let stopwords = index.params.stopwords;
    let on_disk = Index::create_in_dir(&staging, build_schema(stopwords))?;
    register_analyzer(&on_disk, stopwords)?;
    write_documents(&on_disk, &index.docs)?;
    drop(on_disk);

    if path.exists() {
        fs::remove_dir_all(path)?;
    }
    fs::rename(&staging, path)?;
    debug!("saved index ({} documents) to {}", index.len(), path.display());
    Ok(())
}

/// Restore an index saved by [`save_index`].
///
/// Returns [`IndexError::NotFound`] when `path` holds no `meta.json`, and
/// [`IndexError::Corrupt`] when the artifact is present but unreadable or
/// inconsistent.
pub fn load_index(path: &Path) -> IndexResult<LexicalIndex> {
    if !path.join(META_FILE).is_file() {
        return Err(IndexError::NotFound(path.to_path_buf()));
    }
    let index = Index::open_in_dir(path).map_err(|e| IndexError::corrupt(path, e.to_string()))?;
    LexicalIndex::restore(index, path).map_err(|e| match e {
        IndexError::Tantivy(e) => IndexError::corrupt(path, e.to_string()),
        other => other,
    })
}

/// Result of trying to open a persisted index.
#[derive(Debug)]
pub enum LoadOutcome {
    Found(LexicalIndex),
    NotFound,
    Corrupt(IndexError),
}

/// Classify a load attempt so callers can branch on rebuild explicitly.
pub fn open_index(path: &Path) -> LoadOutcome {
    match load_index(path) {
        Ok(index) => LoadOutcome::Found(index),
        Err(e) if e.is_not_found() => LoadOutcome::NotFound,
        Err(e) => LoadOutcome::Corrupt(e),
    }
}

/// Delete the artifact at `path`. A missing artifact is not an error.
pub fn remove_index(path: &Path) -> IndexResult<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)?;
    } else if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "index".into());
    name.push(".staging");
    path.with_file_name(name)
}
