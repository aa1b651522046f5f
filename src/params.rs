//! Param Source Registry.
//!
//! Maps a registered name to a factory producing a [`ParamSource`]: a
//! partitionable, possibly-infinite iterator of per-invocation parameter
//! bundles. Registration is process-wide, init-on-first-use, and
//! idempotent under the same name — mirroring `fantoch::client::Workload`'s
//! closed-loop command generation, generalised into a registry the way
//! `esrally.track.params.register_param_source_for_name` does.

use crate::model::Params;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// One invocation's worth of parameters, plus how many more this source
/// knows it will produce (if finite).
pub trait ParamSource: Send {
    /// Returns a partitioned view of this source for client `index` of
    /// `count` total clients. Partitions must be independent: consuming one
    /// partition does not advance any other.
    fn partition(&self, index: u32, count: u32) -> Box<dyn ParamSource>;

    /// Total invocations this partition will produce, if known.
    fn size(&self) -> Option<u64>;

    /// Produces the next invocation's parameters. Side-effecting: each call
    /// advances the source.
    fn params(&mut self) -> Params;
}

pub type ParamSourceFactory =
    Arc<dyn Fn(&Params) -> Box<dyn ParamSource> + Send + Sync>;

static REGISTRY: OnceLock<Mutex<HashMap<String, ParamSourceFactory>>> =
    OnceLock::new();

fn registry() -> &'static Mutex<HashMap<String, ParamSourceFactory>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Registers `factory` under `name`. Re-registering the same name is
/// idempotent and simply overwrites the previous factory, matching spec
/// §4.A's "registration is a process-wide one-shot per name".
pub fn register(name: impl Into<String>, factory: ParamSourceFactory) {
    registry().lock().insert(name.into(), factory);
}

/// Instantiates the param source registered under `name` with the given
/// inline `params`.
///
/// # Panics
/// Panics if no source was registered under `name`; this mirrors
/// `esrally`'s behaviour of treating an unregistered param source as a
/// track-authoring bug rather than a recoverable runtime condition.
pub fn create(name: &str, params: &Params) -> Box<dyn ParamSource> {
    let registry = registry().lock();
    let factory = registry
        .get(name)
        .unwrap_or_else(|| panic!("no param source registered for [{name}]"));
    factory(params)
}

/// A fixed-size source of synthetic bulk-indexing request bodies, mirroring
/// `esrally.track.params.BulkIndexParamSource`: each invocation issues a
/// `bulk-size`-document batch and the source exhausts after `total` batches
/// total across all partitions, split with [`crate::scheduler::local_share`].
pub struct BulkIndexingParamSource {
    index: String,
    bulk_size: u64,
    remaining: u64,
    next_doc_id: u64,
}

impl BulkIndexingParamSource {
    pub fn new(index: impl Into<String>, bulk_size: u64, total_bulks: u64) -> Self {
        Self {
            index: index.into(),
            bulk_size: bulk_size.max(1),
            remaining: total_bulks,
            next_doc_id: 0,
        }
    }
}

impl ParamSource for BulkIndexingParamSource {
    fn partition(&self, index: u32, count: u32) -> Box<dyn ParamSource> {
        // each partition's synthetic doc ids start from a disjoint block so
        // concurrent clients never mint the same _id.
        const DOC_ID_BLOCK: u64 = 1_000_000_000;
        Box::new(BulkIndexingParamSource {
            index: self.index.clone(),
            bulk_size: self.bulk_size,
            remaining: crate::scheduler::local_share(self.remaining, count, index),
            next_doc_id: index as u64 * DOC_ID_BLOCK,
        })
    }

    fn size(&self) -> Option<u64> {
        Some(self.remaining)
    }

    fn params(&mut self) -> Params {
        self.remaining = self.remaining.saturating_sub(1);
        let docs: Vec<serde_json::Value> = (0..self.bulk_size)
            .map(|i| {
                let doc_id = self.next_doc_id + i;
                serde_json::json!({"_id": doc_id.to_string(), "value": doc_id})
            })
            .collect();
        self.next_doc_id += self.bulk_size;

        let mut params = Params::new();
        params.insert("index".to_string(), self.index.clone().into());
        params.insert("bulk-size".to_string(), self.bulk_size.into());
        params.insert("body".to_string(), serde_json::Value::Array(docs));
        params
    }
}

/// An unbounded source of synthetic search queries drawn from a fixed
/// `vocabulary`, mirroring `esrally.track.params.SearchParamSource`'s
/// unbounded "one query per invocation" shape. Each partition gets its own
/// seeded RNG derived from the shared `seed` so runs are reproducible while
/// partitions don't all draw the same sequence of terms.
pub struct SearchQueryParamSource {
    index: String,
    vocabulary: Arc<Vec<String>>,
    seed: u64,
    rng: rand::rngs::StdRng,
}

impl SearchQueryParamSource {
    pub fn new(index: impl Into<String>, vocabulary: Vec<String>, seed: u64) -> Self {
        use rand::SeedableRng;
        Self {
            index: index.into(),
            vocabulary: Arc::new(vocabulary),
            seed,
            rng: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }
}

impl ParamSource for SearchQueryParamSource {
    fn partition(&self, index: u32, _count: u32) -> Box<dyn ParamSource> {
        use rand::SeedableRng;
        let partition_seed = self.seed.wrapping_add(index as u64 + 1);
        Box::new(SearchQueryParamSource {
            index: self.index.clone(),
            vocabulary: Arc::clone(&self.vocabulary),
            seed: partition_seed,
            rng: rand::rngs::StdRng::seed_from_u64(partition_seed),
        })
    }

    fn size(&self) -> Option<u64> {
        None
    }

    fn params(&mut self) -> Params {
        use rand::seq::SliceRandom;
        let term = self
            .vocabulary
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_default();

        let mut params = Params::new();
        params.insert("index".to_string(), self.index.clone().into());
        params.insert(
            "body".to_string(),
            serde_json::json!({"query": {"match": {"text": term}}}),
        );
        params
    }
}

/// Registers [`BulkIndexingParamSource`] and [`SearchQueryParamSource`]
/// under the names `"bulk-indexing"` and `"search-query"`, reading their
/// construction parameters (`index`, `bulk-size`, `total-bulks` /
/// `vocabulary`, `seed`) from the per-operation `params` map the way
/// `esrally`'s track-aware factories do.
pub fn register_builtin_sources() {
    register(
        "bulk-indexing",
        Arc::new(|params: &Params| {
            let index = params
                .get("index")
                .and_then(|v| v.as_str())
                .unwrap_or("unnamed-index")
                .to_string();
            let bulk_size = params.get("bulk-size").and_then(|v| v.as_u64()).unwrap_or(1000);
            let total_bulks = params.get("total-bulks").and_then(|v| v.as_u64()).unwrap_or(1);
            Box::new(BulkIndexingParamSource::new(index, bulk_size, total_bulks)) as Box<dyn ParamSource>
        }),
    );

    register(
        "search-query",
        Arc::new(|params: &Params| {
            let index = params
                .get("index")
                .and_then(|v| v.as_str())
                .unwrap_or("unnamed-index")
                .to_string();
            let vocabulary: Vec<String> = params
                .get("vocabulary")
                .and_then(|v| v.as_array())
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_else(|| vec!["term".to_string()]);
            let seed = params.get("seed").and_then(|v| v.as_u64()).unwrap_or(0);
            Box::new(SearchQueryParamSource::new(index, vocabulary, seed)) as Box<dyn ParamSource>
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingSource {
        total: u64,
        issued: u64,
    }

    impl ParamSource for CountingSource {
        fn partition(&self, _index: u32, _count: u32) -> Box<dyn ParamSource> {
            Box::new(CountingSource {
                total: self.total,
                issued: 0,
            })
        }

        fn size(&self) -> Option<u64> {
            Some(self.total - self.issued)
        }

        fn params(&mut self) -> Params {
            self.issued += 1;
            let mut params = Params::new();
            params.insert("seq".to_string(), self.issued.into());
            params
        }
    }

    #[test]
    fn register_and_create_is_idempotent_under_same_name() {
        register(
            "counting",
            Arc::new(|params: &Params| {
                let total = params
                    .get("size")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(1);
                Box::new(CountingSource { total, issued: 0 }) as Box<dyn ParamSource>
            }),
        );
        // re-registering under the same name must not panic or break
        // existing state.
        register(
            "counting",
            Arc::new(|params: &Params| {
                let total = params
                    .get("size")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(1);
                Box::new(CountingSource { total, issued: 0 }) as Box<dyn ParamSource>
            }),
        );

        let mut params = Params::new();
        params.insert("size".to_string(), 3.into());
        let mut source = create("counting", &params);
        assert_eq!(source.size(), Some(3));
        assert_eq!(source.params().get("seq").unwrap().as_u64(), Some(1));
        assert_eq!(source.size(), Some(2));
    }

    #[test]
    fn partitions_are_independent() {
        register(
            "independence-check",
            Arc::new(|_: &Params| {
                Box::new(CountingSource { total: 10, issued: 0 }) as Box<dyn ParamSource>
            }),
        );
        let source = create("independence-check", &Params::new());
        let mut a = source.partition(0, 2);
        let mut b = source.partition(1, 2);
        a.params();
        a.params();
        assert_eq!(b.params().get("seq").unwrap().as_u64(), Some(1));
    }

    #[test]
    fn bulk_indexing_source_produces_bulk_size_docs_and_counts_down() {
        let mut source = BulkIndexingParamSource::new("logs", 3, 2);
        assert_eq!(source.size(), Some(2));

        let params = source.params();
        assert_eq!(params.get("index").unwrap().as_str(), Some("logs"));
        assert_eq!(params.get("bulk-size").unwrap().as_u64(), Some(3));
        let body = params.get("body").unwrap().as_array().unwrap();
        assert_eq!(body.len(), 3);
        assert_eq!(source.size(), Some(1));

        source.params();
        assert_eq!(source.size(), Some(0));
    }

    #[test]
    fn bulk_indexing_source_partitions_split_remaining_and_doc_ids() {
        let source = BulkIndexingParamSource::new("logs", 1, 10);
        let a = source.partition(0, 2);
        let b = source.partition(1, 2);
        assert_eq!(a.size(), Some(5));
        assert_eq!(b.size(), Some(5));
    }

    #[test]
    fn search_query_source_is_unbounded_and_draws_from_vocabulary() {
        let vocabulary = vec!["rust".to_string(), "async".to_string()];
        let mut source = SearchQueryParamSource::new("docs", vocabulary.clone(), 42);
        assert_eq!(source.size(), None);

        let params = source.params();
        let body = params.get("body").unwrap();
        let term = body["query"]["match"]["text"].as_str().unwrap();
        assert!(vocabulary.contains(&term.to_string()));
    }

    #[test]
    fn search_query_source_is_deterministic_under_the_same_seed() {
        let vocabulary = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
        let mut one = SearchQueryParamSource::new("docs", vocabulary.clone(), 7);
        let mut two = SearchQueryParamSource::new("docs", vocabulary, 7);

        let terms_one: Vec<_> = (0..5).map(|_| one.params()).collect();
        let terms_two: Vec<_> = (0..5).map(|_| two.params()).collect();
        assert_eq!(
            terms_one.iter().map(|p| p.get("body").cloned()).collect::<Vec<_>>(),
            terms_two.iter().map(|p| p.get("body").cloned()).collect::<Vec<_>>(),
        );
    }

    #[test]
    fn search_query_source_partitions_use_independent_rngs() {
        let vocabulary: Vec<String> = (0..50).map(|i| format!("term-{i}")).collect();
        let source = SearchQueryParamSource::new("docs", vocabulary, 1);
        let mut a = source.partition(0, 4);
        let mut b = source.partition(1, 4);

        let drawn_term = |params: Params| params.get("body").unwrap()["query"]["match"]["text"].clone();
        let terms_a: Vec<_> = (0..8).map(|_| drawn_term(a.params())).collect();
        let terms_b: Vec<_> = (0..8).map(|_| drawn_term(b.params())).collect();
        assert_ne!(terms_a, terms_b);
    }
}
