use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use thiserror::Error;

use super::normalize::normalize;
use super::types::{CuratedEntry, InteractionEdge, NormalizedName, Severity};

/// Curated interaction dataset compiled into the binary.
const CURATED_DATASET: &str = include_str!("../../resources/interactions.json");

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeError {
    #[error("Failed to load interaction dataset from {0}: {1}")]
    Load(String, String),

    #[error("Failed to parse interaction dataset {0}: {1}")]
    Parse(String, String),

    #[error("Interaction knowledge base unavailable: {0}")]
    Unavailable(String),

    #[error("Knowledge base lock poisoned")]
    LockPoisoned,
}

// ---------------------------------------------------------------------------
// KnowledgeBase
// ---------------------------------------------------------------------------

/// Immutable directed lookup table: source drug → known interactions.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    table: HashMap<NormalizedName, Vec<InteractionEdge>>,
}

impl KnowledgeBase {
    /// Build from curated entries. Both sides are normalized; self-edges,
    /// blank names and repeated (source, counterpart) edges are skipped, so
    /// feeding the same entries twice yields the same table.
    pub fn from_entries(entries: &[CuratedEntry]) -> Self {
        let mut table: HashMap<NormalizedName, Vec<InteractionEdge>> = HashMap::new();

        for entry in entries {
            let source = normalize(&entry.drug);
            if source.is_empty() {
                continue;
            }
            for interaction in &entry.interactions {
                let counterpart = normalize(&interaction.interacts_with);
                if counterpart.is_empty() || counterpart == source {
                    continue;
                }
                let edges = table.entry(source.clone()).or_default();
                if edges.iter().any(|e| e.counterpart == counterpart) {
                    continue;
                }
                edges.push(InteractionEdge {
                    counterpart,
                    severity: Severity::classify(&interaction.severity),
                    description: interaction.description.trim().to_string(),
                });
            }
        }

        Self { table }
    }

    pub fn from_json(name: &str, json: &str) -> Result<Self, KnowledgeError> {
        let entries: Vec<CuratedEntry> = serde_json::from_str(json)
            .map_err(|e| KnowledgeError::Parse(name.to_string(), e.to_string()))?;
        Ok(Self::from_entries(&entries))
    }

    /// The compiled-in curated dataset.
    pub fn curated() -> Result<Self, KnowledgeError> {
        Self::from_json("interactions.json", CURATED_DATASET)
    }

    /// Load a dataset file with the same schema as the compiled-in one.
    pub fn load(path: &Path) -> Result<Self, KnowledgeError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| KnowledgeError::Load(path.display().to_string(), e.to_string()))?;
        Self::from_json(&path.display().to_string(), &json)
    }

    /// Edges stored under `key` as source. Empty if unknown.
    pub fn lookup_direct(&self, key: &NormalizedName) -> &[InteractionEdge] {
        self.table.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every (source, edge) whose counterpart is `key`. Linear scan.
    pub fn lookup_reverse(&self, key: &NormalizedName) -> Vec<(&NormalizedName, &InteractionEdge)> {
        self.table
            .iter()
            .flat_map(|(source, edges)| edges.iter().map(move |edge| (source, edge)))
            .filter(|(_, edge)| &edge.counterpart == key)
            .collect()
    }

    /// Number of source drugs.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.table.values().map(Vec::len).sum()
    }

    /// Source drugs, sorted.
    pub fn drugs(&self) -> Vec<&NormalizedName> {
        let mut drugs: Vec<&NormalizedName> = self.table.keys().collect();
        drugs.sort();
        drugs
    }

    /// All directed edges as (source, edge), sorted by source.
    pub fn edges(&self) -> Vec<(&NormalizedName, &InteractionEdge)> {
        let mut all: Vec<(&NormalizedName, &InteractionEdge)> = self
            .table
            .iter()
            .flat_map(|(source, edges)| edges.iter().map(move |edge| (source, edge)))
            .collect();
        all.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.counterpart.cmp(&b.1.counterpart)));
        all
    }
}

// ---------------------------------------------------------------------------
// KnowledgeStore
// ---------------------------------------------------------------------------

enum DatasetSource {
    Compiled,
    Entries(Vec<CuratedEntry>),
    Json { name: String, json: String },
}

/// Owning handle to the current knowledge base.
///
/// The first `build`/`snapshot` constructs the table exactly once, even when
/// several threads race. Readers get an `Arc` to an immutable table; `update`
/// swaps in a whole new table.
pub struct KnowledgeStore {
    source: DatasetSource,
    built: OnceLock<Result<(), KnowledgeError>>,
    table: RwLock<Arc<KnowledgeBase>>,
    generation: AtomicU64,
}

impl KnowledgeStore {
    /// Store backed by the compiled-in curated dataset, built lazily.
    pub fn new() -> Self {
        Self::with_source(DatasetSource::Compiled)
    }

    /// Store backed by caller-supplied entries, built lazily.
    pub fn from_entries(entries: Vec<CuratedEntry>) -> Self {
        Self::with_source(DatasetSource::Entries(entries))
    }

    /// Store backed by dataset text, parsed lazily on first use. A parse
    /// failure leaves the store unavailable rather than failing here.
    pub fn from_json(name: &str, json: impl Into<String>) -> Self {
        Self::with_source(DatasetSource::Json {
            name: name.to_string(),
            json: json.into(),
        })
    }

    /// Store loaded eagerly from a dataset file.
    pub fn from_path(path: &Path) -> Result<Self, KnowledgeError> {
        let base = KnowledgeBase::load(path)?;
        let store = Self::new();
        store.update(base)?;
        Ok(store)
    }

    fn with_source(source: DatasetSource) -> Self {
        Self {
            source,
            built: OnceLock::new(),
            table: RwLock::new(Arc::new(KnowledgeBase::default())),
            generation: AtomicU64::new(0),
        }
    }

    /// Populate the table from the configured dataset. Only the first call
    /// does any work; concurrent callers wait for it and share its result.
    pub fn build(&self) -> Result<(), KnowledgeError> {
        self.built
            .get_or_init(|| {
                let base = match &self.source {
                    DatasetSource::Compiled => KnowledgeBase::curated(),
                    DatasetSource::Entries(entries) => Ok(KnowledgeBase::from_entries(entries)),
                    DatasetSource::Json { name, json } => KnowledgeBase::from_json(name, json),
                };
                match base {
                    Ok(base) => {
                        tracing::info!(
                            drugs = base.len(),
                            edges = base.edge_count(),
                            "Interaction knowledge base built"
                        );
                        self.install(base)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Interaction knowledge base build failed");
                        Err(KnowledgeError::Unavailable(e.to_string()))
                    }
                }
            })
            .clone()
    }

    /// Current table, building it first if needed. After a failed build
    /// this errors until `update` installs a table.
    pub fn snapshot(&self) -> Result<Arc<KnowledgeBase>, KnowledgeError> {
        if let Err(e) = self.build() {
            if self.generation() == 0 {
                return Err(e);
            }
        }
        let table = self.table.read().map_err(|_| KnowledgeError::LockPoisoned)?;
        Ok(Arc::clone(&table))
    }

    /// Replace the whole table. In-flight readers keep their old snapshot.
    pub fn update(&self, base: KnowledgeBase) -> Result<(), KnowledgeError> {
        // Mark as built first so a pending lazy build cannot overwrite this table.
        let _ = self.built.set(Ok(()));
        tracing::info!(
            drugs = base.len(),
            edges = base.edge_count(),
            "Interaction knowledge base replaced"
        );
        self.install(base)
    }

    /// Re-read a dataset file and swap it in. On error the current table stays.
    pub fn refresh_from_path(&self, path: &Path) -> Result<(), KnowledgeError> {
        let base = KnowledgeBase::load(path)?;
        self.update(base)
    }

    /// How many tables have been installed (initial build plus updates).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn install(&self, base: KnowledgeBase) -> Result<(), KnowledgeError> {
        let mut table = self.table.write().map_err(|_| KnowledgeError::LockPoisoned)?;
        *table = Arc::new(base);
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Default for KnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::thread;

    use super::*;
    use crate::interactions::types::CuratedInteraction;

    fn entry(drug: &str, with: &[(&str, &str, &str)]) -> CuratedEntry {
        CuratedEntry {
            drug: drug.into(),
            interactions: with
                .iter()
                .map(|(other, severity, description)| CuratedInteraction {
                    interacts_with: (*other).into(),
                    severity: (*severity).into(),
                    description: (*description).into(),
                })
                .collect(),
        }
    }

    fn key(raw: &str) -> NormalizedName {
        normalize(raw)
    }

    #[test]
    fn curated_dataset_parses() {
        let base = KnowledgeBase::curated().unwrap();
        assert!(base.len() >= 10);
        assert!(base.edge_count() >= 25);
    }

    #[test]
    fn curated_keys_are_normalized() {
        let base = KnowledgeBase::curated().unwrap();
        for (source, edge) in base.edges() {
            assert_eq!(&normalize(source.as_str()), source);
            assert_eq!(normalize(edge.counterpart.as_str()), edge.counterpart);
        }
    }

    #[test]
    fn direct_lookup_finds_edges() {
        let base = KnowledgeBase::curated().unwrap();
        let edges = base.lookup_direct(&key("Warfarin"));
        let aspirin = edges
            .iter()
            .find(|e| e.counterpart == key("aspirin"))
            .unwrap();
        assert_eq!(aspirin.severity, Severity::High);
    }

    #[test]
    fn direct_lookup_unknown_is_empty() {
        let base = KnowledgeBase::curated().unwrap();
        assert!(base.lookup_direct(&key("unobtainium")).is_empty());
    }

    #[test]
    fn reverse_lookup_scans_counterparts() {
        let base = KnowledgeBase::curated().unwrap();
        let sources: Vec<&str> = base
            .lookup_reverse(&key("clarithromycin"))
            .into_iter()
            .map(|(source, _)| source.as_str())
            .collect();
        assert!(sources.contains(&"simvastatin"));
        assert!(sources.contains(&"warfarin"));
        assert!(sources.contains(&"atorvastatin"));
    }

    #[test]
    fn from_entries_never_duplicates_edges() {
        let entries = vec![
            entry("Warfarin", &[("Aspirin 81mg", "high", "bleeding")]),
            entry("warfarin 5 mg tablet", &[("aspirin", "high", "bleeding")]),
        ];
        let once = KnowledgeBase::from_entries(&entries);
        assert_eq!(once.edge_count(), 1);

        let doubled: Vec<CuratedEntry> = entries.iter().chain(entries.iter()).cloned().collect();
        let twice = KnowledgeBase::from_entries(&doubled);
        assert_eq!(twice.edge_count(), once.edge_count());
    }

    #[test]
    fn from_entries_skips_blank_and_self_edges() {
        let entries = vec![
            entry("  ", &[("aspirin", "high", "x")]),
            entry("warfarin", &[("", "high", "x"), ("Warfarin 1mg", "high", "x")]),
        ];
        let base = KnowledgeBase::from_entries(&entries);
        assert!(base.is_empty());
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = KnowledgeBase::from_json("broken.json", "[{").unwrap_err();
        assert!(matches!(err, KnowledgeError::Parse(name, _) if name == "broken.json"));
    }

    #[test]
    fn store_builds_lazily_on_snapshot() {
        let store = KnowledgeStore::new();
        assert_eq!(store.generation(), 0);
        let snapshot = store.snapshot().unwrap();
        assert!(!snapshot.is_empty());
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn repeated_build_is_a_no_op() {
        let store = KnowledgeStore::new();
        store.build().unwrap();
        let first = store.snapshot().unwrap();
        store.build().unwrap();
        store.build().unwrap();
        let again = store.snapshot().unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(first.edge_count(), again.edge_count());
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn concurrent_first_use_builds_once() {
        let store = Arc::new(KnowledgeStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.snapshot().unwrap())
            })
            .collect();
        let snapshots: Vec<Arc<KnowledgeBase>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(store.generation(), 1);
        for snapshot in &snapshots[1..] {
            assert!(Arc::ptr_eq(&snapshots[0], snapshot));
        }
    }

    #[test]
    fn update_swaps_whole_table() {
        let store = KnowledgeStore::new();
        let before = store.snapshot().unwrap();

        let replacement =
            KnowledgeBase::from_entries(&[entry("drug-a", &[("drug-b", "low", "test")])]);
        store.update(replacement).unwrap();

        let after = store.snapshot().unwrap();
        assert_eq!(after.edge_count(), 1);
        assert!(after.lookup_direct(&key("warfarin")).is_empty());
        // Old readers keep a complete, untouched table.
        assert!(!before.lookup_direct(&key("warfarin")).is_empty());
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn update_before_build_is_not_overwritten() {
        let store = KnowledgeStore::new();
        store
            .update(KnowledgeBase::from_entries(&[entry("x-drug", &[("y-drug", "high", "t")])]))
            .unwrap();
        store.build().unwrap();
        assert_eq!(store.snapshot().unwrap().edge_count(), 1);
    }

    #[test]
    fn store_from_entries_uses_given_dataset() {
        let store = KnowledgeStore::from_entries(vec![entry(
            "alpha",
            &[("beta", "severe", "test")],
        )]);
        let base = store.snapshot().unwrap();
        assert_eq!(base.lookup_direct(&key("alpha"))[0].severity, Severity::High);
    }

    #[test]
    fn store_from_json_builds_lazily() {
        let store = KnowledgeStore::from_json(
            "inline.json",
            r#"[{"drug": "alpha", "interactions": [{"interacts_with": "beta", "severity": "high", "description": "t"}]}]"#,
        );
        assert_eq!(store.generation(), 0);
        assert_eq!(store.snapshot().unwrap().edge_count(), 1);
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn failed_build_is_cached_and_unavailable() {
        let store = KnowledgeStore::from_json("broken.json", "[{ not json");
        let first = store.build().unwrap_err();
        assert!(matches!(first, KnowledgeError::Unavailable(ref msg) if msg.contains("broken.json")));
        assert_eq!(store.build().unwrap_err(), first);
        assert!(matches!(store.snapshot(), Err(KnowledgeError::Unavailable(_))));
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn update_recovers_a_failed_store() {
        let store = KnowledgeStore::from_json("broken.json", "oops");
        assert!(store.snapshot().is_err());
        store
            .update(KnowledgeBase::from_entries(&[entry("alpha", &[("beta", "low", "t")])]))
            .unwrap();
        assert_eq!(store.snapshot().unwrap().edge_count(), 1);
        assert!(store.build().is_err());
    }

    #[test]
    fn store_from_path_and_refresh() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"drug": "alpha", "interactions": [{{"interacts_with": "beta", "severity": "mild", "description": "t"}}]}}]"#
        )
        .unwrap();

        let store = KnowledgeStore::from_path(file.path()).unwrap();
        assert_eq!(store.snapshot().unwrap().edge_count(), 1);

        let mut next = tempfile::NamedTempFile::new().unwrap();
        write!(
            next,
            r#"[{{"drug": "alpha", "interactions": [
                {{"interacts_with": "beta", "severity": "mild", "description": "t"}},
                {{"interacts_with": "gamma", "severity": "high", "description": "t"}}
            ]}}]"#
        )
        .unwrap();
        store.refresh_from_path(next.path()).unwrap();
        assert_eq!(store.snapshot().unwrap().edge_count(), 2);
    }

    #[test]
    fn failed_refresh_keeps_current_table() {
        let store = KnowledgeStore::new();
        let before = store.snapshot().unwrap().edge_count();

        let dir = tempfile::tempdir().unwrap();
        let err = store
            .refresh_from_path(&dir.path().join("missing.json"))
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::Load(_, _)));
        assert_eq!(store.snapshot().unwrap().edge_count(), before);
    }
}
