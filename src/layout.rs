//! Level Layout
//!
//! Places pattern nodes on a grid by breadth-first rank from the root
//! nodes (nodes with no incoming edge), then converts rank and
//! within-rank order into pixel coordinates.
//!
//! [`LayoutCache`] memoizes results keyed by a canonical hash of the graph
//! and options. Entries expire after a TTL and the store is LRU-bounded.

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet, VecDeque};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// A node in a pattern diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    pub label: String,
}

impl FlowNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub source: String,
    pub target: String,
}

impl FlowEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Which axis ranks advance along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutDirection {
    #[default]
    TopDown,
    LeftRight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub direction: LayoutDirection,
    /// Distance between consecutive ranks
    pub rank_spacing: f64,
    /// Distance between nodes sharing a rank
    pub node_spacing: f64,
    /// Cross-axis coordinate each rank is centred on
    pub center: f64,
    /// Main-axis coordinate of rank 0
    pub origin: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::TopDown,
            rank_spacing: 150.0,
            node_spacing: 200.0,
            center: 400.0,
            origin: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodePosition {
    pub id: String,
    pub rank: usize,
    pub order: usize,
    pub x: f64,
    pub y: f64,
}

/// Positions sorted by rank, then by order within the rank.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GraphLayout {
    pub positions: Vec<NodePosition>,
}

impl GraphLayout {
    pub fn get(&self, id: &str) -> Option<&NodePosition> {
        self.positions.iter().find(|p| p.id == id)
    }

    /// Highest rank plus one.
    pub fn rank_count(&self) -> usize {
        self.positions.iter().map(|p| p.rank + 1).max().unwrap_or(0)
    }
}

/// Compute a level layout.
///
/// The result depends only on the node id set, the edge set and the
/// options, never on declaration order: roots, children and the order
/// within a rank are all taken in id order. Edges naming unknown nodes are
/// ignored. When every node has an incoming edge the smallest id is used
/// as the root; nodes still unreached afterwards seed their own BFS at
/// rank 0.
pub fn compute_layout(nodes: &[FlowNode], edges: &[FlowEdge], options: &LayoutOptions) -> GraphLayout {
    let mut ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();

    let known: HashSet<&str> = ids.iter().copied().collect();
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut has_incoming: HashSet<&str> = HashSet::new();

    for edge in edges {
        let (source, target) = (edge.source.as_str(), edge.target.as_str());
        if !known.contains(source) || !known.contains(target) {
            debug!(source, target, "Ignoring edge with unknown endpoint");
            continue;
        }
        children.entry(source).or_default().push(target);
        if source != target {
            has_incoming.insert(target);
        }
    }
    for targets in children.values_mut() {
        targets.sort_unstable();
        targets.dedup();
    }

    let mut seeds: Vec<&str> = ids
        .iter()
        .copied()
        .filter(|id| !has_incoming.contains(id))
        .collect();
    if seeds.is_empty() {
        seeds.extend(ids.first().copied());
    }

    let mut rank_of: HashMap<&str, usize> = HashMap::new();
    assign_ranks(&seeds, &children, &mut rank_of);
    for &id in &ids {
        if !rank_of.contains_key(id) {
            assign_ranks(&[id], &children, &mut rank_of);
        }
    }

    let mut placed: Vec<(&str, usize)> = ids.iter().map(|&id| (id, rank_of[id])).collect();
    placed.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    let mut rank_sizes: HashMap<usize, usize> = HashMap::new();
    for (_, rank) in &placed {
        *rank_sizes.entry(*rank).or_insert(0) += 1;
    }

    let mut next_slot: HashMap<usize, usize> = HashMap::new();
    let positions = placed
        .into_iter()
        .map(|(id, rank)| {
            let slot = next_slot.entry(rank).or_insert(0);
            let order = *slot;
            *slot += 1;

            let width = rank_sizes[&rank];
            let cross = options.center + (order as f64 - (width as f64 - 1.0) / 2.0) * options.node_spacing;
            let main = options.origin + rank as f64 * options.rank_spacing;
            let (x, y) = match options.direction {
                LayoutDirection::TopDown => (cross, main),
                LayoutDirection::LeftRight => (main, cross),
            };
            NodePosition {
                id: id.to_string(),
                rank,
                order,
                x,
                y,
            }
        })
        .collect();

    GraphLayout { positions }
}

fn assign_ranks<'a>(
    roots: &[&'a str],
    children: &HashMap<&'a str, Vec<&'a str>>,
    rank_of: &mut HashMap<&'a str, usize>,
) {
    let mut queue: VecDeque<&'a str> = VecDeque::new();
    for &root in roots {
        if !rank_of.contains_key(root) {
            rank_of.insert(root, 0);
            queue.push_back(root);
        }
    }
    while let Some(id) = queue.pop_front() {
        let rank = rank_of[id];
        for &child in children.get(id).into_iter().flatten() {
            if !rank_of.contains_key(child) {
                rank_of.insert(child, rank + 1);
                queue.push_back(child);
            }
        }
    }
}

/// Canonical cache key over the node id set, edge set and options.
///
/// Every id and endpoint is written with a length prefix, so ids containing
/// separator characters cannot make two different graphs share a key.
pub fn layout_key(nodes: &[FlowNode], edges: &[FlowEdge], options: &LayoutOptions) -> String {
    let mut ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    let mut links: Vec<(&str, &str)> = edges
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();
    links.sort_unstable();
    links.dedup();

    let mut hasher = Sha256::new();
    hasher.update((ids.len() as u64).to_le_bytes());
    for id in &ids {
        hash_field(&mut hasher, id.as_bytes());
    }
    hasher.update((links.len() as u64).to_le_bytes());
    for (source, target) in &links {
        hash_field(&mut hasher, source.as_bytes());
        hash_field(&mut hasher, target.as_bytes());
    }
    hasher.update([match options.direction {
        LayoutDirection::TopDown => 0u8,
        LayoutDirection::LeftRight => 1u8,
    }]);
    for value in [
        options.rank_spacing,
        options.node_spacing,
        options.center,
        options.origin,
    ] {
        hasher.update(value.to_bits().to_le_bytes());
    }
    hex::encode(hasher.finalize())
}

fn hash_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

struct CachedLayout {
    layout: Arc<GraphLayout>,
    created_at: Instant,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
}

/// TTL + LRU memo table for [`compute_layout`].
pub struct LayoutCache {
    entries: Mutex<LruCache<String, CachedLayout>>,
    stats: Mutex<CacheStats>,
    ttl: Duration,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_CACHE_TTL, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_settings(ttl, DEFAULT_CACHE_CAPACITY)
    }

    /// A zero capacity is treated as one.
    pub fn with_settings(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            stats: Mutex::new(CacheStats::default()),
            ttl,
        }
    }

    /// Return the cached layout or compute and store it.
    pub fn get_or_compute(
        &self,
        nodes: &[FlowNode],
        edges: &[FlowEdge],
        options: &LayoutOptions,
    ) -> Arc<GraphLayout> {
        let key = layout_key(nodes, edges, options);

        {
            let mut entries = self.entries.lock();
            if let Some(entry) = entries.get(&key) {
                if entry.created_at.elapsed() <= self.ttl {
                    self.stats.lock().hits += 1;
                    trace!(key = %&key[..12], "Layout cache hit");
                    return Arc::clone(&entry.layout);
                }
                entries.pop(&key);
                self.stats.lock().expired += 1;
            }
        }

        // Computed without holding the lock; a concurrent writer stores an equal value.
        let layout = Arc::new(compute_layout(nodes, edges, options));
        self.stats.lock().misses += 1;
        self.entries.lock().put(
            key,
            CachedLayout {
                layout: Arc::clone(&layout),
                created_at: Instant::now(),
            },
        );
        layout
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}
