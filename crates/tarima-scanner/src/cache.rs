use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

struct CacheEntry<V> {
  observed_at: Instant,
  value: Arc<V>,
}

/// Caché por directorio con ventana de caducidad y capacidad acotada.
///
/// Pertenece a una instancia de scanner (no es global). Las lecturas toman
/// el lock compartido; inserción y desalojo van juntos bajo el lock
/// exclusivo, así que nunca se pisan.
///
/// La caché no comprueba que el directorio exista: quien llama debe
/// confirmarlo antes de fiarse de una entrada.
pub struct DirectoryCache<V> {
  entries: RwLock<HashMap<PathBuf, CacheEntry<V>>>,
  staleness: Duration,
  capacity: usize,
  eviction_fraction: f64,
}

impl<V> DirectoryCache<V> {
  pub fn new(staleness: Duration, capacity: usize, eviction_fraction: f64) -> Self {
    Self {
      entries: RwLock::new(HashMap::new()),
      staleness,
      capacity: capacity.max(1),
      eviction_fraction: eviction_fraction.clamp(0.0, 1.0),
    }
  }

  /// Valor cacheado si la entrada es más joven que la ventana de caducidad.
  pub fn get_fresh(&self, dir: &Path) -> Option<Arc<V>> {
    self.get_fresh_at(dir, Instant::now())
  }

  pub(crate) fn get_fresh_at(&self, dir: &Path, now: Instant) -> Option<Arc<V>> {
    let entries = self.entries.read().ok()?;
    let entry = entries.get(dir)?;
    let age = now.saturating_duration_since(entry.observed_at);
    (age < self.staleness).then(|| Arc::clone(&entry.value))
  }

  pub fn insert(&self, dir: PathBuf, value: V) -> Arc<V> {
    self.insert_at(dir, value, Instant::now())
  }

  pub(crate) fn insert_at(&self, dir: PathBuf, value: V, observed_at: Instant) -> Arc<V> {
    let value = Arc::new(value);
    let Ok(mut entries) = self.entries.write() else {
      tracing::warn!("directory cache lock poisoned, skipping insert");
      return value;
    };

    entries.insert(dir, CacheEntry { observed_at, value: Arc::clone(&value) });

    if entries.len() > self.capacity {
      let evict = ((entries.len() as f64) * self.eviction_fraction).ceil().max(1.0) as usize;
      let mut by_age: Vec<(PathBuf, Instant)> = entries.iter().map(|(p, e)| (p.clone(), e.observed_at)).collect();
      by_age.sort_by_key(|(_, at)| *at);
      for (path, _) in by_age.into_iter().take(evict) {
        entries.remove(&path);
      }
      tracing::debug!(evicted = evict, remaining = entries.len(), "directory cache eviction");
    }

    value
  }

  pub fn invalidate(&self, dir: &Path) {
    if let Ok(mut entries) = self.entries.write() {
      entries.remove(dir);
    }
  }

  pub fn clear(&self) {
    if let Ok(mut entries) = self.entries.write() {
      entries.clear();
    }
  }

  pub fn len(&self) -> usize {
    self.entries.read().map(|e| e.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
