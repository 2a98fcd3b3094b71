/*!

A cache of compiled schemas keyed by the definitions they were built from. Merging and installing are the expensive
part of creating a store, and applications tend to create many stores from the same few definitions.

The cache is an ordinary owned value: whoever creates it decides its lifetime and passes it where it is needed. Entries
expire `ttl` after their last use. Expiry is checked lazily when an entry is looked up, and `evict_expired` sweeps all
entries at a time of the caller's choosing.

*/

use std::{
  collections::hash_map::DefaultHasher,
  hash::{Hash, Hasher},
  time::{Duration, Instant},
};

use crate::{
  abstractions::HashMap,
  core::{
    description::CasDefinition,
    schema::{CasSchema, RcCasSchema},
    type_system::SchemaError,
  },
  trace,
};

struct CacheEntry {
  schema   : RcCasSchema,
  last_used: Instant,
}

pub struct SchemaCache {
  ttl    : Duration,
  entries: HashMap<u64, CacheEntry>,
}

impl SchemaCache {
  pub fn new(ttl: Duration) -> SchemaCache {
    SchemaCache {
      ttl,
      entries: HashMap::default(),
    }
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }

  /// Returns the cached schema for `definitions`, building and caching it on a miss.
  pub fn get_or_create(&mut self, definitions: &[CasDefinition]) -> Result<RcCasSchema, SchemaError> {
    self.get_or_create_at(definitions, Instant::now())
  }

  /// Like `get_or_create`, with the current time supplied by the caller.
  pub fn get_or_create_at(&mut self, definitions: &[CasDefinition], now: Instant) -> Result<RcCasSchema, SchemaError> {
    if let Some(schema) = self.get_at(definitions, now) {
      return Ok(schema);
    }

    let schema = CasSchema::from_definitions(definitions)?;
    self.entries.insert(
      definitions_key(definitions),
      CacheEntry { schema: schema.clone(), last_used: now }
    );
    Ok(schema)
  }

  /// Looks up `definitions` without building. An expired entry is removed and reported as absent.
  pub fn get_at(&mut self, definitions: &[CasDefinition], now: Instant) -> Option<RcCasSchema> {
    let key = definitions_key(definitions);
    let expired = match self.entries.get(&key) {
      None        => return None,
      Some(entry) => self.is_expired(entry, now),
    };

    if expired {
      trace!(2, "schema cache entry {:016x} expired", key);
      self.entries.remove(&key);
      return None;
    }

    let entry = self.entries.get_mut(&key)?;
    entry.last_used = now;
    Some(entry.schema.clone())
  }

  /// Removes every entry not used within the time-to-live. Returns the number removed.
  pub fn evict_expired(&mut self, now: Instant) -> usize {
    let before = self.entries.len();
    let ttl    = self.ttl;
    self.entries.retain(|_, entry| now.saturating_duration_since(entry.last_used) < ttl);
    before - self.entries.len()
  }

  fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
    now.saturating_duration_since(entry.last_used) >= self.ttl
  }
}

fn definitions_key(definitions: &[CasDefinition]) -> u64 {
  let mut hasher = DefaultHasher::new();
  definitions.hash(&mut hasher);
  hasher.finish()
}


#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::core::description::TypeSystemDescription;

  fn definitions() -> Vec<CasDefinition> {
    let mut ts = TypeSystemDescription::new();
    ts.add_type("org.example.Token", None, "uima.tcas.Annotation");
    vec![CasDefinition::new(ts)]
  }

  #[test]
  fn hits_share_the_schema() {
    let mut cache = SchemaCache::new(Duration::from_secs(60));
    let now       = Instant::now();
    let first     = cache.get_or_create_at(&definitions(), now).unwrap();
    let second    = cache.get_or_create_at(&definitions(), now + Duration::from_secs(10)).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn entries_expire_after_last_use() {
    let mut cache = SchemaCache::new(Duration::from_secs(60));
    let start     = Instant::now();
    let first     = cache.get_or_create_at(&definitions(), start).unwrap();

    // Used again at 50s, so still alive at 100s.
    assert!(cache.get_at(&definitions(), start + Duration::from_secs(50)).is_some());
    assert!(cache.get_at(&definitions(), start + Duration::from_secs(100)).is_some());

    let rebuilt = cache.get_or_create_at(&definitions(), start + Duration::from_secs(200)).unwrap();
    assert!(!Arc::ptr_eq(&first, &rebuilt));
  }

  #[test]
  fn explicit_sweep() {
    let mut cache = SchemaCache::new(Duration::from_secs(1));
    let start     = Instant::now();
    cache.get_or_create_at(&definitions(), start).unwrap();
    cache.get_or_create_at(&[], start).unwrap();
    assert_eq!(cache.len(), 2);

    assert_eq!(cache.evict_expired(start), 0);
    assert_eq!(cache.evict_expired(start + Duration::from_secs(2)), 2);
    assert!(cache.is_empty());
  }

  #[test]
  fn failures_are_not_cached() {
    let mut ts = TypeSystemDescription::new();
    ts.add_type("org.example.Orphan", None, "org.example.Missing");
    let mut cache = SchemaCache::new(Duration::from_secs(60));
    assert!(cache.get_or_create(&[CasDefinition::new(ts)]).is_err());
    assert!(cache.is_empty());
  }
}
