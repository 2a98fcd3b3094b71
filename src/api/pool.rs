/*!

A bounded pool of stores sharing one schema. Stores are built up front; `checkout` hands one out, blocking until one is
free or the timeout elapses, and `release` resets it and puts it back.

Releasing a store the pool does not own, or one that is already free, is logged and the store is handed back to the
caller instead of being added to the free set.

*/

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::{
  abstractions::HashSet,
  api::cas::Cas,
  core::schema::RcCasSchema,
  debug,
  warning,
};

struct PoolState {
  free       : Vec<Cas>,
  /// Ids of every store built by this pool.
  owned      : HashSet<u64>,
  checked_out: HashSet<u64>,
}

pub struct CasPool {
  schema   : RcCasSchema,
  size     : usize,
  state    : Mutex<PoolState>,
  available: Condvar,
}

impl CasPool {
  pub fn new(size: usize, schema: RcCasSchema) -> CasPool {
    let free: Vec<Cas> = (0..size).map(|_| Cas::new(schema.clone())).collect();
    let owned          = free.iter().map(Cas::id).collect();
    debug!(2, "built a pool of {} stores", size);

    CasPool {
      schema,
      size,
      state    : Mutex::new(PoolState { free, owned, checked_out: HashSet::default() }),
      available: Condvar::new(),
    }
  }

  pub fn schema(&self) -> &RcCasSchema {
    &self.schema
  }

  pub fn size(&self) -> usize {
    self.size
  }

  /// The number of stores currently free.
  pub fn available(&self) -> usize {
    self.state.lock().free.len()
  }

  /// Takes a free store. A `timeout_ms` of zero or less waits indefinitely; otherwise `None` is returned if no store
  /// becomes free in time.
  pub fn checkout(&self, timeout_ms: i64) -> Option<Cas> {
    let deadline = (timeout_ms > 0).then(|| Instant::now() + Duration::from_millis(timeout_ms as u64));
    let mut state = self.state.lock();

    loop {
      if let Some(cas) = state.free.pop() {
        state.checked_out.insert(cas.id());
        return Some(cas);
      }

      match deadline {
        None => self.available.wait(&mut state),
        Some(deadline) => {
          if self.available.wait_until(&mut state, deadline).timed_out() && state.free.is_empty() {
            return None;
          }
        }
      }
    }
  }

  /// Resets `cas` and returns it to the free set. A store that is not checked out from this pool is returned to the
  /// caller unchanged.
  pub fn release(&self, mut cas: Cas) -> Option<Cas> {
    let mut state = self.state.lock();
    let id        = cas.id();

    if !state.owned.contains(&id) {
      warning!("a store not owned by this pool was released to it (store {})", id);
      return Some(cas);
    }
    if !state.checked_out.remove(&id) {
      warning!("a store already free was released to the pool again (store {})", id);
      return Some(cas);
    }

    cas.reset();
    state.free.push(cas);
    drop(state);
    self.available.notify_all();
    None
  }
}
