/*!

The linear type order is a total order on all types that sorted indexes can use as a key (the "type priority" key).
It is assembled from priority lists, each of which says its types should be ordered as listed.

The builder keeps a graph of pairwise constraints. Adding a constraint that contradicts an existing path is rejected
immediately as a cycle. When the order is produced, types that appear in no list inherit the constraints of their
nearest constrained ancestor, so a subtype of a high priority type is also high priority. The constraint graph is then
sorted topologically, breaking ties by type code.

*/

use std::cmp::Ordering;
use std::collections::BTreeSet;

use thiserror::Error;

use crate::{
  abstractions::NatSet,
  core::type_system::{builtins::TOP, RcTypeSystem, TypeCode},
};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TypeOrderError {
  #[error("the priority of \"{first}\" over \"{second}\" contradicts earlier priorities")]
  Cycle {
    first : String,
    second: String,
  },
}

pub struct LinearTypeOrderBuilder {
  type_system : RcTypeSystem,
  successors  : Vec<BTreeSet<TypeCode>>,
  predecessors: Vec<BTreeSet<TypeCode>>,
}

impl LinearTypeOrderBuilder {
  pub fn new(type_system: RcTypeSystem) -> LinearTypeOrderBuilder {
    let count = type_system.len();
    LinearTypeOrderBuilder {
      type_system,
      successors  : vec![BTreeSet::new(); count],
      predecessors: vec![BTreeSet::new(); count],
    }
  }

  /// Whether no constraint has been added.
  pub fn is_empty(&self) -> bool {
    self.successors.iter().all(|s| s.is_empty())
  }

  /// Requires each type in `types` to precede the next.
  pub fn add(&mut self, types: &[TypeCode]) -> Result<(), TypeOrderError> {
    for pair in types.windows(2) {
      let (first, second) = (pair[0], pair[1]);
      if first == second || self.path_exists(first, second) {
        continue;
      }
      if self.path_exists(second, first) {
        return Err(TypeOrderError::Cycle {
          first : self.type_system.type_name(first).to_string(),
          second: self.type_system.type_name(second).to_string(),
        });
      }
      self.connect(first, second);
    }
    Ok(())
  }

  fn connect(&mut self, from: TypeCode, to: TypeCode) {
    self.successors[from.idx()].insert(to);
    self.predecessors[to.idx()].insert(from);
  }

  fn path_exists(&self, from: TypeCode, to: TypeCode) -> bool {
    let mut visited = NatSet::with_capacity(self.successors.len());
    let mut stack   = vec![from];
    while let Some(node) = stack.pop() {
      if node == to {
        return true;
      }
      if visited.insert(node.idx()) {
        stack.extend(self.successors[node.idx()].iter().copied());
      }
    }
    false
  }

  /// Produces the total order.
  pub fn order(&self) -> LinearTypeOrder {
    let was_empty        = self.is_empty();
    let mut successors   = self.successors.clone();
    let mut predecessors = self.predecessors.clone();
    let count            = successors.len();

    // Unconstrained types inherit the constraints of their nearest constrained ancestors.
    for bottom in 0..count {
      let mut current    = TypeCode(bottom as u32);
      let mut in_source  = None;
      let mut out_source = None;
      let mut to_modify  = Vec::new();
      loop {
        if in_source.is_none() && !predecessors[current.idx()].is_empty() {
          in_source = Some(current);
        }
        if out_source.is_none() && !successors[current.idx()].is_empty() {
          out_source = Some(current);
        }
        if (in_source.is_some() && out_source.is_some()) || current == TOP {
          break;
        }
        to_modify.push(current);
        match self.type_system.supertype(current) {
          Some(supertype) => current = supertype,
          None            => break,
        }
      }

      let (mut do_in, mut do_out) = (true, true);
      for node in to_modify {
        if let (true, Some(source)) = (do_in, in_source) {
          if predecessors[node.idx()].is_empty() {
            let inherited: Vec<TypeCode> = predecessors[source.idx()].iter().copied().collect();
            for predecessor in inherited {
              predecessors[node.idx()].insert(predecessor);
              successors[predecessor.idx()].insert(node);
            }
          } else {
            do_in = false;
          }
        }
        if let (true, Some(source)) = (do_out, out_source) {
          if successors[node.idx()].is_empty() {
            let inherited: Vec<TypeCode> = successors[source.idx()].iter().copied().collect();
            for successor in inherited {
              successors[node.idx()].insert(successor);
              predecessors[successor.idx()].insert(node);
            }
          } else {
            do_out = false;
          }
        }
      }
    }

    // Topological sort, lowest code first among the ready nodes.
    let mut in_degree: Vec<usize> = predecessors.iter().map(|p| p.len()).collect();
    let mut ready: BTreeSet<TypeCode> = (0..count)
        .filter(|i| in_degree[*i] == 0)
        .map(|i| TypeCode(i as u32))
        .collect();
    let mut order  = Vec::with_capacity(count);
    let mut placed = NatSet::with_capacity(count);

    while let Some(node) = ready.pop_first() {
      order.push(node);
      placed.insert(node.idx());
      for successor in successors[node.idx()].iter() {
        in_degree[successor.idx()] -= 1;
        if in_degree[successor.idx()] == 0 {
          ready.insert(*successor);
        }
      }
    }
    // Inherited constraints can in principle close a cycle. Anything left goes last, in code order.
    order.extend(
      (0..count)
          .filter(|i| !placed.contains(*i))
          .map(|i| TypeCode(i as u32))
    );

    LinearTypeOrder::from_order(order, was_empty)
  }
}

/// A total order on the types of one type system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearTypeOrder {
  order   : Vec<TypeCode>,
  rank    : Vec<u32>,
  is_empty: bool,
}

impl LinearTypeOrder {
  fn from_order(order: Vec<TypeCode>, is_empty: bool) -> LinearTypeOrder {
    let mut rank = vec![0; order.len()];
    for (position, code) in order.iter().enumerate() {
      rank[code.idx()] = position as u32;
    }
    LinearTypeOrder { order, rank, is_empty }
  }

  /// The order used when no priorities are declared: type code order.
  pub fn by_code(type_count: usize) -> LinearTypeOrder {
    LinearTypeOrder::from_order((0..type_count).map(|i| TypeCode(i as u32)).collect(), true)
  }

  pub fn order(&self) -> &[TypeCode] {
    &self.order
  }

  /// Whether no priorities were declared.
  pub fn is_empty_order(&self) -> bool {
    self.is_empty
  }

  pub fn less_than(&self, a: TypeCode, b: TypeCode) -> bool {
    self.rank[a.idx()] < self.rank[b.idx()]
  }

  pub fn compare(&self, a: TypeCode, b: TypeCode) -> Ordering {
    self.rank[a.idx()].cmp(&self.rank[b.idx()])
  }
}
