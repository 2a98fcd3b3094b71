use std::iter::once;
use std::fmt::Display;

/**
Join an iterator of items with a separator produced from the previous item. There is no such adapter in the stdlib.
(C.f. `Vec::join(…)`)

Usage:

    use casgraph::abstractions::join_iter;

    let iter = ["uima", "tcas", "Annotation"].iter().cloned();
    let joined = join_iter(iter, |_| ".").collect::<String>();
    assert_eq!(joined, "uima.tcas.Annotation");
 */
pub fn join_iter<T>(mut iter: impl Iterator<Item = T>, sep: impl Fn(&T) -> T)
                    -> impl Iterator<Item = T>
{
  iter
      .next()
      .into_iter()
      .chain(iter.flat_map(move |s| once(sep(&s)).chain(once(s))))
}

/// Join a list of things that can be displayed as string with a given separator.
///
/// This is a convenience function that defers to `join_iter`.
pub fn join_string<T: Display>(iter: impl Iterator<Item = T>, sep: &str) -> String {
  join_iter(iter.map(|t| t.to_string()), |_| sep.to_string()).collect::<String>()
}

/// Joins items as a comma separated list of double-quoted names, the form used in diagnostics that list types.
pub fn join_quoted<T: Display>(iter: impl Iterator<Item = T>) -> String {
  join_string(iter.map(|t| format!("\"{}\"", t)), ", ")
}

#[cfg(test)]
mod tests {
  use crate::abstractions::string_join::{join_iter, join_quoted, join_string};

  #[test]
  fn join_iter_test() {
    let iter = ["org", "example", "Token"].iter().cloned();
    let joined = join_iter(iter, |_| ".").collect::<String>();
    assert_eq!(joined, "org.example.Token");
  }

  #[test]
  fn join_string_test(){
    let list = [1, 3, 5, 7, 9];
    let joined = join_string(list.iter(), " ");
    assert_eq!(joined, "1 3 5 7 9");
  }

  #[test]
  fn join_quoted_test() {
    let joined = join_quoted(["a.B", "a.C"].iter());
    assert_eq!(joined, "\"a.B\", \"a.C\"");
    assert_eq!(join_quoted(Vec::<&str>::new().iter()), "");
  }
}
