//! Ordering of detected traits by their requirements.

use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use super::{TraitError, TraitKind};

/// Order detected traits so every trait runs after the traits it requires.
///
/// Kahn's algorithm over the requirement graph; whenever several traits are
/// ready the one declared first in the catalog goes next. A requirement group
/// with no detected member is an error.
pub fn order(detected: &[TraitKind]) -> Result<Vec<TraitKind>, TraitError> {
  let mut kinds = detected.to_vec();
  kinds.sort();
  kinds.dedup();

  let mut graph: DiGraph<TraitKind, ()> = DiGraph::new();
  let nodes: HashMap<TraitKind, NodeIndex> = kinds.iter().map(|k| (*k, graph.add_node(*k))).collect();

  for kind in &kinds {
    for group in kind.requirements() {
      let present: Vec<&TraitKind> = group.iter().filter(|r| nodes.contains_key(r)).collect();
      if present.is_empty() {
        return Err(TraitError::MissingRequirement {
          name: *kind,
          alternatives: group.iter().map(|k| k.name()).collect::<Vec<_>>().join(", "),
        });
      }
      // Edge from requirement to dependent
      for required in present {
        graph.add_edge(nodes[required], nodes[kind], ());
      }
    }
  }

  let mut in_degree: HashMap<NodeIndex, usize> = graph
    .node_indices()
    .map(|idx| (idx, graph.neighbors_directed(idx, Direction::Incoming).count()))
    .collect();
  let mut ready: BTreeSet<TraitKind> = kinds
    .iter()
    .filter(|k| in_degree[&nodes[*k]] == 0)
    .copied()
    .collect();

  let mut ordered = Vec::with_capacity(kinds.len());
  while let Some(kind) = ready.pop_first() {
    ordered.push(kind);
    for next in graph.neighbors_directed(nodes[&kind], Direction::Outgoing) {
      if let Some(degree) = in_degree.get_mut(&next) {
        *degree -= 1;
        if *degree == 0 {
          ready.insert(graph[next]);
        }
      }
    }
  }

  if ordered.len() != kinds.len() {
    return Err(TraitError::Cycle);
  }
  Ok(ordered)
}

#[cfg(test)]
mod tests {
  use super::*;
  use TraitKind::*;

  #[test]
  fn requirements_come_first() {
    assert_eq!(order(&[Rails, Bundler, War, CompiledGems]).unwrap(), vec![War, Rails, Bundler, CompiledGems]);
    assert_eq!(order(&[NoGemspec, CompiledGems, Jar]).unwrap(), vec![Jar, NoGemspec, CompiledGems]);
  }

  #[test]
  fn declaration_order_breaks_ties() {
    assert_eq!(
      order(&[JBundler, Bundler, Rack, War]).unwrap(),
      vec![War, Rack, Bundler, JBundler]
    );
  }

  #[test]
  fn any_alternative_satisfies_a_group() {
    assert_eq!(order(&[Jar, Bundler]).unwrap(), vec![Jar, Bundler]);
    assert_eq!(order(&[War, Bundler]).unwrap(), vec![War, Bundler]);
  }

  #[test]
  fn unsatisfied_requirement_is_an_error() {
    let err = order(&[Rails]).unwrap_err();
    assert!(matches!(err, TraitError::MissingRequirement { name: Rails, .. }));
    assert!(err.to_string().contains("[War]"));

    let err = order(&[CompiledGems]).unwrap_err();
    assert!(err.to_string().contains("[War, Jar]"));
  }

  #[test]
  fn absent_traits_are_not_ordered() {
    assert_eq!(order(&[]).unwrap(), Vec::<TraitKind>::new());
    assert_eq!(order(&[War, War]).unwrap(), vec![War]);
  }
}
