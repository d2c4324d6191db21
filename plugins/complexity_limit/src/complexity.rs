use std::collections::{HashMap, HashSet};

use graphql_parser::query::Selection;
use switchyard_common::graphql::{
  find_fragment, root_selection_set, ParsedGraphQLDocument, ParsedOperationDefinition,
  ParsedSelectionSet,
};

/// Counts the fields selected by `operation`, expanding fragments from `document`.
///
/// A fragment spread that refers back to a fragment being expanded counts as zero, as do
/// spreads of unknown fragments. Each fragment is expanded once per operation and the total
/// saturates at `usize::MAX`.
pub fn operation_complexity(
  document: &ParsedGraphQLDocument,
  operation: &ParsedOperationDefinition,
) -> usize {
  ComplexityWalker {
    document,
    expanding: HashSet::new(),
    fragments: HashMap::new(),
  }
  .selection_set(root_selection_set(operation))
}

struct ComplexityWalker<'a> {
  document: &'a ParsedGraphQLDocument,
  expanding: HashSet<&'a str>,
  fragments: HashMap<&'a str, usize>,
}

impl<'a> ComplexityWalker<'a> {
  fn selection_set(&mut self, selection_set: &'a ParsedSelectionSet) -> usize {
    let mut complexity: usize = 0;

    for selection in selection_set.items.iter() {
      let selection_complexity = match selection {
        Selection::Field(field) => 1usize.saturating_add(self.selection_set(&field.selection_set)),
        Selection::InlineFragment(inline) => self.selection_set(&inline.selection_set),
        Selection::FragmentSpread(spread) => self.fragment(spread.fragment_name.as_str()),
      };

      complexity = complexity.saturating_add(selection_complexity);
    }

    complexity
  }

  fn fragment(&mut self, name: &'a str) -> usize {
    if let Some(complexity) = self.fragments.get(name) {
      return *complexity;
    }

    if !self.expanding.insert(name) {
      return 0;
    }

    let document = self.document;
    let complexity = find_fragment(document, name)
      .map(|fragment| self.selection_set(&fragment.selection_set))
      .unwrap_or_default();

    self.expanding.remove(name);
    self.fragments.insert(name, complexity);

    complexity
  }
}
