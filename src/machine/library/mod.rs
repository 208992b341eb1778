//! Built-in algorithm library
//!
//! Every descriptor is validated when the library is built, so a broken table
//! is reported once at startup instead of mid-trace.

mod arrays;
mod basics;
mod numeric;
mod structures;

use crate::machine::descriptor::{Descriptor, DescriptorError};
use rustc_hash::FxHashMap;

/// Registry of descriptors by id, listed in authoring order
#[derive(Clone, Default)]
pub struct Library {
    descriptors: FxHashMap<&'static str, Descriptor>,
    order: Vec<&'static str>,
}

impl Library {
    /// All built-in algorithms
    pub fn standard() -> Result<Self, DescriptorError> {
        Library::from_descriptors(vec![
            basics::variable_swap(),
            basics::fizz_buzz(),
            arrays::array_sum(),
            numeric::gcd_subtraction(),
            basics::expression_eval(),
            numeric::bit_reverse(),
            numeric::recursive_factorial(),
            structures::priority_queue(),
            structures::binary_tree_traversal(),
            structures::linked_list_delete(),
            structures::linked_list_append(),
            arrays::bin_sort(),
            arrays::similarity_ratio(),
            arrays::binary_search(),
            arrays::five_number_summary(),
            basics::minimax(),
            numeric::utf8_encode(),
            basics::admission_fee(),
            arrays::array_reverse(),
        ])
    }

    pub fn from_descriptors(descriptors: Vec<Descriptor>) -> Result<Self, DescriptorError> {
        let mut library = Library::default();
        for descriptor in descriptors {
            descriptor.validate()?;
            let id = descriptor.id;
            if library.descriptors.insert(id, descriptor).is_some() {
                return Err(DescriptorError::DuplicateId { id });
            }
            library.order.push(id);
        }
        tracing::debug!(count = library.order.len(), "algorithm library built");
        Ok(library)
    }

    pub fn get(&self, id: &str) -> Option<&Descriptor> {
        self.descriptors.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> + '_ {
        self.order.iter().filter_map(|id| self.descriptors.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_library_builds() {
        let library = Library::standard().expect("valid tables");
        assert_eq!(library.len(), 19);
        assert_eq!(library.ids().next(), Some("variable_swap"));
        assert!(library.get("binary_search").is_some());
        assert!(library.get("bogus").is_none());
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let result = Library::from_descriptors(vec![basics::variable_swap(), basics::variable_swap()]);
        assert!(matches!(
            result,
            Err(DescriptorError::DuplicateId { id: "variable_swap" })
        ));
    }
}
