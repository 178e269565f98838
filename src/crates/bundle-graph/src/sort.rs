//! Topological ordering of a bundle's transforms
//!
//! Kahn-style, level by level: every transform starts with a pending count
//! equal to its declared input slots, and transforms with nothing pending
//! seed the frontier. Draining a transform records it as the producer of
//! each of its outputs in the [`ProvenanceIndex`] and decrements the pending
//! count of every consumer slot wired to those outputs; a consumer reaching
//! zero joins the back of the frontier.
//!
//! Transforms that never reach zero are either on a cycle or wait on a
//! collection nobody produces; both are reported as
//! [`TranslateError::BundleHasCycle`].
//!
//! Roots, outputs and consumers are all visited in sorted id/name order, so
//! the resulting sequence is deterministic for a given descriptor.

use crate::config::ConsumerLookup;
use crate::descriptor::BundleDescriptor;
use crate::error::{Result, TranslateError};
use crate::provenance::ProvenanceIndex;
use std::collections::{HashMap, VecDeque};

/// Output of the sort: a producer-first transform order plus provenance
#[derive(Debug, Clone)]
pub struct SortedBundle<'a> {
    /// Transform ids, each after every transform producing one of its inputs
    pub order: Vec<&'a str>,
    /// Producer of every collection that has one
    pub provenance: ProvenanceIndex<'a>,
}

/// Sort `descriptor`'s transforms so producers precede consumers
///
/// # Errors
///
/// - [`TranslateError::RootlessBundle`] when there are no transforms
/// - [`TranslateError::UnknownCollection`] on a dangling collection reference
/// - [`TranslateError::DuplicateProducer`] when two transforms output one collection
/// - [`TranslateError::BundleHasCycle`] when some transforms can't be ordered
///
/// # Example
///
/// ```rust
/// use bundle_graph::config::ConsumerLookup;
/// use bundle_graph::descriptor::{BundleDescriptor, CoderSpec, PTransform};
/// use bundle_graph::sort::topological_sort;
/// use bundle_graph::urn;
///
/// let descriptor = BundleDescriptor::builder("b")
///     .coder("c", CoderSpec::new(urn::CODER_BYTES))
///     .pcollection("pc1", "c")
///     .transform("write", PTransform::new(urn::DATA_SINK, vec![]).with_input("i", "pc1"))
///     .transform("read", PTransform::new(urn::DATA_SOURCE, vec![]).with_output("o", "pc1"))
///     .build();
///
/// let sorted = topological_sort(&descriptor, ConsumerLookup::Indexed).unwrap();
/// assert_eq!(sorted.order, vec!["read", "write"]);
/// assert_eq!(sorted.provenance.producer("pc1").unwrap().transform_id, "read");
/// ```
pub fn topological_sort(
    descriptor: &BundleDescriptor,
    lookup: ConsumerLookup,
) -> Result<SortedBundle<'_>> {
    if descriptor.transforms.is_empty() {
        return Err(TranslateError::RootlessBundle);
    }
    descriptor.check_references()?;

    let ids = descriptor.transform_ids();
    let mut provenance = ProvenanceIndex::new(descriptor);
    let mut pending: HashMap<&str, usize> = ids
        .iter()
        .map(|id| (*id, descriptor.transforms[*id].inputs.len()))
        .collect();

    let index = match lookup {
        ConsumerLookup::Indexed => Some(ConsumerIndex::build(descriptor, &ids)),
        ConsumerLookup::Scan => None,
    };

    let mut frontier: VecDeque<&str> = ids
        .iter()
        .copied()
        .filter(|id| pending[id] == 0)
        .collect();
    tracing::debug!(roots = frontier.len(), transforms = ids.len(), "sorting bundle");

    let mut order = Vec::with_capacity(ids.len());
    while let Some(id) = frontier.pop_front() {
        order.push(id);
        let transform = &descriptor.transforms[id];

        for (_, collection) in transform.sorted_outputs() {
            provenance.record_producer(collection, id, transform)?;

            let consumers = match &index {
                Some(index) => index.consumers(collection).to_vec(),
                None => scan_consumers(descriptor, &ids, collection),
            };
            // A producer aliasing one collection under two output names
            // decrements twice; binding rejects that consumer later.
            for consumer in consumers {
                match pending.get_mut(consumer) {
                    Some(count) if *count > 0 => {
                        *count -= 1;
                        if *count == 0 {
                            frontier.push_back(consumer);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    if order.len() != ids.len() {
        let unresolved: Vec<String> = ids
            .iter()
            .filter(|id| pending[*id] > 0)
            .map(|id| id.to_string())
            .collect();
        return Err(TranslateError::BundleHasCycle {
            ordered: order.len(),
            total: ids.len(),
            unresolved,
        });
    }

    Ok(SortedBundle { order, provenance })
}

/// Consumer slots of `collection`, found by scanning every transform
///
/// One entry per matching input slot, so a transform wired twice to the same
/// collection appears twice.
fn scan_consumers<'a>(
    descriptor: &'a BundleDescriptor,
    ids: &[&'a str],
    collection: &str,
) -> Vec<&'a str> {
    let mut consumers = Vec::new();
    for id in ids {
        for (_, input) in descriptor.transforms[*id].sorted_inputs() {
            if input == collection {
                consumers.push(*id);
            }
        }
    }
    consumers
}

/// Precomputed collection → consumer slots, in the same order a scan yields
struct ConsumerIndex<'a> {
    consumers: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> ConsumerIndex<'a> {
    fn build(descriptor: &'a BundleDescriptor, ids: &[&'a str]) -> Self {
        let mut consumers: HashMap<&'a str, Vec<&'a str>> = HashMap::new();
        for id in ids {
            for (_, input) in descriptor.transforms[*id].sorted_inputs() {
                consumers.entry(input).or_default().push(*id);
            }
        }
        Self { consumers }
    }

    fn consumers(&self, collection: &str) -> &[&'a str] {
        self.consumers
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
