//! Provenance index: collection id → producing transform
//!
//! The wire format only stores forward references, so the producer of each
//! collection is discovered during the topological sort and recorded here.
//! Records borrow from the descriptor; the index lives for one translation.

use crate::descriptor::{BundleDescriptor, PCollection, PTransform};
use crate::error::{Result, TranslateError};
use std::collections::HashMap;

/// The transform that produces a collection
#[derive(Debug, Clone, Copy)]
pub struct Producer<'a> {
    pub transform_id: &'a str,
    pub transform: &'a PTransform,
}

/// Everything known about one collection
#[derive(Debug, Clone)]
pub struct ProvenanceRecord<'a> {
    /// Original wire metadata
    pub collection: &'a PCollection,
    /// Filled once, when the producer is drained from the sort frontier
    pub producer: Option<Producer<'a>>,
}

/// Lookup from collection id to its provenance record
#[derive(Debug, Clone, Default)]
pub struct ProvenanceIndex<'a> {
    records: HashMap<&'a str, ProvenanceRecord<'a>>,
}

impl<'a> ProvenanceIndex<'a> {
    /// Create an empty record for every collection of the descriptor
    pub fn new(descriptor: &'a BundleDescriptor) -> Self {
        let records = descriptor
            .pcollections
            .iter()
            .map(|(id, collection)| {
                (
                    id.as_str(),
                    ProvenanceRecord {
                        collection,
                        producer: None,
                    },
                )
            })
            .collect();
        Self { records }
    }

    /// Record `transform_id` as the producer of `collection`
    ///
    /// Returns `true` the first time a producer is recorded. Recording the
    /// same producer again is a no-op; a different producer is an error.
    pub fn record_producer(
        &mut self,
        collection: &str,
        transform_id: &'a str,
        transform: &'a PTransform,
    ) -> Result<bool> {
        let record = self
            .records
            .get_mut(collection)
            .ok_or_else(|| TranslateError::unknown_collection(transform_id, collection))?;

        match record.producer {
            Some(existing) if existing.transform_id == transform_id => Ok(false),
            Some(existing) => Err(TranslateError::DuplicateProducer {
                collection: collection.to_string(),
                first: existing.transform_id.to_string(),
                second: transform_id.to_string(),
            }),
            None => {
                tracing::trace!(collection, producer = transform_id, "recorded producer");
                record.producer = Some(Producer {
                    transform_id,
                    transform,
                });
                Ok(true)
            }
        }
    }

    pub fn get(&self, collection: &str) -> Option<&ProvenanceRecord<'a>> {
        self.records.get(collection)
    }

    pub fn producer(&self, collection: &str) -> Option<Producer<'a>> {
        self.records.get(collection).and_then(|record| record.producer)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Collections whose producer has been discovered
    pub fn produced(&self) -> usize {
        self.records
            .values()
            .filter(|record| record.producer.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::CoderSpec;
    use crate::urn;

    fn descriptor() -> BundleDescriptor {
        BundleDescriptor::builder("b")
            .coder("c", CoderSpec::new(urn::CODER_BYTES))
            .pcollection("pc1", "c")
            .pcollection("pc2", "c")
            .transform("a", PTransform::new(urn::DATA_SOURCE, vec![]).with_output("o", "pc1"))
            .transform("b", PTransform::new(urn::DATA_SOURCE, vec![]).with_output("o", "pc1"))
            .build()
    }

    #[test]
    fn test_records_start_empty() {
        let descriptor = descriptor();
        let index = ProvenanceIndex::new(&descriptor);

        assert_eq!(index.len(), 2);
        assert_eq!(index.produced(), 0);
        assert!(index.producer("pc1").is_none());
        assert_eq!(index.get("pc2").unwrap().collection.coder_id, "c");
    }

    #[test]
    fn test_record_once() {
        let descriptor = descriptor();
        let mut index = ProvenanceIndex::new(&descriptor);
        let a = &descriptor.transforms["a"];

        assert!(index.record_producer("pc1", "a", a).unwrap());
        assert!(!index.record_producer("pc1", "a", a).unwrap());
        assert_eq!(index.producer("pc1").unwrap().transform_id, "a");
        assert_eq!(index.produced(), 1);
    }

    #[test]
    fn test_conflicting_producers() {
        let descriptor = descriptor();
        let mut index = ProvenanceIndex::new(&descriptor);

        index
            .record_producer("pc1", "a", &descriptor.transforms["a"])
            .unwrap();
        let err = index
            .record_producer("pc1", "b", &descriptor.transforms["b"])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "collection 'pc1' is produced by both 'a' and 'b'"
        );
    }

    #[test]
    fn test_unknown_collection() {
        let descriptor = descriptor();
        let mut index = ProvenanceIndex::new(&descriptor);

        assert!(matches!(
            index.record_producer("nope", "a", &descriptor.transforms["a"]),
            Err(TranslateError::UnknownCollection { .. })
        ));
    }
}
