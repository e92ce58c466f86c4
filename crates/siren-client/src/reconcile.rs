//! Folds pushed events into the local alert collection.

use siren_types::AlertRecord;

use crate::bus::SyncEvent;

/// Ordered, id-keyed collection of alert records. New ids are inserted at
/// the front (most recent first); updates replace in place so a record keeps
/// its position for the life of its id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertCollection {
    records: Vec<AlertRecord>,
}

impl AlertCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[AlertRecord] {
        &self.records
    }

    pub fn get(&self, id: i64) -> Option<&AlertRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Apply one event. Each case either swaps a whole record or changes
    /// nothing; later events for an id always win over earlier ones.
    pub fn apply(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::InitialSnapshot(records) => self.replace_all(records),
            SyncEvent::RecordCreated(record) | SyncEvent::RecordUpdated(record) => {
                // Re-delivered creations and out-of-order updates for unknown
                // ids are both treated as upserts, not errors.
                self.upsert(record.clone());
            }
            SyncEvent::RecordDeleted(id) => self.remove(*id),
            SyncEvent::Notify(_) => {}
        }
    }

    /// Replace the whole collection. If the snapshot repeats an id, the last
    /// occurrence's payload wins, at the first occurrence's position.
    fn replace_all(&mut self, incoming: &[AlertRecord]) {
        let mut records: Vec<AlertRecord> = Vec::with_capacity(incoming.len());
        for record in incoming {
            match records.iter().position(|r| r.id == record.id) {
                Some(pos) => records[pos] = record.clone(),
                None => records.push(record.clone()),
            }
        }
        self.records = records;
    }

    fn upsert(&mut self, record: AlertRecord) {
        match self.records.iter().position(|r| r.id == record.id) {
            Some(pos) => self.records[pos] = record,
            None => self.records.insert(0, record),
        }
    }

    fn remove(&mut self, id: i64) {
        self.records.retain(|r| r.id != id);
    }
}
