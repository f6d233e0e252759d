//! Tutor availability: the ordered list of slots, its validation rules, and
//! whole-list persistence under a single key.
//!
//! Slots are identified by position. Every successful mutation rewrites the
//! complete list; if that write fails the in-memory change is undone and the
//! error is returned.

use chrono::NaiveDate;

use crate::error::{Result, TutordeskError};
use crate::model::{AvailabilitySlot, TimeOfDay};
use crate::storage::KvStore;

pub struct AvailabilityManager<S: KvStore> {
    store: S,
    key: String,
    slots: Vec<AvailabilitySlot>,
}

impl<S: KvStore> AvailabilityManager<S> {
    /// Load the persisted list. Absent → empty. Unreadable or malformed data
    /// is logged and also treated as empty.
    pub fn load(store: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let slots = match read_slots(&store, &key) {
            Ok(slots) => slots,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "falling back to empty availability");
                Vec::new()
            }
        };
        Self { store, key, slots }
    }

    /// Slots in insertion order.
    pub fn slots(&self) -> &[AvailabilitySlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Validate, append and persist.
    pub fn add_slot(&mut self, candidate: AvailabilitySlot) -> Result<()> {
        candidate.validate_range()?;
        if self.find_conflict(&candidate).is_some() {
            return Err(TutordeskError::OverlapConflict {
                day: candidate.day.label(),
                start: candidate.start,
                end: candidate.end,
            });
        }

        self.slots.push(candidate);
        if let Err(e) = self.persist() {
            self.slots.pop();
            return Err(e);
        }

        if let Some(slot) = self.slots.last() {
            tracing::debug!(day = %slot.day, start = %slot.start, end = %slot.end, "slot added");
        }
        Ok(())
    }

    /// Add a slot from the create-schedule editor (date + recurring toggle).
    pub fn add_draft(
        &mut self,
        date: NaiveDate,
        recurring: bool,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<AvailabilitySlot> {
        let slot = AvailabilitySlot::from_draft(date, recurring, start, end);
        self.add_slot(slot.clone())?;
        Ok(slot)
    }

    /// Remove the slot at `index`. Negative or past-the-end positions fail
    /// with `IndexOutOfRange`.
    pub fn remove_slot(&mut self, index: i64) -> Result<AvailabilitySlot> {
        let len = self.slots.len();
        let position = usize::try_from(index)
            .ok()
            .filter(|i| *i < len)
            .ok_or(TutordeskError::IndexOutOfRange { index, len })?;

        let removed = self.slots.remove(position);
        if let Err(e) = self.persist() {
            self.slots.insert(position, removed);
            return Err(e);
        }

        tracing::debug!(index, day = %removed.day, "slot removed");
        Ok(removed)
    }

    /// First existing slot that conflicts with `candidate`.
    pub fn find_conflict(&self, candidate: &AvailabilitySlot) -> Option<&AvailabilitySlot> {
        self.slots.iter().find(|s| s.overlaps(candidate))
    }

    fn persist(&self) -> Result<()> {
        let blob = serde_json::to_string(&self.slots)?;
        self.store.put(&self.key, &blob)
    }
}

fn read_slots<S: KvStore>(store: &S, key: &str) -> Result<Vec<AvailabilitySlot>> {
    let raw = store
        .get(key)
        .map_err(|e| TutordeskError::PersistenceRead(e.to_string()))?;
    match raw {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| TutordeskError::PersistenceRead(format!("malformed '{key}': {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DayKey;
    use crate::storage::MemoryKvStore;

    const KEY: &str = "tutorAvailability";

    fn slot(day: &str, start: &str, end: &str) -> AvailabilitySlot {
        AvailabilitySlot::new(
            day.parse().unwrap(),
            start.parse().unwrap(),
            end.parse().unwrap(),
        )
    }

    fn manager() -> (MemoryKvStore, AvailabilityManager<MemoryKvStore>) {
        let store = MemoryKvStore::new();
        let manager = AvailabilityManager::load(store.clone(), KEY);
        (store, manager)
    }

    fn persisted(store: &MemoryKvStore) -> Vec<AvailabilitySlot> {
        serde_json::from_str(&store.get(KEY).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn test_adjacent_slots_both_accepted() {
        let (store, mut m) = manager();
        m.add_slot(slot("Monday", "09:00", "10:00")).unwrap();
        m.add_slot(slot("Monday", "10:00", "11:00")).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(persisted(&store), m.slots());
    }

    #[test]
    fn test_overlap_rejected() {
        let (store, mut m) = manager();
        m.add_slot(slot("Monday", "09:00", "10:00")).unwrap();
        let err = m.add_slot(slot("Monday", "09:30", "09:45")).unwrap_err();
        assert!(matches!(err, TutordeskError::OverlapConflict { .. }));
        assert_eq!(m.len(), 1);
        assert_eq!(persisted(&store).len(), 1);
    }

    #[test]
    fn test_overlap_cases() {
        let (_, mut m) = manager();
        m.add_slot(slot("Monday", "10:00", "12:00")).unwrap();
        // start inside, end inside, containing
        for (s, e) in [("11:00", "13:00"), ("09:00", "10:30"), ("09:00", "13:00")] {
            assert!(m.add_slot(slot("Monday", s, e)).is_err(), "{s}-{e}");
        }
        // same times on another day key are fine
        m.add_slot(slot("Tuesday", "10:00", "12:00")).unwrap();
        m.add_slot(slot("2023-10-09", "10:00", "12:00")).unwrap();
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn test_invalid_range_rejected() {
        let (store, mut m) = manager();
        let err = m.add_slot(slot("Monday", "10:00", "09:00")).unwrap_err();
        assert!(matches!(err, TutordeskError::InvalidRange { .. }));
        let err = m.add_slot(slot("Monday", "10:00", "10:00")).unwrap_err();
        assert!(matches!(err, TutordeskError::InvalidRange { .. }));
        assert!(m.is_empty());
        assert_eq!(store.get(KEY).unwrap(), None);
    }

    #[test]
    fn test_same_day_slots_never_overlap() {
        let (_, mut m) = manager();
        let attempts = [
            ("09:00", "11:00"),
            ("10:00", "12:00"),
            ("11:00", "12:00"),
            ("08:00", "09:30"),
            ("08:00", "09:00"),
            ("12:00", "14:00"),
            ("13:00", "13:30"),
        ];
        for (s, e) in attempts {
            let _ = m.add_slot(slot("Wednesday", s, e));
        }
        for (i, a) in m.slots().iter().enumerate() {
            for b in &m.slots()[i + 1..] {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_remove_out_of_range() {
        let (_, mut m) = manager();
        m.add_slot(slot("Monday", "09:00", "10:00")).unwrap();
        assert!(matches!(
            m.remove_slot(-1),
            Err(TutordeskError::IndexOutOfRange { index: -1, len: 1 })
        ));
        assert!(matches!(
            m.remove_slot(1),
            Err(TutordeskError::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_remove_rewrites_blob() {
        let (store, mut m) = manager();
        m.add_slot(slot("Monday", "09:00", "10:00")).unwrap();
        m.add_slot(slot("Tuesday", "09:00", "10:00")).unwrap();
        let removed = m.remove_slot(0).unwrap();
        assert_eq!(removed.day, DayKey::Recurring(chrono::Weekday::Mon));
        assert_eq!(m.len(), 1);
        assert_eq!(persisted(&store), m.slots());
    }

    #[test]
    fn test_load_absent_and_malformed() {
        let store = MemoryKvStore::new();
        assert!(AvailabilityManager::load(store.clone(), KEY).is_empty());

        store.put(KEY, "{not json").unwrap();
        assert!(AvailabilityManager::load(store.clone(), KEY).is_empty());

        store
            .put(KEY, r#"[{"day":"Moonday","start":"09:00","end":"10:00"}]"#)
            .unwrap();
        assert!(AvailabilityManager::load(store, KEY).is_empty());
    }

    #[test]
    fn test_load_reads_existing_blob() {
        let store = MemoryKvStore::new();
        store
            .put(
                KEY,
                r#"[{"day":"Monday","start":"09:00","end":"12:00"},{"day":"2023-10-10","start":"14:00","end":"16:00"}]"#,
            )
            .unwrap();
        let m = AvailabilityManager::load(store, KEY);
        assert_eq!(m.len(), 2);
        assert!(!m.slots()[1].day.is_recurring());
    }

    #[test]
    fn test_failed_persist_rolls_back_add() {
        let (store, mut m) = manager();
        m.add_slot(slot("Monday", "09:00", "10:00")).unwrap();
        store.set_fail_writes(true);
        let err = m.add_slot(slot("Monday", "11:00", "12:00")).unwrap_err();
        assert!(matches!(err, TutordeskError::Storage(_)));
        assert_eq!(m.len(), 1);
        assert_eq!(persisted(&store), m.slots());
    }

    #[test]
    fn test_failed_persist_rolls_back_remove() {
        let (store, mut m) = manager();
        m.add_slot(slot("Monday", "09:00", "10:00")).unwrap();
        m.add_slot(slot("Monday", "10:00", "11:00")).unwrap();
        let before = m.slots().to_vec();
        store.set_fail_writes(true);
        assert!(m.remove_slot(0).is_err());
        assert_eq!(m.slots(), before.as_slice());
    }

    #[test]
    fn test_add_draft() {
        let (_, mut m) = manager();
        let wed = NaiveDate::from_ymd_opt(2023, 10, 11).unwrap();
        let recurring = m
            .add_draft(wed, true, "09:00".parse().unwrap(), "10:00".parse().unwrap())
            .unwrap();
        assert_eq!(recurring.day.to_string(), "Wednesday");
        // one-time key on the same date does not clash with the weekly key
        let once = m
            .add_draft(wed, false, "09:00".parse().unwrap(), "10:00".parse().unwrap())
            .unwrap();
        assert_eq!(once.day.to_string(), "2023-10-11");
        assert_eq!(m.len(), 2);
    }
}
