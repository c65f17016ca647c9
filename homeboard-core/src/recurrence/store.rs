//! JSON-file storage for recurring rules.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::{RecurrenceRule, expand_rules};
use crate::error::{HomeboardError, HomeboardResult};
use crate::event::CalendarEvent;
use crate::persist::{decode_records, read_if_exists, write_atomically};

/// Rules stored as a JSON array, keyed by integer id.
///
/// Ids are assigned as one more than the largest existing id, starting at 1.
#[derive(Debug, Clone)]
pub struct RuleStore {
    path: PathBuf,
}

impl RuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RuleStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored rules. A missing file is an empty store.
    pub fn load_all(&self) -> HomeboardResult<Vec<RecurrenceRule>> {
        match read_if_exists(&self.path)? {
            Some(content) => decode_records(&content, "recurring rule"),
            None => Ok(Vec::new()),
        }
    }

    fn save_all(&self, rules: &[RecurrenceRule]) -> HomeboardResult<()> {
        let content = serde_json::to_string_pretty(rules)
            .map_err(|e| HomeboardError::Serialization(e.to_string()))?;
        write_atomically(&self.path, &content)
    }

    pub fn get(&self, id: u32) -> HomeboardResult<Option<RecurrenceRule>> {
        Ok(self.load_all()?.into_iter().find(|r| r.id == Some(id)))
    }

    /// Like [`get`](Self::get), but a missing rule is an error.
    pub fn require(&self, id: u32) -> HomeboardResult<RecurrenceRule> {
        self.get(id)?.ok_or(HomeboardError::RuleNotFound(id))
    }

    /// Store a new rule and return it with its assigned id.
    pub fn add(&self, mut rule: RecurrenceRule) -> HomeboardResult<RecurrenceRule> {
        rule.validate()?;

        let mut rules = self.load_all()?;
        let max_id = rules.iter().filter_map(|r| r.id).max().unwrap_or(0);
        rule.id = Some(max_id + 1);

        rules.push(rule.clone());
        self.save_all(&rules)?;
        Ok(rule)
    }

    /// Replace the rule with `id`, keeping the id. Returns false if absent.
    pub fn update(&self, id: u32, mut rule: RecurrenceRule) -> HomeboardResult<bool> {
        rule.validate()?;

        let mut rules = self.load_all()?;
        let Some(slot) = rules.iter_mut().find(|r| r.id == Some(id)) else {
            return Ok(false);
        };

        rule.id = Some(id);
        *slot = rule;
        self.save_all(&rules)?;
        Ok(true)
    }

    /// Remove the rule with `id`. Returns false if absent.
    pub fn delete(&self, id: u32) -> HomeboardResult<bool> {
        let rules = self.load_all()?;
        let before = rules.len();
        let remaining: Vec<RecurrenceRule> =
            rules.into_iter().filter(|r| r.id != Some(id)).collect();

        if remaining.len() == before {
            return Ok(false);
        }
        self.save_all(&remaining)?;
        Ok(true)
    }

    /// Expand every stored rule over `[window_start, window_end]`, sorted by start.
    pub fn expand_all(
        &self,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> HomeboardResult<Vec<CalendarEvent>> {
        Ok(expand_rules(&self.load_all()?, window_start, window_end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn rule(title: &str) -> RecurrenceRule {
        RecurrenceRule::new(title, Weekday::Thu, hm(15, 30), hm(16, 30))
    }

    fn store() -> (tempfile::TempDir, RuleStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RuleStore::new(dir.path().join("recurring_events.json"));
        (dir, store)
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let (_dir, store) = store();
        assert_eq!(store.add(rule("Chess")).unwrap().id, Some(1));
        assert_eq!(store.add(rule("Scouts")).unwrap().id, Some(2));
        assert_eq!(store.load_all().unwrap().len(), 2);
    }

    #[test]
    fn test_ids_follow_max_not_count() {
        let (_dir, store) = store();
        store.add(rule("A")).unwrap();
        store.add(rule("B")).unwrap();
        store.add(rule("C")).unwrap();
        assert!(store.delete(2).unwrap());

        // Two rules remain but the next id is still max + 1.
        assert_eq!(store.add(rule("D")).unwrap().id, Some(4));
    }

    #[test]
    fn test_update_keeps_id() {
        let (_dir, store) = store();
        store.add(rule("Chess")).unwrap();

        let mut changed = rule("Chess club");
        changed.id = Some(99);
        assert!(store.update(1, changed).unwrap());

        let stored = store.require(1).unwrap();
        assert_eq!(stored.title, "Chess club");
        assert_eq!(stored.id, Some(1));
        assert!(!store.update(5, rule("Ghost")).unwrap());
    }

    #[test]
    fn test_delete_missing_returns_false() {
        let (_dir, store) = store();
        store.add(rule("Chess")).unwrap();
        assert!(!store.delete(7).unwrap());
        assert!(matches!(store.require(7), Err(HomeboardError::RuleNotFound(7))));
    }

    #[test]
    fn test_add_rejects_invalid_rule() {
        let (_dir, store) = store();
        let bad = RecurrenceRule::new("Backwards", Weekday::Thu, hm(16, 0), hm(15, 0));
        assert!(matches!(store.add(bad), Err(HomeboardError::InvalidRule(_))));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_hand_edited_rules_still_expand() {
        let (_dir, store) = store();
        std::fs::write(
            store.path(),
            r#"[{"id": 3, "title": "Late shift", "day_of_week": 0,
                 "start_time": "22:00:00", "end_time": "06:00:00",
                 "timezone": "America/New_York"},
                {"id": "oops"}]"#,
        )
        .unwrap();

        let events = store
            .expand_all(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            )
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Late shift");
    }
}
