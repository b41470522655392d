use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ScrapeError;

/// One tracked webcomic. Field names on disk follow the `*_vol_*` keys of the
/// existing `comic.json` files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrackedSeries {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    #[serde(rename = "prev_vol_num")]
    pub prev_chapter_num: u32,
    #[serde(rename = "latest_vol_num", default, skip_serializing_if = "Option::is_none")]
    pub latest_chapter_num: Option<u32>,
    #[serde(rename = "latest_vol_available", default, skip_serializing_if = "is_false")]
    pub has_new_chapter: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl TrackedSeries {
    pub fn new(id: impl Into<String>, name: impl Into<String>, prev_chapter_num: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            prev_chapter_num,
            latest_chapter_num: None,
            has_new_chapter: false,
        }
    }

    /// Clears the per-run fields before a new checking pass.
    pub fn reset_run(&mut self) {
        self.latest_chapter_num = None;
        self.has_new_chapter = false;
    }
}

/// Ordered mapping of series id to series.
///
/// Order is the insertion order of the JSON object on disk, so formatted
/// messages come out in the same order the user listed the series.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedState {
    series: Vec<TrackedSeries>,
}

impl TrackedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TrackedSeries> {
        self.series.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut TrackedSeries> {
        self.series.iter_mut().find(|s| s.id == id)
    }

    /// Inserts or replaces a series. A replaced series keeps its position.
    pub fn insert(&mut self, series: TrackedSeries) {
        match self.get_mut(&series.id) {
            Some(existing) => *existing = series,
            None => self.series.push(series),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<TrackedSeries> {
        let index = self.series.iter().position(|s| s.id == id)?;
        Some(self.series.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedSeries> {
        self.series.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrackedSeries> {
        self.series.iter_mut()
    }

    pub fn ids(&self) -> Vec<String> {
        self.series.iter().map(|s| s.id.clone()).collect()
    }
}

impl FromIterator<TrackedSeries> for TrackedState {
    fn from_iter<I: IntoIterator<Item = TrackedSeries>>(iter: I) -> Self {
        let mut state = TrackedState::new();
        for series in iter {
            state.insert(series);
        }
        state
    }
}

impl Serialize for TrackedState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.series.len()))?;
        for series in &self.series {
            map.serialize_entry(&series.id, series)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TrackedState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StateVisitor;

        impl<'de> Visitor<'de> for StateVisitor {
            type Value = TrackedState;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object keyed by series id")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut state = TrackedState::new();
                while let Some((id, mut series)) = access.next_entry::<String, TrackedSeries>()? {
                    series.id = id;
                    state.insert(series);
                }
                Ok(state)
            }
        }

        deserializer.deserialize_map(StateVisitor)
    }
}

/// Everything one checking pass produced. Lives only for a single run.
#[derive(Debug)]
pub struct RunResult {
    pub checked_at: DateTime<Utc>,
    pub any_new: bool,
    pub state: TrackedState,
    pub failures: Vec<(String, ScrapeError)>,
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Notified { series: usize },
    NothingNew,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Notified { series } => write!(f, "notified about {} series", series),
            RunOutcome::NothingNew => write!(f, "nothing new"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_keeps_file_order() {
        let json = r#"{"9": {"name": "Z", "prev_vol_num": 1}, "1": {"name": "A", "prev_vol_num": 2}}"#;
        let state: TrackedState = serde_json::from_str(json).unwrap();
        assert_eq!(state.ids(), vec!["9".to_string(), "1".to_string()]);
        assert_eq!(state.get("1").unwrap().name, "A");
        assert_eq!(state.get("1").unwrap().latest_chapter_num, None);
    }

    #[test]
    fn test_serialize_omits_unknown_latest() {
        let state: TrackedState = vec![TrackedSeries::new("123", "A", 10)].into_iter().collect();
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"123":{"name":"A","prev_vol_num":10}}"#);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut state: TrackedState = vec![
            TrackedSeries::new("1", "A", 1),
            TrackedSeries::new("2", "B", 2),
        ]
        .into_iter()
        .collect();
        state.insert(TrackedSeries::new("1", "A2", 5));
        assert_eq!(state.ids(), vec!["1".to_string(), "2".to_string()]);
        assert_eq!(state.get("1").unwrap().prev_chapter_num, 5);
        assert!(state.remove("2").is_some());
        assert_eq!(state.len(), 1);
    }
}
