use std::{
    collections::{btree_map, BTreeMap},
    fmt,
    marker::PhantomData,
};

use serde::{
    de::{self, MapAccess, SeqAccess, Visitor},
    Deserialize, Deserializer,
};

/// Entries keyed by their numeric ID, iterated in ascending ID order.
///
/// Accepts both encodings found in definition files:
///
/// ```json
/// {"definitions": {"1": {"name": "reboots", ...}}}
/// {"definitions": [{"id": 1, "name": "reboots", ...}]}
/// ```
///
/// An ID that appears more than once keeps its first entry and is listed by
/// [`IdTable::duplicates`].
#[derive(Debug, Clone, PartialEq)]
pub struct IdTable<T> {
    entries:    BTreeMap<u32, T>,
    duplicates: Vec<u32>,
}

impl<T> Default for IdTable<T> {
    fn default() -> Self {
        IdTable {
            entries:    BTreeMap::new(),
            duplicates: Vec::new(),
        }
    }
}

impl<T> IdTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    /// Insert an entry, returning the previous entry with the same ID.
    pub fn insert(&mut self, id: u32, entry: T) -> Option<T> {
        self.entries.insert(id, entry)
    }

    /// IDs that were declared more than once, in document order.
    pub fn duplicates(&self) -> &[u32] {
        &self.duplicates
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.entries.iter_mut().map(|(id, entry)| (*id, entry))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    fn declare(&mut self, id: u32, entry: T) {
        match self.entries.entry(id) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            btree_map::Entry::Occupied(_) => self.duplicates.push(id),
        }
    }
}

impl<T> IntoIterator for IdTable<T> {
    type Item     = (u32, T);
    type IntoIter = btree_map::IntoIter<u32, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<T> FromIterator<(u32, T)> for IdTable<T> {
    fn from_iter<I: IntoIterator<Item = (u32, T)>>(iter: I) -> Self {
        let mut table = IdTable::new();
        for (id, entry) in iter {
            table.declare(id, entry);
        }
        table
    }
}

/// List form element: the entry plus its `"id"` member.
#[derive(Deserialize)]
struct Keyed<T> {
    id:    u32,
    #[serde(flatten)]
    entry: T,
}

struct IdTableVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for IdTableVisitor<T> {
    type Value = IdTable<T>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object keyed by decimal ID or an array of entries with an \"id\" member")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut table = IdTable::new();
        while let Some(key) = map.next_key::<String>()? {
            let id = key.trim().parse::<u32>().map_err(|_| {
                <A::Error as de::Error>::custom(format!("ID {:?} is not an unsigned integer", key))
            })?;
            let entry = map
                .next_value::<T>()
                .map_err(|e| <A::Error as de::Error>::custom(format!("ID {}: {}", id, e)))?;
            table.declare(id, entry);
        }
        Ok(table)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut table = IdTable::new();
        let mut index = 0usize;
        loop {
            let next = seq
                .next_element::<Keyed<T>>()
                .map_err(|e| <A::Error as de::Error>::custom(format!("entry {}: {}", index, e)))?;
            let Some(keyed) = next else { break };
            table.declare(keyed.id, keyed.entry);
            index += 1;
        }
        Ok(table)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for IdTable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdTableVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Entry {
        name: String,
    }

    #[test]
    fn test_map_and_list_agree() {
        let map: IdTable<Entry> =
            serde_json::from_str(r#"{"7": {"name": "b"}, "3": {"name": "a"}}"#).unwrap();
        let list: IdTable<Entry> =
            serde_json::from_str(r#"[{"id": 7, "name": "b"}, {"id": 3, "name": "a"}]"#).unwrap();

        assert_eq!(map, list);
        assert_eq!(map.ids().collect::<Vec<_>>(), vec![3, 7]);
        assert_eq!(map.get(3).unwrap().name, "a");
        assert!(map.duplicates().is_empty());
    }

    #[test]
    fn test_repeated_key_recorded() {
        let table: IdTable<Entry> =
            serde_json::from_str(r#"{"1": {"name": "a"}, "1": {"name": "b"}}"#).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(1).unwrap().name, "a");
        assert_eq!(table.duplicates(), &[1]);
    }

    #[test]
    fn test_duplicate_ids_recorded() {
        let list: IdTable<Entry> =
            serde_json::from_str(r#"[{"id": 1, "name": "a"}, {"id": 1, "name": "b"}]"#).unwrap();
        assert_eq!(list.duplicates(), &[1]);

        let map: IdTable<Entry> =
            serde_json::from_str(r#"{"1": {"name": "a"}, "01": {"name": "b"}}"#).unwrap();
        assert_eq!(map.duplicates(), &[1]);
    }

    #[test]
    fn test_entry_error_names_id() {
        let err = serde_json::from_str::<IdTable<Entry>>(r#"{"12": {"title": "x"}}"#).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("ID 12"), "{}", message);
        assert!(message.contains("name"), "{}", message);
    }

    #[test]
    fn test_list_entry_error_names_position() {
        let err =
            serde_json::from_str::<IdTable<Entry>>(r#"[{"id": 1, "name": "a"}, {"name": "b"}]"#)
                .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("entry 1"), "{}", message);
        assert!(message.contains("id"), "{}", message);
    }

    #[test]
    fn test_non_numeric_key_rejected() {
        assert!(serde_json::from_str::<IdTable<Entry>>(r#"{"abc": {"name": "a"}}"#).is_err());
    }

    #[test]
    fn test_scalar_rejected() {
        assert!(serde_json::from_str::<IdTable<Entry>>("3").is_err());
    }
}
