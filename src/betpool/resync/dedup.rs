use std::collections::HashMap;

use crate::betpool::resync::model::Record;

/// Collapses records sharing a primary key.
///
/// Records whose key is missing or empty are dropped.
pub fn dedup_by_key(records: Vec<Record>, primary_key: &str) -> Vec<Record> {
    dedup_by(records, |record| record.key(primary_key))
}

/// Keeps one item per distinct key.
///
/// The fold keeps one slot per key in the order the key was first seen; a
/// later item with the same key overwrites the slot's content entirely (last
/// write wins, no field merge). Items for which `key` yields `None` are
/// dropped.
pub fn dedup_by<T, F>(items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> Option<String>,
{
    let (slots, _) = items.into_iter().fold(
        (Vec::<T>::new(), HashMap::<String, usize>::new()),
        |(mut slots, mut index), item| {
            let Some(item_key) = key(&item) else {
                return (slots, index);
            };
            match index.get(&item_key) {
                Some(&position) => slots[position] = item,
                None => {
                    index.insert(item_key, slots.len());
                    slots.push(item);
                }
            }
            (slots, index)
        },
    );
    slots
}
