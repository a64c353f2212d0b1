//! Name-based lookup shared by every level of the job tree.
//!
//! When several elements carry the same name the **last** one wins. Callers
//! rely on "most recently added wins" when duplicates exist, so the scan
//! never stops at the first match.

use serde_json::Value;

/// An element addressable by its name field.
pub trait Named {
    fn name(&self) -> &str;
}

/// Find the last element whose name equals `target`.
pub fn find_by_name<'a, T: Named>(items: &'a [T], target: &str) -> Option<&'a T> {
    items.iter().rev().find(|item| item.name() == target)
}

/// Mutable variant of [`find_by_name`].
pub fn find_by_name_mut<'a, T: Named>(items: &'a mut [T], target: &str) -> Option<&'a mut T> {
    items.iter_mut().rev().find(|item| item.name() == target)
}

/// Find the last JSON object in `values` whose `key` field is the string `target`.
///
/// Non-object elements and elements without the key never match.
pub fn find_by_key<'a>(values: &'a [Value], key: &str, target: &str) -> Option<&'a Value> {
    values
        .iter()
        .rev()
        .find(|value| value.get(key).and_then(Value::as_str) == Some(target))
}
