use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Item names sit between "acquired" and "from" in the drop log.
///
/// Case-insensitive and non-greedy, so consecutive log entries yield one
/// match each. `.` does not cross line breaks.
const ITEM_PATTERN: &str = r"(?i)acquired\s+(.*?)\s+from";

static ITEM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ITEM_PATTERN).expect("item pattern is a valid regex"));

/// One looted item name, cleaned of surrounding whitespace and trailing `.`/`,`.
///
/// May be empty when the matched span held only whitespace or punctuation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LootItem(String);

impl LootItem {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for LootItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for LootItem {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Collapses whitespace runs to single spaces and strips any trailing run of
/// periods, commas and spaces.
pub fn clean_item(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| c == '.' || c == ',' || c == ' ')
        .to_string()
}

/// Extracts item names in order of appearance. Duplicates are kept.
///
/// Never fails: text without any "acquired … from" span yields an empty list.
/// Matches that clean up to an empty string are kept too, so the result
/// length always equals the number of matched spans.
pub fn extract_items(text: &str) -> Vec<LootItem> {
    let items: Vec<LootItem> = ITEM_REGEX
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| LootItem(clean_item(m.as_str())))
        .collect();

    let blank = items.iter().filter(|item| item.is_empty()).count();
    if blank > 0 {
        tracing::debug!("{} of {} extracted items are empty after cleanup", blank, items.len());
    }
    tracing::info!("Extracted {} items", items.len());

    items
}
