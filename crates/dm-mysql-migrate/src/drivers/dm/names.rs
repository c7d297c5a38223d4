//! Case-insensitive table name resolution.

use std::collections::HashMap;

/// Lower-cased name to stored name, built once from the source catalog.
#[derive(Debug, Clone, Default)]
pub struct TableNameMap {
    by_lower: HashMap<String, String>,
}

impl TableNameMap {
    pub fn new<I, S>(stored: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let by_lower = stored
            .into_iter()
            .map(|s| {
                let s = s.into();
                (s.to_lowercase(), s)
            })
            .collect();
        Self { by_lower }
    }

    /// Stored name for `name`, or `name` unchanged when the catalog has no match.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.by_lower
            .get(&name.to_lowercase())
            .map(String::as_str)
            .unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.by_lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_lower.is_empty()
    }
}
