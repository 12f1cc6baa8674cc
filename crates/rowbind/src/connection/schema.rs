use std::collections::HashMap;

/// Memoized schema metadata, keyed by table name. Entries never expire on
/// their own; callers refresh with `use_cache = false`.
#[derive(Debug, Default, Clone)]
pub(crate) struct SchemaCache {
    pub(crate) tables: Option<Vec<String>>,
    pub(crate) fields: HashMap<String, Vec<String>>,
    pub(crate) primary_keys: HashMap<String, Vec<String>>,
    pub(crate) autoincrement_keys: HashMap<String, Option<String>>,
}

impl SchemaCache {
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn forget_table(&mut self, table: &str) {
        self.fields.remove(table);
        self.primary_keys.remove(table);
        self.autoincrement_keys.remove(table);
    }
}
