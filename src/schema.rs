// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Table schemas and column resolution.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::DataType;

/// Index of a table in its schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef(pub u8);

/// Index of a column in its table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef(pub u8);

/// A resolved column: which table, which column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub table: TableRef,
    pub column: ColumnRef,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub dt: DataType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema(pub Vec<Table>);

impl Schema {
    pub fn table(&self, table: TableRef) -> &Table {
        &self.0[table.0 as usize]
    }

    pub fn column(&self, descriptor: ColumnDescriptor) -> &Column {
        &self.table(descriptor.table).columns[descriptor.column.0 as usize]
    }

    fn find_column(&self, table: TableRef, name: &str) -> Option<ColumnDescriptor> {
        self.table(table)
            .columns
            .iter()
            .position(|c| c.name == name)
            .map(|idx| ColumnDescriptor {
                table,
                column: ColumnRef(idx as u8),
            })
    }
}

/// Memoizes column lookups for one checking session. Lookups are by name
/// within a table, including misses.
#[derive(Debug, Default)]
pub struct ColumnCache {
    entries: HashMap<(u8, String), Option<ColumnDescriptor>>,
}

impl ColumnCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_column(
        &mut self,
        schema: &Schema,
        table: TableRef,
        name: &str,
    ) -> Option<ColumnDescriptor> {
        if let Some(cached) = self.entries.get(&(table.0, name.to_owned())) {
            return *cached;
        }
        let found = schema.find_column(table, name);
        self.entries.insert((table.0, name.to_owned()), found);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema(vec![Table {
            name: "orders".into(),
            columns: vec![
                Column {
                    name: "price".into(),
                    dt: DataType::integer(false, 32),
                },
                Column {
                    name: "note".into(),
                    dt: DataType::BYTES,
                },
            ],
        }])
    }

    #[test]
    fn lookup_by_name() {
        let s = schema();
        let mut cache = ColumnCache::new();
        let d = cache.find_column(&s, TableRef(0), "note").unwrap();
        assert_eq!(d.column, ColumnRef(1));
        assert_eq!(s.column(d).dt, DataType::BYTES);
        assert!(cache.find_column(&s, TableRef(0), "missing").is_none());
    }

    #[test]
    fn misses_are_cached() {
        let s = schema();
        let mut cache = ColumnCache::new();
        assert!(cache.find_column(&s, TableRef(0), "ghost").is_none());
        // A second lookup must hit the memoized miss.
        assert!(cache.find_column(&s, TableRef(0), "ghost").is_none());
        assert_eq!(cache.entries.len(), 1);
    }
}
