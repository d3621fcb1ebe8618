use crate::collection::Record;
use crate::core::{ModelError, Result, Value};
use crate::model::Model;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Shared handle to a record store, as injected into bound models and
/// relation factories.
pub type SharedStore = Arc<Mutex<dyn RecordStore + Send>>;

/// Row-level persistence surface the model core is paired with.
///
/// The core itself never calls this; it only exposes `load`, `to_array`,
/// and the declaration table the collaborator needs.
pub trait RecordStore {
    /// Insert a record, assigning an id when none is present. Returns the id.
    fn insert(&mut self, table: &str, record: Record) -> Result<Value>;

    fn fetch(&self, table: &str, id: &Value) -> Result<Option<Record>>;

    /// Replace the record with the given id. Returns whether a row matched.
    fn update(&mut self, table: &str, id: &Value, record: Record) -> Result<bool>;

    /// Delete the record with the given id. Returns whether a row matched.
    fn delete(&mut self, table: &str, id: &Value) -> Result<bool>;
}

const ID_COLUMN: &str = "id";

#[derive(Debug, Default)]
struct TableData {
    rows: Vec<Record>,
    next_id: i64,
}

/// In-memory `RecordStore` with auto-incrementing integer ids under the
/// `id` column.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<String, TableData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.tables.contains_key(&name) {
            return Err(ModelError::Store(format!("table '{name}' already exists")));
        }
        self.tables.insert(name, TableData { rows: Vec::new(), next_id: 1 });
        Ok(())
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn row_count(&self, name: &str) -> Result<usize> {
        Ok(self.table(name)?.rows.len())
    }

    fn table(&self, name: &str) -> Result<&TableData> {
        self.tables
            .get(name)
            .ok_or_else(|| ModelError::UnknownTable(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut TableData> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| ModelError::UnknownTable(name.to_string()))
    }
}

impl RecordStore for MemoryStore {
    fn insert(&mut self, table: &str, mut record: Record) -> Result<Value> {
        let data = self.table_mut(table)?;

        let id = match record.get(ID_COLUMN) {
            Some(id) if !id.is_null() => id.clone(),
            _ => {
                let id = Value::Integer(data.next_id);
                record.insert(ID_COLUMN.to_string(), id.clone());
                id
            }
        };
        if let Some(numeric) = id.as_i64() {
            data.next_id = data.next_id.max(numeric + 1);
        }

        data.rows.push(record);
        Ok(id)
    }

    fn fetch(&self, table: &str, id: &Value) -> Result<Option<Record>> {
        let data = self.table(table)?;
        Ok(data
            .rows
            .iter()
            .find(|row| row.get(ID_COLUMN).is_some_and(|stored| stored.loose_eq(id)))
            .cloned())
    }

    fn update(&mut self, table: &str, id: &Value, mut record: Record) -> Result<bool> {
        let data = self.table_mut(table)?;
        let index = data
            .rows
            .iter()
            .position(|row| row.get(ID_COLUMN).is_some_and(|stored| stored.loose_eq(id)));

        match index {
            Some(index) => {
                record.insert(ID_COLUMN.to_string(), id.clone());
                data.rows[index] = record;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&mut self, table: &str, id: &Value) -> Result<bool> {
        let data = self.table_mut(table)?;
        let before = data.rows.len();
        data.rows
            .retain(|row| !row.get(ID_COLUMN).is_some_and(|stored| stored.loose_eq(id)));
        Ok(data.rows.len() != before)
    }
}

/// A model bound to a store handle and table.
///
/// Store operations follow the collaborator's own convention: a `bool`
/// outcome plus a recorded `last_error` message, never a propagated error.
/// Create-vs-update is decided by the presence of a value for the id
/// property.
pub struct BoundModel {
    model: Model,
    table: String,
    id_property: String,
    store: SharedStore,
    last_error: Option<String>,
}

impl BoundModel {
    pub fn new(model: Model, table: impl Into<String>, store: SharedStore) -> Self {
        Self {
            model,
            table: table.into(),
            id_property: ID_COLUMN.to_string(),
            store,
            last_error: None,
        }
    }

    pub fn with_id_property(mut self, name: impl Into<String>) -> Self {
        self.id_property = name.into();
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Insert or update, branching on the id property. On insert the
    /// generated id is written back through the unconditional setter.
    pub fn save(&mut self) -> bool {
        self.run(Self::try_save)
    }

    /// Re-fetch the row by id and re-ingest it with guards bypassed, the way
    /// a persistence layer restores externally fetched rows.
    pub fn refresh(&mut self) -> bool {
        self.run(Self::try_refresh)
    }

    pub fn delete(&mut self) -> bool {
        self.run(Self::try_delete)
    }

    fn run(&mut self, op: fn(&mut Self) -> Result<()>) -> bool {
        match op(self) {
            Ok(()) => {
                self.last_error = None;
                true
            }
            Err(err) => {
                tracing::debug!(table = %self.table, error = %err, "store operation failed");
                self.last_error = Some(err.to_string());
                false
            }
        }
    }

    fn try_save(&mut self) -> Result<()> {
        let record = self.to_record();
        let current_id = self
            .model
            .get_value(&self.id_property)
            .filter(|id| !id.is_null())
            .cloned();

        let mut store = self.store.lock()?;
        match current_id {
            Some(id) => {
                if !store.update(&self.table, &id, record)? {
                    return Err(ModelError::Store(format!(
                        "no row with id {id} in '{}'",
                        self.table
                    )));
                }
            }
            None => {
                let id = store.insert(&self.table, record)?;
                drop(store);
                self.model.set_value(self.id_property.clone(), id);
            }
        }
        Ok(())
    }

    fn try_refresh(&mut self) -> Result<()> {
        let id = self.current_id()?;
        let store = self.store.lock()?;
        let record = store.fetch(&self.table, &id)?.ok_or_else(|| {
            ModelError::Store(format!("no row with id {id} in '{}'", self.table))
        })?;
        drop(store);
        self.apply_record(record);
        Ok(())
    }

    fn try_delete(&mut self) -> Result<()> {
        let id = self.current_id()?;
        let mut store = self.store.lock()?;
        if !store.delete(&self.table, &id)? {
            return Err(ModelError::Store(format!(
                "no row with id {id} in '{}'",
                self.table
            )));
        }
        Ok(())
    }

    fn current_id(&self) -> Result<Value> {
        self.model
            .get_value(&self.id_property)
            .filter(|id| !id.is_null())
            .cloned()
            .ok_or_else(|| {
                ModelError::Store(format!("model has no value for '{}'", self.id_property))
            })
    }

    /// Value bag mapped through declared column names.
    fn to_record(&self) -> Record {
        let mut record = Record::new();
        for (name, value) in self.model.to_array(&[]) {
            let column = self
                .model
                .property(&name)
                .map(|decl| decl.storage_column().to_string())
                .unwrap_or(name);
            record.insert(column, value);
        }
        record
    }

    /// Columns mapped back to property names, then ingested with guards
    /// bypassed.
    fn apply_record(&mut self, record: Record) {
        let pairs: Vec<(String, Value)> = self
            .model
            .properties()
            .iter()
            .filter_map(|decl| {
                record
                    .get(decl.storage_column())
                    .map(|value| (decl.name.clone(), value.clone()))
            })
            .collect();
        self.model.load(pairs, false);
    }
}
