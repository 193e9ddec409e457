use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::config::Config;
use crate::error::{DbError, DbResult};
use crate::heap_file::HeapFile;
use crate::tuple::TupleDesc;
use crate::types::Type::{IntType, StringType};

/// The name ↔ (tableId, TupleDesc, HeapFile) registry.
pub struct Catalog {
    tables_by_name: RwLock<HashMap<String, Arc<HeapFile>>>,
    tables_by_id: RwLock<HashMap<usize, Arc<HeapFile>>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            tables_by_name: RwLock::new(HashMap::new()),
            tables_by_id: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_table(&self, file: HeapFile, name: String) {
        let file = Arc::new(file);
        let file_id = file.get_id();
        self.tables_by_name
            .write()
            .unwrap()
            .insert(name, Arc::clone(&file));
        self.tables_by_id.write().unwrap().insert(file_id, file);
    }

    pub fn get_table_from_name(&self, name: &str) -> Option<Arc<HeapFile>> {
        self.tables_by_name.read().unwrap().get(name).map(Arc::clone)
    }

    pub fn get_table_from_id(&self, id: usize) -> Option<Arc<HeapFile>> {
        self.tables_by_id.read().unwrap().get(&id).map(Arc::clone)
    }

    pub fn get_tuple_desc(&self, table_id: usize) -> Option<TupleDesc> {
        self.get_table_from_id(table_id)
            .map(|t| t.get_tuple_desc().clone())
    }

    /// Loads a text schema file of lines like `table_name (field: Int, other: String)`,
    /// opening or creating `data/{table_name}.dat` for each and registering it.
    pub fn load_schema(&self, schema_file_path: &str, config: &Config) -> DbResult<()> {
        let schema_file = File::open(schema_file_path)?;
        let reader = BufReader::new(schema_file);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let split_parens: Vec<&str> = line.split('(').collect();
            let table_name = split_parens[0].replace(' ', "");
            let data_path = format!("data/{}.dat", table_name);
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .open(&data_path)?;

            let fields: Vec<&str> = split_parens[1].split(',').collect();
            let mut field_types = vec![];
            let mut field_names = vec![];
            for field in fields.iter() {
                let field: Vec<&str> = field.split(':').collect();
                let field_name = field[0].replace(' ', "");
                let field_type = field[1].replace(' ', "").replace(')', "");
                let field_type = match field_type.as_str() {
                    "Int" => IntType,
                    "String" => StringType,
                    other => {
                        return Err(DbError::SchemaMismatch(format!(
                            "unknown field type '{other}' in schema file"
                        )))
                    }
                };
                field_names.push(field_name);
                field_types.push(field_type);
            }
            let td = TupleDesc::with_capacity(
                field_types,
                field_names,
                config.string_field_capacity,
            );
            let heap_file = HeapFile::new(file, td, Path::new(&data_path), config.page_size)?;
            self.add_table(heap_file, table_name);
        }
        Ok(())
    }
}
