use crate::database;
use crate::error::{DbError, DbResult};
use crate::heap_file::HeapFileIterator;
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};
use crate::types::Type;

use super::OpIterator;

/// A full scan over one table's tuples, exposing each field renamed
/// `alias.original` (or `null.null` when either half is absent, rather
/// than failing).
pub struct SeqScan {
    tid: TransactionId,
    table_id: usize,
    td: TupleDesc,
    iter: Option<HeapFileIterator>,
}

impl SeqScan {
    pub fn new(tid: TransactionId, table_id: usize, alias: Option<&str>) -> DbResult<Self> {
        let db = database::get_global_db();
        let catalog = db.get_catalog();
        let inner_td = catalog
            .get_tuple_desc(table_id)
            .ok_or_else(|| DbError::NoSuchTable(format!("table id {table_id}")))?;

        let alias_part = alias.unwrap_or("null");
        let types: Vec<Type> = (0..inner_td.get_num_fields())
            .map(|i| *inner_td.get_field_type(i).unwrap())
            .collect();
        let names: Vec<String> = (0..inner_td.get_num_fields())
            .map(|i| {
                let field_part = inner_td
                    .get_field_name(i)
                    .map(|s| s.as_str())
                    .unwrap_or("null");
                format!("{alias_part}.{field_part}")
            })
            .collect();
        let td = TupleDesc::with_capacity(types, names, inner_td.string_capacity());

        Ok(SeqScan {
            tid,
            table_id,
            td,
            iter: None,
        })
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> DbResult<()> {
        let db = database::get_global_db();
        let catalog = db.get_catalog();
        let table = catalog
            .get_table_from_id(self.table_id)
            .ok_or_else(|| DbError::NoSuchTable(format!("table id {}", self.table_id)))?;
        let mut iter = table.iterator(self.tid);
        iter.open()?;
        self.iter = Some(iter);
        Ok(())
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        let iter = self.iter.as_mut().ok_or(DbError::IteratorClosed)?;
        iter.next()
    }

    fn rewind(&mut self) -> DbResult<()> {
        let iter = self.iter.as_mut().ok_or(DbError::IteratorClosed)?;
        iter.rewind()
    }

    fn close(&mut self) {
        if let Some(mut iter) = self.iter.take() {
            iter.close();
        }
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.td
    }
}
