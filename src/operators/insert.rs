use crate::database;
use crate::error::{DbError, DbResult};
use crate::fields::{FieldVal, IntField};
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};
use crate::types::Type;

use super::OpIterator;

/// Drains `child` exactly once into table `table_id` via the buffer pool,
/// then emits a single one-column tuple holding the number of tuples
/// inserted, followed by end-of-stream. A second `next` call (without an
/// intervening `rewind`) also returns end-of-stream rather than inserting
/// again.
pub struct Insert {
    tid: TransactionId,
    table_id: usize,
    child: Box<dyn OpIterator>,
    td: TupleDesc,
    done: bool,
}

impl Insert {
    pub fn new(tid: TransactionId, table_id: usize, child: Box<dyn OpIterator>) -> Self {
        let td = TupleDesc::new(vec![Type::IntType], vec!["count".to_string()]);
        Insert {
            tid,
            table_id,
            child,
            td,
            done: false,
        }
    }
}

impl OpIterator for Insert {
    fn open(&mut self) -> DbResult<()> {
        self.child.open()?;
        let db = database::get_global_db();
        let catalog = db.get_catalog();
        let target_td = catalog
            .get_tuple_desc(self.table_id)
            .ok_or_else(|| DbError::NoSuchTable(format!("table id {}", self.table_id)))?;
        if *self.child.tuple_desc() != target_td {
            return Err(DbError::SchemaMismatch(
                "insert child schema does not match table schema".to_string(),
            ));
        }
        self.done = false;
        Ok(())
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        let db = database::get_global_db();
        let bp = db.get_buffer_pool();
        let mut count = 0i32;
        while let Some(t) = self.child.next()? {
            bp.insert_tuple(self.tid, self.table_id, t)?;
            count += 1;
        }
        Ok(Some(Tuple::new(
            vec![FieldVal::IntField(IntField::new(count))],
            &self.td,
        )))
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.child.rewind()?;
        self.done = false;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.td
    }
}
