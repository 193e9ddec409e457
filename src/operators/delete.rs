use crate::database;
use crate::error::{DbError, DbResult};
use crate::fields::{FieldVal, IntField};
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};
use crate::types::Type;

use super::OpIterator;

/// Symmetric to `Insert`: drains `child` exactly once, deleting each tuple
/// (addressed by its own `RecordId`) via the buffer pool, then emits
/// `(countDeleted)` followed by end-of-stream.
pub struct Delete {
    tid: TransactionId,
    child: Box<dyn OpIterator>,
    td: TupleDesc,
    done: bool,
}

impl Delete {
    pub fn new(tid: TransactionId, child: Box<dyn OpIterator>) -> Self {
        let td = TupleDesc::new(vec![Type::IntType], vec!["count".to_string()]);
        Delete {
            tid,
            child,
            td,
            done: false,
        }
    }
}

impl OpIterator for Delete {
    fn open(&mut self) -> DbResult<()> {
        self.child.open()?;
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
            let rid = t.get_record_id().ok_or(DbError::NotOnPage)?;
            let table_id = rid.get_page_id().get_table_id();
            bp.delete_tuple(self.tid, table_id, &t)?;
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
