use crate::error::{DbError, DbResult};
use crate::fields::FieldVal;
use crate::tuple::{Tuple, TupleDesc};

use super::{compare, Op, OpIterator};

/// A single comparison against one field of a tuple: `field[index] op value`.
#[derive(Debug, Clone)]
pub struct Predicate {
    field_index: usize,
    op: Op,
    value: FieldVal,
}

impl Predicate {
    pub fn new(field_index: usize, op: Op, value: FieldVal) -> Self {
        Predicate {
            field_index,
            op,
            value,
        }
    }

    pub fn eval(&self, tuple: &Tuple) -> DbResult<bool> {
        let field = tuple
            .get_field(self.field_index)
            .ok_or_else(|| DbError::NoSuchField(format!("field index {}", self.field_index)))?;
        compare(self.op, field, &self.value)
    }
}

/// Yields only the child tuples for which `predicate` holds. Its schema is
/// identical to the child's.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Self {
        Filter { predicate, child }
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> DbResult<()> {
        self.child.open()
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        while let Some(t) = self.child.next()? {
            if self.predicate.eval(&t)? {
                return Ok(Some(t));
            }
        }
        Ok(None)
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        self.child.tuple_desc()
    }
}
