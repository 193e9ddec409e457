use crate::error::{DbError, DbResult};
use crate::tuple::{Tuple, TupleDesc};

use super::{compare, Op, OpIterator};

/// A comparison between one field of the left child and one field of the
/// right child.
#[derive(Debug, Clone, Copy)]
pub struct JoinPredicate {
    left_field: usize,
    right_field: usize,
    op: Op,
}

impl JoinPredicate {
    pub fn new(left_field: usize, right_field: usize, op: Op) -> Self {
        JoinPredicate {
            left_field,
            right_field,
            op,
        }
    }

    pub fn eval(&self, left: &Tuple, right: &Tuple) -> DbResult<bool> {
        let a = left
            .get_field(self.left_field)
            .ok_or_else(|| DbError::NoSuchField(format!("left field index {}", self.left_field)))?;
        let b = right.get_field(self.right_field).ok_or_else(|| {
            DbError::NoSuchField(format!("right field index {}", self.right_field))
        })?;
        compare(self.op, a, b)
    }
}

/// A nested-loop join: for each left tuple, the right child is rewound and
/// scanned fully, emitting the field-concatenated tuple wherever
/// `predicate` holds.
pub struct Join {
    predicate: JoinPredicate,
    left: Box<dyn OpIterator>,
    right: Box<dyn OpIterator>,
    td: TupleDesc,
    current_left: Option<Tuple>,
}

impl Join {
    pub fn new(predicate: JoinPredicate, left: Box<dyn OpIterator>, right: Box<dyn OpIterator>) -> Self {
        let td = TupleDesc::combine(left.tuple_desc(), right.tuple_desc());
        Join {
            predicate,
            left,
            right,
            td,
            current_left: None,
        }
    }

    fn combine(left: &Tuple, right: &Tuple, td: &TupleDesc) -> Tuple {
        let mut fields = left.get_fields();
        fields.extend(right.get_fields());
        Tuple::new(fields, td)
    }
}

impl OpIterator for Join {
    fn open(&mut self) -> DbResult<()> {
        self.left.open()?;
        self.right.open()?;
        self.current_left = self.left.next()?;
        Ok(())
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        loop {
            let Some(left_tuple) = self.current_left.clone() else {
                return Ok(None);
            };
            while let Some(right_tuple) = self.right.next()? {
                if self.predicate.eval(&left_tuple, &right_tuple)? {
                    return Ok(Some(Self::combine(&left_tuple, &right_tuple, &self.td)));
                }
            }
            self.right.rewind()?;
            self.current_left = self.left.next()?;
        }
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.left.rewind()?;
        self.right.rewind()?;
        self.current_left = self.left.next()?;
        Ok(())
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.td
    }
}
