mod aggregate;
mod delete;
mod filter;
mod insert;
mod join;
mod seq_scan;

pub use aggregate::{AggOp, Aggregate};
pub use delete::Delete;
pub use filter::{Filter, Predicate};
pub use insert::Insert;
pub use join::{Join, JoinPredicate};
pub use seq_scan::SeqScan;

use crate::error::{DbError, DbResult};
use crate::fields::FieldVal;
use crate::tuple::{Tuple, TupleDesc};

/// Comparison operators usable in a `Predicate` or `JoinPredicate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

/// The uniform pull interface every operator implements. A tree of
/// operators is driven by repeatedly calling `next` on the root; each
/// operator pulls from its own children in turn. Single-threaded per
/// evaluation — an operator is not `Send`-shared across threads mid-scan.
pub trait OpIterator {
    /// Prepares the operator (and its children) to be pulled from.
    fn open(&mut self) -> DbResult<()>;

    /// Returns the next output tuple, or `None` at end of stream.
    fn next(&mut self) -> DbResult<Option<Tuple>>;

    /// Resets the operator to the state just after `open`.
    fn rewind(&mut self) -> DbResult<()>;

    /// Releases any resources held by this operator and its children.
    fn close(&mut self);

    /// The schema of tuples this operator yields.
    fn tuple_desc(&self) -> &TupleDesc;
}

/// Shared comparison logic for `Predicate` and `JoinPredicate`: both
/// operands must be the same field kind, and `Like` only makes sense for
/// strings (a substring match).
pub(crate) fn compare(op: Op, a: &FieldVal, b: &FieldVal) -> DbResult<bool> {
    match (a, b) {
        (FieldVal::IntField(a), FieldVal::IntField(b)) => {
            let (a, b) = (a.get_value(), b.get_value());
            match op {
                Op::Eq => Ok(a == b),
                Op::Ne => Ok(a != b),
                Op::Lt => Ok(a < b),
                Op::Le => Ok(a <= b),
                Op::Gt => Ok(a > b),
                Op::Ge => Ok(a >= b),
                Op::Like => Err(DbError::IllegalOp),
            }
        }
        (FieldVal::StringField(a), FieldVal::StringField(b)) => {
            let (a, b) = (a.get_value(), b.get_value());
            match op {
                Op::Eq => Ok(a == b),
                Op::Ne => Ok(a != b),
                Op::Lt => Ok(a < b),
                Op::Le => Ok(a <= b),
                Op::Gt => Ok(a > b),
                Op::Ge => Ok(a >= b),
                Op::Like => Ok(a.contains(&b)),
            }
        }
        _ => Err(DbError::SchemaMismatch(
            "predicate operand type does not match field type".to_string(),
        )),
    }
}
