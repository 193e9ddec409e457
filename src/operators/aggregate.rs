use std::collections::HashMap;

use crate::error::{DbError, DbResult};
use crate::fields::{FieldVal, IntField};
use crate::tuple::{Tuple, TupleDesc};
use crate::types::Type;

use super::OpIterator;

/// The aggregate functions `Aggregate` supports. String-valued aggregate
/// fields only support `Count`; any other op over a string raises
/// `DbError::IllegalOp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

struct GroupState {
    count: i64,
    sum: i64,
    min: i32,
    max: i32,
}

impl GroupState {
    fn new() -> Self {
        GroupState {
            count: 0,
            sum: 0,
            min: i32::MAX,
            max: i32::MIN,
        }
    }

    fn add_int(&mut self, v: i32) {
        self.count += 1;
        self.sum += v as i64;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }

    fn add_non_numeric(&mut self) {
        self.count += 1;
    }

    fn result(&self, op: AggOp) -> i32 {
        match op {
            AggOp::Min => self.min,
            AggOp::Max => self.max,
            AggOp::Sum => self.sum as i32,
            // integer division in Rust truncates toward zero, matching the invariant.
            AggOp::Avg => (self.sum / self.count) as i32,
            AggOp::Count => self.count as i32,
        }
    }
}

/// Groups child tuples by `gb_field` (or one synthetic group when
/// `gb_field` is `None`, i.e. `NO_GROUPING`) and reduces `a_field` within
/// each group via `op`. The child is drained fully on `open`; `next`
/// replays the computed groups.
pub struct Aggregate {
    gb_field: Option<usize>,
    a_field: usize,
    op: AggOp,
    child: Box<dyn OpIterator>,
    td: TupleDesc,
    groups: Vec<(Option<FieldVal>, GroupState)>,
    position: usize,
}

impl Aggregate {
    pub fn new(
        gb_field: Option<usize>,
        a_field: usize,
        op: AggOp,
        child: Box<dyn OpIterator>,
    ) -> DbResult<Self> {
        let child_td = child.tuple_desc();
        let (types, names) = if let Some(gb) = gb_field {
            let gb_type = *child_td
                .get_field_type(gb)
                .ok_or_else(|| DbError::NoSuchField(format!("group field index {gb}")))?;
            (
                vec![gb_type, Type::IntType],
                vec!["group".to_string(), "aggregate".to_string()],
            )
        } else {
            (vec![Type::IntType], vec!["aggregate".to_string()])
        };
        let td = TupleDesc::with_capacity(types, names, child_td.string_capacity());

        Ok(Aggregate {
            gb_field,
            a_field,
            op,
            child,
            td,
            groups: Vec::new(),
            position: 0,
        })
    }

    fn materialize(&mut self) -> DbResult<()> {
        self.groups.clear();
        let mut index: HashMap<Option<FieldVal>, usize> = HashMap::new();
        self.child.rewind()?;
        while let Some(t) = self.child.next()? {
            let key = match self.gb_field {
                Some(i) => Some(
                    t.get_field(i)
                        .cloned()
                        .ok_or_else(|| DbError::NoSuchField(format!("group field index {i}")))?,
                ),
                None => None,
            };
            let a_value = t
                .get_field(self.a_field)
                .ok_or_else(|| DbError::NoSuchField(format!("aggregate field index {}", self.a_field)))?;

            let pos = *index.entry(key.clone()).or_insert_with(|| {
                self.groups.push((key, GroupState::new()));
                self.groups.len() - 1
            });

            match a_value {
                FieldVal::IntField(IntField { .. }) => {
                    let v = a_value.clone().into_int().unwrap().get_value();
                    self.groups[pos].1.add_int(v);
                }
                FieldVal::StringField(_) => {
                    if self.op != AggOp::Count {
                        return Err(DbError::IllegalOp);
                    }
                    self.groups[pos].1.add_non_numeric();
                }
            }
        }
        Ok(())
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> DbResult<()> {
        self.child.open()?;
        self.materialize()?;
        self.position = 0;
        Ok(())
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        if self.position >= self.groups.len() {
            return Ok(None);
        }
        let (key, state) = &self.groups[self.position];
        self.position += 1;
        let result = FieldVal::IntField(IntField::new(state.result(self.op)));
        let fields = match key {
            Some(k) => vec![k.clone(), result],
            None => vec![result],
        };
        Ok(Some(Tuple::new(fields, &self.td)))
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.position = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.td
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    struct VecScan {
        td: TupleDesc,
        rows: Vec<Tuple>,
        pos: usize,
    }

    impl VecScan {
        fn new(values: Vec<i32>) -> Self {
            let td = TupleDesc::new(vec![Type::IntType], vec!["x".to_string()]);
            let rows = values
                .into_iter()
                .map(|v| Tuple::new(vec![FieldVal::IntField(IntField::new(v))], &td))
                .collect();
            VecScan { td, rows, pos: 0 }
        }
    }

    impl OpIterator for VecScan {
        fn open(&mut self) -> DbResult<()> {
            self.pos = 0;
            Ok(())
        }
        fn next(&mut self) -> DbResult<Option<Tuple>> {
            let t = self.rows.get(self.pos).cloned();
            if t.is_some() {
                self.pos += 1;
            }
            Ok(t)
        }
        fn rewind(&mut self) -> DbResult<()> {
            self.pos = 0;
            Ok(())
        }
        fn close(&mut self) {}
        fn tuple_desc(&self) -> &TupleDesc {
            &self.td
        }
    }

    #[test]
    fn avg_truncates_toward_zero() {
        let child = Box::new(VecScan::new(vec![1, 2, 3, 4]));
        let mut agg = Aggregate::new(None, 0, AggOp::Avg, child).unwrap();
        agg.open().unwrap();
        let t = agg.next().unwrap().unwrap();
        assert_eq!(
            t.get_field(0).unwrap().clone().into_int().unwrap().get_value(),
            2
        );
        assert!(agg.next().unwrap().is_none());
    }

    #[test]
    fn count_with_no_grouping() {
        let child = Box::new(VecScan::new(vec![5, 6, 7]));
        let mut agg = Aggregate::new(None, 0, AggOp::Count, child).unwrap();
        agg.open().unwrap();
        let t = agg.next().unwrap().unwrap();
        assert_eq!(
            t.get_field(0).unwrap().clone().into_int().unwrap().get_value(),
            3
        );
    }

    #[test]
    fn grouping_keys_produce_separate_groups() {
        let td = TupleDesc::new(
            vec![Type::IntType, Type::IntType],
            vec!["g".to_string(), "v".to_string()],
        );
        let rows = vec![(0, 10), (0, 20), (1, 5)];
        struct Rows {
            td: TupleDesc,
            rows: Vec<(i32, i32)>,
            pos: usize,
        }
        impl OpIterator for Rows {
            fn open(&mut self) -> DbResult<()> {
                self.pos = 0;
                Ok(())
            }
            fn next(&mut self) -> DbResult<Option<Tuple>> {
                if self.pos >= self.rows.len() {
                    return Ok(None);
                }
                let (g, v) = self.rows[self.pos];
                self.pos += 1;
                Ok(Some(Tuple::new(
                    vec![
                        FieldVal::IntField(IntField::new(g)),
                        FieldVal::IntField(IntField::new(v)),
                    ],
                    &self.td,
                )))
            }
            fn rewind(&mut self) -> DbResult<()> {
                self.pos = 0;
                Ok(())
            }
            fn close(&mut self) {}
            fn tuple_desc(&self) -> &TupleDesc {
                &self.td
            }
        }
        let child = Box::new(Rows { td, rows, pos: 0 });
        let mut agg = Aggregate::new(Some(0), 1, AggOp::Sum, child).unwrap();
        agg.open().unwrap();
        let mut results = vec![];
        while let Some(t) = agg.next().unwrap() {
            let g = t.get_field(0).unwrap().clone().into_int().unwrap().get_value();
            let s = t.get_field(1).unwrap().clone().into_int().unwrap().get_value();
            results.push((g, s));
        }
        assert_eq!(results, vec![(0, 30), (1, 5)]);
    }
}
