use std::collections::HashMap;

use crate::config::DEFAULT_HISTOGRAM_BUCKETS;
use crate::database;
use crate::error::{DbError, DbResult};
use crate::fields::FieldVal;
use crate::operators::Op;
use crate::transaction::TransactionId;
use crate::types::Type;

use super::string_histogram::pack;
use super::{IntHistogram, StringHistogram};

/// Per-field min/max, collected in the first scan pass before histograms
/// can be allocated.
struct IntRange {
    min: i32,
    max: i32,
}

/// Cost and selectivity estimates for one table, built by scanning it twice:
/// once to learn per-field ranges and the tuple count, once to populate
/// histograms sized from those ranges.
pub struct TableStats {
    table_id: usize,
    io_cost_per_page: f64,
    num_pages: usize,
    num_tuples: usize,
    int_histograms: HashMap<usize, IntHistogram>,
    string_histograms: HashMap<usize, StringHistogram>,
}

impl TableStats {
    pub fn new(table_id: usize, io_cost_per_page: f64) -> DbResult<Self> {
        let db = database::get_global_db();
        let catalog = db.get_catalog();
        let bp = db.get_buffer_pool();

        let table = catalog
            .get_table_from_id(table_id)
            .ok_or_else(|| DbError::NoSuchTable(format!("table id {table_id}")))?;
        let td = table.get_tuple_desc().clone();
        let num_pages = table.num_pages();

        let tid = TransactionId::new();

        let mut int_ranges: HashMap<usize, IntRange> = HashMap::new();
        let mut string_ranges: HashMap<usize, IntRange> = HashMap::new();
        let mut num_tuples: usize = 0;

        {
            let mut it = table.iterator(tid);
            it.open()?;
            while let Some(t) = it.next()? {
                num_tuples += 1;
                for i in 0..td.get_num_fields() {
                    match t.get_field(i) {
                        Some(FieldVal::IntField(f)) => {
                            let v = f.get_value();
                            int_ranges
                                .entry(i)
                                .and_modify(|r| {
                                    r.min = r.min.min(v);
                                    r.max = r.max.max(v);
                                })
                                .or_insert(IntRange { min: v, max: v });
                        }
                        Some(FieldVal::StringField(f)) => {
                            let v = pack(&f.get_value());
                            string_ranges
                                .entry(i)
                                .and_modify(|r| {
                                    r.min = r.min.min(v);
                                    r.max = r.max.max(v);
                                })
                                .or_insert(IntRange { min: v, max: v });
                        }
                        None => {}
                    }
                }
            }
            it.close();
        }

        let mut int_histograms = HashMap::new();
        for (i, range) in int_ranges.iter() {
            let field_range = (range.max - range.min + 1).max(1) as usize;
            let buckets = bucket_count(num_tuples, field_range);
            int_histograms.insert(*i, IntHistogram::new(buckets, range.min, range.max));
        }
        let mut string_histograms = HashMap::new();
        for (i, range) in string_ranges.iter() {
            let field_range = (range.max - range.min + 1).max(1) as usize;
            let buckets = bucket_count(num_tuples, field_range);
            string_histograms.insert(*i, StringHistogram::new(buckets, range.min, range.max));
        }

        {
            let mut it = table.iterator(tid);
            it.open()?;
            while let Some(t) = it.next()? {
                for i in 0..td.get_num_fields() {
                    match t.get_field(i) {
                        Some(FieldVal::IntField(f)) => {
                            if let Some(h) = int_histograms.get_mut(&i) {
                                h.add_value(f.get_value());
                            }
                        }
                        Some(FieldVal::StringField(f)) => {
                            if let Some(h) = string_histograms.get_mut(&i) {
                                h.add_value(&f.get_value());
                            }
                        }
                        None => {}
                    }
                }
            }
            it.close();
        }

        bp.transaction_complete(tid, true)?;

        Ok(TableStats {
            table_id,
            io_cost_per_page,
            num_pages,
            num_tuples,
            int_histograms,
            string_histograms,
        })
    }

    pub fn get_table_id(&self) -> usize {
        self.table_id
    }

    pub fn estimate_scan_cost(&self) -> f64 {
        self.num_pages as f64 * self.io_cost_per_page
    }

    pub fn estimate_cardinality(&self, selectivity: f64) -> usize {
        (self.num_tuples as f64 * selectivity).floor().max(0.0) as usize
    }

    pub fn estimate_selectivity(
        &self,
        field_index: usize,
        op: Op,
        constant: &FieldVal,
    ) -> DbResult<f64> {
        match constant.get_type() {
            Type::IntType => {
                let v = constant
                    .clone()
                    .into_int()
                    .ok_or_else(|| DbError::SchemaMismatch("expected int field".to_string()))?
                    .get_value();
                let h = self
                    .int_histograms
                    .get(&field_index)
                    .ok_or_else(|| DbError::NoSuchField(format!("field index {field_index}")))?;
                Ok(h.selectivity(op, v))
            }
            Type::StringType => {
                let s = constant
                    .clone()
                    .into_string()
                    .ok_or_else(|| DbError::SchemaMismatch("expected string field".to_string()))?
                    .get_value();
                let h = self
                    .string_histograms
                    .get(&field_index)
                    .ok_or_else(|| DbError::NoSuchField(format!("field index {field_index}")))?;
                Ok(h.selectivity(op, &s))
            }
        }
    }
}

fn bucket_count(num_tuples: usize, field_range: usize) -> usize {
    [num_tuples / 20, field_range, DEFAULT_HISTOGRAM_BUCKETS]
        .into_iter()
        .min()
        .unwrap_or(1)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_count_is_bounded_by_all_three_limits() {
        assert_eq!(bucket_count(2000, 500), 100);
        assert_eq!(bucket_count(40, 500), 2);
        assert_eq!(bucket_count(2000, 5), 5);
        assert_eq!(bucket_count(0, 500), 1);
    }
}
