use crate::error::{DbError, DbResult};
use crate::transaction::TransactionId;
use crate::tuple::{RecordId, Tuple, TupleDesc};

/// The kind of lock a caller wants on a page.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Copy)]
pub enum Permission {
    Read,
    Write,
}

/// A page's identity: which table, and which page number within it.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Copy, PartialOrd, Ord)]
pub struct PageId {
    table_id: usize,
    page_number: usize,
}

impl PageId {
    pub fn new(table_id: usize, page_number: usize) -> Self {
        PageId {
            table_id,
            page_number,
        }
    }

    pub fn get_table_id(&self) -> usize {
        self.table_id
    }

    pub fn get_page_number(&self) -> usize {
        self.page_number
    }
}

/// One fixed-size disk block: header bitmap + slotted tuple records.
///
/// The header bit for slot `i` is 1 iff `tuples[i]` holds a present tuple.
/// A page also carries a "before image" — the bytes as of the last quiesced
/// point — so the buffer pool can discard an aborting transaction's writes
/// without re-reading from disk.
#[derive(Debug, Clone)]
pub struct HeapPage {
    pid: PageId,
    td: TupleDesc,
    page_size: usize,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    num_slots: usize,
    before_image: Vec<u8>,
    dirtied_by: Option<TransactionId>,
}

impl PartialEq for HeapPage {
    fn eq(&self, other: &Self) -> bool {
        self.pid == other.pid && self.get_page_data() == other.get_page_data()
    }
}

fn header_size_for(num_slots: usize) -> usize {
    (num_slots + 7) / 8
}

fn num_slots_for(page_size: usize, tuple_size: usize) -> usize {
    (page_size * 8) / (tuple_size * 8 + 1)
}

impl HeapPage {
    /// Parses `data` (exactly `page_size` bytes) into a page. Fails with
    /// `MalformedPage` if `data` is shorter than `page_size` or a tuple
    /// marked present fails to deserialize.
    pub fn new(pid: PageId, data: &[u8], td: TupleDesc, page_size: usize) -> DbResult<Self> {
        if data.len() < page_size {
            return Err(DbError::MalformedPage(format!(
                "expected {} bytes, got {}",
                page_size,
                data.len()
            )));
        }
        let tuple_size = td.get_size();
        let num_slots = num_slots_for(page_size, tuple_size);
        let header_size = header_size_for(num_slots);
        let header = data[..header_size].to_vec();

        let mut tuples = Vec::with_capacity(num_slots);
        for i in 0..num_slots {
            if Self::get_slot(&header, i) {
                let start = header_size + i * tuple_size;
                let end = start + tuple_size;
                let mut t = Tuple::deserialize(&data[start..end], &td)?;
                t.set_record_id(RecordId::new(pid, i));
                tuples.push(Some(t));
            } else {
                tuples.push(None);
            }
        }

        let before_image = data[..page_size].to_vec();

        Ok(HeapPage {
            pid,
            td,
            page_size,
            header,
            tuples,
            num_slots,
            before_image,
            dirtied_by: None,
        })
    }

    /// An empty page of `page_size` bytes for the given schema.
    pub fn empty(pid: PageId, td: TupleDesc, page_size: usize) -> DbResult<Self> {
        let data = vec![0u8; page_size];
        HeapPage::new(pid, &data, td, page_size)
    }

    pub fn get_id(&self) -> PageId {
        self.pid
    }

    pub fn tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    pub fn get_before_image(&self) -> DbResult<HeapPage> {
        HeapPage::new(self.pid, &self.before_image, self.td.clone(), self.page_size)
    }

    pub fn set_before_image(&mut self) {
        self.before_image = self.get_page_data();
    }

    /// Serializes the page back to `page_size` bytes: header, then each
    /// slot's tuple bytes (or zeros for empty slots), then zero padding.
    pub fn get_page_data(&self) -> Vec<u8> {
        let mut data = self.header.clone();
        let tuple_size = self.td.get_size();
        for i in 0..self.num_slots {
            match &self.tuples[i] {
                Some(t) => data.extend(t.serialize()),
                None => data.extend(vec![0u8; tuple_size]),
            }
        }
        data.resize(self.page_size, 0);
        data
    }

    fn get_slot(header: &[u8], i: usize) -> bool {
        let idx = i / 8;
        let bit = i % 8;
        if idx >= header.len() {
            return false;
        }
        header[idx] & (1 << bit) != 0
    }

    fn set_slot(header: &mut [u8], i: usize, value: bool) {
        let idx = i / 8;
        let bit = i % 8;
        if value {
            header[idx] |= 1 << bit;
        } else {
            header[idx] &= !(1 << bit);
        }
    }

    /// Inserts `tuple` into the lowest-indexed empty slot, stamping its
    /// record id. Fails with `PageFull` or `SchemaMismatch`.
    pub fn insert(&mut self, mut tuple: Tuple) -> DbResult<()> {
        if *tuple.get_tuple_desc() != self.td {
            return Err(DbError::SchemaMismatch(
                "tuple schema does not match page schema".to_string(),
            ));
        }
        for i in 0..self.num_slots {
            if !Self::get_slot(&self.header, i) {
                let rid = RecordId::new(self.pid, i);
                tuple.set_record_id(rid);
                self.tuples[i] = Some(tuple);
                Self::set_slot(&mut self.header, i, true);
                return Ok(());
            }
        }
        Err(DbError::PageFull)
    }

    /// Clears the slot holding `tuple`. Fails with `NotOnPage` if the
    /// tuple's record id doesn't name this page or the slot isn't occupied.
    pub fn delete(&mut self, tuple: &Tuple) -> DbResult<()> {
        let rid = tuple.get_record_id().ok_or(DbError::NotOnPage)?;
        if rid.get_page_id() != self.pid {
            return Err(DbError::NotOnPage);
        }
        let slot = rid.get_tuple_no();
        if slot >= self.num_slots || !Self::get_slot(&self.header, slot) {
            return Err(DbError::NotOnPage);
        }
        self.tuples[slot] = None;
        Self::set_slot(&mut self.header, slot, false);
        Ok(())
    }

    pub fn num_empty_slots(&self) -> usize {
        (0..self.num_slots)
            .filter(|&i| !Self::get_slot(&self.header, i))
            .count()
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    pub fn mark_dirty(&mut self, dirty: bool, tid: TransactionId) {
        self.dirtied_by = if dirty { Some(tid) } else { None };
    }

    pub fn is_dirty(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter().filter_map(|t| t.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldVal, IntField};
    use crate::types::Type;

    fn int_pair_desc() -> TupleDesc {
        TupleDesc::with_capacity(
            vec![Type::IntType, Type::IntType],
            vec!["a".to_string(), "b".to_string()],
            0,
        )
    }

    #[test]
    fn num_slots_matches_formula() {
        let td = int_pair_desc();
        let page = HeapPage::empty(PageId::new(1, 0), td.clone(), 4096).unwrap();
        assert_eq!(page.num_slots(), num_slots_for(4096, td.get_size()));
        assert_eq!(page.num_slots(), 504);
    }

    #[test]
    fn round_trip_serialize() {
        let td = int_pair_desc();
        let mut page = HeapPage::empty(PageId::new(1, 0), td.clone(), 4096).unwrap();
        for i in 0..10 {
            page.insert(Tuple::new(
                vec![
                    FieldVal::IntField(IntField::new(i)),
                    FieldVal::IntField(IntField::new(i * 2)),
                ],
                &td,
            ))
            .unwrap();
        }
        let bytes = page.get_page_data();
        let page2 = HeapPage::new(page.get_id(), &bytes, td, 4096).unwrap();
        assert_eq!(page, page2);
        let values: Vec<(i32, i32)> = page2
            .iter()
            .map(|t| {
                (
                    t.get_field(0).unwrap().clone().into_int().unwrap().get_value(),
                    t.get_field(1).unwrap().clone().into_int().unwrap().get_value(),
                )
            })
            .collect();
        let expected: Vec<(i32, i32)> = (0..10).map(|i| (i, i * 2)).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn insert_sets_lowest_empty_slot_and_header_bit() {
        let td = int_pair_desc();
        let mut page = HeapPage::empty(PageId::new(1, 0), td.clone(), 4096).unwrap();
        let t = Tuple::new(
            vec![FieldVal::IntField(IntField::new(1)), FieldVal::IntField(IntField::new(2))],
            &td,
        );
        page.insert(t).unwrap();
        assert_eq!(page.iter().count(), 1);
        assert_eq!(page.num_empty_slots(), page.num_slots() - 1);
    }

    #[test]
    fn page_full_when_no_empty_slots() {
        let td = int_pair_desc();
        let mut page = HeapPage::empty(PageId::new(1, 0), td.clone(), 4096).unwrap();
        for i in 0..page.num_slots() {
            page.insert(Tuple::new(
                vec![
                    FieldVal::IntField(IntField::new(i as i32)),
                    FieldVal::IntField(IntField::new(0)),
                ],
                &td,
            ))
            .unwrap();
        }
        let extra = Tuple::new(
            vec![FieldVal::IntField(IntField::new(0)), FieldVal::IntField(IntField::new(0))],
            &td,
        );
        assert!(matches!(page.insert(extra), Err(DbError::PageFull)));
    }

    #[test]
    fn delete_clears_header_bit() {
        let td = int_pair_desc();
        let mut page = HeapPage::empty(PageId::new(1, 0), td.clone(), 4096).unwrap();
        page.insert(Tuple::new(
            vec![FieldVal::IntField(IntField::new(1)), FieldVal::IntField(IntField::new(2))],
            &td,
        ))
        .unwrap();
        let t = page.iter().next().unwrap().clone();
        page.delete(&t).unwrap();
        assert_eq!(page.iter().count(), 0);
        assert_eq!(page.num_empty_slots(), page.num_slots());
    }

    #[test]
    fn delete_rejects_tuple_not_on_page() {
        let td = int_pair_desc();
        let mut page = HeapPage::empty(PageId::new(1, 0), td.clone(), 4096).unwrap();
        let foreign = Tuple::new(
            vec![FieldVal::IntField(IntField::new(1)), FieldVal::IntField(IntField::new(2))],
            &td,
        );
        assert!(matches!(page.delete(&foreign), Err(DbError::NotOnPage)));
    }

    #[test]
    fn before_image_round_trips() {
        let td = int_pair_desc();
        let mut page = HeapPage::empty(PageId::new(1, 0), td.clone(), 4096).unwrap();
        page.set_before_image();
        page.insert(Tuple::new(
            vec![FieldVal::IntField(IntField::new(1)), FieldVal::IntField(IntField::new(2))],
            &td,
        ))
        .unwrap();
        let before = page.get_before_image().unwrap();
        assert_eq!(before.iter().count(), 0);
        assert_eq!(page.iter().count(), 1);
    }
}
