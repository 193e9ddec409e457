use std::fmt::{Display, Formatter};

use crate::config::DEFAULT_STRING_FIELD_CAPACITY;
use crate::error::{DbError, DbResult};
use crate::fields::{Field, FieldVal};
use crate::page::PageId;
use crate::types::Type;

/// A stable reference to one tuple's slot on one page.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct RecordId {
    pid: PageId,
    tuple_no: usize,
}

impl RecordId {
    pub fn new(pid: PageId, tuple_no: usize) -> Self {
        RecordId { pid, tuple_no }
    }

    pub fn get_page_id(&self) -> PageId {
        self.pid
    }

    pub fn get_tuple_no(&self) -> usize {
        self.tuple_no
    }
}

/// An ordered schema: field types plus optional names.
///
/// Equality is defined purely by the ordered type+name sequence, per
/// invariant; `string_capacity` affects on-disk size but not equality.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    types: Vec<Type>,
    fields: Vec<String>,
    string_capacity: usize,
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.types == other.types && self.fields == other.fields
    }
}
impl Eq for TupleDesc {}

impl TupleDesc {
    pub fn new(types: Vec<Type>, fields: Vec<String>) -> Self {
        TupleDesc {
            types,
            fields,
            string_capacity: DEFAULT_STRING_FIELD_CAPACITY,
        }
    }

    pub fn with_capacity(types: Vec<Type>, fields: Vec<String>, string_capacity: usize) -> Self {
        TupleDesc {
            types,
            fields,
            string_capacity,
        }
    }

    pub fn string_capacity(&self) -> usize {
        self.string_capacity
    }

    /// Concatenates `td1`'s fields followed by `td2`'s. Takes `td1`'s string
    /// capacity (the two are expected to share a capacity in practice, since
    /// both descend from the same `Config`).
    pub fn combine(td1: &TupleDesc, td2: &TupleDesc) -> TupleDesc {
        let mut types = td1.types.clone();
        types.extend(td2.types.clone());
        let mut field_names = td1.fields.clone();
        field_names.extend(td2.fields.clone());
        TupleDesc::with_capacity(types, field_names, td1.string_capacity)
    }

    pub fn get_num_fields(&self) -> usize {
        self.types.len()
    }

    pub fn get_field_name(&self, i: usize) -> Option<&String> {
        self.fields.get(i)
    }

    /// Returns the index of the field with the given name, or
    /// `DbError::NoSuchField` if none matches.
    pub fn name_to_id(&self, name: &str) -> DbResult<usize> {
        self.fields
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| DbError::NoSuchField(name.to_string()))
    }

    pub fn get_field_type(&self, i: usize) -> Option<&Type> {
        self.types.get(i)
    }

    /// Size in bytes of a tuple matching this schema: the sum of each
    /// field's own type width (string fields use this schema's capacity).
    pub fn get_size(&self) -> usize {
        self.types
            .iter()
            .fold(0, |acc, t| acc + t.get_len(self.string_capacity))
    }
}

/// A schema plus a vector of field values, plus an optional record id.
#[derive(Debug, Clone)]
pub struct Tuple {
    fields: Vec<FieldVal>,
    td: TupleDesc,
    rid: Option<RecordId>,
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields && self.td == other.td
    }
}
impl Eq for Tuple {}

impl Display for Tuple {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = String::new();
        for (i, field) in self.fields.iter().enumerate() {
            let name = self
                .td
                .get_field_name(i)
                .cloned()
                .unwrap_or_else(|| "?".to_string());
            match field {
                FieldVal::IntField(int_field) => {
                    s.push_str(&format!("{}: {}", name, int_field.get_value()))
                }
                FieldVal::StringField(string_field) => {
                    s.push_str(&format!("{}: {}", name, string_field.get_value()))
                }
            }
            if i != self.fields.len() - 1 {
                s.push_str(", ");
            }
        }
        write!(f, "{{{}}}", s)
    }
}

impl Tuple {
    pub fn new(fields: Vec<FieldVal>, td: &TupleDesc) -> Self {
        Tuple {
            fields,
            td: td.clone(),
            rid: None,
        }
    }

    pub fn get_tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    pub fn get_record_id(&self) -> Option<RecordId> {
        self.rid
    }

    pub fn set_record_id(&mut self, rid: RecordId) {
        self.rid = Some(rid);
    }

    pub fn get_field(&self, i: usize) -> Option<&FieldVal> {
        self.fields.get(i)
    }

    pub fn set_field(&mut self, i: usize, field: FieldVal) {
        self.fields[i] = field;
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = vec![];
        for field in self.fields.iter() {
            bytes.extend(field.serialize());
        }
        bytes
    }

    pub fn deserialize(bytes: &[u8], td: &TupleDesc) -> DbResult<Self> {
        let mut offset = 0;
        let mut fields = vec![];
        for t in td.types.iter() {
            let field = t.parse(&bytes[offset..], td.string_capacity)?;
            offset += t.get_len(td.string_capacity);
            fields.push(field);
        }
        Ok(Tuple::new(fields, td))
    }

    pub fn get_fields(&self) -> Vec<FieldVal> {
        self.fields.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{IntField, StringField};
    use crate::types::Type;

    #[test]
    fn test_tuple_desc_combine() {
        let td1 = TupleDesc::new(
            vec![Type::IntType, Type::StringType],
            vec!["int".to_string(), "string".to_string()],
        );
        let td2 = TupleDesc::new(
            vec![Type::IntType, Type::StringType],
            vec!["int".to_string(), "string".to_string()],
        );
        let td3 = TupleDesc::combine(&td1, &td2);
        assert_eq!(td3.get_num_fields(), 4);
        assert_eq!(td3.get_field_name(0), Some(&"int".to_string()));
        assert_eq!(td3.get_field_name(1), Some(&"string".to_string()));
        assert_eq!(td3.get_field_name(2), Some(&"int".to_string()));
        assert_eq!(td3.get_field_name(3), Some(&"string".to_string()));
    }

    #[test]
    fn test_tuple_desc_len() {
        let td = TupleDesc::with_capacity(
            vec![Type::IntType, Type::StringType],
            vec!["int".to_string(), "string".to_string()],
            8,
        );
        assert_eq!(td.get_size(), 4 + (8 + 4));
    }

    #[test]
    fn test_tuple_desc_equality_ignores_capacity() {
        let td_a = TupleDesc::with_capacity(vec![Type::IntType], vec!["x".to_string()], 8);
        let td_b = TupleDesc::with_capacity(vec![Type::IntType], vec!["x".to_string()], 256);
        assert_eq!(td_a, td_b);
    }

    #[test]
    fn test_name_to_id_missing_field() {
        let td = TupleDesc::new(vec![Type::IntType], vec!["x".to_string()]);
        assert!(td.name_to_id("y").is_err());
        assert_eq!(td.name_to_id("x").unwrap(), 0);
    }

    #[test]
    fn test_tuple_serialize_deserialize() {
        let td = TupleDesc::with_capacity(
            vec![Type::IntType, Type::StringType],
            vec!["int".to_string(), "string".to_string()],
            5,
        );
        let tuple = Tuple::new(
            vec![
                FieldVal::IntField(IntField::new(1)),
                FieldVal::StringField(StringField::new("hello".to_string(), 5)),
            ],
            &td,
        );
        let bytes = tuple.serialize();
        let tuple2 = Tuple::deserialize(&bytes, &td).unwrap();
        assert_eq!(tuple, tuple2);
    }
}
