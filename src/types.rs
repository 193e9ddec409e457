use crate::error::{DbError, DbResult};
use crate::fields::{FieldVal, IntField, StringField};

/// Only Int and String are supported, matching the teaching lineage this
/// engine is built for.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Type {
    IntType,
    StringType,
}

impl Type {
    /// Serialized byte width of this type. String width depends on the
    /// schema's configured capacity, unlike a one-size-fits-all `INT_TYPE`
    /// width for every field.
    pub fn get_len(&self, string_capacity: usize) -> usize {
        match self {
            Type::IntType => 4,
            Type::StringType => string_capacity + 4,
        }
    }

    pub fn parse(&self, bytes: &[u8], string_capacity: usize) -> DbResult<FieldVal> {
        match self {
            Type::IntType => {
                if bytes.len() < 4 {
                    return Err(DbError::MalformedPage("truncated int field".to_string()));
                }
                let mut int_bytes = [0; 4];
                int_bytes.copy_from_slice(&bytes[..4]);
                Ok(FieldVal::IntField(IntField::new(i32::from_be_bytes(
                    int_bytes,
                ))))
            }
            Type::StringType => {
                if bytes.len() < 4 + string_capacity {
                    return Err(DbError::MalformedPage(
                        "truncated string field".to_string(),
                    ));
                }
                let mut len_bytes = [0; 4];
                len_bytes.copy_from_slice(&bytes[..4]);
                let len = u32::from_be_bytes(len_bytes) as usize;
                let len = len.min(string_capacity);
                let string_bytes = bytes[4..4 + len].to_vec();
                let value = String::from_utf8_lossy(&string_bytes).into_owned();
                Ok(FieldVal::StringField(StringField::new(
                    value,
                    string_capacity,
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_round_trips() {
        let v = FieldVal::IntField(IntField::new(-7));
        let bytes = match &v {
            FieldVal::IntField(f) => f.serialize(),
            _ => unreachable!(),
        };
        let parsed = Type::IntType.parse(&bytes, 128).unwrap();
        assert_eq!(parsed, v);
    }

    #[test]
    fn string_round_trips() {
        let v = FieldVal::StringField(StringField::new("hi".to_string(), 16));
        let bytes = match &v {
            FieldVal::StringField(f) => f.serialize(),
            _ => unreachable!(),
        };
        let parsed = Type::StringType.parse(&bytes, 16).unwrap();
        assert_eq!(parsed, v);
    }
}
