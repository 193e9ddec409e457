use crate::types::Type;

/// Wrapper for the two supported field value kinds.
#[derive(Debug, PartialEq, Eq, Clone, PartialOrd, Ord, Hash)]
pub enum FieldVal {
    IntField(IntField),
    StringField(StringField),
}

impl FieldVal {
    pub fn into_int(self) -> Option<IntField> {
        match self {
            FieldVal::IntField(int_field) => Some(int_field),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<StringField> {
        match self {
            FieldVal::StringField(string_field) => Some(string_field),
            _ => None,
        }
    }

    pub fn get_type(&self) -> Type {
        match self {
            FieldVal::IntField(_) => Type::IntType,
            FieldVal::StringField(_) => Type::StringType,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            FieldVal::IntField(f) => f.serialize(),
            FieldVal::StringField(f) => f.serialize(),
        }
    }
}

/// Common behavior across field kinds.
pub trait Field {
    fn get_type(&self) -> Type;
    fn serialize(&self) -> Vec<u8>;
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
pub struct IntField {
    value: i32,
}

impl IntField {
    pub fn new(value: i32) -> Self {
        IntField { value }
    }

    pub fn get_value(&self) -> i32 {
        self.value
    }
}

impl Field for IntField {
    fn get_type(&self) -> Type {
        Type::IntType
    }

    fn serialize(&self) -> Vec<u8> {
        self.value.to_be_bytes().to_vec()
    }
}

/// A string field. `capacity` is the schema-configured on-disk width
/// (excluding the 4-byte length prefix); values longer than `capacity` are
/// truncated on serialization.
#[derive(Debug, Eq, Clone)]
pub struct StringField {
    value: String,
    capacity: usize,
}

impl StringField {
    pub fn new(value: String, capacity: usize) -> Self {
        StringField { value, capacity }
    }

    pub fn get_value(&self) -> String {
        self.value.clone()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl PartialEq for StringField {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialOrd for StringField {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.value.cmp(&other.value))
    }
}

impl Ord for StringField {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl std::hash::Hash for StringField {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl Field for StringField {
    fn get_type(&self) -> Type {
        Type::StringType
    }

    fn serialize(&self) -> Vec<u8> {
        let str_bytes = self.value.as_bytes();
        let copy_len = std::cmp::min(str_bytes.len(), self.capacity);
        let mut bytes = vec![0; self.capacity + 4];
        bytes[0..4].copy_from_slice(&(copy_len as u32).to_be_bytes());
        bytes[4..4 + copy_len].copy_from_slice(&str_bytes[..copy_len]);
        bytes
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_int_field() {
        let int_field = IntField::new(1);
        assert_eq!(int_field.get_type(), Type::IntType);
        assert_eq!(int_field.serialize(), vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_string_field() {
        let string_field = StringField::new("hello".to_string(), 128);
        assert_eq!(string_field.get_type(), Type::StringType);
        let serialized = string_field.serialize();
        assert_eq!(serialized.len(), 132);
        assert_eq!(&serialized[0..4], &[0, 0, 0, 5]);
        assert_eq!(&serialized[4..9], b"hello");
    }

    #[test]
    fn test_string_field_truncates_past_capacity() {
        let string_field = StringField::new("hello world".to_string(), 5);
        let serialized = string_field.serialize();
        assert_eq!(serialized.len(), 9);
        assert_eq!(&serialized[4..9], b"hello");
    }
}
