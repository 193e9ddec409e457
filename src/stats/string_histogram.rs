use crate::operators::Op;

use super::IntHistogram;

const PACK_CHARS: usize = 4;

/// Packs up to the first 4 characters of a string into an i32 so string
/// selectivity can ride on the same equi-width bucket math as `IntHistogram`.
pub(crate) fn pack(s: &str) -> i32 {
    let mut value: i32 = 0;
    let mut chars = s.chars();
    for _ in 0..PACK_CHARS {
        let c = chars.next().unwrap_or('\0') as i32;
        let c = c.min(127);
        value = value * 128 + c;
    }
    value
}

/// A histogram over string-valued fields, built by packing each string's
/// leading characters into an integer and delegating to `IntHistogram`.
pub struct StringHistogram {
    inner: IntHistogram,
}

impl StringHistogram {
    /// `min_packed`/`max_packed` are the observed bounds for this field,
    /// packed the same way `add_value`/`selectivity` pack their arguments —
    /// mirroring `IntHistogram::new`'s per-field range rather than spanning
    /// the full packed-character space regardless of the actual data.
    pub fn new(num_buckets: usize, min_packed: i32, max_packed: i32) -> Self {
        StringHistogram {
            inner: IntHistogram::new(num_buckets, min_packed, max_packed),
        }
    }

    pub fn add_value(&mut self, s: &str) {
        self.inner.add_value(pack(s));
    }

    pub fn selectivity(&self, op: Op, s: &str) -> f64 {
        self.inner.selectivity(op, pack(s))
    }
}
