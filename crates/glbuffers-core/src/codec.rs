//! Packing and unpacking records against a layout

use std::sync::Arc;

use crate::layout::RecordLayout;
use crate::token::FormatToken;
use crate::value::Value;
use crate::{Error, Result};

/// One packed record, `stride` bytes
///
/// Carries the identity of the layout that produced it; unpacking through a
/// different layout is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub(crate) layout_id: u64,
    pub(crate) bytes: Vec<u8>,
}

impl Record {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A contiguous run of packed records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Records {
    pub(crate) layout_id: u64,
    pub(crate) stride: usize,
    pub(crate) bytes: Vec<u8>,
}

impl Records {
    /// Record count
    pub fn len(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.bytes.len() / self.stride
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Unpacked, read-friendly view of one record
#[derive(Debug, Clone)]
pub struct ItemView {
    layout: Arc<RecordLayout>,
    values: Vec<Vec<f64>>,
}

impl ItemView {
    /// Field values by name
    pub fn field(&self, name: &str) -> Option<&[f64]> {
        self.layout
            .tokens()
            .iter()
            .position(|t| t.name == name)
            .map(|i| self.values[i].as_slice())
    }

    /// `(name, values)` pairs in token order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.layout
            .tokens()
            .iter()
            .zip(&self.values)
            .map(|(t, v)| (t.name.as_str(), v.as_slice()))
    }
}

impl std::ops::Index<&str> for ItemView {
    type Output = [f64];

    fn index(&self, name: &str) -> &[f64] {
        match self.field(name) {
            Some(values) => values,
            None => panic!("no field named \"{name}\""),
        }
    }
}

fn unexpected(token: &FormatToken, found: &Value) -> Error {
    Error::UnexpectedValue {
        format: token.format_code(),
        found: found.repr(),
    }
}

impl RecordLayout {
    /// Pack one fully specified row
    pub fn pack_single(&self, row: &Value) -> Result<Record> {
        let mut bytes = vec![0u8; self.stride()];
        self.pack_into(row, &mut bytes, true)?;
        Ok(Record {
            layout_id: self.id(),
            bytes,
        })
    }

    /// Pack a sequence of rows
    ///
    /// Rows may be partial: missing trailing fields and missing trailing
    /// elements are filled with the kind's zero value.
    pub fn pack(&self, rows: &[Value]) -> Result<Records> {
        if rows.is_empty() {
            return Err(Error::NoData);
        }
        let stride = self.stride();
        let mut bytes = vec![0u8; stride * rows.len()];
        for (chunk, row) in bytes.chunks_mut(stride).zip(rows) {
            self.pack_into(row, chunk, false)?;
        }
        Ok(Records {
            layout_id: self.id(),
            stride,
            bytes,
        })
    }

    /// Unpack one record previously produced by this layout
    pub fn unpack_single(self: &Arc<Self>, record: &Record) -> Result<ItemView> {
        if record.layout_id != self.id() {
            return Err(Error::ForeignRecord);
        }
        Ok(self.read_item(&record.bytes))
    }

    /// Unpack a run of records previously produced by this layout
    pub fn unpack(self: &Arc<Self>, records: &Records) -> Result<Vec<ItemView>> {
        if records.layout_id != self.id() {
            return Err(Error::ForeignRecord);
        }
        Ok(self.unpack_bytes(&records.bytes))
    }

    /// Unpack raw record bytes without an identity check
    ///
    /// For bytes that crossed a process or device boundary, where the
    /// producing layout instance cannot travel along. Trailing bytes shorter
    /// than one record are ignored.
    pub fn unpack_bytes(self: &Arc<Self>, bytes: &[u8]) -> Vec<ItemView> {
        bytes
            .chunks_exact(self.stride())
            .map(|chunk| self.read_item(chunk))
            .collect()
    }

    /// Decode one record's bytes
    pub(crate) fn read_item(self: &Arc<Self>, bytes: &[u8]) -> ItemView {
        let mut values = Vec::with_capacity(self.len());
        for (token, offset) in self.tokens().iter().zip(self.offsets()) {
            let width = token.kind.size();
            let mut elems = Vec::with_capacity(token.count);
            for i in 0..token.count {
                let at = offset + i * width;
                elems.push(token.kind.read(&bytes[at..at + width]));
            }
            values.push(elems);
        }
        ItemView {
            layout: Arc::clone(self),
            values,
        }
    }

    fn pack_into(&self, row: &Value, out: &mut [u8], exact: bool) -> Result<()> {
        let tokens = self.tokens();

        // Single-field layouts accept the field's sequence (or a bare scalar
        // when count == 1) in place of the nested row form.
        let fields: &[Value] = match row {
            Value::Num(_) => {
                if tokens.len() == 1 && tokens[0].count == 1 {
                    std::slice::from_ref(row)
                } else {
                    return Err(unexpected(&tokens[0], row));
                }
            }
            Value::Seq(items) => {
                if tokens.len() == 1 && !matches!(items.first(), Some(Value::Seq(_))) {
                    std::slice::from_ref(row)
                } else {
                    items.as_slice()
                }
            }
        };

        // Shape mismatches report before arity: a malformed field value wins
        // over a surplus of fields.
        for (i, value) in fields.iter().enumerate() {
            let (token, offset) = match tokens.get(i) {
                Some(token) => (token, self.offsets()[i]),
                None => return Err(Error::InvalidIndex),
            };
            let scalar_ok = tokens.len() == 1 && token.count == 1;
            let elems = field_elems(token, value, scalar_ok)?;

            if elems.len() > token.count {
                return Err(Error::InvalidIndex);
            }
            if exact && elems.len() < token.count {
                return Err(unexpected(token, value));
            }

            let width = token.kind.size();
            for (j, elem) in elems.iter().enumerate() {
                let at = offset + j * width;
                token.kind.write(*elem, &mut out[at..at + width]);
            }
        }

        if exact && fields.len() < tokens.len() {
            let token = &tokens[fields.len()];
            return Err(Error::UnexpectedValue {
                format: token.format_code(),
                found: "()".to_string(),
            });
        }

        Ok(())
    }
}

fn field_elems(token: &FormatToken, value: &Value, scalar_ok: bool) -> Result<Vec<f64>> {
    match value {
        Value::Num(n) if scalar_ok => Ok(vec![*n]),
        Value::Num(_) => Err(unexpected(token, value)),
        Value::Seq(items) => {
            let mut elems = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Num(n) => elems.push(*n),
                    Value::Seq(_) => return Err(unexpected(token, value)),
                }
            }
            Ok(elems)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: Vec<Value>) -> Value {
        Value::Seq(fields)
    }

    #[test]
    fn test_pack_single() {
        let f1 = RecordLayout::from_string("(3f)[foo]").unwrap();
        let f2 = RecordLayout::from_string("(3f)[vertex](4B)[color]").unwrap();
        let f3 = RecordLayout::from_string("(1d)[boo]").unwrap();

        let p1 = f1.pack_single(&Value::from([1.0, 2.0, 3.0])).unwrap();
        let p2 = f2
            .pack_single(&row(vec![
                Value::from([1.0, 2.0, 3.0]),
                Value::from([255.0, 100.0, 200.0, 140.0]),
            ]))
            .unwrap();
        let p3 = f3.pack_single(&Value::from([6666.0])).unwrap();

        assert_eq!(f1.stride(), p1.as_bytes().len());
        assert_eq!(f2.stride(), p2.as_bytes().len());
        assert_eq!(f3.stride(), p3.as_bytes().len());

        let u1 = f1.unpack_single(&p1).unwrap();
        assert_eq!([1.0, 2.0, 3.0], u1["foo"]);

        let u2 = f2.unpack_single(&p2).unwrap();
        assert_eq!([1.0, 2.0, 3.0], u2["vertex"]);
        assert_eq!([255.0, 100.0, 200.0, 140.0], u2["color"]);

        let u3 = f3.unpack_single(&p3).unwrap();
        assert_eq!([6666.0], u3["boo"]);
    }

    #[test]
    fn test_pack_unpack() {
        let f2 = RecordLayout::from_string("(3f)[vertex](4B)[color]").unwrap();

        let data = [
            row(vec![
                Value::from([1.0, 2.0, 3.0]),
                Value::from([215.0, 200.0, 230.0, 255.0]),
            ]),
            row(vec![
                Value::from([10.0, 8.0, 43.0]),
                Value::from([100.0, 255.0, 50.0, 50.0]),
            ]),
        ];
        let packed = f2.pack(&data).unwrap();
        assert_eq!(2, packed.len());

        let items = f2.unpack(&packed).unwrap();
        assert_eq!([1.0, 2.0, 3.0], items[0]["vertex"]);
        assert_eq!([215.0, 200.0, 230.0, 255.0], items[0]["color"]);
        assert_eq!([10.0, 8.0, 43.0], items[1]["vertex"]);
        assert_eq!([100.0, 255.0, 50.0, 50.0], items[1]["color"]);
    }

    #[test]
    fn test_partial_pack_zero_fills() {
        let f1 = RecordLayout::from_string("(3f)[foo]").unwrap();

        let data = [
            Value::from([1.0]),
            Value::from([4.0, 5.0, 6.0]),
            Value::from([7.0, 8.0]),
        ];
        let packed = f1.pack(&data).unwrap();
        let items = f1.unpack(&packed).unwrap();

        assert_eq!([1.0, 0.0, 0.0], items[0]["foo"]);
        assert_eq!([4.0, 5.0, 6.0], items[1]["foo"]);
        assert_eq!([7.0, 8.0, 0.0], items[2]["foo"]);
    }

    #[test]
    fn test_partial_pack_missing_field() {
        let f2 = RecordLayout::from_string("(3f)[vertex](4B)[color]").unwrap();

        let data = [row(vec![Value::from([1.0, 2.0, 3.0])])];
        let packed = f2.pack(&data).unwrap();
        let items = f2.unpack(&packed).unwrap();

        assert_eq!([1.0, 2.0, 3.0], items[0]["vertex"]);
        assert_eq!([0.0, 0.0, 0.0, 0.0], items[0]["color"]);
    }

    #[test]
    fn test_pack_fail() {
        let f1 = RecordLayout::from_string("(3f)[foo]").unwrap();
        let f2 = RecordLayout::from_string("(3f)[vertex](4B)[color]").unwrap();

        // scalar where the 3-float field needs a sequence
        let err = f1.pack(&[Value::Num(20.0)]).unwrap_err();
        assert_eq!(
            "Expected Sequence with format \"3f\", found \"20.0\"",
            err.to_string()
        );

        // too many elements for the field
        let err = f1.pack(&[Value::from([4.0, 5.0, 6.0, 12.0])]).unwrap_err();
        assert_eq!("invalid index", err.to_string());

        let err = f1.pack(&[]).unwrap_err();
        assert_eq!("No data to pack", err.to_string());

        // second row is a flat sequence where nested fields are required
        let data = [
            row(vec![
                Value::from([10.0, 20.0, 30.0]),
                Value::from([10.0, 11.0, 12.0, 13.0]),
            ]),
            Value::from([20.0, 30.0, 40.0]),
        ];
        let err = f2.pack(&data).unwrap_err();
        assert_eq!(
            "Expected Sequence with format \"3f\", found \"20.0\"",
            err.to_string()
        );
    }

    #[test]
    fn test_pack_single_requires_full_rows() {
        let f1 = RecordLayout::from_string("(3f)[foo]").unwrap();
        let f2 = RecordLayout::from_string("(3f)[vertex](4B)[color]").unwrap();

        assert!(f1.pack_single(&Value::from([1.0, 2.0])).is_err());

        let err = f2
            .pack_single(&row(vec![Value::from([1.0, 2.0, 3.0])]))
            .unwrap_err();
        assert_eq!(
            "Expected Sequence with format \"4B\", found \"()\"",
            err.to_string()
        );

        let err = f1
            .pack_single(&row(vec![
                Value::from([1.0, 2.0, 3.0]),
                Value::from([4.0, 5.0, 6.0]),
            ]))
            .unwrap_err();
        assert_eq!("invalid index", err.to_string());
    }

    #[test]
    fn test_unpack_foreign_record() {
        let f1 = RecordLayout::from_string("(3f)[foo]").unwrap();
        let f2 = RecordLayout::from_string("(3i)[foo]").unwrap();

        let data = [
            Value::from([1.0, 2.0, 3.0]),
            Value::from([4.0, 5.0, 6.0]),
            Value::from([7.0, 8.0, 9.0]),
        ];
        let packed = f2.pack(&data).unwrap();

        let err = f1.unpack(&packed).unwrap_err();
        assert_eq!(
            "Impossible to unpack data that was not packed by the formatter",
            err.to_string()
        );
    }

    #[test]
    fn test_unpack_bytes() {
        let f1 = RecordLayout::from_string("(2S)[halves]").unwrap();
        let packed = f1.pack(&[Value::from([1.0, 2.0]), Value::from([3.0, 4.0])]).unwrap();

        let items = f1.unpack_bytes(packed.as_bytes());
        assert_eq!(2, items.len());
        assert_eq!([3.0, 4.0], items[1]["halves"]);
    }

    #[test]
    fn test_scalar_row_single_field() {
        let f3 = RecordLayout::from_string("(1d)[boo]").unwrap();
        let record = f3.pack_single(&Value::Num(900.0)).unwrap();
        let item = f3.unpack_single(&record).unwrap();
        assert_eq!([900.0], item["boo"]);
    }
}
