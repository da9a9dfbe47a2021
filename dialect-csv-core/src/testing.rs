use core::mem;
use core::str;

use arrayvec::{ArrayString, ArrayVec};

use crate::dialect::{Actions, Dialect, Malformation};

pub type Csv = ArrayVec<Row, 10>;
pub type Row = ArrayVec<Field, 10>;
pub type Field = ArrayString<32>;

macro_rules! csv {
    ($([$($field:expr),*]),*) => {{
        #[allow(unused_mut)]
        fn x() -> $crate::testing::Csv {
            let mut csv = $crate::testing::Csv::new();
            $(
                let mut row = $crate::testing::Row::new();
                $(
                    row.push($crate::testing::Field::from($field).unwrap());
                )*
                csv.push(row);
            )*
            csv
        }
        x()
    }}
}

macro_rules! parses_to {
    ($name:ident, $provider:expr, $data:expr, $expected:expr) => {
        #[test]
        fn $name() {
            use $crate::dialect::DialectProvider;

            let mut dialect = $provider.provide();
            let got = $crate::testing::tokenize(&mut dialect, $data.as_bytes());
            assert_eq!(Ok($expected), got);
        }
    };
}

macro_rules! fails_at {
    ($name:ident, $provider:expr, $data:expr, $pos:expr, $kind:expr) => {
        #[test]
        fn $name() {
            use $crate::dialect::DialectProvider;

            let mut dialect = $provider.provide();
            let got = $crate::testing::tokenize(&mut dialect, $data.as_bytes());
            assert_eq!(Err(($pos, $kind)), got);
        }
    };
}

/// Runs a dialect over all of `data` and collects its records.
///
/// This is a minimal in-memory tokenizer: it applies the actions in the
/// documented order and returns the position of the first error.
pub fn tokenize<D: Dialect>(
    dialect: &mut D,
    data: &[u8],
) -> Result<Csv, (usize, Malformation)> {
    let mut csv = Csv::new();
    let mut row = Row::new();
    let mut field = ArrayVec::<u8, 32>::new();
    let mut mark: Option<usize> = None;
    let mut state = dialect.start();
    let mut pos = 0;
    loop {
        let input = data.get(pos).cloned();
        let trans = dialect.transition(state, input);
        let acts = trans.actions;
        if acts.contains(Actions::ERROR) {
            return Err((pos, dialect.malformation(state, input)));
        }
        if acts.contains(Actions::REMOVE_CHAR_BEFORE) {
            let start = mark.unwrap_or(pos - 1);
            field.try_extend_from_slice(&data[start..pos - 1]).unwrap();
            mark = Some(pos);
        }
        if acts.contains(Actions::END_FIELD_BEFORE) {
            end_field(&mut row, &mut field, &mut mark, data, pos - 1);
        }
        if acts.contains(Actions::START_FIELD) {
            field.clear();
            mark = Some(pos);
        }
        if acts.contains(Actions::END_FIELD_HERE) {
            end_field(&mut row, &mut field, &mut mark, data, pos);
        }
        state = trans.state;
        if !acts.contains(Actions::REPEAT) && input.is_some() {
            pos += 1;
        }
        if acts.contains(Actions::END_LINE) {
            csv.push(mem::replace(&mut row, Row::new()));
        }
        if acts.contains(Actions::STOP) || input.is_none() {
            if !row.is_empty() {
                csv.push(row);
            }
            return Ok(csv);
        }
    }
}

fn end_field(
    row: &mut Row,
    field: &mut ArrayVec<u8, 32>,
    mark: &mut Option<usize>,
    data: &[u8],
    end: usize,
) {
    let start = mark.take().unwrap_or(end);
    field.try_extend_from_slice(&data[start..end]).unwrap();
    row.push(Field::from(str::from_utf8(field).unwrap()).unwrap());
    field.clear();
}
