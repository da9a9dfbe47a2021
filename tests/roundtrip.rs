use dialect_csv::{
    DialectProvider, ReaderBuilder, RelaxedProvider, StrictProvider,
    WriterBuilder,
};
use proptest::prelude::*;

type Row = Vec<Option<String>>;

fn rows() -> impl Strategy<Value = Vec<Row>> {
    let field = prop::option::of("[a-z;,\"\r\n ]{0,6}");
    prop::collection::vec(prop::collection::vec(field, 1..6), 0..8)
}

fn write<P: DialectProvider>(provider: &P, rows: &[Row]) -> Vec<u8> {
    let mut wtr = WriterBuilder::new()
        .dialect(&provider.provide())
        .quote_line_breaks(true)
        .buffer_capacity(7)
        .from_writer(vec![]);
    for row in rows {
        wtr.write_record(row.iter().map(|f| f.as_ref())).unwrap();
    }
    wtr.into_inner().unwrap()
}

fn read<P: DialectProvider>(provider: P, data: &[u8], cap: usize) -> Vec<Row> {
    let mut rdr =
        ReaderBuilder::new(provider).buffer_capacity(cap).from_reader(data);
    let mut got = vec![];
    while let Some(rec) = rdr.next_record().unwrap() {
        got.push(
            rec.iter_opt()
                .map(|f| f.map(|f| String::from_utf8(f.to_vec()).unwrap()))
                .collect(),
        );
    }
    got
}

proptest! {
    #[test]
    fn strict_round_trip(rows in rows(), cap in 1usize..40) {
        let provider = StrictProvider::new();
        let data = write(&provider, &rows);
        prop_assert_eq!(read(provider, &data, cap), rows);
    }

    #[test]
    fn relaxed_round_trip(rows in rows(), cap in 1usize..40) {
        let provider = RelaxedProvider::new();
        let data = write(&provider, &rows);
        prop_assert_eq!(read(provider, &data, cap), rows);
    }

    #[test]
    fn semicolon_round_trip(rows in rows()) {
        let provider = StrictProvider::new().delimiter(b';');
        let data = write(&provider, &rows);
        prop_assert_eq!(read(provider, &data, 8), rows);
    }

    #[test]
    fn relaxed_never_fails(data in prop::collection::vec(any::<u8>(), 0..200)) {
        let mut rdr = ReaderBuilder::new(RelaxedProvider::new())
            .buffer_capacity(5)
            .from_reader(&data[..]);
        prop_assert!(rdr.skip(u64::MAX).is_ok());
    }
}
