use dialect_csv::{
    DecimalSeparator, Dialect, DialectProvider, Error, ExcelProvider,
    Malformation, Reader, ReaderBuilder, RelaxedProvider, StrictProvider,
    WriterBuilder,
};

type Fields = Vec<Option<String>>;

fn read_all<P: DialectProvider>(provider: P, data: &[u8]) -> Vec<Fields> {
    let mut rdr = ReaderBuilder::new(provider).from_reader(data);
    let mut rows = vec![];
    while let Some(rec) = rdr.next_record().unwrap() {
        rows.push(
            rec.iter_opt()
                .map(|f| f.map(|f| String::from_utf8(f.to_vec()).unwrap()))
                .collect(),
        );
    }
    rows
}

fn write_all<D: Dialect>(dialect: &D, rows: &[Fields]) -> Vec<u8> {
    let mut wtr = WriterBuilder::new()
        .dialect(dialect)
        .quote_line_breaks(true)
        .from_writer(vec![]);
    for row in rows {
        wtr.write_record(row.iter().map(|f| f.as_ref())).unwrap();
    }
    wtr.into_inner().unwrap()
}

fn s(field: &str) -> Option<String> {
    Some(field.to_string())
}

#[test]
fn round_trip() {
    let rows = vec![
        vec![s("plain"), s("with,comma"), s("with \"quote\"")],
        vec![None, s(""), s("multi\r\nline")],
        vec![s("tail"), None, None],
    ];
    let strict = StrictProvider::new();
    let data = write_all(&strict.provide(), &rows);
    assert_eq!(read_all(strict, &data), rows);

    let relaxed = RelaxedProvider::new().delimiter(b'\t').quote(b'\'');
    let data = write_all(&relaxed.provide(), &rows);
    assert_eq!(read_all(relaxed, &data), rows);
}

#[test]
fn quoting_minimality() {
    let mut wtr = WriterBuilder::new().from_writer(vec![]);
    wtr.write_record(vec![Some("a"), Some("b,c"), None, Some("d\"e")])
        .unwrap();
    wtr.write_record(vec![Some("a"), Some("b,c"), Some(""), Some("d\"e")])
        .unwrap();
    let data = wtr.into_inner().unwrap();
    assert_eq!(
        String::from_utf8(data).unwrap(),
        "a,\"b,c\",,\"d\"\"e\"\r\na,\"b,c\",\"\",\"d\"\"e\"\r\n"
    );
}

#[test]
fn absent_vs_empty() {
    let mut wtr = WriterBuilder::new().from_writer(vec![]);
    wtr.write_record(vec![None, Some("")]).unwrap();
    let data = wtr.into_inner().unwrap();
    assert_eq!(data, b",\"\"\r\n");

    let mut rdr = Reader::from_reader(&data[..]);
    let rec = rdr.next_record().unwrap().unwrap();
    assert_eq!(rec.len(), 2);
    assert!(rec.is_absent(0));
    assert_eq!(rec.get_opt(0), None);
    assert!(!rec.is_absent(1));
    assert_eq!(rec.get_opt(1), Some(&b""[..]));
    // Typed accessors see both as missing.
    assert_eq!(rec.get_str(0).unwrap(), None);
    assert_eq!(rec.get_i32(1).unwrap(), None);
}

#[test]
fn dialect_error_boundary() {
    let data = b"a,\"b\nc";

    let mut rdr = ReaderBuilder::new(StrictProvider::new()).from_reader(&data[..]);
    match rdr.next_record() {
        Err(Error::Malformed { kind, byte, .. }) => {
            assert_eq!(kind, Malformation::UnexpectedEof);
            assert_eq!(byte, None);
        }
        other => panic!("expected a malformed input error, got {:?}", other),
    }

    let rows = read_all(RelaxedProvider::new(), data);
    assert_eq!(rows, vec![vec![s("a"), s("b\nc")]]);
}

#[test]
fn line_terminator_tolerance() {
    let rows = read_all(RelaxedProvider::new(), b"a,b\r\nc,d\n e,f\r");
    assert_eq!(
        rows,
        vec![
            vec![s("a"), s("b")],
            vec![s("c"), s("d")],
            vec![s(" e"), s("f")],
        ]
    );
}

#[test]
fn excel_delimiter_sniffing() {
    let comma = ExcelProvider::new(DecimalSeparator::Comma);

    let mut rdr = ReaderBuilder::new(comma).from_reader(&b"sep=;\r\na;b;c\r\n"[..]);
    {
        let rec = rdr.next_record().unwrap().unwrap();
        assert_eq!(rec.iter().collect::<Vec<_>>(), vec![&b"a"[..], b"b", b"c"]);
    }
    assert_eq!(rdr.delimiter(), b';');
    assert!(rdr.next_record().unwrap().is_none());

    // A comma decimal separator makes `;` the list delimiter.
    let rows = read_all(comma, b"1,5;2\r\n");
    assert_eq!(rows, vec![vec![s("1,5"), s("2")]]);
    let rows = read_all(ExcelProvider::new(DecimalSeparator::Point), b"1;5,2\r\n");
    assert_eq!(rows, vec![vec![s("1;5"), s("2")]]);
}

#[test]
fn field_count_mismatch() {
    let data = "a,b,c\r\nd,e,f\r\ng,h,i,j\r\n";
    let mut rdr = ReaderBuilder::new(StrictProvider::new())
        .flexible(false)
        .from_reader(data.as_bytes());
    rdr.skip(2).unwrap();
    match rdr.next_record() {
        Err(Error::TooManyFields { pos, expected, found }) => {
            assert_eq!(pos.line(), 3);
            assert_eq!((expected, found), (3, 4));
        }
        other => panic!("expected too many fields, got {:?}", other),
    }
}

#[test]
fn field_longer_than_window() {
    let long = "x\"".repeat(500);
    let mut data = String::from("head,\"");
    data.push_str(&long.replace('"', "\"\""));
    data.push_str("\",tail\r\nnext\r\n");

    let mut rdr = ReaderBuilder::new(StrictProvider::new())
        .buffer_capacity(16)
        .max_record_length(4096)
        .from_reader(data.as_bytes());
    {
        let rec = rdr.next_record().unwrap().unwrap();
        assert_eq!(rec.len(), 3);
        assert_eq!(rec.get(1), Some(long.as_bytes()));
        assert_eq!(rec.get(2), Some(&b"tail"[..]));
    }
    let rec = rdr.next_record().unwrap().unwrap();
    assert_eq!(rec.get(0), Some(&b"next"[..]));
    assert_eq!(rec.position().unwrap().byte(), data.len() as u64 - 6);
}

#[test]
fn record_too_long_cap() {
    let data = format!("{}\r\nshort\r\n", "y".repeat(100));
    let mut rdr = ReaderBuilder::new(RelaxedProvider::new())
        .buffer_capacity(8)
        .max_record_length(50)
        .from_reader(data.as_bytes());
    match rdr.next_record() {
        Err(Error::RecordTooLong { pos, limit }) => {
            assert_eq!(limit, 50);
            assert_eq!(pos.record(), 0);
        }
        other => panic!("expected record too long, got {:?}", other),
    }
    rdr.resync().unwrap();
    let rec = rdr.next_record().unwrap().unwrap();
    assert_eq!(rec.get(0), Some(&b"short"[..]));
}

#[test]
fn providers_give_independent_dialects() {
    let excel = ExcelProvider::default();
    let mut first = ReaderBuilder::new(excel).from_reader(&b"sep=|\na|b\n"[..]);
    let mut second = ReaderBuilder::new(excel).from_reader(&b"a|b\n"[..]);

    assert_eq!(first.next_record().unwrap().unwrap().len(), 2);
    assert_eq!(first.delimiter(), b'|');
    assert_eq!(second.next_record().unwrap().unwrap().len(), 1);
    assert_eq!(second.delimiter(), b',');
}

#[test]
fn closed_reader_and_writer() {
    let mut rdr = Reader::from_reader(&b"a\n"[..]);
    rdr.close();
    assert!(matches!(rdr.next_record(), Err(Error::Closed)));
    assert!(matches!(rdr.skip(1), Err(Error::Closed)));

    let mut wtr = WriterBuilder::new().from_writer(vec![]);
    wtr.close().unwrap();
    wtr.close().unwrap();
    assert!(matches!(wtr.write_record(vec![Some("a")]), Err(Error::Closed)));
}
