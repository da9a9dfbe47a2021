/*!
The `dialect-csv-index` crate provides an on disk index of the records in
CSV data read with [`dialect-csv`](https://docs.rs/dialect-csv).

# Example: build an index and jump to the last record

The `RecordIndex` maps record indices to the position where each record
starts. It is written once and cannot be updated: if the CSV data changes,
the index needs to be created again.

```no_run
use std::error::Error;
use std::fs::File;
use std::io::{self, Write};

use dialect_csv::{Reader, ReaderBuilder, StrictProvider};
use dialect_csv_index::RecordIndex;

# fn main() -> Result<(), Box<dyn Error>> {
let builder = ReaderBuilder::new(StrictProvider::new());

// Index `data.csv` into `data.csv.idx`.
let mut rdr = builder.from_path("data.csv")?;
let mut wtr = io::BufWriter::new(File::create("data.csv.idx")?);
RecordIndex::<File>::create(&mut rdr, &mut wtr)?;
wtr.flush()?;

// Seek a fresh reader to the last record.
let mut idx = RecordIndex::open(File::open("data.csv.idx")?)?;
if idx.is_empty() {
    return Err(From::from("expected a non-empty CSV index"));
}
let pos = idx.get(idx.len() - 1)?;
let mut rdr = builder.from_path("data.csv")?;
rdr.seek(pos)?;
match rdr.next_record()? {
    Some(rec) => println!("{}", rec),
    None => return Err(From::from("expected at least one record")),
}
# Ok(())
# }
```

# Example: split work across threads

`RecordIndex::partitions` divides the data into byte ranges that start and
end on record boundaries. Each range can be read by its own `Reader` with its
own dialect, which is the only way to read one CSV stream in parallel.

```no_run
use std::error::Error;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::thread;

use dialect_csv::{ReaderBuilder, RelaxedProvider};
use dialect_csv_index::RecordIndex;

# fn main() -> Result<(), Box<dyn Error>> {
let mut idx = RecordIndex::open(File::open("data.csv.idx")?)?;
let mut handles = vec![];
for range in idx.partitions(4)? {
    handles.push(thread::spawn(move || -> dialect_csv::Result<u64> {
        let mut file = File::open("data.csv")?;
        file.seek(SeekFrom::Start(range.start))?;
        let part = file.take(range.end - range.start);
        let mut rdr =
            ReaderBuilder::new(RelaxedProvider::new()).from_reader(part);
        rdr.skip(u64::MAX)
    }));
}
let mut total = 0;
for handle in handles {
    total += handle.join().map_err(|_| "worker panicked")??;
}
println!("{} records", total);
# Ok(())
# }
```
*/

#![deny(missing_docs)]

pub use crate::simple::RecordIndex;

mod simple;
