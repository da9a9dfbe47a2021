use std::io;
use std::ops::Range;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use dialect_csv::{Dialect, Error, Position, Reader, Record, Result};

/// Size in bytes of one record entry.
const ENTRY: u64 = 16;

/// An index for random access to CSV records.
///
/// This index permits seeking to the start of any CSV record with a constant
/// number of operations, and splitting CSV data into record aligned byte
/// ranges.
///
/// The format of the index is amenable to serializing to disk. It consists
/// of 64 bit big-endian integers: for each of the `N` records in the indexed
/// data, the byte offset and the line number where the record starts.
/// These are followed by the byte offset of the end of the data, and
/// finally by `N`.
#[derive(Debug)]
pub struct RecordIndex<R> {
    rdr: R,
    len: u64,
}

impl<R: io::Read + io::Seek> RecordIndex<R> {
    /// Write an index to the given writer.
    ///
    /// The given CSV reader is read as given until it is done. If there was
    /// a problem reading CSV records or writing to the given writer, then
    /// an error is returned.
    ///
    /// The index starts at the reader's current record. Its byte offsets
    /// are those reported by the reader, so an index of a reader created
    /// at the start of its data can be used with `Reader::seek` on a
    /// reader over the same data.
    pub fn create<C, D, W>(rdr: &mut Reader<C, D>, mut wtr: W) -> Result<()>
    where
        C: io::Read,
        D: Dialect,
        W: io::Write,
    {
        let mut len = 0;
        let mut record = Record::new();
        while rdr.read_record(&mut record)? {
            let pos = match record.position() {
                Some(pos) => pos.clone(),
                None => rdr.position(),
            };
            wtr.write_u64::<BigEndian>(pos.byte())?;
            wtr.write_u64::<BigEndian>(pos.line())?;
            len += 1;
        }
        wtr.write_u64::<BigEndian>(rdr.position().byte())?;
        wtr.write_u64::<BigEndian>(len)?;
        Ok(())
    }

    /// Open an existing CSV index.
    ///
    /// The reader given must be seekable and should contain an index written
    /// by `RecordIndex::create`.
    pub fn open(mut rdr: R) -> Result<RecordIndex<R>> {
        rdr.seek(io::SeekFrom::End(-8))?;
        let len = rdr.read_u64::<BigEndian>()?;
        Ok(RecordIndex { rdr, len })
    }

    /// Get the position of the record at index `i`.
    ///
    /// The first record has index `0`.
    ///
    /// If the position returned is given to `Reader::seek` on a reader over
    /// the data that was indexed, then the next record read will be the
    /// `i`th record.
    pub fn get(&mut self, i: u64) -> Result<Position> {
        if i >= self.len {
            let msg = format!(
                "invalid record index {} (there are {} records)",
                i, self.len
            );
            return Err(Error::from(io::Error::new(io::ErrorKind::Other, msg)));
        }
        self.rdr.seek(io::SeekFrom::Start(i * ENTRY))?;
        let byte = self.rdr.read_u64::<BigEndian>()?;
        let line = self.rdr.read_u64::<BigEndian>()?;
        if line == 0 {
            let msg = format!("corrupt index entry for record {}", i);
            return Err(Error::from(io::Error::new(
                io::ErrorKind::InvalidData,
                msg,
            )));
        }
        let mut pos = Position::new();
        pos.set_byte(byte).set_line(line).set_record(i);
        Ok(pos)
    }

    /// Returns the byte offset of the end of the indexed data.
    pub fn data_len(&mut self) -> Result<u64> {
        self.rdr.seek(io::SeekFrom::Start(self.len * ENTRY))?;
        Ok(self.rdr.read_u64::<BigEndian>()?)
    }

    /// Split the indexed data into at most `n` byte ranges.
    ///
    /// Every range starts at the first byte of a record and ends where the
    /// next range starts, and the ranges together cover every record. Each
    /// holds the same number of records, except for the last one which may
    /// hold fewer. No ranges are returned if `n` is zero or the index is
    /// empty.
    pub fn partitions(&mut self, n: u64) -> Result<Vec<Range<u64>>> {
        if n == 0 || self.len == 0 {
            return Ok(vec![]);
        }
        let per = (self.len + n - 1) / n;
        let end = self.data_len()?;
        let mut starts = vec![];
        let mut i = 0;
        while i < self.len {
            starts.push(self.get(i)?.byte());
            i += per;
        }
        let mut ranges = Vec::with_capacity(starts.len());
        for (k, &start) in starts.iter().enumerate() {
            let stop = starts.get(k + 1).cloned().unwrap_or(end);
            ranges.push(start..stop);
        }
        Ok(ranges)
    }

    /// Return the number of records in this index.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if and only if this index has no records.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
