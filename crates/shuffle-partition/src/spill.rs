//! Spill-file storage for `SubpartitionKind::Blocking` sub-partitions
//! that have grown past their in-memory window.
//!
//! Record layout : `[length: i32][dataType: u8][payload]`,
//! followed by a `crc32fast` checksum trailer for integrity, terminated
//! by an end-of-partition sentinel record (`dataType = 0xFF`, empty
//! payload).

use crate::error::PartitionError;
use bincode::Options;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const END_OF_PARTITION: u8 = 0xFF;

fn bincode_options() -> impl bincode::Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}

/// Appends spill records to a temp-file-backed store.
pub struct SpillWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl SpillWriter {
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record and its checksum trailer.
    pub fn write_record(&mut self, data_type: u8, payload: &[u8]) -> Result<(), PartitionError> {
        self.write_raw(data_type, payload)
.map_err(|e| PartitionError::Spill(e.to_string()))
    }

    /// Appends the end-of-partition sentinel and flushes to disk.
    pub fn finish(mut self) -> Result<PathBuf, PartitionError> {
        self.write_raw(END_OF_PARTITION, &[])
.map_err(|e| PartitionError::Spill(e.to_string()))?;
        self.writer
.flush()
.map_err(|e| PartitionError::Spill(e.to_string()))?;
        Ok(self.path)
    }

    fn write_raw(&mut self, data_type: u8, payload: &[u8]) -> io::Result<()> {
        let length = payload.len() as i32;
        let header = bincode_options()
.serialize(&(length, data_type))
.expect("fixed-width header never fails to serialize");
        self.writer.write_all(&header)?;
        self.writer.write_all(payload)?;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&header);
        hasher.update(payload);
        self.writer.write_all(&hasher.finalize().to_le_bytes())?;
        Ok(())
    }
}

/// One decoded spill record, or the end-of-partition sentinel.
pub enum SpillRecord {
    Data { data_type: u8, payload: Vec<u8> },
    EndOfPartition,
}

/// Reads records back from a spill file in append order.
pub struct SpillReader {
    reader: BufReader<File>,
}

impl SpillReader {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
        })
    }

    /// Reads the next record, or `None` at end of file.
    pub fn read_record(&mut self) -> Result<Option<SpillRecord>, PartitionError> {
        let mut header_buf = [0u8; 5]; // i32 length + u8 data_type, fixint-encoded
        match self.reader.read_exact(&mut header_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(PartitionError::Spill(e.to_string())),
        }
        let (length, data_type): (i32, u8) = bincode_options()
.deserialize(&header_buf[..])
.map_err(|e| PartitionError::Spill(e.to_string()))?;

        let mut payload = vec![0u8; length.max(0) as usize];
        self.reader
.read_exact(&mut payload)
.map_err(|e| PartitionError::Spill(e.to_string()))?;

        let mut trailer = [0u8; 4];
        self.reader
.read_exact(&mut trailer)
.map_err(|e| PartitionError::Spill(e.to_string()))?;
        let expected = u32::from_le_bytes(trailer);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&header_buf);
        hasher.update(&payload);
        if hasher.finalize() != expected {
            return Err(PartitionError::Spill("checksum mismatch".into()));
        }

        if data_type == END_OF_PARTITION {
            Ok(Some(SpillRecord::EndOfPartition))
        } else {
            Ok(Some(SpillRecord::Data { data_type, payload }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_records_and_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subpartition-0.spill");

        let mut writer = SpillWriter::create(&path).unwrap();
        writer.write_record(0, b"first record").unwrap();
        writer.write_record(1, b"second record").unwrap();
        writer.finish().unwrap();

        let mut reader = SpillReader::open(&path).unwrap();
        match reader.read_record().unwrap().unwrap() {
            SpillRecord::Data { data_type, payload } => {
                assert_eq!(data_type, 0);
                assert_eq!(payload, b"first record");
            }
            SpillRecord::EndOfPartition => panic!("expected data record"),
        }
        match reader.read_record().unwrap().unwrap() {
            SpillRecord::Data { data_type, payload } => {
                assert_eq!(data_type, 1);
                assert_eq!(payload, b"second record");
            }
            SpillRecord::EndOfPartition => panic!("expected data record"),
        }
        assert!(matches!(
            reader.read_record().unwrap().unwrap(),
            SpillRecord::EndOfPartition
));
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn detects_corrupted_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.spill");

        let mut writer = SpillWriter::create(&path).unwrap();
        writer.write_record(0, b"payload").unwrap();
        writer.finish().unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[6] ^= 0xFF; // flip a byte inside the first record's payload
        std::fs::write(&path, bytes).unwrap();

        let mut reader = SpillReader::open(&path).unwrap();
        assert!(reader.read_record().is_err());
    }
}
