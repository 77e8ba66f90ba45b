//! Big-endian cursor helpers shared by the class-file decoder and encoder.

use scroll::ctx::TryFromCtx;
use scroll::{Endian, Pread, BE};

use super::ClassFileError;

/// Forward-only reader over a class-file byte slice.
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    fn read<T>(&mut self) -> Result<T, ClassFileError>
    where
        T: TryFromCtx<'a, Endian, Error = scroll::Error>,
    {
        let at = self.offset;
        let bytes = self.bytes;
        bytes
            .gread_with::<T>(&mut self.offset, BE)
            .map_err(|_: scroll::Error| ClassFileError::Truncated { offset: at })
    }

    pub fn u8(&mut self) -> Result<u8, ClassFileError> {
        self.read()
    }

    pub fn i8(&mut self) -> Result<i8, ClassFileError> {
        self.read()
    }

    pub fn u16(&mut self) -> Result<u16, ClassFileError> {
        self.read()
    }

    pub fn i16(&mut self) -> Result<i16, ClassFileError> {
        self.read()
    }

    pub fn u32(&mut self) -> Result<u32, ClassFileError> {
        self.read()
    }

    pub fn i32(&mut self) -> Result<i32, ClassFileError> {
        self.read()
    }

    pub fn i64(&mut self) -> Result<i64, ClassFileError> {
        self.read()
    }

    pub fn u64(&mut self) -> Result<u64, ClassFileError> {
        self.read()
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8], ClassFileError> {
        let start = self.offset;
        let end = start.checked_add(len).ok_or(ClassFileError::Truncated { offset: start })?;
        let slice = self.bytes.get(start..end).ok_or(ClassFileError::Truncated { offset: start })?;
        self.offset = end;
        Ok(slice)
    }

    /// Skip switch padding so the next read starts on a 4-byte boundary.
    pub fn align4(&mut self) -> Result<(), ClassFileError> {
        while self.offset % 4 != 0 {
            self.u8()?;
        }
        Ok(())
    }
}

/// Growable big-endian writer.
#[derive(Default)]
pub(crate) struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a `u16` count, failing when `len` does not fit.
    pub fn count(&mut self, what: &'static str, len: usize) -> Result<(), ClassFileError> {
        let value = u16::try_from(len).map_err(|_| ClassFileError::TooLarge { what, len })?;
        self.u16(value);
        Ok(())
    }

    /// Write a `u32` length-prefixed blob.
    pub fn blob(&mut self, what: &'static str, bytes: &[u8]) -> Result<(), ClassFileError> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| ClassFileError::TooLarge { what, len: bytes.len() })?;
        self.u32(len);
        self.bytes(bytes);
        Ok(())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_decodes_big_endian_and_reports_truncation() {
        let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34, 0xFF];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.u32().unwrap(), 0xCAFE_BABE);
        assert_eq!(reader.u16().unwrap(), 52);
        assert_eq!(reader.remaining(), 1);
        assert_eq!(reader.u16(), Err(ClassFileError::Truncated { offset: 6 }));
        assert_eq!(reader.i8().unwrap(), -1);
        assert_eq!(reader.bytes(1), Err(ClassFileError::Truncated { offset: 7 }));
    }

    #[test]
    fn align4_skips_padding_relative_to_start() {
        let data = [0xAA, 0, 0, 0, 0, 0, 0, 7];
        let mut reader = ByteReader::new(&data);
        reader.u8().unwrap();
        reader.align4().unwrap();
        assert_eq!(reader.offset(), 4);
        assert_eq!(reader.i32().unwrap(), 7);
    }

    #[test]
    fn writer_rejects_oversized_counts() {
        let mut writer = ByteWriter::new();
        writer.count("interfaces", 3).unwrap();
        assert!(matches!(
            writer.count("interfaces", 70_000),
            Err(ClassFileError::TooLarge { what: "interfaces", len: 70_000 })
        ));
        assert_eq!(writer.into_inner(), vec![0, 3]);
    }
}
