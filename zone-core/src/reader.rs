//! Последовательное чтение little-endian полей из payload.
//!
//! Декодеры сначала проверяют полную длину payload, так что `UnexpectedEnd`
//! на практике означает ошибку в раскладке, а не в данных.

use thiserror::Error;

/// Чтение вышло за конец буфера
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unexpected end of payload at offset {offset}: wanted {wanted} more bytes")]
pub struct UnexpectedEnd {
    /// Позиция, с которой читали
    pub offset: usize,
    /// Сколько байт не хватило
    pub wanted: usize,
}

pub(crate) type Result<T> = std::result::Result<T, UnexpectedEnd>;

pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.data.len().saturating_sub(self.pos) < len {
            return Err(UnexpectedEnd {
                offset: self.pos,
                wanted: len,
            });
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.data[start..self.pos])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    pub(crate) fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(UnexpectedEnd {
                offset,
                wanted: 0,
            });
        }
        self.pos = offset;
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Любой ненулевой байт считается `true`
    pub(crate) fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    /// Строка фиксированной длины: обрезаем по первому NUL, битый UTF-8 заменяем
    pub(crate) fn read_fixed_str(&mut self, len: usize) -> Result<String> {
        let raw = self.take(len)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }
}
