//! Binary object-file codec: writer/reader for the big-endian image format
//! the assembler emits and the simulator consumes.
//!
//! Layout: `u32 data_size`, `u32 code_size`, `data_size` data words,
//! `code_size` code words, trailing `u32 entry_point`. Grounded on
//! `read_machine_code`/`write_machine_code` in the reference implementation.

use std::io::{self, Read, Write};

use thiserror::Error;

use crate::isa::{CODE_SIZE, DATA_SIZE};

#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("I/O error reading object file: {0}")]
    Io(#[from] io::Error),
    #[error("object file truncated: expected {expected} more bytes")]
    Truncated { expected: usize },
    #[error("object declares {size} data words, exceeding the {limit}-word data memory")]
    DataOverflow { size: usize, limit: usize },
    #[error("object declares {size} code words, exceeding the {limit}-word code memory")]
    CodeOverflow { size: usize, limit: usize },
}

pub struct Image {
    pub data: Vec<u32>,
    pub code: Vec<u32>,
    pub entry_point: u32,
}

pub fn write<W: Write>(mut w: W, data: &[u32], code: &[u32], entry_point: u32) -> Result<(), ObjectError> {
    w.write_all(&(data.len() as u32).to_be_bytes())?;
    w.write_all(&(code.len() as u32).to_be_bytes())?;
    for word in data {
        w.write_all(&word.to_be_bytes())?;
    }
    for word in code {
        w.write_all(&word.to_be_bytes())?;
    }
    w.write_all(&entry_point.to_be_bytes())?;
    Ok(())
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32, ObjectError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => ObjectError::Truncated { expected: 4 },
        _ => ObjectError::Io(e),
    })?;
    Ok(u32::from_be_bytes(buf))
}

/// Reads an object image, zero-filling data/code memory up to `DATA_SIZE`/
/// `CODE_SIZE` beyond what the file declares as "used".
pub fn read<R: Read>(mut r: R) -> Result<Image, ObjectError> {
    let data_size = read_u32(&mut r)? as usize;
    let code_size = read_u32(&mut r)? as usize;
    if data_size > DATA_SIZE {
        return Err(ObjectError::DataOverflow { size: data_size, limit: DATA_SIZE });
    }
    if code_size > CODE_SIZE {
        return Err(ObjectError::CodeOverflow { size: code_size, limit: CODE_SIZE });
    }

    let mut data = vec![0u32; DATA_SIZE];
    for slot in data.iter_mut().take(data_size) {
        *slot = read_u32(&mut r)?;
    }
    let mut code = vec![0u32; CODE_SIZE];
    for slot in code.iter_mut().take(code_size) {
        *slot = read_u32(&mut r)?;
    }
    let entry_point = read_u32(&mut r)?;

    Ok(Image { data, code, entry_point })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let data = vec![1, 2, 3];
        let code = vec![0xdead_beef, 0x1234_5678];
        let mut buf = Vec::new();
        write(&mut buf, &data, &code, 1).unwrap();

        let image = read(&buf[..]).unwrap();
        assert_eq!(&image.data[..3], &data[..]);
        assert!(image.data[3..].iter().all(|&w| w == 0));
        assert_eq!(&image.code[..2], &code[..]);
        assert!(image.code[2..].iter().all(|&w| w == 0));
        assert_eq!(image.entry_point, 1);
    }

    #[test]
    fn truncated_file_errors() {
        let buf = [0u8, 0, 0, 1]; // claims 1 data word but supplies none
        assert!(matches!(read(&buf[..]), Err(ObjectError::Truncated { .. })));
    }
}
