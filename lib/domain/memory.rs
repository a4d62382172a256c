//! The byte-granular memory engine over the environment.
//!
//! Reads and writes are expanded to byte lists. Writes are strong (replace)
//! or weak (join with the previous value); writing inside a compressed run
//! splits the run around the written byte. Reads of addresses the
//! environment has no cell for fall back to the image backing.

use crate::domain::env::{Dimension, Env};
use crate::domain::Value;
use crate::error::*;

impl<V> Env<V>
where
    V: Value,
{
    /// Read `bits` bits of memory at the given address.
    ///
    /// If any byte of the read has no cell in the environment, the whole
    /// read is retried against the image backing; if the backing cannot
    /// serve it either, the result is bot.
    pub fn load(&self, address: u64, bits: usize, big_endian: bool) -> Result<V> {
        if bits % 8 != 0 || bits == 0 {
            bail!("memory load of bit width {} not divisible by 8", bits);
        }

        let addresses: Vec<u64> = (0..bits as u64 / 8).map(|i| address + i).collect();

        let mut bytes = Vec::with_capacity(addresses.len());
        for byte_address in &addresses {
            match self.find_addr(*byte_address) {
                Some((_, value)) => bytes.push(value.clone()),
                None => {
                    bytes.clear();
                    break;
                }
            }
        }

        if bytes.is_empty() {
            let backing = match self.backing() {
                Some(backing) => backing,
                None => return Ok(V::bot(bits)),
            };
            for byte_address in &addresses {
                match backing.read::<V>(*byte_address) {
                    Ok(value) => bytes.push(value),
                    Err(Error(ErrorKind::NotFound(_), _)) => return Ok(V::bot(bits)),
                    Err(e) => return Err(e),
                }
            }
        }

        if !big_endian {
            bytes.reverse();
        }
        Ok(V::concat(&bytes))
    }

    /// Write a value to memory at the given address, byte by byte.
    ///
    /// A strong write replaces existing cells; a weak write joins with them.
    /// A weak write to an address with no cell fails with `Empty`, since the
    /// unset cell stands for anything the backing may hold.
    pub fn store(&mut self, address: u64, value: &V, strong: bool, big_endian: bool) -> Result<()> {
        let bits = value.bits();
        if bits % 8 != 0 || bits == 0 {
            bail!("memory store of bit width {} not divisible by 8", bits);
        }

        let mut addresses: Vec<u64> = (0..bits as u64 / 8).map(|i| address + i).collect();
        if big_endian {
            addresses.reverse();
        }

        for (i, byte_address) in addresses.into_iter().enumerate() {
            let byte = value.extract(i * 8, i * 8 + 7);
            let found = self
                .find_addr(byte_address)
                .map(|(dimension, previous)| (dimension.clone(), previous.clone()));
            match found {
                None => {
                    if strong {
                        self.insert(Dimension::Mem(byte_address), byte);
                    } else {
                        bail!(ErrorKind::Empty(format!(
                            "weak write to unset address 0x{:X}",
                            byte_address
                        )));
                    }
                }
                Some((Dimension::Mem(_), previous)) => {
                    let cell = if strong { byte } else { byte.join(&previous) };
                    self.insert(Dimension::Mem(byte_address), cell);
                }
                Some((Dimension::MemItv(lo, hi), previous)) => {
                    self.split_run(lo, hi, byte_address);
                    let cell = if strong { byte } else { byte.join(&previous) };
                    self.insert(Dimension::Mem(byte_address), cell);
                }
                Some((Dimension::Reg(_), _)) => {
                    unreachable!("register key found at memory address 0x{:X}", byte_address)
                }
            }
        }
        Ok(())
    }

    /// Fill memory from `address` with `count` copies of one byte value,
    /// stored as a single compressed run. Strong update.
    pub fn store_repeat_byte(&mut self, address: u64, byte: &V, count: u64) -> Result<()> {
        if byte.bits() != 8 {
            bail!(
                "repeated fill requires a byte value, got {} bits",
                byte.bits()
            );
        }

        for i in 0..count {
            let byte_address = address + i;
            let found = self
                .find_addr(byte_address)
                .map(|(dimension, _)| dimension.clone());
            match found {
                None => {}
                Some(Dimension::Mem(existing)) => {
                    self.remove(&Dimension::Mem(existing));
                }
                Some(Dimension::MemItv(lo, hi)) => {
                    self.split_run(lo, hi, byte_address);
                }
                Some(Dimension::Reg(_)) => {
                    unreachable!("register key found at memory address 0x{:X}", byte_address)
                }
            }
        }

        self.insert(Dimension::MemItv(address, address + count), byte.clone());
        Ok(())
    }
}

#[cfg(test)]
mod memory_tests {
    use crate::domain::env::{Dimension, Env};
    use crate::domain::{TaintedConst, Value};
    use crate::il;
    use crate::memory::backing;
    use crate::RC;

    fn value(v: u64, bits: usize) -> TaintedConst {
        TaintedConst::of_word(&il::const_(v, bits))
    }

    #[test]
    fn word_write_then_read_little_endian() {
        let mut env: Env<TaintedConst> = Env::new();
        env.store(0x2000, &value(0x12345678, 32), true, false).unwrap();

        assert_eq!(env.load(0x2000, 32, false).unwrap(), value(0x12345678, 32));
        assert_eq!(env.load(0x2001, 16, false).unwrap(), value(0x3456, 16));
        assert_eq!(env.load(0x2000, 8, false).unwrap(), value(0x78, 8));
        assert_eq!(env.load(0x2003, 8, false).unwrap(), value(0x12, 8));
    }

    #[test]
    fn word_write_then_read_big_endian() {
        let mut env: Env<TaintedConst> = Env::new();
        env.store(0x2000, &value(0x12345678, 32), true, true).unwrap();

        assert_eq!(env.load(0x2000, 8, false).unwrap(), value(0x12, 8));
        assert_eq!(env.load(0x2003, 8, false).unwrap(), value(0x78, 8));
        assert_eq!(env.load(0x2000, 32, true).unwrap(), value(0x12345678, 32));
    }

    #[test]
    fn weak_write_joins() {
        let mut env: Env<TaintedConst> = Env::new();
        env.store(0x100, &value(0xAA, 8), true, false).unwrap();
        env.store(0x100, &value(0xBB, 8), false, false).unwrap();

        assert_eq!(
            env.load(0x100, 8, false).unwrap(),
            value(0xAA, 8).join(&value(0xBB, 8))
        );
    }

    #[test]
    fn weak_write_to_unset_memory_is_empty() {
        let mut env: Env<TaintedConst> = Env::new();
        assert!(env.store(0x100, &value(0xAA, 8), false, false).is_err());
    }

    #[test]
    fn run_read_back() {
        let mut env: Env<TaintedConst> = Env::new();
        env.store_repeat_byte(0x1000, &value(0x00, 8), 16).unwrap();

        assert_eq!(env.len(), 1);
        assert!(env.get(&Dimension::MemItv(0x1000, 0x1010)).is_some());
        for address in 0x1000..=0x1010 {
            assert_eq!(env.load(address, 8, false).unwrap(), value(0x00, 8));
        }
    }

    #[test]
    fn byte_write_splits_run() {
        let mut env: Env<TaintedConst> = Env::new();
        env.store_repeat_byte(0x1000, &value(0x00, 8), 16).unwrap();
        env.store(0x1008, &value(0xAB, 8), true, false).unwrap();

        assert_eq!(env.len(), 3);
        assert_eq!(
            *env.get(&Dimension::MemItv(0x1000, 0x1007)).unwrap(),
            value(0x00, 8)
        );
        assert_eq!(*env.get(&Dimension::Mem(0x1008)).unwrap(), value(0xAB, 8));
        assert_eq!(
            *env.get(&Dimension::MemItv(0x1009, 0x1010)).unwrap(),
            value(0x00, 8)
        );

        assert_eq!(env.load(0x1008, 8, false).unwrap(), value(0xAB, 8));
        for address in (0x1000..0x1008).chain(0x1009..=0x1010) {
            assert_eq!(env.load(address, 8, false).unwrap(), value(0x00, 8));
        }
    }

    #[test]
    fn load_falls_back_to_backing() {
        let image = vec![0xDE, 0xAD, 0xBE, 0xEF, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let sections = vec![backing::Section::new(0x4000, 0x10, 0, 0x10, ".rodata")];
        let backing = backing_from_parts(image, sections);

        let mut env: Env<TaintedConst> = Env::new_with_backing(RC::new(backing));
        assert_eq!(env.load(0x4000, 16, false).unwrap(), value(0xADDE, 16));

        // partially written word falls back to the backing as a whole
        env.store(0x4000, &value(0x42, 8), true, false).unwrap();
        assert_eq!(env.load(0x4000, 8, false).unwrap(), value(0x42, 8));
        assert_eq!(env.load(0x4000, 16, false).unwrap(), value(0xADDE, 16));
    }

    #[test]
    fn load_of_unmapped_memory_is_bot() {
        let env: Env<TaintedConst> = Env::new();
        assert!(env.load(0x100, 8, false).unwrap().is_bot());

        let backing = backing::Memory::new();
        let env: Env<TaintedConst> = Env::new_with_backing(RC::new(backing));
        assert!(env.load(0x100, 32, false).unwrap().is_bot());
    }

    fn backing_from_parts(
        image: Vec<u8>,
        sections: Vec<backing::Section>,
    ) -> backing::Memory {
        let path = std::env::temp_dir().join("kestrel-backing-test");
        std::fs::write(&path, &image).unwrap();
        backing::Memory::from_file(&path, sections).unwrap()
    }
}
