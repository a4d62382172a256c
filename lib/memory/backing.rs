//! The section map over a loaded binary image.
//!
//! Sections map a virtual address range onto a slice of the raw image. The
//! abstract domain reads through to this backing when asked for a memory byte
//! it has no cell for, which lets statically-known bytes (code, initialized
//! data) flow into the analysis without per-byte initialization.

use crate::domain::Value;
use crate::error::*;
use crate::il;
use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::Bound::Included;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// A virtual-to-raw mapping of one section of a loaded binary.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Section {
    virt_addr: u64,
    virt_size: u64,
    raw_addr: u64,
    raw_size: u64,
    name: String,
}

impl Section {
    /// Create a new memory section.
    pub fn new<S>(virt_addr: u64, virt_size: u64, raw_addr: u64, raw_size: u64, name: S) -> Section
    where
        S: Into<String>,
    {
        Section {
            virt_addr,
            virt_size,
            raw_addr,
            raw_size,
            name: name.into(),
        }
    }

    pub fn virt_addr(&self) -> u64 {
        self.virt_addr
    }

    pub fn virt_size(&self) -> u64 {
        self.virt_size
    }

    pub fn raw_addr(&self) -> u64 {
        self.raw_addr
    }

    pub fn raw_size(&self) -> u64 {
        self.raw_size
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if the half-open virtual range of this section contains `address`.
    pub fn contains(&self, address: u64) -> bool {
        self.virt_addr <= address && address < self.virt_addr + self.virt_size
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} [0x{:X}-0x{:X}] raw 0x{:X}+0x{:X}",
            self.name,
            self.virt_addr,
            self.virt_addr + self.virt_size,
            self.raw_addr,
            self.raw_size
        )
    }
}

/// The raw bytes of a binary image together with its section map.
///
/// The image is read once and lives for the analyzer process; states share it
/// through a reference-counted handle and never mutate it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Memory {
    image: Vec<u8>,
    sections: BTreeMap<u64, Section>,
}

impl Memory {
    /// Create an empty backing with no image and no sections.
    pub fn new() -> Memory {
        Memory {
            image: Vec::new(),
            sections: BTreeMap::new(),
        }
    }

    /// Read the binary image from a file and install the given sections.
    pub fn from_file<P>(path: P, sections: Vec<Section>) -> Result<Memory>
    where
        P: AsRef<Path>,
    {
        let mut file = File::open(path)?;
        let mut image = Vec::new();
        file.read_to_end(&mut image)?;

        let mut memory = Memory {
            image,
            sections: BTreeMap::new(),
        };
        for section in sections {
            memory.add_section(section);
        }
        Ok(memory)
    }

    /// Build a backing from a JSON description.
    ///
    /// The description holds the path of the binary image and its section
    /// list:
    ///
    /// ```json
    /// {
    ///     "file": "path/to/binary",
    ///     "sections": [
    ///         {"virt_addr": 4096, "virt_size": 512,
    ///          "raw_addr": 0, "raw_size": 512, "name": ".text"}
    ///     ]
    /// }
    /// ```
    pub fn from_json_file<P>(path: P) -> Result<Memory>
    where
        P: AsRef<Path>,
    {
        let mut file = File::open(path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;

        let root: Json = serde_json::from_str(&buf)?;

        let image_path = match root["file"] {
            Json::String(ref image_path) => image_path.to_string(),
            _ => bail!("file missing from section description"),
        };

        let mut sections = Vec::new();
        if let Json::Array(ref entries) = root["sections"] {
            for entry in entries {
                let field = |name: &str| -> Result<u64> {
                    match entry[name] {
                        Json::Number(ref number) => match number.as_u64() {
                            Some(value) => Ok(value),
                            None => bail!("section {} not u64", name),
                        },
                        _ => bail!("{} missing for section", name),
                    }
                };
                let name = match entry["name"] {
                    Json::String(ref name) => name.to_string(),
                    _ => bail!("name missing for section"),
                };
                sections.push(Section::new(
                    field("virt_addr")?,
                    field("virt_size")?,
                    field("raw_addr")?,
                    field("raw_size")?,
                    name,
                ));
            }
        } else {
            bail!("sections missing from section description");
        }

        Memory::from_file(image_path, sections)
    }

    /// Install a section in this backing.
    pub fn add_section(&mut self, section: Section) {
        trace!("backing section {}", section);
        self.sections.insert(section.virt_addr(), section);
    }

    /// Get the sections in this backing.
    pub fn sections(&self) -> &BTreeMap<u64, Section> {
        &self.sections
    }

    /// Get the raw image bytes.
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Find the section whose virtual range contains the given address.
    pub fn section_for(&self, address: u64) -> Option<&Section> {
        let mut sections = self.sections.range((Included(0), Included(address)));
        if let Some((_, section)) = sections.next_back() {
            if section.contains(address) {
                return Some(section);
            }
        }
        None
    }

    /// Lift the byte at the given virtual address into a cell value.
    ///
    /// Addresses in no section fail with `NotFound`. Addresses past a
    /// section's raw data are zero-fill or bss and lift to top.
    pub fn read<V>(&self, address: u64) -> Result<V>
    where
        V: Value,
    {
        let section = match self.section_for(address) {
            Some(section) => section,
            None => bail!(ErrorKind::NotFound(format!(
                "no section contains address 0x{:X}",
                address
            ))),
        };

        let offset = address - section.virt_addr();
        if offset > section.raw_size() {
            return Ok(V::top(8));
        }

        let index = (section.raw_addr() + offset) as usize;
        let byte = match self.image.get(index) {
            Some(byte) => *byte,
            None => panic!(
                "section {} points past the end of the loaded image",
                section.name()
            ),
        };
        Ok(V::of_word(&il::const_(u64::from(byte), 8)))
    }
}

impl Default for Memory {
    fn default() -> Memory {
        Memory::new()
    }
}
