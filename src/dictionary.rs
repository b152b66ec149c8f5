use std::{
    collections::HashMap,
    io::{Read, Write},
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{invalid_data, Result, ZambeziError};

/// Term to dense id mapping. Ids are handed out in insertion order and never
/// reach `capacity`.
pub struct Dictionary {
    capacity: u32,
    ids: HashMap<String, u32>,
    terms: Vec<String>,
}

impl Dictionary {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            ids: HashMap::new(),
            terms: Vec::new(),
        }
    }

    pub fn insert_term(&mut self, term: &str) -> Result<u32> {
        if let Some(&id) = self.ids.get(term) {
            return Ok(id);
        }
        if self.terms.len() as u32 >= self.capacity {
            return Err(ZambeziError::DictionaryFull {
                capacity: self.capacity,
            });
        }
        let id = self.terms.len() as u32;
        self.ids.insert(term.to_owned(), id);
        self.terms.push(term.to_owned());
        Ok(id)
    }

    pub fn get_term_id(&self, term: &str) -> Option<u32> {
        self.ids.get(term).copied()
    }

    pub fn term(&self, id: u32) -> Option<&str> {
        self.terms.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn save(&self, writer: &mut impl Write) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self.capacity)?;
        writer.write_u32::<LittleEndian>(self.terms.len() as u32)?;
        for term in &self.terms {
            writer.write_u32::<LittleEndian>(term.len() as u32)?;
            writer.write_all(term.as_bytes())?;
        }
        Ok(())
    }

    pub fn load(reader: &mut impl Read) -> std::io::Result<Self> {
        let capacity = reader.read_u32::<LittleEndian>()?;
        let count = reader.read_u32::<LittleEndian>()?;
        if count > capacity {
            return Err(invalid_data(format!(
                "{} terms exceed dictionary capacity {}",
                count, capacity
            )));
        }
        let mut dictionary = Self::new(capacity);
        for id in 0..count {
            let len = reader.read_u32::<LittleEndian>()?;
            let mut bytes = Vec::new();
            reader.by_ref().take(len as u64).read_to_end(&mut bytes)?;
            if bytes.len() != len as usize {
                return Err(std::io::ErrorKind::UnexpectedEof.into());
            }
            let term = String::from_utf8(bytes).map_err(|e| invalid_data(e.to_string()))?;
            if dictionary.ids.insert(term.clone(), id).is_some() {
                return Err(invalid_data(format!("duplicate term {:?}", term)));
            }
            dictionary.terms.push(term);
        }
        Ok(dictionary)
    }
}
