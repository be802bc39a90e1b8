use serde::{Deserialize, Serialize};

/// One FASTA record held in memory.
///
/// Generated candidates carry a structured name (see [`crate::bio::SubseqName`]);
/// downstream stages recover chromosome and coordinates from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sequence {
    pub id: i64,
    pub name: String,
    pub letters: Vec<u8>,
}

impl Sequence {
    pub fn new(id: i64, name: impl Into<String>, letters: Vec<u8>) -> Self {
        Self {
            id,
            name: name.into(),
            letters,
        }
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    pub fn letters_str(&self) -> String {
        String::from_utf8_lossy(&self.letters).to_string()
    }

    pub fn header(&self) -> String {
        format!(">{}", self.name)
    }
}
