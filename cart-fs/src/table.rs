use core::fmt;

use alloc::{collections::BTreeMap, string::{String, ToString}, vec::Vec};

use crate::{layout::FileRecord, CartError, Result};

/// Stable identifier of a file, never reused while the device is powered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileHandle(pub u16);

impl fmt::Display for FileHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Every file the device knows about. Records are only ever appended, so
/// a handle is simply the record's index.
pub struct FileTable {
  files: Vec<FileRecord>,
  by_path: BTreeMap<String, FileHandle>,
  max_files: usize,
  max_path_len: usize,
}

impl FileTable {
  pub fn new(max_files: usize, max_path_len: usize) -> Self {
    Self {
      files: Vec::new(),
      by_path: BTreeMap::new(),
      max_files: max_files.min(u16::MAX as usize + 1),
      max_path_len,
    }
  }

  /// Open `path`, creating an empty record on first use. Reopening rewinds
  /// the cursor and keeps length and frames.
  pub fn open(&mut self, path: &str) -> Result<FileHandle> {
    if let Some(&handle) = self.by_path.get(path) {
      let file = &mut self.files[handle.0 as usize];
      if file.is_open() {
        return Err(CartError::AlreadyOpen(path.to_string()));
      }
      file.reopen();
      return Ok(handle);
    }
    if path.is_empty() || path.len() > self.max_path_len {
      return Err(CartError::InvalidPath);
    }
    if self.files.len() >= self.max_files {
      return Err(CartError::TooManyFiles);
    }
    let handle = FileHandle(self.files.len() as u16);
    self.files.push(FileRecord::new(path.to_string()));
    self.by_path.insert(path.to_string(), handle);
    Ok(handle)
  }

  pub fn close(&mut self, handle: FileHandle) -> Result<()> {
    self.get_open(handle)?.close();
    Ok(())
  }

  /// Look up a record whatever its state
  pub fn get(&self, handle: FileHandle) -> Result<&FileRecord> {
    self.files
      .get(handle.0 as usize)
      .ok_or(CartError::InvalidHandle(handle))
  }

  /// Look up a record that must currently be open
  pub fn get_open(&mut self, handle: FileHandle) -> Result<&mut FileRecord> {
    let file = self.files
      .get_mut(handle.0 as usize)
      .ok_or(CartError::InvalidHandle(handle))?;
    if !file.is_open() {
      return Err(CartError::NotOpen(handle));
    }
    Ok(file)
  }

  pub fn lookup(&self, path: &str) -> Option<FileHandle> {
    self.by_path.get(path).copied()
  }

  /// Paths in handle order
  pub fn ls(&self) -> Vec<String> {
    self.files.iter().map(|file| file.path().to_string()).collect()
  }

  pub fn records(&self) -> impl Iterator<Item = (FileHandle, &FileRecord)> {
    self.files
      .iter()
      .enumerate()
      .map(|(idx, file)| (FileHandle(idx as u16), file))
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use alloc::string::String;

  #[test]
  fn open_assigns_fresh_handles() {
    let mut table = FileTable::new(8, 16);
    assert!(table.is_empty());
    let a = table.open("a").unwrap();
    let b = table.open("b").unwrap();
    assert_eq!(table.len(), 2);
    assert_ne!(a, b);
    assert_eq!(table.lookup("a"), Some(a));
    assert_eq!(table.ls(), ["a", "b"]);
  }

  #[test]
  fn state_machine() {
    let mut table = FileTable::new(8, 16);
    let a = table.open("a").unwrap();
    assert_eq!(table.open("a"), Err(CartError::AlreadyOpen("a".into())));
    table.close(a).unwrap();
    assert_eq!(table.close(a), Err(CartError::NotOpen(a)));
    assert_eq!(table.open("a"), Ok(a));
    assert_eq!(table.len(), 1);
  }

  #[test]
  fn unknown_handle() {
    let mut table = FileTable::new(8, 16);
    assert_eq!(table.close(FileHandle(3)), Err(CartError::InvalidHandle(FileHandle(3))));
    assert!(table.get(FileHandle(0)).is_err());
  }

  #[test]
  fn capacity_limits() {
    let mut table = FileTable::new(2, 4);
    assert_eq!(table.open(""), Err(CartError::InvalidPath));
    assert_eq!(table.open("abcde"), Err(CartError::InvalidPath));
    table.open("abcd").unwrap();
    table.open("b").unwrap();
    assert_eq!(table.open("c"), Err(CartError::TooManyFiles));
    // known paths still reopen once the table is full
    let b = table.lookup("b").unwrap();
    table.close(b).unwrap();
    assert_eq!(table.open("b"), Ok(b));
    let long: String = "x".repeat(5);
    assert_eq!(table.open(&long), Err(CartError::InvalidPath));
  }
}
