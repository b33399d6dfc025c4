//! The driver capability surface.

use bytes::Bytes;

use crate::{AccessContext, AccessLevel, DocumentStat, DriverError};

/// A physical backend behind a document store.
///
/// Addresses are absolute, normalized, '/'-separated strings. Content is raw
/// bytes: no parsing, no format interpretation. Listings return immediate
/// child names with directories suffixed by `/`.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Box<dyn Driver>`.
pub trait Driver: Send + Sync {
    /// Open whatever connection the backend needs.
    fn connect(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    /// Release the backend connection.
    fn disconnect(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    /// Authorize an operation. `Ok(false)` denies it.
    fn access(
        &self,
        _uri: &str,
        _level: AccessLevel,
        _context: &AccessContext,
    ) -> Result<bool, DriverError> {
        Ok(true)
    }

    /// Read the bytes stored at `uri`.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - Nothing is stored there (not an error condition).
    /// * `Ok(Some(bytes))` - The stored document.
    /// * `Err(DriverError)` - A transport or system error occurred.
    fn read(&mut self, uri: &str) -> Result<Option<Bytes>, DriverError>;

    /// Replace the document at `uri`, creating parents as needed.
    fn write(&mut self, uri: &str, document: Bytes) -> Result<(), DriverError>;

    /// Append a chunk to the document at `uri`, creating it if missing.
    fn append(&mut self, _uri: &str, _chunk: Bytes) -> Result<(), DriverError> {
        Err(DriverError::NotSupported {
            operation: "append",
        })
    }

    /// Read metadata. A missing address yields a stat with `exists == false`.
    fn stat(&mut self, uri: &str) -> Result<DocumentStat, DriverError>;

    /// Move a document or directory.
    fn rename(&mut self, _from: &str, _to: &str) -> Result<(), DriverError> {
        Err(DriverError::NotSupported { operation: "move" })
    }

    /// Delete a document or directory (recursively).
    fn delete(&mut self, uri: &str) -> Result<(), DriverError>;

    /// List immediate children of a directory.
    fn list_dir(&mut self, uri: &str) -> Result<Vec<String>, DriverError>;
}

// Blanket implementations for references and boxes

impl<T: Driver + ?Sized> Driver for Box<T> {
    fn connect(&mut self) -> Result<(), DriverError> {
        self.as_mut().connect()
    }

    fn disconnect(&mut self) -> Result<(), DriverError> {
        self.as_mut().disconnect()
    }

    fn access(
        &self,
        uri: &str,
        level: AccessLevel,
        context: &AccessContext,
    ) -> Result<bool, DriverError> {
        self.as_ref().access(uri, level, context)
    }

    fn read(&mut self, uri: &str) -> Result<Option<Bytes>, DriverError> {
        self.as_mut().read(uri)
    }

    fn write(&mut self, uri: &str, document: Bytes) -> Result<(), DriverError> {
        self.as_mut().write(uri, document)
    }

    fn append(&mut self, uri: &str, chunk: Bytes) -> Result<(), DriverError> {
        self.as_mut().append(uri, chunk)
    }

    fn stat(&mut self, uri: &str) -> Result<DocumentStat, DriverError> {
        self.as_mut().stat(uri)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), DriverError> {
        self.as_mut().rename(from, to)
    }

    fn delete(&mut self, uri: &str) -> Result<(), DriverError> {
        self.as_mut().delete(uri)
    }

    fn list_dir(&mut self, uri: &str) -> Result<Vec<String>, DriverError> {
        self.as_mut().list_dir(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// A flat map driver with no directories.
    struct TestDriver {
        data: BTreeMap<String, Bytes>,
    }

    impl TestDriver {
        fn new() -> Self {
            Self {
                data: BTreeMap::new(),
            }
        }
    }

    impl Driver for TestDriver {
        fn read(&mut self, uri: &str) -> Result<Option<Bytes>, DriverError> {
            Ok(self.data.get(uri).cloned())
        }

        fn write(&mut self, uri: &str, document: Bytes) -> Result<(), DriverError> {
            self.data.insert(uri.to_string(), document);
            Ok(())
        }

        fn stat(&mut self, uri: &str) -> Result<DocumentStat, DriverError> {
            Ok(match self.data.get(uri) {
                Some(bytes) => DocumentStat::file(bytes.len() as u64, None),
                None => DocumentStat::missing(),
            })
        }

        fn delete(&mut self, uri: &str) -> Result<(), DriverError> {
            self.data.remove(uri);
            Ok(())
        }

        fn list_dir(&mut self, _uri: &str) -> Result<Vec<String>, DriverError> {
            Ok(self.data.keys().map(|k| k.trim_start_matches('/').to_string()).collect())
        }
    }

    #[test]
    fn basic_read_write_works() {
        let mut driver = TestDriver::new();

        let data = Bytes::from_static(b"hello world");
        driver.write("/users/123", data.clone()).unwrap();

        assert_eq!(driver.read("/users/123").unwrap(), Some(data));
        assert_eq!(driver.read("/nonexistent").unwrap(), None);
        assert!(driver.stat("/users/123").unwrap().is_file());
    }

    #[test]
    fn defaults_allow_and_reject_optional_ops() {
        let mut driver = TestDriver::new();
        assert!(driver
            .access("/x", AccessLevel::Read, &AccessContext::anonymous())
            .unwrap());
        assert!(matches!(
            driver.append("/x", Bytes::from_static(b"1")),
            Err(DriverError::NotSupported { .. })
        ));
        assert!(matches!(
            driver.rename("/x", "/y"),
            Err(DriverError::NotSupported { .. })
        ));
    }

    #[test]
    fn box_dyn_works() {
        let mut boxed: Box<dyn Driver> = Box::new(TestDriver::new());

        boxed
            .write("/dyn_test", Bytes::from_static(b"dyn_data"))
            .unwrap();
        let result = boxed.read("/dyn_test").unwrap();
        assert_eq!(result, Some(Bytes::from_static(b"dyn_data")));
        assert_eq!(boxed.list_dir("/").unwrap(), vec!["dyn_test".to_string()]);
    }
}
