//! Output sinks for `print` and `println`

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// A cloneable in-memory sink.
///
/// Hand one clone to [`Vm::with_output`](crate::Vm::with_output) and keep
/// another to read what the script printed.
///
/// ```
/// use interpreter::{SharedBuffer, Vm};
///
/// let buffer = SharedBuffer::new();
/// let mut vm = Vm::new().with_output(Box::new(buffer.clone()));
/// vm.interpret("println(1 + 2);", "demo.slo").unwrap();
/// assert_eq!(buffer.contents(), "3\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl SharedBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }

    /// Return the contents and empty the buffer
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.bytes.borrow_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
