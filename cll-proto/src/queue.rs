//! Bounded command queue between the UART receive path and the dispatcher.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

use crate::command::Command;

/// Maximum number of queued commands.
pub const QUEUE_LEN: usize = 10;

/// FIFO of decoded commands. When full, the newest command is rejected.
pub struct CommandQueue {
    inner: Mutex<RefCell<Deque<Command, QUEUE_LEN>>>,
}

impl CommandQueue {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Append a command. Gives it back if the queue is full.
    pub fn push(&self, command: Command) -> Result<(), Command> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).push_back(command))
    }

    /// Take the oldest command.
    pub fn pop(&self) -> Option<Command> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).pop_front())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).clear());
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}
