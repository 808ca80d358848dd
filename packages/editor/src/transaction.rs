//! # Designer Transactions
//!
//! Named units of work on the component registry. Transactions nest and
//! must close in LIFO order; closing any frame but the innermost one fails
//! with [`EditorError::TransactionOutOfOrder`] and leaves the stack as it was.
//!
//! A [`DesignerTransaction`] dropped while still open is rolled back.

use crate::errors::{EditorError, EditorResult};
use crate::events::HostEvent;
use crate::text_buffer::lock;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

#[derive(Debug)]
struct Frame {
    id: u64,
    description: String,
}

#[derive(Debug, Default)]
pub struct TransactionStack {
    frames: Vec<Frame>,
    next_id: u64,
}

impl TransactionStack {
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Description of the innermost open transaction
    pub fn current(&self) -> Option<&str> {
        self.frames.last().map(|frame| frame.description.as_str())
    }
}

/// Open transaction handle
#[derive(Debug)]
pub struct DesignerTransaction {
    id: u64,
    description: String,
    stack: Arc<Mutex<TransactionStack>>,
    events: broadcast::Sender<HostEvent>,
    closed: bool,
}

impl DesignerTransaction {
    /// Push a new frame, notifying before and after
    pub(crate) fn open(
        stack: &Arc<Mutex<TransactionStack>>,
        events: &broadcast::Sender<HostEvent>,
        description: &str,
    ) -> Self {
        let _ = events.send(HostEvent::TransactionOpening {
            description: description.to_string(),
        });
        let id = {
            let mut stack = lock(stack);
            let id = stack.next_id;
            stack.next_id += 1;
            stack.frames.push(Frame {
                id,
                description: description.to_string(),
            });
            id
        };
        tracing::debug!("transaction '{}' opened", description);
        let _ = events.send(HostEvent::TransactionOpened {
            description: description.to_string(),
        });

        Self {
            id,
            description: description.to_string(),
            stack: stack.clone(),
            events: events.clone(),
            closed: false,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn commit(&mut self) -> EditorResult<()> {
        self.close(true)
    }

    pub fn cancel(&mut self) -> EditorResult<()> {
        self.close(false)
    }

    fn close(&mut self, commit: bool) -> EditorResult<()> {
        if self.closed {
            return Err(EditorError::TransactionClosed(self.description.clone()));
        }
        {
            let stack = lock(&self.stack);
            match stack.frames.last() {
                Some(top) if top.id == self.id => {}
                top => {
                    return Err(EditorError::TransactionOutOfOrder {
                        closing: self.description.clone(),
                        open: top
                            .map(|frame| frame.description.clone())
                            .unwrap_or_default(),
                    })
                }
            }
        }

        let _ = self.events.send(HostEvent::TransactionClosing {
            description: self.description.clone(),
            commit,
        });
        lock(&self.stack).frames.pop();
        self.closed = true;
        tracing::debug!(
            "transaction '{}' {}",
            self.description,
            if commit { "committed" } else { "rolled back" }
        );
        let _ = self.events.send(HostEvent::TransactionClosed {
            description: self.description.clone(),
            commit,
        });
        Ok(())
    }
}

impl Drop for DesignerTransaction {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.cancel() {
            tracing::error!("dropping open transaction: {}", e);
        }
    }
}
