//! # Text Buffer Adapter
//!
//! All reads and writes of the markup text go through [`TextBufferAdapter`].
//!
//! ## Design
//!
//! - One owner thread performs every mutation. Other threads marshal their
//!   mutation onto the owner's [`OwnerQueue`] and block until it has run
//! - A [`MutationGate`] is closed for the duration of a mutation; readers
//!   wait for it to open so they never see a half-written buffer
//! - Order inside a mutation: close gate, edit, mark dirty, record the undo
//!   step, reopen gate, then notify listeners
//! - Change notifications are held back while a [`SuppressGuard`] is alive
//!   and collapse into a single event when the last guard drops
//!
//! ```text
//!  worker thread                         owner thread
//!  ─────────────                         ────────────
//!  adapter.insert(..) ──job──▶ mpsc ──▶ OwnerQueue::pump()
//!        │                                   │ gate.close()
//!        │                                   │ buffer.insert()
//!        │                                   │ dirty = true
//!        │                                   │ undo.finish_action()
//!        │                                   │ gate.open()
//!  blocking_recv ◀──────── oneshot ◀─────────┘
//! ```

use crate::errors::{EditorError, EditorResult};
use crate::undo_tracker::UndoTracker;
use formsmith_parser::{Region, TextLocation};
use ropey::Rope;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use tokio::sync::{broadcast, mpsc, oneshot};

/// The live text the designer edits
pub trait TextBuffer: Send {
    fn text(&self) -> String;

    fn text_between(&self, begin: TextLocation, end: TextLocation) -> String;

    fn insert(&mut self, at: TextLocation, text: &str);

    fn replace(&mut self, region: Region, text: &str);

    fn remove(&mut self, region: Region);

    /// Undo the most recent edit; false when there is nothing to undo
    fn undo(&mut self) -> bool;

    fn redo(&mut self) -> bool;
}

/// One reversible edit, in char indices
#[derive(Debug, Clone)]
struct RopeEdit {
    start: usize,
    removed: String,
    inserted: String,
}

/// In-memory [`TextBuffer`] backed by a rope, with its own edit history
#[derive(Debug, Default)]
pub struct RopeBuffer {
    rope: Rope,
    undo: Vec<RopeEdit>,
    redo: Vec<RopeEdit>,
}

impl RopeBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    /// Char index of a 1-based location. Columns past the end of a line
    /// resolve to the start of the next line.
    fn char_index(&self, location: TextLocation) -> usize {
        if location.line == 0 {
            return 0;
        }
        let line = location.line - 1;
        if line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        let line_start = self.rope.line_to_char(line);
        let line_len = self.rope.line(line).len_chars();
        line_start + location.column.saturating_sub(1).min(line_len)
    }

    fn char_range(&self, region: Region) -> (usize, usize) {
        let start = self.char_index(region.begin);
        let end = self.char_index(region.end).max(start);
        (start, end)
    }

    fn apply(&mut self, edit: &RopeEdit) {
        let removed_len = edit.removed.chars().count();
        if removed_len > 0 {
            self.rope.remove(edit.start..edit.start + removed_len);
        }
        if !edit.inserted.is_empty() {
            self.rope.insert(edit.start, &edit.inserted);
        }
    }

    fn record(&mut self, start: usize, end: usize, inserted: &str) {
        let edit = RopeEdit {
            start,
            removed: self.rope.slice(start..end).to_string(),
            inserted: inserted.to_string(),
        };
        self.apply(&edit);
        self.undo.push(edit);
        self.redo.clear();
    }
}

impl TextBuffer for RopeBuffer {
    fn text(&self) -> String {
        self.rope.to_string()
    }

    fn text_between(&self, begin: TextLocation, end: TextLocation) -> String {
        let (start, end) = self.char_range(Region::new(begin, end));
        self.rope.slice(start..end).to_string()
    }

    fn insert(&mut self, at: TextLocation, text: &str) {
        let start = self.char_index(at);
        self.record(start, start, text);
    }

    fn replace(&mut self, region: Region, text: &str) {
        let (start, end) = self.char_range(region);
        self.record(start, end, text);
    }

    fn remove(&mut self, region: Region) {
        let (start, end) = self.char_range(region);
        self.record(start, end, "");
    }

    fn undo(&mut self) -> bool {
        let Some(edit) = self.undo.pop() else {
            return false;
        };
        let inverse = RopeEdit {
            start: edit.start,
            removed: edit.inserted.clone(),
            inserted: edit.removed.clone(),
        };
        self.apply(&inverse);
        self.redo.push(edit);
        true
    }

    fn redo(&mut self) -> bool {
        let Some(edit) = self.redo.pop() else {
            return false;
        };
        self.apply(&edit);
        self.undo.push(edit);
        true
    }
}

/// Manual-reset event: closed while a mutation is in flight
#[derive(Debug, Default)]
pub struct MutationGate {
    closed: Mutex<bool>,
    opened: Condvar,
}

impl MutationGate {
    pub fn close(&self) {
        *lock(&self.closed) = true;
    }

    pub fn open(&self) {
        *lock(&self.closed) = false;
        self.opened.notify_all();
    }

    pub fn is_open(&self) -> bool {
        !*lock(&self.closed)
    }

    /// Block until the gate is open. No timeout: the mutation that closed it
    /// always reopens it.
    pub fn wait(&self) {
        let mut closed = lock(&self.closed);
        while *closed {
            closed = self
                .opened
                .wait(closed)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

type OwnerJob = Box<dyn FnOnce() + Send>;

/// Receiving end of the owner thread's task queue.
///
/// The owner must keep pumping while it waits on anything a worker thread
/// might be blocked behind.
pub struct OwnerQueue {
    receiver: mpsc::UnboundedReceiver<OwnerJob>,
}

impl OwnerQueue {
    /// Run every job queued so far; returns how many ran
    pub fn pump(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Block for the next job and run it; false once every sender is gone
    pub fn run_one(&mut self) -> bool {
        match self.receiver.blocking_recv() {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run jobs until `done` reports true. Whoever makes `done` true must
    /// post a job afterwards (see [`TextBufferAdapter::wake_owner`]).
    pub fn run_until(&mut self, done: impl Fn() -> bool) {
        self.pump();
        while !done() {
            if !self.run_one() {
                break;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferEvent {
    /// Text changed; `generation` counts mutations since creation
    Changed { generation: u64 },
}

struct AdapterInner {
    buffer: Mutex<Box<dyn TextBuffer>>,
    gate: MutationGate,
    dirty: AtomicBool,
    generation: AtomicU64,
    undo: Mutex<UndoTracker>,
    suppress_depth: AtomicUsize,
    change_pending: AtomicBool,
    owner: ThreadId,
    queue: mpsc::UnboundedSender<OwnerJob>,
    events: broadcast::Sender<BufferEvent>,
}

/// Shared handle to the text buffer. Clones share the same buffer.
#[derive(Clone)]
pub struct TextBufferAdapter {
    inner: Arc<AdapterInner>,
}

impl std::fmt::Debug for TextBufferAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBufferAdapter")
            .field("dirty", &self.is_dirty())
            .field("generation", &self.generation())
            .finish()
    }
}

impl TextBufferAdapter {
    /// Wrap a buffer. The calling thread becomes the owner thread.
    pub fn new(buffer: impl TextBuffer + 'static) -> (Self, OwnerQueue) {
        let (queue, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(64);
        let adapter = Self {
            inner: Arc::new(AdapterInner {
                buffer: Mutex::new(Box::new(buffer)),
                gate: MutationGate::default(),
                // nothing has been parsed yet
                dirty: AtomicBool::new(true),
                generation: AtomicU64::new(0),
                undo: Mutex::new(UndoTracker::new()),
                suppress_depth: AtomicUsize::new(0),
                change_pending: AtomicBool::new(false),
                owner: thread::current().id(),
                queue,
                events,
            }),
        };
        (adapter, OwnerQueue { receiver })
    }

    /// Adapter over an in-memory [`RopeBuffer`]
    pub fn from_text(text: &str) -> (Self, OwnerQueue) {
        Self::new(RopeBuffer::new(text))
    }

    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.inner.owner
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Clear the dirty flag if no mutation happened since `generation` was read
    pub fn mark_clean(&self, generation: u64) -> bool {
        let _buffer = lock(&self.inner.buffer);
        if self.generation() == generation {
            self.inner.dirty.store(false, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    /// Force a re-parse on the next read
    pub fn mark_dirty(&self) {
        self.inner.dirty.store(true, Ordering::SeqCst);
    }

    pub fn wait_for_mutations(&self) {
        self.inner.gate.wait();
    }

    /// Current text together with the generation it belongs to
    pub fn read_snapshot(&self) -> (String, u64) {
        self.inner.gate.wait();
        let buffer = lock(&self.inner.buffer);
        (buffer.text(), self.generation())
    }

    pub fn text(&self) -> String {
        self.read_snapshot().0
    }

    pub fn text_between(&self, begin: TextLocation, end: TextLocation) -> String {
        self.inner.gate.wait();
        lock(&self.inner.buffer).text_between(begin, end)
    }

    pub fn insert(&self, at: TextLocation, text: &str) -> EditorResult<()> {
        let text = text.to_string();
        self.mutate(move |buffer| buffer.insert(at, &text))
    }

    pub fn replace(&self, region: Region, text: &str) -> EditorResult<()> {
        let text = text.to_string();
        self.mutate(move |buffer| buffer.replace(region, &text))
    }

    pub fn remove(&self, region: Region) -> EditorResult<()> {
        self.mutate(move |buffer| buffer.remove(region))
    }

    /// Replace the whole text as a single undoable edit
    pub fn set_text(&self, text: &str) -> EditorResult<()> {
        let text = text.to_string();
        self.mutate(move |buffer| {
            let end = TextLocation::new(usize::MAX, 1);
            buffer.replace(Region::new(TextLocation::START, end), &text)
        })
    }

    pub fn can_undo(&self) -> bool {
        lock(&self.inner.undo).can_undo()
    }

    pub fn can_redo(&self) -> bool {
        lock(&self.inner.undo).can_redo()
    }

    pub fn undo_tracker(&self) -> UndoTracker {
        lock(&self.inner.undo).clone()
    }

    /// Undo through the buffer's native history; false when the tracker
    /// reports nothing to undo
    pub fn undo(&self) -> EditorResult<bool> {
        if !self.can_undo() {
            return Ok(false);
        }
        self.on_owner(|adapter| {
            adapter.apply(
                |buffer| buffer.undo(),
                |undo| undo.undo_action(),
            )
        })
    }

    pub fn redo(&self) -> EditorResult<bool> {
        if !self.can_redo() {
            return Ok(false);
        }
        self.on_owner(|adapter| {
            adapter.apply(
                |buffer| buffer.redo(),
                |undo| undo.redo_action(),
            )
        })
    }

    /// Hold back change notifications until the guard drops
    pub fn suppress_notifications(&self) -> SuppressGuard {
        self.inner.suppress_depth.fetch_add(1, Ordering::SeqCst);
        SuppressGuard {
            adapter: self.clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BufferEvent> {
        self.inner.events.subscribe()
    }

    /// Queue a no-op so a blocked [`OwnerQueue::run_until`] re-checks its
    /// condition
    pub fn wake_owner(&self) {
        let _ = self.inner.queue.send(Box::new(|| {}));
    }

    fn mutate(
        &self,
        edit: impl FnOnce(&mut dyn TextBuffer) + Send + 'static,
    ) -> EditorResult<()> {
        self.on_owner(move |adapter| {
            adapter.apply(edit, UndoTracker::finish_action);
        })
    }

    /// Run `job` on the owner thread, blocking until it has finished
    fn on_owner<R: Send + 'static>(
        &self,
        job: impl FnOnce(&TextBufferAdapter) -> R + Send + 'static,
    ) -> EditorResult<R> {
        if self.is_owner_thread() {
            return Ok(job(self));
        }

        let (reply, response) = oneshot::channel();
        let adapter = self.clone();
        self.inner
            .queue
            .send(Box::new(move || {
                let _ = reply.send(job(&adapter));
            }))
            .map_err(|_| EditorError::OwnerGone)?;

        tracing::debug!("waiting for owner thread to apply text mutation");
        response.blocking_recv().map_err(|_| EditorError::OwnerGone)
    }

    fn apply<R>(
        &self,
        edit: impl FnOnce(&mut dyn TextBuffer) -> R,
        track: impl FnOnce(&mut UndoTracker),
    ) -> R {
        self.inner.gate.close();
        let result = {
            let mut buffer = lock(&self.inner.buffer);
            let result = edit(buffer.as_mut());
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            self.inner.dirty.store(true, Ordering::SeqCst);
            result
        };
        track(&mut lock(&self.inner.undo));
        self.inner.gate.open();

        self.notify_changed();
        result
    }

    fn notify_changed(&self) {
        if self.inner.suppress_depth.load(Ordering::SeqCst) > 0 {
            self.inner.change_pending.store(true, Ordering::SeqCst);
            return;
        }
        let _ = self.inner.events.send(BufferEvent::Changed {
            generation: self.generation(),
        });
    }
}

/// Keeps change notifications suppressed while alive
pub struct SuppressGuard {
    adapter: TextBufferAdapter,
}

impl Drop for SuppressGuard {
    fn drop(&mut self) {
        let inner = &self.adapter.inner;
        if inner.suppress_depth.fetch_sub(1, Ordering::SeqCst) == 1
            && inner.change_pending.swap(false, Ordering::SeqCst)
        {
            self.adapter.notify_changed();
        }
    }
}
