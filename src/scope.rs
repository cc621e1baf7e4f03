//! Ambient scope stack: chain-local key/value frames attached to every
//! event emitted while they are active.
//!
//! Each logical call chain owns its own stack. Async chains carry their
//! frames in a task-local slot seeded by [`isolated`], so frames survive
//! suspension points within one chain but are never visible to another
//! chain that happens to interleave on the same executor thread. Code
//! running outside any isolated slot (plain threads, top-level sync
//! callers) falls back to a thread-local stack, where one OS thread is
//! one chain.
use std::cell::RefCell;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::{LogEvent, PropertyMap};

static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
struct Frame {
    id: u64,
    values: PropertyMap,
}

tokio::task_local! {
    static TASK_FRAMES: RefCell<Vec<Frame>>;
}

thread_local! {
    static THREAD_FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

fn task_slot_active() -> bool {
    TASK_FRAMES.try_with(|_| ()).is_ok()
}

fn with_frames<R>(f: impl FnOnce(&RefCell<Vec<Frame>>) -> R) -> R {
    if task_slot_active() {
        TASK_FRAMES.with(f)
    } else {
        THREAD_FRAMES.with(f)
    }
}

/// Handle returned by [`push`]; releases its frame on drop.
///
/// The frame is popped only if it is still the top of the chain's stack,
/// so releasing out of order (or twice) is a safe no-op and can never
/// disturb frames pushed by other chains.
#[derive(Debug)]
pub struct ScopeGuard {
    frame_id: u64,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        with_frames(|frames| {
            let mut frames = frames.borrow_mut();
            if frames.last().map(|frame| frame.id) == Some(self.frame_id) {
                frames.pop();
            }
        });
    }
}

/// Pushes a new frame onto the current chain's stack.
///
/// The map is taken by value, so later mutation by the caller cannot
/// affect the pushed frame.
pub fn push(values: PropertyMap) -> ScopeGuard {
    let frame = Frame {
        id: NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed),
        values,
    };
    let frame_id = frame.id;
    with_frames(|frames| frames.borrow_mut().push(frame));
    ScopeGuard { frame_id }
}

/// Copies every active frame's properties into the event, oldest frame
/// first, so the innermost scope wins on key collisions.
pub fn enrich_into(event: &mut LogEvent) {
    with_frames(|frames| {
        let frames = frames.borrow();
        for frame in frames.iter() {
            for (key, value) in frame.values.iter() {
                event.properties.insert(key, value.clone());
            }
        }
    });
}

/// Runs a future with its own empty scope stack.
///
/// Wrap the root future of each spawned call chain in this so that
/// scopes pushed inside it stay with the chain across await points and
/// never leak to concurrently running chains.
pub async fn isolated<F: Future>(future: F) -> F::Output {
    TASK_FRAMES.scope(RefCell::new(Vec::new()), future).await
}
