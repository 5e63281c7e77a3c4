use crate::context::Context;
use crate::http::Request;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

/// Free-list of reusable [`Context`] values.
///
/// At most `capacity` idle contexts are kept; extra ones are dropped on
/// release.
#[derive(Clone)]
pub struct ContextPool {
    inner: Arc<Mutex<ContextPoolInner>>,
}

struct ContextPoolInner {
    contexts: Vec<Box<Context>>,
    capacity: usize,
}

impl ContextPool {
    pub fn new(capacity: usize) -> Self {
        ContextPool {
            inner: Arc::new(Mutex::new(ContextPoolInner {
                contexts: Vec::new(),
                capacity,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ContextPoolInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Checks out a context reset for `request`. It goes back to the pool when
    /// the returned guard is dropped, including during unwinding.
    pub fn acquire(&self, request: Request) -> PooledContext<'_> {
        let mut ctx = self.lock().contexts.pop().unwrap_or_default();
        ctx.reset(request);
        PooledContext {
            ctx: ManuallyDrop::new(ctx),
            pool: self,
        }
    }

    fn release(&self, mut ctx: Box<Context>) {
        ctx.release();
        let mut inner = self.lock();
        if inner.contexts.len() < inner.capacity {
            inner.contexts.push(ctx);
        }
    }

    pub fn idle(&self) -> usize {
        self.lock().contexts.len()
    }

    pub fn set_capacity(&self, capacity: usize) {
        let mut inner = self.lock();
        inner.capacity = capacity;
        inner.contexts.truncate(capacity);
    }
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Exclusive checkout of a pooled [`Context`].
pub struct PooledContext<'p> {
    ctx: ManuallyDrop<Box<Context>>,
    pool: &'p ContextPool,
}

impl Deref for PooledContext<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.ctx
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        // SAFETY: `ctx` is taken exactly once, here, and never read again.
        let ctx = unsafe { ManuallyDrop::take(&mut self.ctx) };
        self.pool.release(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};

    #[test]
    fn contexts_are_reused() {
        let pool = ContextPool::new(4);
        let first: *const Context = {
            let ctx = pool.acquire(Request::new("GET", "/a"));
            &*ctx as *const Context
        };
        assert_eq!(pool.idle(), 1);

        let ctx = pool.acquire(Request::new("GET", "/b"));
        assert_eq!(&*ctx as *const Context, first);
        assert_eq!(ctx.path(), "/b");
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn released_context_is_reset() {
        let pool = ContextPool::new(4);
        {
            let mut ctx = pool.acquire(Request::new("GET", "/a"));
            ctx.string(404, "nope");
            ctx.abort();
        }
        let ctx = pool.acquire(Request::new("GET", "/b"));
        assert!(!ctx.is_aborted());
        assert!(ctx.response().body.is_empty());
    }

    #[test]
    fn capacity_bounds_idle_contexts() {
        let pool = ContextPool::new(1);
        {
            let _a = pool.acquire(Request::new("GET", "/a"));
            let _b = pool.acquire(Request::new("GET", "/b"));
        }
        assert_eq!(pool.idle(), 1);

        pool.set_capacity(0);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn context_returns_to_pool_on_panic() {
        let pool = ContextPool::new(4);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ctx = pool.acquire(Request::new("GET", "/boom"));
            panic!("handler failed");
        }));
        assert!(result.is_err());
        assert_eq!(pool.idle(), 1);
    }
}
