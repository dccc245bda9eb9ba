use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

/// A thread pool for parallel decode work.
///
/// On native targets, uses `std::thread::scope` for scoped parallel execution.
/// On WASM, executes all tasks sequentially on the calling thread.
///
/// # Example
///
/// ```
/// use redlilium_gltfio::compute::ThreadPool;
///
/// let pool = ThreadPool::new(4);
///
/// let mut results = vec![0u32; 4];
/// pool.scope(|s| {
///     for (i, slot) in results.iter_mut().enumerate() {
///         s.spawn(move || {
///             *slot = (i as u32) * 10;
///         });
///     }
/// });
/// assert_eq!(results, vec![0, 10, 20, 30]);
/// ```
pub struct ThreadPool {
    num_threads: usize,
}

impl ThreadPool {
    /// Creates a new thread pool with the given number of worker threads.
    ///
    /// On WASM, the thread count is ignored (single-threaded execution).
    pub fn new(num_threads: usize) -> Self {
        Self {
            num_threads: num_threads.max(1),
        }
    }

    /// Creates a thread pool sized to the number of available CPU cores.
    pub fn default_threads() -> Self {
        Self::new(std::thread::available_parallelism().map_or(1, |n| n.get()))
    }

    /// Number of worker threads used by [`map`](Self::map).
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Executes tasks within a scoped context.
    ///
    /// All tasks spawned within the closure are guaranteed to complete
    /// before this method returns. Tasks can borrow local variables
    /// thanks to scoped lifetimes.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn scope<'env, F>(&self, f: F)
    where
        F: for<'scope> FnOnce(&Scope<'scope, 'env>),
    {
        std::thread::scope(|s| {
            let scope = Scope { inner: s };
            f(&scope);
        });
    }

    /// Executes tasks within a scoped context (WASM: sequential).
    #[cfg(target_arch = "wasm32")]
    pub fn scope<'env, F>(&self, f: F)
    where
        F: for<'scope> FnOnce(&Scope<'scope, 'env>),
    {
        let scope = Scope {
            _marker: std::marker::PhantomData,
        };
        f(&scope);
    }

    /// Applies `f` to every item across the pool and returns the results in
    /// input order.
    ///
    /// Workers pull the next item index from a shared counter, so a slow
    /// item does not stall a whole batch. Small inputs run inline.
    pub fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
    {
        let workers = self.num_threads.min(items.len());
        if workers <= 1 {
            return items.into_iter().map(f).collect();
        }

        let count = items.len();
        let inputs: Vec<Mutex<Option<T>>> =
            items.into_iter().map(|item| Mutex::new(Some(item))).collect();
        let outputs: Vec<Mutex<Option<R>>> = (0..count).map(|_| Mutex::new(None)).collect();
        let next = AtomicUsize::new(0);

        self.scope(|s| {
            for _ in 0..workers {
                s.spawn(|| {
                    loop {
                        let i = next.fetch_add(1, Ordering::Relaxed);
                        if i >= count {
                            break;
                        }
                        if let Some(item) = inputs[i].lock().take() {
                            *outputs[i].lock() = Some(f(item));
                        }
                    }
                });
            }
        });

        outputs
            .into_iter()
            .filter_map(|slot| slot.into_inner())
            .collect()
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::default_threads()
    }
}

/// A scope for spawning tasks that must complete before the scope exits.
///
/// All tasks spawned within a scope are guaranteed to complete before
/// [`ThreadPool::scope`] returns.
#[cfg(not(target_arch = "wasm32"))]
pub struct Scope<'scope, 'env: 'scope> {
    inner: &'scope std::thread::Scope<'scope, 'env>,
}

#[cfg(not(target_arch = "wasm32"))]
impl<'scope, 'env> Scope<'scope, 'env> {
    /// Spawns a task within this scope.
    ///
    /// The task will be executed by a new thread.
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'scope,
    {
        self.inner.spawn(f);
    }
}

/// A scope for spawning tasks (WASM: sequential execution).
#[cfg(target_arch = "wasm32")]
pub struct Scope<'scope, 'env: 'scope> {
    _marker: std::marker::PhantomData<(&'scope (), &'env ())>,
}

#[cfg(target_arch = "wasm32")]
impl<'scope, 'env> Scope<'scope, 'env> {
    /// Spawns a task within this scope (WASM: executes immediately).
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'scope,
    {
        f();
    }
}
