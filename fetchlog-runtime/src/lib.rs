//! Tokio runtime wrapper that owns the session-wide cancellation token.
//!
//! Every operation runs under a child of the root token, so cancelling the
//! root (Ctrl-C, shutdown) stops whatever acquisition is in flight while a
//! single operation can still be cancelled on its own.
use anyhow::Result;
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct FetchlogHandle {
    inner: Handle,
    cancel: Arc<CancellationToken>,
}

pub struct FetchlogRuntime {
    runtime: Runtime,
    cancel: Arc<CancellationToken>,
}

impl FetchlogRuntime {
    /// Build a Tokio runtime for the fetchlog binary.
    ///
    /// ```
    /// use fetchlog_runtime::FetchlogRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = FetchlogRuntime::build("doctest-runtime", Some(1))
    ///     .expect("runtime builds");
    /// let value = runtime.block_on(async { 2 + 2 });
    /// assert_eq!(value, 4);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn build(thread_name: &str, worker_threads: Option<usize>) -> Result<Self> {
        let mut builder = Builder::new_multi_thread();
        builder.enable_all().thread_name(thread_name);

        if let Some(workers) = worker_threads {
            builder.worker_threads(workers.max(1));
        }

        let runtime = builder.build()?;
        let cancel = Arc::new(CancellationToken::new());
        Ok(Self { runtime, cancel })
    }

    pub fn handle(&self) -> FetchlogHandle {
        FetchlogHandle {
            inner: self.runtime.handle().clone(),
            cancel: self.cancel.clone(),
        }
    }

    pub fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Cancel outstanding work and shut the runtime down gracefully.
    pub fn shutdown(self, graceful: std::time::Duration) {
        self.cancel.cancel();
        self.runtime.shutdown_timeout(graceful);
    }
}

impl FetchlogHandle {
    pub fn spawn<F, T>(&self, fut: F) -> JoinHandle<T>
    where
        F: std::future::Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.inner.spawn(fut)
    }

    /// The session-wide token.
    pub fn cancellation(&self) -> Arc<CancellationToken> {
        self.cancel.clone()
    }

    /// Fresh token for one operation; cancelled together with the session.
    ///
    /// ```
    /// use fetchlog_runtime::FetchlogRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = FetchlogRuntime::build("op-token", Some(1)).unwrap();
    /// let handle = runtime.handle();
    /// let op = handle.operation_token();
    /// op.cancel();
    /// assert!(!handle.cancellation().is_cancelled());
    ///
    /// let op = handle.operation_token();
    /// handle.cancellation().cancel();
    /// assert!(op.is_cancelled());
    /// runtime.shutdown(Duration::from_millis(5));
    /// ```
    pub fn operation_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Cancel the session token on the first Ctrl-C.
    pub fn cancel_on_ctrl_c(&self) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        self.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                res = tokio::signal::ctrl_c() => {
                    match res {
                        Ok(()) => tracing::info!("runtime.ctrl_c"),
                        Err(err) => tracing::warn!(error=%err, "runtime.ctrl_c.listen_failed"),
                    }
                    cancel.cancel();
                }
            }
        })
    }
}
