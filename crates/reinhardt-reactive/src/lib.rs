//! Dependency-tracking reactivity core
//!
//! State is wrapped so property reads and writes become dependency-graph
//! operations; [`Watcher`]s record what they read while evaluating and are
//! re-run, batched by the scheduler, when any of it changes.
//!
//! ## Modules
//!
//! - [`value`]: dynamic values with reference identity
//! - [`observer`]: reactive wrappers and tracked property access
//! - [`dep`]: publish/subscribe dependency nodes
//! - [`watcher`]: computation nodes
//! - [`scheduler`]: batched, ordered re-runs
//! - [`next_tick`]: the deferred-callback queue
//! - [`error_handling`]: the error capture chain

pub mod array;
pub mod computed;
pub mod config;
pub mod dep;
pub mod error;
pub mod error_handling;
pub mod logging;
pub mod next_tick;
pub mod observer;
pub mod runtime;
pub mod scheduler;
pub mod scope;
pub mod traverse;
pub mod value;
pub mod watch;
pub mod watcher;

pub use computed::Computed;
pub use config::{MAX_UPDATE_COUNT, Mode, RuntimeConfig};
pub use dep::{Dep, DepId};
pub use error::{ReactiveError, ReactiveResult};
pub use error_handling::{
	GlobalErrorHandler, handle_error, invoke_async_with_error_handling, invoke_with_error_handling,
};
#[cfg(feature = "tokio")]
pub use next_tick::tokio_task_scheduler;
pub use next_tick::{Task, TaskScheduler, TickCallback};
pub use observer::Observer;
pub use runtime::{Runtime, try_with_runtime, with_runtime};
pub use scheduler::LifecycleHooks;
pub use scope::{ErrorCapturedHook, Propagation, ScopeId};
pub use traverse::traverse;
pub use value::{Array, Key, Object, Value};
pub use watch::{Unwatch, WatchOptions, WatchSource, parse_path};
pub use watcher::{BeforeHook, Getter, WatchCallback, Watcher, WatcherId, WatcherOptions};

#[doc(hidden)]
pub use tracing as __tracing;
