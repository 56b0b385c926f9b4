//! The XTRA reactive core.
//!
//! [`ReactiveCore`] owns the raw value tree and everything that reacts to
//! it below the DOM: the change-gated mutation entry points, the computed
//! cache with precise dependency re-registration, path watchers, and the
//! debounced persistence bridge. The directive engine layers DOM concerns
//! on top and orchestrates change propagation by asking the core what a
//! mutation invalidated.

mod computed;
mod persist;
mod reactive;
mod store;
mod watch;

pub use computed::{DerivedError, DerivedFn, Reader};
pub use reactive::ReactiveCore;
pub use persist::{MemoryStorage, Storage, STORAGE_KEY};
pub use store::{Change, Store};
pub use watch::WatchFn;
