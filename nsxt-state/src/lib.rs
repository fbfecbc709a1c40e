//! NSX-T State Management
//!
//! Records which NSX objects were created through the provider, keyed by
//! resource type and name, with the attributes last read back.
//!
//! ```ignore
//! use nsxt_state::StateStore;
//!
//! let store = StateStore::open("nsxt.state.json").await?;
//! let lock = store.lock("apply").await?;
//! let mut state = store.load().await?;
//!
//! state.record(&created);
//! store.save(&mut state).await?;
//! store.unlock(&lock).await?;
//! ```

pub mod error;
pub mod lock;
pub mod state;
pub mod store;

pub use error::{StateError, StateResult};
pub use lock::StateLock;
pub use state::{RecordedResource, StateFile};
pub use store::{DEFAULT_STATE_PATH, StateStore};
