//! Shared synchronization and collection types.

pub use parking_lot::{Mutex, RwLock};

pub use std::sync::{
    atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering},
    Arc, Weak,
};

pub use hashbrown::{HashMap, HashSet};
