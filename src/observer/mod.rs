//! DOM 变更观察
//!
//! - `mutation`: 变更记录、写入通知与相关性判定
//! - `coordinator`: 防抖调度与重新高亮

pub mod coordinator;
pub mod mutation;

pub use coordinator::{MutationCoordinator, PassReport, PassState};
pub use mutation::{
    batch_is_relevant, is_relevant, is_self_inflicted, DomObserver, MutationKind, MutationQueue,
    MutationRecord, MutationSink, NullSink,
};
