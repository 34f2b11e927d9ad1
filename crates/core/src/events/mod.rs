pub mod poller;
pub mod registry;
pub mod types;

pub use poller::LivePoller;
pub use registry::{SubscriberRegistry, Subscription};
pub use types::LiveEvent;
