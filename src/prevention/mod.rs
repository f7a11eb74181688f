pub mod blocker;
pub mod firewall;

pub use blocker::Blocker;
pub use firewall::{BlockOutcome, FilterClient, IpsetClient};
