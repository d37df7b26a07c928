// Models module - Database entity representations

pub mod attendance;
pub mod member;
pub mod subscription;

pub use attendance::Attendance;
pub use member::{Member, MemberStatus};
pub use subscription::{Plan, Subscription};
