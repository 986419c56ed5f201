mod membership_event;
mod operation;
mod segment;
mod user;

pub use membership_event::*;
pub use operation::*;
pub use segment::*;
pub use user::*;
