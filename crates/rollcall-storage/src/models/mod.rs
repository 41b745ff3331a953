pub mod member;
pub mod session;
pub mod system_log;

pub use member::{Member, MemberUpdate, NewMember};
pub use session::{NewSession, Session, SessionClose};
pub use system_log::SystemLog;
