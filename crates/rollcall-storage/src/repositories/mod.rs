pub mod member;
pub mod session;
pub mod system_log;

pub use member::{MemberRepository, SqliteMemberRepository};
pub use session::{SessionRepository, SqliteSessionRepository};
pub use system_log::{SqliteSystemLogRepository, SystemLogRepository};
