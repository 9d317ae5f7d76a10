mod archived_session;

pub use archived_session::{ArchivedSession, ArchivedSessionRow};
