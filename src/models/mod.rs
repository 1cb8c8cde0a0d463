//! Data models shared by the session layer and the tools.

pub mod envelope;
pub mod query;
pub mod result;
pub mod value;

pub use envelope::{Envelope, Metadata, Status, create_response};
pub use query::{QueryParam, Statement};
pub use result::{Record, ResultSet, rows_to_records};
pub use value::SqlValue;
