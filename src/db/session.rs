//! The database capability the tools consume.

use crate::db::builder::PlaceholderStyle;
use crate::error::DbResult;
use crate::models::{ResultSet, Statement};
use std::future::Future;
use std::sync::Arc;

/// An open session against a database exposing the catalog views.
///
/// Implementations run one statement per call, fetch every row, and release
/// whatever connection they used before returning, on success and on error.
/// Failures are returned as-is; callers do not retry.
pub trait CatalogSession: Send + Sync {
    /// Execute `statement` with its bound parameters and fetch all rows.
    fn fetch_all(&self, statement: &Statement) -> impl Future<Output = DbResult<ResultSet>> + Send;

    /// Placeholder syntax expected in statement text.
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }
}

impl<S: CatalogSession> CatalogSession for Arc<S> {
    fn fetch_all(&self, statement: &Statement) -> impl Future<Output = DbResult<ResultSet>> + Send {
        (**self).fetch_all(statement)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        (**self).placeholder_style()
    }
}
