//! Backend dispatch macro for reducing code duplication.
//!
//! Statements differ per backend only in driver type and placeholder syntax, so
//! call sites match on the connection once and write each arm inline.

/// Macro for generating backend dispatch match arms over a `DbConnection`.
///
/// # Example
///
/// ```ignore
/// db_dispatch!(conn, {
///     Embedded(c) => sqlx::query("SELECT 1").execute(&mut *c).await?,
///     Networked(c) => sqlx::query("SELECT 1").execute(&mut **c).await?,
/// });
/// ```
#[macro_export]
macro_rules! db_dispatch {
    ($conn:expr, { $($variant:ident($c:ident) => $body:expr),+ $(,)? }) => {
        match $conn {
            $(
                $crate::db::pool::DbConnection::$variant($c) => $body,
            )+
        }
    };
}
