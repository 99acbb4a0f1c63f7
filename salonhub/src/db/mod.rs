//! Database layer: repositories over sqlx/PostgreSQL.
//!
//! Each entity has a repository in [`handlers`] that owns a `&mut PgConnection`
//! and exposes typed queries, with request/response DTOs in [`models`]. Errors
//! are classified into [`errors::DbError`] so the API layer can map them to
//! status codes without inspecting sqlx internals.

pub mod errors;
pub mod handlers;
pub mod models;
