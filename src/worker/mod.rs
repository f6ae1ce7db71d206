//! Database worker process.
//!
//! SQL Server and DuckDB statements are executed by a long-running child
//! process (`heron-worker`) so that native drivers stay out of this crate.
//! Requests and responses are single JSON lines on the child's stdin and
//! stdout, correlated by request id:
//!
//! ```text
//! heron ──► {"id":"…","method":"query.execute","params":{"driver":"mssql",
//!            "connection_string":"…","sql":"SELECT TOP 200 …","max_rows":200}}
//! heron ◄── {"id":"…","success":true,"result":{"columns":[…],"rows":[[…]],"row_count":1}}
//! ```
//!
//! Several requests may be in flight at once; the reader task routes each
//! response to the caller waiting on its id. If the worker exits, every
//! waiting caller receives a `WORKER_EXITED` error.

mod client;
mod error;
pub mod protocol;

pub use client::WorkerClient;
pub use error::{WorkerError, WorkerResult};
