//! # Proctor
//!
//! Allowlisted DOM automation for browser test harnesses.
//!
//! Proctor mediates between test code and a live browser page over the
//! Chrome DevTools Protocol (CDP). Remote execution is restricted to a fixed
//! catalog of vetted operations, and caller parameters always travel as
//! structured call arguments rather than interpolated source text, so a
//! value containing quotes or script fragments can never change which
//! operation runs.
//!
//! ## Features
//!
//! - **Closed operation catalogs** - element-scoped and page-scoped, frozen
//!   at compile time, no runtime registration
//! - **Structured arguments everywhere** - parameters are CDP call
//!   arguments, never expression text
//! - **Single choke point** - every remote call flows through the dispatcher
//! - **Minimal dependencies** - a hand-rolled CDP client, ~8 crates total
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use proctor::Connection;
//!
//! #[tokio::main]
//! async fn main() -> proctor::Result<()> {
//!     // Attach to a browser started with --remote-debugging-port
//!     let connection = Connection::connect("ws://127.0.0.1:9222/devtools/browser/abc")?;
//!     let page = connection.open_page("https://example.com").await?;
//!     page.wait_for_ready(10_000).await?;
//!
//!     let input = page.find("#email").await?;
//!     input.set_value("user@example.com").await?;
//!     assert_eq!(input.value().await?, "user@example.com");
//!
//!     page.find("button[type='submit']").await?.click().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Dispatching directly
//!
//! The helpers above are thin wrappers; the dispatcher is public for test
//! code that wants to run a catalogued operation by name:
//!
//! ```rust,no_run
//! # use proctor::{dispatch_on_element, Connection};
//! # use serde_json::json;
//! # async fn example(connection: Connection) -> proctor::Result<()> {
//! let page = connection.open_page("https://example.com").await?;
//! let field = page.find("#search").await?;
//! dispatch_on_element(page.session(), field.node_id(), "setValue", &[json!("query")]).await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cdp;
pub mod dispatch;
pub mod error;
pub mod page;

// Re-exports
pub use catalog::OperationDef;
pub use cdp::{Connection, Session};
pub use dispatch::{dispatch_on_element, dispatch_on_page, RemoteCall};
pub use error::{CatalogScope, Error, Result};
pub use page::{Element, Page, Rect, ScrollPosition, ViewportSize};
