//! # freshcart-db: Local Persistence for FreshCart
//!
//! SQLite-backed storage for the FreshCart client: connection pooling,
//! embedded migrations, repository-per-aggregate data access, and
//! watch-based live queries.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  freshcart-core (pure business logic)                               │
//! │       ▲                                                             │
//! │       │ domain types + guards                                       │
//! │  ┌────┴────────────────────────────────────────────────────────┐    │
//! │  │           ★ freshcart-db (THIS CRATE) ★                     │    │
//! │  │                                                             │    │
//! │  │  ┌──────┐ ┌────────────┐ ┌──────────────┐ ┌─────────────┐  │    │
//! │  │  │ pool │ │ migrations │ │ repository/* │ │ live        │  │    │
//! │  │  │ DI   │ │ embedded   │ │ orders,      │ │ LiveQuery   │  │    │
//! │  │  │handle│ │ forward-   │ │ stores,      │ │ + change    │  │    │
//! │  │  │      │ │ only       │ │ returns, ... │ │ hub         │  │    │
//! │  │  └──────┘ └────────────┘ └──────────────┘ └─────────────┘  │    │
//! │  └─────────────────────────────────────────────────────────────┘    │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite file (WAL mode, foreign keys ON)                            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use freshcart_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("/data/freshcart.db")).await?;
//! let orders = db.orders().for_user("user-1").await?;
//! ```
//!
//! ## Design Principles
//!
//! 1. **Explicit handle**: no global store; whoever builds the
//!    [`Database`] owns its lifecycle and passes clones down
//! 2. **Forward-only migrations**: schema changes are new numbered
//!    scripts, never a drop-and-recreate
//! 3. **Guards live in core**: repositories load, delegate to the domain
//!    type, and persist what it produced
//! 4. **Commit, then notify**: live queries only ever observe committed
//!    state

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod live;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use live::LiveQuery;
pub use pool::{new_id, Database, DbConfig};
pub use repository::{OrderRepository, ReturnRepository, SettingsRepository, StoreRepository};
