//! # Blueprint Container Test Suite
//!
//! Cross-crate scenarios that drive real containers against the in-memory
//! host registries.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/            # Recipe graph benchmarks (criterion)
//! └── src/integration/
//!     ├── fixtures.rs         # Shared host, bean classes and waiters
//!     ├── lifecycle_flows.rs  # Creation, timeout and destruction
//!     ├── dependency_flows.rs # Grace periods, flapping services, handlers
//!     ├── wiring_flows.rs     # Singletons, cycles and concurrent lookups
//!     └── runtime_flows.rs    # Runtime, dispatcher and bus end to end
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p bp-tests
//! cargo test -p bp-tests integration::dependency_flows
//! cargo bench -p bp-tests
//! ```

pub mod integration;
