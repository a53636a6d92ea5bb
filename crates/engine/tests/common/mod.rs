pub mod fixtures;
pub mod mocks;

#[allow(unused_imports)]
pub use fixtures::{TestEngine, expect_session, seeded_bytes, target, upload_in_order};
#[allow(unused_imports)]
pub use mocks::{CountingIndex, FailingBackend, InstrumentedBackend};
