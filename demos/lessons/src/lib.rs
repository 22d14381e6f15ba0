//! Small headless apps built on Trellis. Each module is one app: its
//! actions and reducers (if it has a store), its components, and tests
//! that drive it through `Runtime::trigger`.

pub mod blog;
pub mod comments;
pub mod fake_api;
pub mod pics;
pub mod resources;
pub mod seasons;
pub mod songs;
pub mod streams;
pub mod translate;
pub mod videos;
