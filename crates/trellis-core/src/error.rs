use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("slice `{0}` is registered twice")]
    DuplicateSlice(String),

    /// A component read a slice that no reducer owns.
    #[error("no slice named `{0}`")]
    MissingSlice(String),

    #[error("slice `{name}` does not hold a `{expected}`")]
    SliceType {
        name: String,
        expected: &'static str,
    },

    #[error("props do not match component `{0}`")]
    PropsType(&'static str),

    #[error("updates did not settle after {0} render passes")]
    UpdateLoop(usize),

    #[error("no root is mounted")]
    NoRoot,

    #[error("no element with id `{id}` handles `{event}`")]
    UnknownTarget { id: String, event: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
