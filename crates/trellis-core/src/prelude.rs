pub use crate::collab::{
    ClientConfig, GeoError, Geolocation, Http, HttpError, HttpFuture, Method, Position, Response,
    Service, query_param, with_query,
};
pub use crate::component::{Component, component};
pub use crate::connect::{Connect, connect};
pub use crate::dispatch::{Dispatched, Dispatcher, deferred};
pub use crate::effects::{Dispose, Subscription, on_unmount};
pub use crate::error::{Error, Result};
pub use crate::runtime::{Frame, Lifecycle, RenderCx, Rerender, Runtime, RuntimeConfig};
pub use crate::scope::Scope;
pub use crate::signal::{Signal, signal};
pub use crate::state::Setter;
pub use crate::store::{Action, ChangeSet, Interest, LoggingMiddleware, Middleware, Store, whole};
pub use crate::task::{Task, TaskError};
pub use crate::view::{Button, Callback, Div, El, Fragment, Input, Markup, Text, View};
