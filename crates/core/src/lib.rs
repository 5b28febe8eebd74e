//! Tempest - reactive client engine for tempest servers
//!
//! A single-writer [`Model`] is kept consistent under user intents, results
//! of asynchronous remote calls and server-pushed collection updates:
//!
//! - **[`Message`]**: typed intents, applied one at a time by [`update`]
//! - **[`Command`]**: asynchronous work returned by a transition; it talks to
//!   the server through [`Capability`](tempest_runtime::Capability) handles and
//!   reports back only by queueing messages
//! - **[`Pusher`]**: the client-side object a server calls to keep a keyed
//!   collection (grains, packages) in sync
//! - **[`Program`]**: the dispatch loop owning the model
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tempest::{Model, Program, Shutdown, TracingView, api::ExternalApi, commands};
//! use tempest_runtime::{Connection, WebSocketTransport};
//!
//! let (transport, rx) = WebSocketTransport::connect("wss://example.org/_capnp-api").await?;
//! let connection = Connection::new(transport.into_transport_parts(rx));
//! tokio::spawn({ let c = connection.clone(); async move { c.run().await } });
//!
//! let api = ExternalApi::new(connection.bootstrap());
//! let program = Program::new(Model::new(api.add_ref()), TracingView, host, Shutdown::new());
//! program.spawn(commands::fetch_sessions(api));
//! let model = program.run().await;
//! ```

pub mod api;
pub mod command;
pub mod commands;
pub mod dom_order;
pub mod error;
pub mod message;
pub mod model;
pub mod program;
pub mod pusher;
pub mod shutdown;
pub mod testing;
mod update;

pub use command::{Command, CommandContext, Host, MessageSender};
pub use dom_order::{DomIndex, DomOrder};
pub use error::{Error, ManifestError, Result};
pub use message::{Message, PackageFile};
pub use model::{Focus, Grain, LoginForm, Model, ModelSummary, OpenGrain, Package};
pub use program::{Program, TracingView, View};
pub use pusher::{GrainPusher, PackagePusher, Pusher, PusherHooks};
pub use shutdown::Shutdown;
pub use tempest_protocol::{GrainId, PackageId};
pub use update::update;
