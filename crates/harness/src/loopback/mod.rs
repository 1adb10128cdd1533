//! In-process media server and browser.
//!
//! Implements the collaborator traits without external processes so the whole
//! scenario can run inside a test or the `rtch simulate` command. The server
//! records into a JSON [`Manifest`] instead of a media container, and the
//! browser drives a [`ContentService`](crate::ContentService) directly instead
//! of negotiating over the network.

mod browser;
mod manifest;
mod server;

pub use browser::{Faults, LoopbackBrowser};
pub use manifest::{Manifest, ManifestProber};
pub use server::{LoopbackServer, ServerOptions};
