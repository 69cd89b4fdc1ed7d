//! Browser login for pfw.
//!
//! The login handshake is a loopback redirect: a single-use HTTP listener on
//! `127.0.0.1` receives `GET /callback?token=<value>` from the user's
//! browser after they sign in on the website.
//!
//! # Architecture
//!
//! ```text
//! AuthManager
//! ├── Authenticator   (CallbackServer, or a static double in tests)
//! ├── BrowserOpener   (SystemBrowser, or RecordingBrowser in tests)
//! └── Session         (token + machine id, from pfw-store)
//! ```

pub mod authenticator;
pub mod browser;
pub mod callback;
pub mod error;
pub mod manager;

pub use authenticator::{Authenticator, StaticAuthenticator};
pub use browser::{BrowserOpener, RecordingBrowser, SystemBrowser};
pub use callback::{CALLBACK_PATH, CallbackServer, DEFAULT_STARTUP_TIMEOUT, DEFAULT_WAIT_TIMEOUT};
pub use error::{AuthError, Result};
pub use manager::{AuthManager, LoginOutcome, authorization_url};
