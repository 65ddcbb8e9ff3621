//! # berth-client
//!
//! The ready-to-use client crate of the Berth SDK: wires the session
//! core from `berth-auth` to a `reqwest`-backed transport and exposes a
//! builder for configuring one client per backend app.
//!
//! ```no_run
//! # async fn example() -> berth_core::Result<()> {
//! use berth_auth::Credential;
//! use berth_client::AppClient;
//!
//! let client = AppClient::builder("my-app-id", "https://services.example.com")
//!     .build()
//!     .await?;
//! let user = client.login_with_credential(&Credential::Anonymous).await?;
//! println!("logged in as {}", user.id);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod app;
pub mod transport;

pub use app::{AppClient, AppClientBuilder};
pub use transport::ReqwestTransport;
