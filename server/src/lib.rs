//! Websocket front end for [`chem_index`]
//!
//! A single hyper server upgrades requests on [`service::WEBSOCKET_PATH`] to websockets speaking
//! the command protocol and serves the map client's static files on every other path.
pub mod assets;
pub mod connection;
pub mod error;
pub mod service;
pub mod settings;
