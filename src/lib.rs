pub mod access_log;
pub mod actor;
pub mod approval;
pub mod comments;
pub mod config;
pub mod db;
pub mod drawings;
pub mod enums;
pub mod error;
pub mod models;
pub mod numbering;
pub mod revisions;
pub mod routes;
pub mod schema;
pub mod state;
pub mod supersession;
pub mod transmittals;
