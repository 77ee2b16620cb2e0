pub mod auth;
pub mod comments;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod health;
pub mod likes;
pub mod media;
pub mod middleware;
pub mod password;
pub mod response;
pub mod routes;
pub mod state;
pub mod subscriptions;
pub mod tokens;
pub mod tweets;
pub mod upload;
pub mod users;
pub mod videos;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
