//! HTTP client for the Ferry chat history service.
//!
//! The service stores chats and answers user messages that no tool handles.
//! [`ChatClient`] talks to it over HTTP/JSON; callers that only need the
//! operations depend on the [`ChatService`] trait.
//!
//! | operation      | request                          |
//! |----------------|----------------------------------|
//! | `create_chat`  | `POST {base}/chats`              |
//! | `get_chat`     | `GET {base}/chats/{id}`          |
//! | `get_messages` | `GET {base}/chats/{id}/messages` |
//! | `send_message` | `POST {base}/chats/{id}/messages`|
//! | `delete_chat`  | `DELETE {base}/chats/{id}`       |

pub mod chat;
pub mod client;
pub mod error;
pub mod types;

pub use chat::ChatService;
pub use client::{ChatClient, ClientBuilder};
pub use error::{Error, Result};
pub use types::*;
