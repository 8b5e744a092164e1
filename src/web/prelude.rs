pub(crate) use crate::error::FitroomError;
pub(crate) use crate::web::AppState;
pub(crate) use axum::Json;
pub(crate) use axum::extract::{Path, State};
pub(crate) use serde::{Deserialize, Serialize};
pub(crate) use tracing::info;
