//! Shared query parameter types.

use serde::Deserialize;

/// `?limit=&offset=`. Clamped with `clamp_limit` / `clamp_offset`.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
