//! Success envelopes. Failures are shaped by [`crate::error::AppError`].

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub message: &'static str,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: &'static str) -> Self {
        Self {
            success: true,
            data,
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
    pub message: &'static str,
}

impl<T> PageResponse<T> {
    /// `page` is `skip / limit + 1`, which only lines up with real pages when
    /// `skip` is a multiple of `limit`. Saturates at `i64::MAX`.
    pub fn new(data: Vec<T>, total: i64, skip: i64, limit: i64, message: &'static str) -> Self {
        Self {
            success: true,
            data,
            total,
            page: (skip / limit.max(1)).saturating_add(1),
            size: limit,
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

impl MessageResponse {
    pub fn ok(message: &'static str) -> Self {
        Self {
            success: true,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_number_from_skip_and_limit() {
        assert_eq!(PageResponse::<()>::new(vec![], 0, 0, 10, "").page, 1);
        assert_eq!(PageResponse::<()>::new(vec![], 0, 10, 10, "").page, 2);
        assert_eq!(PageResponse::<()>::new(vec![], 0, 25, 10, "").page, 3);
    }

    #[test]
    fn page_number_saturates_on_huge_skip() {
        let page = PageResponse::<()>::new(vec![], 0, i64::MAX, 1, "").page;
        assert_eq!(page, i64::MAX);
    }

    #[test]
    fn envelope_serializes_success_flag() {
        let json = serde_json::to_value(ApiResponse::ok(1, "done")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 1);
        assert_eq!(json["message"], "done");
    }
}
