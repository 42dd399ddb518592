//! Request/response DTOs for the REST API.

pub mod common_dto;
pub mod request_dto;
pub mod user_dto;

pub use common_dto::{PaginationMeta, PaginationParams};
pub use request_dto::{
    DashboardResponse, DecisionResponse, KindPanel, RequestDetailResponse, RequestListResponse,
    RequestStatsResponse,
};
pub use user_dto::{AdjustFundsRequest, NotificationListResponse, UserListResponse};
