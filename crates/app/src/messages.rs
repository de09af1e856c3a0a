//! Static user-facing messages.
//!
//! Only these two failures are surfaced to the user; every other error is
//! logged and swallowed.

/// Shown when the dashboard list cannot be fetched.
pub const DASHBOARD_LIST_LOAD_FAILED: &str = "대시보드를 불러오는데 실패했습니다.";

/// Shown when the store rejects the configured credentials.
pub const SIGN_IN_FAILED: &str = "로그인에 실패했습니다.";
