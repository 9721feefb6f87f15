//! Client for the remote cinema API.
//!
//! This module owns the three collaborator contracts the booking flow
//! consumes: fetching a showtime, validating a coupon, and creating a
//! booking. Everything behind [`CinemaApi`] is server-owned; this side only
//! shapes requests, classifies failures, and decodes responses.

use crate::types::{
    Booking, BookingId, CinemaId, Money, MovieId, PaymentMethod, PromotionId, SeatId, Showtime,
    ShowtimeId,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Result alias for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Structured rejection codes the API can return.
///
/// `SeatsTaken` is the conflict case: another customer booked one of the
/// requested seats between selection and submission. It is the only
/// rejection that forces the user back to seat selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCode {
    /// Coupon code does not exist.
    CouponNotFound,
    /// Coupon exists but has expired.
    CouponExpired,
    /// Coupon is not valid for this movie/cinema/amount.
    CouponIneligible,
    /// One or more requested seats were booked concurrently.
    SeatsTaken,
    /// Any other structured rejection.
    #[default]
    #[serde(other)]
    Other,
}

/// Error taxonomy for API calls.
///
/// `Rejected` is a definitive answer from the service (user-correctable);
/// `Transient` covers network and server failures (retryable). Neither is
/// fatal to the flow that issued the call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The service understood and refused the request.
    #[error("{message}")]
    Rejected {
        /// Structured rejection code.
        code: RejectionCode,
        /// Human-readable message for inline display.
        message: String,
    },
    /// The request could not be completed; retrying may succeed.
    #[error("request failed: {message}")]
    Transient {
        /// Failure description.
        message: String,
    },
}

impl ApiError {
    /// Shorthand for a transient failure.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }
}

/// Request body for coupon validation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CouponCheckRequest {
    /// Trimmed coupon code.
    pub coupon_code: String,
    /// Subtotal the discount should be computed against.
    pub total_amount: Money,
    /// Movie context for eligibility rules.
    pub movie_id: MovieId,
    /// Cinema context for eligibility rules.
    pub cinema_id: CinemaId,
}

/// Successful coupon validation payload.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CouponCheckResponse {
    /// Validated discount amount.
    pub discount_amount: Money,
    /// Promotion rule that matched.
    pub promotion_id: PromotionId,
    /// Display name of the promotion.
    pub name: String,
}

/// Request body for booking creation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CreateBookingRequest {
    /// Showtime being booked.
    pub showtime_id: ShowtimeId,
    /// Seats to book.
    pub seats: Vec<SeatId>,
    /// Coupon code to apply server-side, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion_code: Option<String>,
    /// Selected payment method id.
    pub payment_method: PaymentMethod,
}

/// The remote cinema API consumed by the booking flow.
pub trait CinemaApi: Send + Sync {
    /// Fetch a showtime with its live seat availability.
    fn get_showtime(
        &self,
        id: &ShowtimeId,
    ) -> Pin<Box<dyn Future<Output = ApiResult<Showtime>> + Send>>;

    /// Validate a coupon against a subtotal and its movie/cinema context.
    fn check_coupon(
        &self,
        request: CouponCheckRequest,
    ) -> Pin<Box<dyn Future<Output = ApiResult<CouponCheckResponse>> + Send>>;

    /// Create a booking from a draft.
    fn create_booking(
        &self,
        request: CreateBookingRequest,
    ) -> Pin<Box<dyn Future<Output = ApiResult<Booking>> + Send>>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// Wire shape of a structured rejection body.
#[derive(Debug, Deserialize)]
struct RejectionBody {
    #[serde(default)]
    code: RejectionCode,
    message: Option<String>,
}

/// `CinemaApi` implementation over HTTP/JSON.
#[derive(Clone, Debug)]
pub struct HttpCinemaApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCinemaApi {
    /// Build a client against the given base URL with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transient`] if the underlying client cannot be
    /// constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::transient(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Classify and decode a response.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ApiError::transient(format!("malformed response body: {e}")));
        }

        if status.is_client_error() {
            let text = response.text().await.unwrap_or_default();
            let body: RejectionBody = serde_json::from_str(&text).unwrap_or(RejectionBody {
                code: RejectionCode::Other,
                message: None,
            });
            let message = body
                .message
                .unwrap_or_else(|| format!("request rejected with status {status}"));
            tracing::warn!(%status, code = ?body.code, "cinema api rejected request");
            return Err(ApiError::Rejected {
                code: body.code,
                message,
            });
        }

        tracing::warn!(%status, "cinema api server error");
        Err(ApiError::transient(format!("server error: {status}")))
    }
}

impl CinemaApi for HttpCinemaApi {
    fn get_showtime(
        &self,
        id: &ShowtimeId,
    ) -> Pin<Box<dyn Future<Output = ApiResult<Showtime>> + Send>> {
        let client = self.client.clone();
        let url = format!("{}/showtimes/{}", self.base_url, id.as_str());
        Box::pin(async move {
            tracing::debug!(%url, "fetching showtime");
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| ApiError::transient(e.to_string()))?;
            Self::decode(response).await
        })
    }

    fn check_coupon(
        &self,
        request: CouponCheckRequest,
    ) -> Pin<Box<dyn Future<Output = ApiResult<CouponCheckResponse>> + Send>> {
        let client = self.client.clone();
        let url = format!("{}/promotions/check", self.base_url);
        Box::pin(async move {
            tracing::debug!(coupon = %request.coupon_code, "validating coupon");
            let response = client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| ApiError::transient(e.to_string()))?;
            Self::decode(response).await
        })
    }

    fn create_booking(
        &self,
        request: CreateBookingRequest,
    ) -> Pin<Box<dyn Future<Output = ApiResult<Booking>> + Send>> {
        let client = self.client.clone();
        let url = format!("{}/bookings", self.base_url);
        Box::pin(async move {
            tracing::info!(
                showtime = %request.showtime_id,
                seats = request.seats.len(),
                "creating booking"
            );
            let response = client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| ApiError::transient(e.to_string()))?;
            Self::decode(response).await
        })
    }
}

// ============================================================================
// Mock implementation (development and tests)
// ============================================================================

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scriptable in-memory `CinemaApi` for development and tests.
///
/// Showtimes and coupon outcomes are registered up front; booking outcomes
/// can be scripted per call, with a successful fabricated booking as the
/// default. Every booking request is recorded for inspection.
#[derive(Debug, Default)]
pub struct MockCinemaApi {
    showtimes: Mutex<HashMap<ShowtimeId, Showtime>>,
    coupons: Mutex<HashMap<String, ApiResult<CouponCheckResponse>>>,
    booking_results: Mutex<Vec<ApiResult<Booking>>>,
    booking_requests: Mutex<Vec<CreateBookingRequest>>,
}

impl MockCinemaApi {
    /// Create an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a showtime, replacing any previous one with the same id.
    #[must_use]
    pub fn with_showtime(self, showtime: Showtime) -> Self {
        lock(&self.showtimes).insert(showtime.id.clone(), showtime);
        self
    }

    /// Register the outcome for a coupon code.
    #[must_use]
    pub fn with_coupon(self, code: impl Into<String>, result: ApiResult<CouponCheckResponse>) -> Self {
        lock(&self.coupons).insert(code.into(), result);
        self
    }

    /// Queue the outcome of the next unscripted booking call (FIFO).
    pub fn push_booking_result(&self, result: ApiResult<Booking>) {
        lock(&self.booking_results).push(result);
    }

    /// Booking requests received so far.
    #[must_use]
    pub fn booking_requests(&self) -> Vec<CreateBookingRequest> {
        lock(&self.booking_requests).clone()
    }

    /// Wrap in an `Arc` for sharing with environments.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl CinemaApi for MockCinemaApi {
    fn get_showtime(
        &self,
        id: &ShowtimeId,
    ) -> Pin<Box<dyn Future<Output = ApiResult<Showtime>> + Send>> {
        let result = lock(&self.showtimes).get(id).cloned().ok_or_else(|| {
            ApiError::Rejected {
                code: RejectionCode::Other,
                message: format!("showtime {id} not found"),
            }
        });
        Box::pin(async move { result })
    }

    fn check_coupon(
        &self,
        request: CouponCheckRequest,
    ) -> Pin<Box<dyn Future<Output = ApiResult<CouponCheckResponse>> + Send>> {
        let result = lock(&self.coupons)
            .get(&request.coupon_code)
            .cloned()
            .unwrap_or_else(|| {
                Err(ApiError::Rejected {
                    code: RejectionCode::CouponNotFound,
                    message: format!("coupon {:?} not found", request.coupon_code),
                })
            });
        Box::pin(async move { result })
    }

    fn create_booking(
        &self,
        request: CreateBookingRequest,
    ) -> Pin<Box<dyn Future<Output = ApiResult<Booking>> + Send>> {
        lock(&self.booking_requests).push(request.clone());

        let scripted = {
            let mut results = lock(&self.booking_results);
            if results.is_empty() {
                None
            } else {
                Some(results.remove(0))
            }
        };

        let result = scripted.unwrap_or_else(|| {
            // Default: fabricate a successful booking at full price.
            let unit_price = lock(&self.showtimes)
                .get(&request.showtime_id)
                .map_or(Money::ZERO, Showtime::unit_price);
            let seat_count = u32::try_from(request.seats.len()).unwrap_or(u32::MAX);
            Ok(Booking {
                id: BookingId::new(format!("bk_{}", uuid::Uuid::new_v4())),
                showtime_id: request.showtime_id.clone(),
                seats: request.seats.clone(),
                total: unit_price.saturating_mul(seat_count),
                created_at: chrono::Utc::now(),
            })
        });

        Box::pin(async move { result })
    }
}
