//! Tiered per-client-IP rate limiting.
//!
//! Three independent budgets: a general tier covering every API route, a
//! stricter auth tier layered on the login route, and an upload tier layered
//! on track creation. A request must pass every tier that wraps its route.
//! Counters are in-memory and per-process.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter,
};
use nonzero_ext::nonzero;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::{
    error::{AppError, Result},
    state::AppState,
};

type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

const GENERAL_WINDOW: Duration = Duration::from_secs(15 * 60);
const AUTH_WINDOW: Duration = Duration::from_secs(15 * 60);
const UPLOAD_WINDOW: Duration = Duration::from_secs(60 * 60);

/// The three per-IP limiters, one per tier.
pub struct RateTiers {
    general: IpLimiter,
    auth: IpLimiter,
    upload: IpLimiter,
}

impl RateTiers {
    pub fn new() -> Self {
        Self {
            // 100 requests per 15 minutes for all API routes
            general: RateLimiter::keyed(tier_quota(nonzero!(100u32), GENERAL_WINDOW)),
            // 5 login attempts per 15 minutes
            auth: RateLimiter::keyed(tier_quota(nonzero!(5u32), AUTH_WINDOW)),
            // 20 uploads per hour
            upload: RateLimiter::keyed(tier_quota(nonzero!(20u32), UPLOAD_WINDOW)),
        }
    }

    pub fn check_general(&self, client_ip: &str) -> Result<()> {
        if self.general.check_key(&client_ip.to_string()).is_err() {
            return Err(AppError::RateLimited(
                "Too many requests from this IP, please try again later.".to_string(),
            ));
        }
        Ok(())
    }

    pub fn check_auth(&self, client_ip: &str) -> Result<()> {
        if self.auth.check_key(&client_ip.to_string()).is_err() {
            return Err(AppError::RateLimited(
                "Too many login attempts, please try again later.".to_string(),
            ));
        }
        Ok(())
    }

    pub fn check_upload(&self, client_ip: &str) -> Result<()> {
        if self.upload.check_key(&client_ip.to_string()).is_err() {
            return Err(AppError::RateLimited(
                "Too many uploads, please try again later.".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RateTiers {
    fn default() -> Self {
        Self::new()
    }
}

/// Governor models a budget as a burst allowance replenished one cell per
/// `window / budget`: a client may spend its full budget at once, then is
/// rejected until cells replenish.
fn tier_quota(budget: NonZeroU32, window: Duration) -> Quota {
    Quota::with_period(window / budget.get())
        .expect("tier window must be nonzero")
        .allow_burst(budget)
}

/// Resolve the client address for rate-limit keying.
///
/// Prefers the first `X-Forwarded-For` hop (the service is expected to run
/// behind a reverse proxy), falling back to the socket peer address.
pub fn client_ip(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn general_tier(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    state.limiter.check_general(&client_ip(&req))?;
    Ok(next.run(req).await)
}

pub async fn auth_tier(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    state.limiter.check_auth(&client_ip(&req))?;
    Ok(next.run(req).await)
}

pub async fn upload_tier(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    state.limiter.check_upload(&client_ip(&req))?;
    Ok(next.run(req).await)
}
