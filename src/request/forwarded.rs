//! Client address recovery from `X-Forwarded-*` chains.
//!
//! # Responsibilities
//! - Pick the hop the configured trust depth points at
//! - Validate it as a literal IP address
//! - Apply the matching `X-Forwarded-Proto` hop only after that succeeds
//!
//! # Design Decisions
//! - Two steps: `select` validates and returns a candidate, `apply` only
//!   ever sees a validated candidate, so nothing is half-applied
//! - Literal addresses only; a hostname would need a blocking lookup
//! - Anomalies are never errors: the request keeps the transport-observed
//!   address and scheme, and the rejection is logged and counted

use std::net::IpAddr;

use crate::observability::metrics;

/// Client address and scheme of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub ip: IpAddr,
    pub is_https: bool,
}

/// A validated forwarded hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardedCandidate {
    pub ip: IpAddr,
    /// `None` when the proto header is absent or its hop is neither
    /// `http` nor `https`.
    pub is_https: Option<bool>,
}

/// Why a chain was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Disabled,
    MissingHeader,
    InvalidAddress,
}

impl Rejection {
    fn as_str(self) -> &'static str {
        match self {
            Rejection::Disabled => "disabled",
            Rejection::MissingHeader => "missing_header",
            Rejection::InvalidAddress => "invalid_address",
        }
    }
}

/// The `depth`-th comma-separated token from the right, trimmed.
///
/// Clamped to the leftmost token when the chain is shorter than `depth`.
/// `depth` must be at least 1.
pub fn pick(chain: &str, depth: u32) -> &str {
    debug_assert!(depth >= 1);
    let mut remaining = depth;
    let mut end = chain.len();
    loop {
        match chain[..end].rfind(',') {
            Some(comma) if remaining > 1 => {
                remaining -= 1;
                end = comma;
            }
            Some(comma) => return chain[comma + 1..end].trim(),
            None => return chain[..end].trim(),
        }
    }
}

/// Select and validate the trusted hop.
pub fn select(
    trust_depth: u32,
    forwarded_for: Option<&str>,
    forwarded_proto: Option<&str>,
) -> Result<ForwardedCandidate, Rejection> {
    if trust_depth == 0 {
        return Err(Rejection::Disabled);
    }
    let forwarded_for = forwarded_for.ok_or(Rejection::MissingHeader)?;
    let ip: IpAddr = pick(forwarded_for, trust_depth)
        .parse()
        .map_err(|_| Rejection::InvalidAddress)?;

    let is_https = forwarded_proto.and_then(|chain| {
        let proto = pick(chain, trust_depth);
        if proto.eq_ignore_ascii_case("https") {
            Some(true)
        } else if proto.eq_ignore_ascii_case("http") {
            Some(false)
        } else {
            None
        }
    });

    Ok(ForwardedCandidate { ip, is_https })
}

/// Overlay a validated candidate on the transport-observed origin.
pub fn apply(origin: Origin, candidate: ForwardedCandidate) -> Origin {
    Origin {
        ip: candidate.ip,
        is_https: candidate.is_https.unwrap_or(origin.is_https),
    }
}

/// Resolve the effective origin, falling back to `origin` on any anomaly.
pub fn resolve(
    origin: Origin,
    trust_depth: u32,
    forwarded_for: Option<&str>,
    forwarded_proto: Option<&str>,
) -> Origin {
    match select(trust_depth, forwarded_for, forwarded_proto) {
        Ok(candidate) => {
            metrics::record_forwarded_applied();
            let resolved = apply(origin, candidate);
            tracing::trace!(
                peer = %origin.ip,
                client = %resolved.ip,
                https = resolved.is_https,
                "Applied forwarded chain"
            );
            resolved
        }
        Err(Rejection::Disabled) => origin,
        Err(reason) => {
            metrics::record_forwarded_rejected(reason.as_str());
            tracing::debug!(
                peer = %origin.ip,
                reason = reason.as_str(),
                forwarded_for = ?forwarded_for,
                "Ignoring forwarded chain"
            );
            origin
        }
    }
}
