//! Traffic categories and route classification for rate limiting.
//!
//! Every request is sorted into exactly one [`RateCategory`] before the
//! limiter consults its counters. Classification is first-match-wins:
//!
//! 1. Explicit path prefixes per category (e.g. `/api/financeiro` → financial)
//! 2. Keyword substrings in the lowercased path (e.g. `pagamento` → financial)
//! 3. HTTP method default: GET/HEAD → read, POST/PUT/PATCH/DELETE → write,
//!    anything else → general
//!
//! Static assets (by file extension) are recognized separately via
//! [`is_static_asset`] and bypass rate limiting entirely.

use axum::http::Method;
use std::collections::HashMap;

/// Traffic category a request is accounted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateCategory {
    Auth,
    Financial,
    Upload,
    Write,
    Read,
    Reports,
    Public,
    General,
}

impl RateCategory {
    /// Lowercase wire name, used in counter keys and rejection bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Financial => "financial",
            Self::Upload => "upload",
            Self::Write => "write",
            Self::Read => "read",
            Self::Reports => "reports",
            Self::Public => "public",
            Self::General => "general",
        }
    }

    /// All categories, for building limit tables.
    pub fn all() -> [RateCategory; 8] {
        [
            Self::Auth,
            Self::Financial,
            Self::Upload,
            Self::Write,
            Self::Read,
            Self::Reports,
            Self::Public,
            Self::General,
        ]
    }
}

impl std::fmt::Display for RateCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-window budget for one category.
#[derive(Debug, Clone, Copy)]
pub struct CategoryLimit {
    pub window_ms: u64,
    pub max: u64,
    /// Human-readable text included in 429 bodies.
    pub message: &'static str,
}

const MINUTE_MS: u64 = 60_000;

/// Default per-category budgets.
///
/// Auth is deliberately tight (brute-force guard); read traffic gets the
/// widest budget. Deployments can override individual categories through
/// `RateLimiter::with_limits`.
pub fn default_limits() -> HashMap<RateCategory, CategoryLimit> {
    let mut limits = HashMap::new();

    limits.insert(
        RateCategory::Auth,
        CategoryLimit {
            window_ms: 15 * MINUTE_MS,
            max: 10,
            message: "Too many authentication attempts. Wait 15 minutes.",
        },
    );
    limits.insert(
        RateCategory::Financial,
        CategoryLimit {
            window_ms: MINUTE_MS,
            max: 30,
            message: "Financial API request limit exceeded. Wait 1 minute.",
        },
    );
    limits.insert(
        RateCategory::Upload,
        CategoryLimit {
            window_ms: MINUTE_MS,
            max: 10,
            message: "Upload limit exceeded. Wait 1 minute.",
        },
    );
    limits.insert(
        RateCategory::Write,
        CategoryLimit {
            window_ms: MINUTE_MS,
            max: 60,
            message: "Write request limit exceeded. Wait 1 minute.",
        },
    );
    limits.insert(
        RateCategory::Read,
        CategoryLimit {
            window_ms: MINUTE_MS,
            max: 500,
            message: "Read request limit exceeded. Wait 1 minute.",
        },
    );
    limits.insert(
        RateCategory::Reports,
        CategoryLimit {
            window_ms: 5 * MINUTE_MS,
            max: 10,
            message: "Report generation limit exceeded. Wait 5 minutes.",
        },
    );
    limits.insert(
        RateCategory::Public,
        CategoryLimit {
            window_ms: MINUTE_MS,
            max: 50,
            message: "Public endpoint limit exceeded. Wait 1 minute.",
        },
    );
    limits.insert(
        RateCategory::General,
        CategoryLimit {
            window_ms: MINUTE_MS,
            max: 300,
            message: "Request limit exceeded. Wait 1 minute.",
        },
    );

    limits
}

/// Path prefixes checked before keyword and method fallbacks.
const AUTH_PREFIXES: &[&str] = &[
    "/api/login",
    "/api/auth",
    "/api/usuarios/login",
    "/api/password",
];

const FINANCIAL_PREFIXES: &[&str] = &[
    "/api/financeiro",
    "/api/contas-pagar",
    "/api/contas-receber",
    "/api/fluxo-caixa",
    "/api/dre",
    "/api/balanco",
    "/api/pagamentos",
];

const UPLOAD_PREFIXES: &[&str] = &["/api/upload", "/api/anexos", "/api/arquivos", "/api/importar"];

const REPORTS_PREFIXES: &[&str] = &[
    "/api/relatorios",
    "/api/exportar",
    "/api/export",
    "/api/report",
    "/api/pdf",
];

const PUBLIC_PREFIXES: &[&str] = &["/api/webhook", "/api/public", "/api/callback"];

const FINANCIAL_KEYWORDS: &[&str] = &[
    "financeiro",
    "pagamento",
    "nfe",
    "fatura",
    "pagar",
    "receber",
];

const UPLOAD_KEYWORDS: &[&str] = &["upload", "file", "anexo", "import"];

/// File extensions that bypass rate limiting entirely.
const STATIC_EXTENSIONS: &[&str] = &[
    ".js", ".css", ".html", ".ico", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".woff", ".woff2",
    ".ttf", ".eot", ".webp", ".map",
];

/// Returns true for static-asset paths that skip rate limiting.
pub fn is_static_asset(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    STATIC_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Classifies a request path and method into a traffic category.
pub fn classify(path: &str, method: &Method) -> RateCategory {
    let lower = path.to_ascii_lowercase();

    if AUTH_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return RateCategory::Auth;
    }
    if FINANCIAL_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return RateCategory::Financial;
    }
    if UPLOAD_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return RateCategory::Upload;
    }
    if REPORTS_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return RateCategory::Reports;
    }
    if PUBLIC_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return RateCategory::Public;
    }

    if FINANCIAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return RateCategory::Financial;
    }
    if UPLOAD_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return RateCategory::Upload;
    }

    match *method {
        Method::GET | Method::HEAD => RateCategory::Read,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE => RateCategory::Write,
        _ => RateCategory::General,
    }
}
