//! Admin query and refund bodies.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::service::AdminQuery;

/// Search and date range for admin lists and exports.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminListParams {
    /// Case-insensitive search text.
    pub q: Option<String>,
    /// Lower bound, RFC 3339 or `YYYY-MM-DD`.
    pub from: Option<String>,
    /// Upper bound, RFC 3339 or `YYYY-MM-DD`.
    pub to: Option<String>,
}

impl From<AdminListParams> for AdminQuery {
    fn from(params: AdminListParams) -> Self {
        Self {
            q: params.q,
            from: params.from,
            to: params.to,
        }
    }
}

/// Request body for `POST /admin/refund`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefundBody {
    /// Deposit to refund.
    pub deposit_id: String,
    /// Partial amount in minor units; full refund when absent.
    #[serde(default)]
    pub amount_cents: Option<i64>,
}
