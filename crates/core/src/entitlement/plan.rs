//! Subscription plans and term arithmetic.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Days granted by a monthly term.
pub const MONTHLY_TERM_DAYS: i64 = 30;
/// Days granted by a yearly term.
pub const YEARLY_TERM_DAYS: i64 = 365;
/// Days granted when the plan cannot be recognised.
pub const FALLBACK_TERM_DAYS: i64 = MONTHLY_TERM_DAYS;

/// Billing period of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingPeriod {
    /// 30-day term.
    Monthly,
    /// 365-day term.
    Yearly,
}

impl BillingPeriod {
    /// Length of one term.
    #[must_use]
    pub fn term(&self) -> Duration {
        match self {
            Self::Monthly => Duration::days(MONTHLY_TERM_DAYS),
            Self::Yearly => Duration::days(YEARLY_TERM_DAYS),
        }
    }
}

/// Who a plan covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanScope {
    /// Only the paying principal.
    Individual,
    /// The payer's whole company.
    Company,
}

/// A catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Stable identifier sent by clients.
    pub id: &'static str,
    /// Billing period.
    pub period: BillingPeriod,
    /// Coverage.
    pub scope: PlanScope,
    /// List price in the default currency.
    pub list_price: Decimal,
}

/// Plans offered at checkout.
pub const CATALOGUE: [Plan; 4] = [
    Plan {
        id: "individual_monthly",
        period: BillingPeriod::Monthly,
        scope: PlanScope::Individual,
        list_price: Decimal::from_parts(5_000, 0, 0, false, 0),
    },
    Plan {
        id: "individual_yearly",
        period: BillingPeriod::Yearly,
        scope: PlanScope::Individual,
        list_price: Decimal::from_parts(50_000, 0, 0, false, 0),
    },
    Plan {
        id: "company_monthly",
        period: BillingPeriod::Monthly,
        scope: PlanScope::Company,
        list_price: Decimal::from_parts(20_000, 0, 0, false, 0),
    },
    Plan {
        id: "company_yearly",
        period: BillingPeriod::Yearly,
        scope: PlanScope::Company,
        list_price: Decimal::from_parts(200_000, 0, 0, false, 0),
    },
];

/// Looks up a catalogue plan by id (case-insensitive).
#[must_use]
pub fn find_plan(plan_id: &str) -> Option<&'static Plan> {
    let plan_id = plan_id.trim();
    CATALOGUE.iter().find(|p| p.id.eq_ignore_ascii_case(plan_id))
}

/// How a plan id is interpreted when granting entitlement.
///
/// Catalogue ids map exactly. Anything else is classified by keyword so that
/// legacy ids such as `Company-Annual` still land on the right term; ids with
/// no recognisable period get the fallback term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanTerms {
    /// Recognised period, if any.
    pub period: Option<BillingPeriod>,
    /// Coverage.
    pub scope: PlanScope,
}

impl PlanTerms {
    /// Classifies a plan id.
    #[must_use]
    pub fn classify(plan_id: &str) -> Self {
        if let Some(plan) = find_plan(plan_id) {
            return Self {
                period: Some(plan.period),
                scope: plan.scope,
            };
        }

        let id = plan_id.to_ascii_lowercase();
        let period = if id.contains("year") || id.contains("annual") {
            Some(BillingPeriod::Yearly)
        } else if id.contains("month") {
            Some(BillingPeriod::Monthly)
        } else {
            None
        };
        let scope = if id.contains("company") {
            PlanScope::Company
        } else {
            PlanScope::Individual
        };

        Self { period, scope }
    }

    /// Returns true if the plan covers a whole company.
    #[must_use]
    pub fn is_company(&self) -> bool {
        self.scope == PlanScope::Company
    }

    /// End of a term that starts at `start`.
    #[must_use]
    pub fn term_end(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        match self.period {
            Some(period) => start + period.term(),
            None => start + Duration::days(FALLBACK_TERM_DAYS),
        }
    }
}
