//! Municipal service categories.

use serde::{Deserialize, Serialize};

/// Service area a question or document belongs to.
///
/// # Examples
///
/// ```
/// use civic_core::ServiceCategory;
/// use std::str::FromStr;
///
/// assert_eq!(ServiceCategory::CashAssistance.as_ref(), "cash_assistance");
/// assert_eq!(ServiceCategory::from_str("snap").unwrap(), ServiceCategory::Snap);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServiceCategory {
    /// Unemployment insurance
    Unemployment,
    /// Supplemental Nutrition Assistance Program
    Snap,
    /// Medicaid health coverage
    Medicaid,
    /// Cash assistance programs
    CashAssistance,
    /// Child care subsidies
    Childcare,
    /// Nothing more specific matched
    General,
}
