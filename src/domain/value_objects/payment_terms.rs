//! # Payment Terms
//!
//! How the buyer intends to pay for a property.
//!
//! [`PaymentTerms`] is a closed tagged variant: cash offers carry nothing,
//! financed and mixed offers carry the financing details that only make
//! sense for them.
//!
//! # Examples
//!
//! ```
//! use offer_negotiation::domain::value_objects::payment_terms::{
//!     FinancingDetails, FinancingStatus, PaymentTerms,
//! };
//!
//! let terms = PaymentTerms::Financed(
//!     FinancingDetails::default()
//!         .with_status(FinancingStatus::PreApproved)
//!         .with_institution("First Mutual"),
//! );
//!
//! assert!(terms.validate().is_ok());
//! assert_eq!(terms.kind(), "financed");
//! ```

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::amount::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of the buyer's financing application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancingStatus {
    /// No lender contacted yet.
    NotStarted,
    /// Informal pre-qualification obtained.
    PreQualified,
    /// Lender pre-approval letter obtained.
    PreApproved,
    /// Financing fully approved.
    Approved,
}

impl fmt::Display for FinancingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::PreQualified => "pre_qualified",
            Self::PreApproved => "pre_approved",
            Self::Approved => "approved",
        };
        f.write_str(s)
    }
}

/// Financing details attached to non-cash offers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingDetails {
    /// Where the buyer is in the financing process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financing_status: Option<FinancingStatus>,
    /// Amount the lender has pre-approved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_approval_amount: Option<Amount>,
    /// Name of the lending institution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financing_institution: Option<String>,
}

impl FinancingDetails {
    /// Sets the financing status.
    #[must_use]
    pub fn with_status(mut self, status: FinancingStatus) -> Self {
        self.financing_status = Some(status);
        self
    }

    /// Sets the pre-approved amount.
    #[must_use]
    pub fn with_pre_approval(mut self, amount: Amount) -> Self {
        self.pre_approval_amount = Some(amount);
        self
    }

    /// Sets the lending institution.
    #[must_use]
    pub fn with_institution(mut self, institution: impl Into<String>) -> Self {
        self.financing_institution = Some(institution.into());
        self
    }

    fn validate(&self) -> DomainResult<()> {
        if let Some(institution) = &self.financing_institution
            && institution.trim().is_empty()
        {
            return Err(DomainError::invalid_terms(
                "financing institution must not be blank",
            ));
        }
        Ok(())
    }
}

/// Payment terms of an offer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "payment_type", rename_all = "snake_case")]
pub enum PaymentTerms {
    /// All-cash purchase.
    #[default]
    Cash,
    /// Fully financed purchase.
    Financed(FinancingDetails),
    /// Part cash, part financed.
    CashPlusFinanced(FinancingDetails),
}

impl PaymentTerms {
    /// Returns the wire name of the payment type.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Financed(_) => "financed",
            Self::CashPlusFinanced(_) => "cash_plus_financed",
        }
    }

    /// Returns the financing details for non-cash terms.
    #[must_use]
    pub fn financing(&self) -> Option<&FinancingDetails> {
        match self {
            Self::Cash => None,
            Self::Financed(details) | Self::CashPlusFinanced(details) => Some(details),
        }
    }

    /// Validates the terms.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTerms` if financing details are malformed.
    pub fn validate(&self) -> DomainResult<()> {
        match self.financing() {
            Some(details) => details.validate(),
            None => Ok(()),
        }
    }
}

impl fmt::Display for PaymentTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cash_has_no_financing() {
        assert!(PaymentTerms::Cash.financing().is_none());
        assert!(PaymentTerms::Cash.validate().is_ok());
    }

    #[test]
    fn blank_institution_is_rejected() {
        let terms =
            PaymentTerms::CashPlusFinanced(FinancingDetails::default().with_institution("  "));
        assert!(matches!(
            terms.validate(),
            Err(DomainError::InvalidTerms(_))
        ));
    }

    #[test]
    fn serde_is_tagged_by_payment_type() {
        let terms = PaymentTerms::Financed(
            FinancingDetails::default()
                .with_status(FinancingStatus::PreApproved)
                .with_pre_approval(Amount::from_units(300_000).unwrap()),
        );
        let json = serde_json::to_value(&terms).unwrap();
        assert_eq!(json["payment_type"], "financed");
        assert_eq!(json["financing_status"], "pre_approved");

        let back: PaymentTerms = serde_json::from_value(json).unwrap();
        assert_eq!(back, terms);
    }

    #[test]
    fn cash_deserializes_from_bare_tag() {
        let terms: PaymentTerms =
            serde_json::from_str(r#"{"payment_type":"cash"}"#).unwrap();
        assert_eq!(terms, PaymentTerms::Cash);
    }

    #[test]
    fn non_positive_pre_approval_fails_to_deserialize() {
        let result: Result<PaymentTerms, _> = serde_json::from_str(
            r#"{"payment_type":"financed","pre_approval_amount":"0"}"#,
        );
        assert!(result.is_err());
    }
}
