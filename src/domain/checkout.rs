//! Checkout flow: a linear `cart → shipping → payment` progression.
//!
//! Forward transitions are gated (non-empty cart, complete shipping details,
//! a selected shipping option); backward navigation to any earlier stage is
//! always allowed and never loses entered data. Submission is guarded against
//! re-entrance while the order/invoice round-trip is outstanding.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::domain::cascade::{Cascade, Level};
use crate::shipping::ShippingOption;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Cart,
    Shipping,
    Payment,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("no shipping option selected")]
    NoShippingOption,

    #[error("the selected shipping option is no longer available")]
    UnknownShippingOption,

    #[error("an order submission is already in progress")]
    SubmissionInFlight,

    #[error("submit is only allowed from the payment stage")]
    NotAtPaymentStage,

    #[error("can only navigate back to an earlier stage")]
    NotAnEarlierStage,
}

/// Customer contact and street-address fields of the shipping form. The
/// location fields live in the [`Cascade`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct ContactForm {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "a valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "phone number is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "street address is required"))]
    pub address: String,
    pub postal_code: Option<String>,
    pub notes: Option<String>,
}

/// Per-session checkout state. Lives in the in-process session map; dropped
/// after a successful submit.
#[derive(Clone, Debug, Default)]
pub struct CheckoutSession {
    stage: Stage,
    pub contact: ContactForm,
    pub cascade: Cascade,
    quotes: Vec<ShippingOption>,
    selected_option: Option<ShippingOption>,
    submitting: bool,
}

impl Default for Stage {
    fn default() -> Self {
        Stage::Cart
    }
}

impl CheckoutSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn quotes(&self) -> &[ShippingOption] {
        &self.quotes
    }

    pub fn selected_option(&self) -> Option<&ShippingOption> {
        self.selected_option.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Advances one stage forward, enforcing the gate for the transition.
    pub fn advance(&mut self, cart_is_empty: bool) -> Result<Stage, CheckoutError> {
        match self.stage {
            Stage::Cart => {
                if cart_is_empty {
                    return Err(CheckoutError::EmptyCart);
                }
                self.stage = Stage::Shipping;
            }
            Stage::Shipping => {
                self.ensure_ready_for_payment()?;
                self.stage = Stage::Payment;
            }
            Stage::Payment => {}
        }
        Ok(self.stage)
    }

    /// Navigates back to any earlier stage, keeping all entered data.
    pub fn back(&mut self, to: Stage) -> Result<Stage, CheckoutError> {
        if to >= self.stage {
            return Err(CheckoutError::NotAnEarlierStage);
        }
        self.stage = to;
        Ok(self.stage)
    }

    /// Validates everything the payment stage requires: the contact fields,
    /// a fully resolved destination, and a selected shipping option. The
    /// first failing field is reported by name.
    pub fn ensure_ready_for_payment(&self) -> Result<(), CheckoutError> {
        if let Err(errors) = self.contact.validate() {
            if let Some(err) = first_field_error(&errors) {
                return Err(err);
            }
        }
        for (level, field) in [
            (Level::Province, "province"),
            (Level::City, "city"),
            (Level::District, "district"),
            (Level::Subdistrict, "subdistrict"),
        ] {
            if self.cascade.selected(level).is_none() {
                return Err(CheckoutError::InvalidField {
                    field: field.to_string(),
                    message: "selection is required".to_string(),
                });
            }
        }
        if self.selected_option.is_none() {
            return Err(CheckoutError::NoShippingOption);
        }
        Ok(())
    }

    /// Replaces the quoted options. Invalidates the current selection if it
    /// no longer appears among the fresh quotes (destination or weight
    /// changed underneath it).
    pub fn set_quotes(&mut self, quotes: Vec<ShippingOption>) {
        if let Some(sel) = &self.selected_option {
            if !quotes
                .iter()
                .any(|q| q.courier == sel.courier && q.service == sel.service)
            {
                self.selected_option = None;
            }
        }
        self.quotes = quotes;
    }

    pub fn select_option(&mut self, courier: &str, service: &str) -> Result<(), CheckoutError> {
        let option = self
            .quotes
            .iter()
            .find(|q| q.courier == courier && q.service == service)
            .cloned()
            .ok_or(CheckoutError::UnknownShippingOption)?;
        self.selected_option = Some(option);
        Ok(())
    }

    /// Marks a submission as in flight. Must be called under the session
    /// lock before any order/invoice I/O starts; a second call before
    /// [`CheckoutSession::abort_submit`] (or session teardown) fails, which
    /// is what keeps a double click from creating two orders.
    pub fn begin_submit(&mut self) -> Result<(), CheckoutError> {
        if self.stage != Stage::Payment {
            return Err(CheckoutError::NotAtPaymentStage);
        }
        self.ensure_ready_for_payment()?;
        if self.submitting {
            return Err(CheckoutError::SubmissionInFlight);
        }
        self.submitting = true;
        Ok(())
    }

    /// Clears the in-flight flag after a failed submission so the customer
    /// can retry without losing any entered data.
    pub fn abort_submit(&mut self) {
        self.submitting = false;
    }

    /// Items plus the selected shipping cost.
    pub fn grand_total(&self, cart_total: i64) -> i64 {
        cart_total + self.selected_option.as_ref().map_or(0, |o| o.cost)
    }
}

/// Picks the failing field to report: the form's fields in display order
/// first, then any other failing field (alphabetically, for a stable choice)
/// so no validation error is ever swallowed.
fn first_field_error(errors: &validator::ValidationErrors) -> Option<CheckoutError> {
    let by_field = errors.field_errors();
    let ordered = ["name", "email", "phone", "address"];
    let extra = {
        let mut keys: Vec<&'static str> = by_field.keys().copied().collect();
        keys.sort_unstable();
        keys.into_iter().find(|k| !ordered.contains(k))
    };
    ordered.into_iter().chain(extra).find_map(|field| {
        by_field.get(field).map(|errs| {
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref())
                .map_or_else(|| "invalid value".to_string(), ToString::to_string);
            CheckoutError::InvalidField {
                field: field.to_string(),
                message,
            }
        })
    })
}
