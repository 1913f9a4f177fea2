//! # Repair-Ticket Lifecycle
//!
//! ```text
//! ┌──────────────┐   advance    ┌──────────────┐   advance    ┌──────────────┐
//! │ SIN_ARREGLAR │ ───────────► │  ARREGLADO   │ ───────────► │  ENTREGADO   │
//! │              │              │ repaired_at  │              │ delivered_at │
//! └──────────────┘              └──────────────┘              └──────────────┘
//! ```
//!
//! States only move forward, one step at a time. Skipping a step, moving
//! backwards or re-entering the current state is rejected.

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, CoreResult};
use crate::types::{Receipt, ReceiptState};

/// Estimated delivery used when a new ticket does not specify one.
pub const DEFAULT_DELIVERY_DAYS: i64 = 1;

impl ReceiptState {
    /// The state that follows this one, or `None` for ENTREGADO.
    pub fn next(&self) -> Option<ReceiptState> {
        match self {
            ReceiptState::SinArreglar => Some(ReceiptState::Arreglado),
            ReceiptState::Arreglado => Some(ReceiptState::Entregado),
            ReceiptState::Entregado => None,
        }
    }

    pub fn can_advance_to(&self, target: ReceiptState) -> bool {
        self.next() == Some(target)
    }

    pub fn is_final(&self) -> bool {
        self.next().is_none()
    }
}

impl Receipt {
    /// Moves the ticket to `target`, stamping the matching timestamp.
    ///
    /// ```rust
    /// # use celumax_core::{Receipt, ReceiptState};
    /// # use chrono::Utc;
    /// # let now = Utc::now();
    /// # let mut receipt = Receipt {
    /// #     id: "r".into(), client_name: "Ana".into(), client_phone: String::new(),
    /// #     client_id: String::new(), device_reference: "A10".into(),
    /// #     procedure: "Pin de carga".into(), device_password: None,
    /// #     price_cents: 0, deposit_cents: 0, registered_at: now,
    /// #     estimated_delivery_at: now, state: ReceiptState::SinArreglar,
    /// #     repaired_at: None, delivered_at: None,
    /// # };
    /// receipt.advance(ReceiptState::Arreglado, now).unwrap();
    /// assert_eq!(receipt.repaired_at, Some(now));
    /// assert!(receipt.advance(ReceiptState::SinArreglar, now).is_err());
    /// ```
    pub fn advance(&mut self, target: ReceiptState, now: DateTime<Utc>) -> CoreResult<()> {
        if !self.state.can_advance_to(target) {
            return Err(CoreError::InvalidStateTransition {
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }

        match target {
            ReceiptState::Arreglado => self.repaired_at = Some(now),
            ReceiptState::Entregado => self.delivered_at = Some(now),
            ReceiptState::SinArreglar => {}
        }
        self.state = target;
        Ok(())
    }
}

/// Delivery estimate for a ticket registered at `registered_at`.
pub fn default_delivery(registered_at: DateTime<Utc>) -> DateTime<Utc> {
    registered_at + Duration::days(DEFAULT_DELIVERY_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt() -> Receipt {
        let now = Utc::now();
        Receipt {
            id: "r1".to_string(),
            client_name: "Luis".to_string(),
            client_phone: "3001234567".to_string(),
            client_id: "1020".to_string(),
            device_reference: "iPhone 11".to_string(),
            procedure: "Cambio de batería".to_string(),
            device_password: Some("1234".to_string()),
            price_cents: 150_000,
            deposit_cents: 50_000,
            registered_at: now,
            estimated_delivery_at: default_delivery(now),
            state: ReceiptState::SinArreglar,
            repaired_at: None,
            delivered_at: None,
        }
    }

    #[test]
    fn test_next_chain() {
        assert_eq!(ReceiptState::SinArreglar.next(), Some(ReceiptState::Arreglado));
        assert_eq!(ReceiptState::Arreglado.next(), Some(ReceiptState::Entregado));
        assert_eq!(ReceiptState::Entregado.next(), None);
        assert!(ReceiptState::Entregado.is_final());
    }

    #[test]
    fn test_full_lifecycle_stamps_dates() {
        let mut r = receipt();
        let repaired = Utc::now();
        r.advance(ReceiptState::Arreglado, repaired).unwrap();
        assert_eq!(r.state, ReceiptState::Arreglado);
        assert_eq!(r.repaired_at, Some(repaired));
        assert_eq!(r.delivered_at, None);

        let delivered = repaired + Duration::hours(3);
        r.advance(ReceiptState::Entregado, delivered).unwrap();
        assert_eq!(r.state, ReceiptState::Entregado);
        assert_eq!(r.repaired_at, Some(repaired));
        assert_eq!(r.delivered_at, Some(delivered));
    }

    #[test]
    fn test_state_only_moves_forward() {
        let all = [
            ReceiptState::SinArreglar,
            ReceiptState::Arreglado,
            ReceiptState::Entregado,
        ];
        for from in all {
            for to in all {
                assert_eq!(from.can_advance_to(to), from.next() == Some(to));
                if from.can_advance_to(to) {
                    assert!(to > from);
                }
            }
        }
    }

    #[test]
    fn test_rejected_transitions_leave_receipt_untouched() {
        let mut r = receipt();
        let err = r.advance(ReceiptState::Entregado, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStateTransition { .. }));
        assert_eq!(r.state, ReceiptState::SinArreglar);
        assert_eq!(r.delivered_at, None);

        assert!(r.advance(ReceiptState::SinArreglar, Utc::now()).is_err());
    }
}
