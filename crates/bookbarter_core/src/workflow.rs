//! crates/bookbarter_core/src/workflow.rs
//!
//! The rules connecting books, transactions, and exchange requests: listing
//! and purchase guards, exchange negotiation as an explicit state
//! transition, and the delete-or-archive decision. Handlers call into this
//! module before touching the store; the store re-checks the exchange
//! transition inside its own transaction so a concurrent response cannot
//! double-process a request.

use uuid::Uuid;

use crate::domain::{Book, BookStatus, ExchangeStatus};

/// A rule violation. The variant messages are user-visible and surface
/// verbatim in error responses.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorkflowError {
    #[error("A price greater than zero is required unless the book is exchange-only")]
    PriceRequired,

    #[error("Book is not available for purchase")]
    BookUnavailable,

    #[error("This book is for exchange only")]
    ExchangeOnly,

    #[error("You cannot buy your own book")]
    SelfPurchase,

    #[error("Requested book is not for exchange")]
    NotExchangeEligible,

    #[error("You can only offer your own books")]
    OfferedNotOwned,

    #[error("You cannot exchange with yourself")]
    SelfExchange,

    #[error("Exchange request is no longer pending (currently {0})")]
    AlreadyResolved(ExchangeStatus),

    #[error("Invalid status: {0}")]
    InvalidDecision(String),
}

/// Listing invariant: a book must carry a positive price unless it is
/// offered for exchange only.
pub fn validate_listing(price: f64, is_exchange_only: bool) -> Result<(), WorkflowError> {
    if !is_exchange_only && price <= 0.0 {
        return Err(WorkflowError::PriceRequired);
    }
    Ok(())
}

/// Purchase guards. Purchases never mutate the book: digital books remain
/// purchasable by any number of buyers, each purchase being an independent
/// access grant.
pub fn validate_purchase(book: &Book, buyer_id: Uuid) -> Result<(), WorkflowError> {
    if book.status == BookStatus::Deleted {
        return Err(WorkflowError::BookUnavailable);
    }
    if book.is_exchange_only {
        return Err(WorkflowError::ExchangeOnly);
    }
    if book.seller_id == buyer_id {
        return Err(WorkflowError::SelfPurchase);
    }
    Ok(())
}

/// Guards for proposing a trade of `offered` for `requested`.
pub fn validate_exchange_proposal(
    requested: &Book,
    offered: &Book,
    requester_id: Uuid,
) -> Result<(), WorkflowError> {
    if !requested.is_exchange_eligible() {
        return Err(WorkflowError::NotExchangeEligible);
    }
    if offered.seller_id != requester_id {
        return Err(WorkflowError::OfferedNotOwned);
    }
    if requested.seller_id == requester_id {
        return Err(WorkflowError::SelfExchange);
    }
    Ok(())
}

/// The owner's answer to a pending exchange request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeDecision {
    Accept,
    Reject,
}

impl ExchangeDecision {
    /// Parses the status string a client sends when responding to a
    /// request. Only the two terminal decisions are accepted; in
    /// particular `completed` cannot be requested directly.
    pub fn parse(s: &str) -> Result<Self, WorkflowError> {
        match s {
            "accepted" => Ok(ExchangeDecision::Accept),
            "rejected" => Ok(ExchangeDecision::Reject),
            other => Err(WorkflowError::InvalidDecision(other.to_string())),
        }
    }
}

impl ExchangeStatus {
    /// The transition function for exchange negotiation.
    ///
    /// Only `pending` requests can move; responding to a request that was
    /// already accepted, rejected, or completed fails with
    /// `AlreadyResolved` so a request can never be processed twice.
    pub fn respond(self, decision: ExchangeDecision) -> Result<ExchangeStatus, WorkflowError> {
        match self {
            ExchangeStatus::Pending => Ok(match decision {
                ExchangeDecision::Accept => ExchangeStatus::Accepted,
                ExchangeDecision::Reject => ExchangeStatus::Rejected,
            }),
            resolved => Err(WorkflowError::AlreadyResolved(resolved)),
        }
    }
}

/// What deleting a book should do, given how many transactions reference it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// No transactions reference the book: remove the row and its stored
    /// files entirely.
    HardDelete,
    /// At least one buyer holds the book through a transaction: keep the
    /// row, mark it `deleted`, and hide it from browsing.
    Archive,
}

pub fn plan_deletion(referencing_transactions: i64) -> DeletionOutcome {
    if referencing_transactions > 0 {
        DeletionOutcome::Archive
    } else {
        DeletionOutcome::HardDelete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn book(seller_id: Uuid, price: f64, is_exchange_only: bool) -> Book {
        Book {
            id: Uuid::new_v4(),
            title: "The Rust Programming Language".to_string(),
            author: "Steve Klabnik".to_string(),
            description: "A book about Rust".to_string(),
            seller_id,
            price,
            is_exchange_only,
            category: "programming".to_string(),
            pdf_path: "/uploads/books/trpl.pdf".to_string(),
            cover_path: None,
            status: BookStatus::Available,
            available_for_browse: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn listing_requires_price_or_exchange_flag() {
        assert_eq!(validate_listing(0.0, false), Err(WorkflowError::PriceRequired));
        assert_eq!(validate_listing(-1.0, false), Err(WorkflowError::PriceRequired));
        assert!(validate_listing(9.99, false).is_ok());
        assert!(validate_listing(0.0, true).is_ok());
    }

    #[test]
    fn purchase_of_available_book_by_another_user_passes() {
        let seller = Uuid::new_v4();
        let buyer = Uuid::new_v4();
        assert!(validate_purchase(&book(seller, 12.50, false), buyer).is_ok());
    }

    #[test]
    fn purchase_of_deleted_book_is_rejected() {
        let mut b = book(Uuid::new_v4(), 12.50, false);
        b.status = BookStatus::Deleted;
        assert_eq!(
            validate_purchase(&b, Uuid::new_v4()),
            Err(WorkflowError::BookUnavailable)
        );
    }

    #[test]
    fn purchase_of_exchange_only_book_is_rejected() {
        let b = book(Uuid::new_v4(), 0.0, true);
        assert_eq!(
            validate_purchase(&b, Uuid::new_v4()),
            Err(WorkflowError::ExchangeOnly)
        );
    }

    #[test]
    fn self_purchase_is_rejected() {
        let seller = Uuid::new_v4();
        let err = validate_purchase(&book(seller, 5.0, false), seller).unwrap_err();
        assert_eq!(err, WorkflowError::SelfPurchase);
        assert_eq!(err.to_string(), "You cannot buy your own book");
    }

    #[test]
    fn sold_book_remains_purchasable() {
        // Digital-good model: a prior sale does not take the listing off
        // the market.
        let mut b = book(Uuid::new_v4(), 5.0, false);
        b.status = BookStatus::Sold;
        assert!(validate_purchase(&b, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn exchange_proposal_for_eligible_book_passes() {
        let owner = Uuid::new_v4();
        let requester = Uuid::new_v4();
        let requested = book(owner, 0.0, true);
        let offered = book(requester, 8.0, false);
        assert!(validate_exchange_proposal(&requested, &offered, requester).is_ok());
    }

    #[test]
    fn zero_price_book_is_exchange_eligible_without_flag() {
        let owner = Uuid::new_v4();
        let requester = Uuid::new_v4();
        let requested = book(owner, 0.0, false);
        let offered = book(requester, 8.0, false);
        assert!(validate_exchange_proposal(&requested, &offered, requester).is_ok());
    }

    #[test]
    fn priced_book_is_not_exchange_eligible() {
        let requester = Uuid::new_v4();
        let requested = book(Uuid::new_v4(), 15.0, false);
        let offered = book(requester, 8.0, false);
        assert_eq!(
            validate_exchange_proposal(&requested, &offered, requester),
            Err(WorkflowError::NotExchangeEligible)
        );
    }

    #[test]
    fn offering_someone_elses_book_is_rejected() {
        let requester = Uuid::new_v4();
        let requested = book(Uuid::new_v4(), 0.0, true);
        let offered = book(Uuid::new_v4(), 8.0, false);
        assert_eq!(
            validate_exchange_proposal(&requested, &offered, requester),
            Err(WorkflowError::OfferedNotOwned)
        );
    }

    #[test]
    fn exchanging_with_yourself_is_rejected() {
        let requester = Uuid::new_v4();
        let requested = book(requester, 0.0, true);
        let offered = book(requester, 8.0, false);
        assert_eq!(
            validate_exchange_proposal(&requested, &offered, requester),
            Err(WorkflowError::SelfExchange)
        );
    }

    #[test]
    fn pending_request_can_be_accepted_or_rejected() {
        assert_eq!(
            ExchangeStatus::Pending.respond(ExchangeDecision::Accept),
            Ok(ExchangeStatus::Accepted)
        );
        assert_eq!(
            ExchangeStatus::Pending.respond(ExchangeDecision::Reject),
            Ok(ExchangeStatus::Rejected)
        );
    }

    #[test]
    fn resolved_requests_cannot_transition_again() {
        for resolved in [
            ExchangeStatus::Accepted,
            ExchangeStatus::Rejected,
            ExchangeStatus::Completed,
        ] {
            assert_eq!(
                resolved.respond(ExchangeDecision::Accept),
                Err(WorkflowError::AlreadyResolved(resolved))
            );
            assert_eq!(
                resolved.respond(ExchangeDecision::Reject),
                Err(WorkflowError::AlreadyResolved(resolved))
            );
        }
    }

    #[test]
    fn decision_parsing_accepts_only_terminal_answers() {
        assert_eq!(ExchangeDecision::parse("accepted"), Ok(ExchangeDecision::Accept));
        assert_eq!(ExchangeDecision::parse("rejected"), Ok(ExchangeDecision::Reject));
        assert!(matches!(
            ExchangeDecision::parse("completed"),
            Err(WorkflowError::InvalidDecision(_))
        ));
        assert!(matches!(
            ExchangeDecision::parse("pending"),
            Err(WorkflowError::InvalidDecision(_))
        ));
    }

    #[test]
    fn full_trade_negotiation_at_the_rules_level() {
        // Seller lists an exchange-only book at price 0; a requester who
        // owns another book proposes a trade, and the seller accepts.
        let seller = Uuid::new_v4();
        let requester = Uuid::new_v4();
        let listed = book(seller, 0.0, true);
        let offered = book(requester, 14.0, false);

        assert!(validate_listing(listed.price, listed.is_exchange_only).is_ok());
        assert!(validate_exchange_proposal(&listed, &offered, requester).is_ok());

        let status = ExchangeStatus::Pending;
        let status = status.respond(ExchangeDecision::Accept).unwrap();
        assert_eq!(status, ExchangeStatus::Accepted);

        // A second response, from either side of the race, is refused.
        assert_eq!(
            status.respond(ExchangeDecision::Reject),
            Err(WorkflowError::AlreadyResolved(ExchangeStatus::Accepted))
        );
    }

    #[test]
    fn deletion_archives_only_transacted_books() {
        assert_eq!(plan_deletion(0), DeletionOutcome::HardDelete);
        assert_eq!(plan_deletion(1), DeletionOutcome::Archive);
        assert_eq!(plan_deletion(42), DeletionOutcome::Archive);
    }
}
