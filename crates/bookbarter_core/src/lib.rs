pub mod domain;
pub mod ports;
pub mod workflow;

pub use domain::{
    Book, BookStatus, ExchangeRequest, ExchangeStatus, Message, PaymentMethod, Role, Transaction,
    TransactionStatus, User, UserCredentials,
};
pub use ports::{FileStore, MarketplaceStore, PortError, PortResult};
pub use workflow::{DeletionOutcome, ExchangeDecision, WorkflowError};
