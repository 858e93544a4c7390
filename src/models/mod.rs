pub mod package;
pub mod subscription;
pub mod transaction;
pub mod webhook_delivery;

pub use package::{CreatePackage, Package, PricingTable, PricingTier};
pub use subscription::{CreateSubscription, Subscription, SubscriptionStatus, UserPackage};
pub use transaction::{
    BillingPeriod, CreateTransaction, Transaction, TransactionMetadata, TransactionStatus,
};
pub use webhook_delivery::{DeliveryOutcome, WebhookDelivery};
