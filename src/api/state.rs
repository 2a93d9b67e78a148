use std::sync::Arc;

use crate::{
    config::Settings,
    payments::{MoneyCommands, RecordCashCharge},
    service::ServiceContext,
};

#[derive(Clone)]
pub struct AppState {
    pub service_context: Arc<ServiceContext>,
    /// Present only when Stripe is configured; payment endpoints refuse
    /// politely without it.
    pub money: Option<Arc<MoneyCommands>>,
    pub cash: Arc<RecordCashCharge>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        service_context: Arc<ServiceContext>,
        money: Option<Arc<MoneyCommands>>,
        cash: Arc<RecordCashCharge>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            service_context,
            money,
            cash,
            settings,
        }
    }
}
