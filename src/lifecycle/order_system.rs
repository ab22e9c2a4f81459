use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::config::{Config, ConfigError};
use crate::model::{MenuBook, MenuError, OrderKind};
use crate::order_actor::StoreError;
use crate::store::{open_store, OrderStore};
use crate::views::{OrderForm, QueueView};

#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Menu(#[from] MenuError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The application root: owns the order store and the menus, and hands out views.
///
/// `OrderSystem` is responsible for:
/// - **Lifecycle Management**: Opening the configured store and shutting it down
/// - **Dependency Wiring**: Giving every view the same store
///
/// # Example
///
/// ```ignore
/// let system = OrderSystem::start(&Config::load()?).await?;
///
/// let mut form = system.order_form(OrderKind::Drink, "Sam");
/// form.toggle("Moscow Mule")?;
/// let id = form.submit().await?;
///
/// let queue = system.queue_view().await?;
/// queue.complete(id.as_str()).await?;
///
/// // Releases the actor, listeners and pollers
/// system.shutdown().await?;
/// ```
pub struct OrderSystem {
    store: Arc<dyn OrderStore>,
    menus: MenuBook,
}

impl OrderSystem {
    /// Loads the menus and opens the store selected by `config`.
    pub async fn start(config: &Config) -> Result<Self, SystemError> {
        let menus = MenuBook::load(&config.menu_path)?;
        info!(
            drinks = menus.drinks.items().len(),
            food = menus.food.items().len(),
            "Menus loaded"
        );
        let store = open_store(config).await?;
        Ok(Self::with_store(store, menus))
    }

    /// Wraps a store opened elsewhere.
    pub fn with_store(store: Arc<dyn OrderStore>, menus: MenuBook) -> Self {
        Self { store, menus }
    }

    pub fn store(&self) -> Arc<dyn OrderStore> {
        self.store.clone()
    }

    pub fn menus(&self) -> &MenuBook {
        &self.menus
    }

    /// A fresh form for `guest` over the menu of `kind`.
    pub fn order_form(&self, kind: OrderKind, guest: &str) -> OrderForm {
        OrderForm::new(self.store.clone(), kind, self.menus.for_kind(kind).clone(), guest)
    }

    pub async fn queue_view(&self) -> Result<QueueView, StoreError> {
        QueueView::open(self.store.clone()).await
    }

    /// Shuts the store down. Views still holding it see it as closed.
    pub async fn shutdown(self) -> Result<(), StoreError> {
        info!(backend = %self.store.backend(), "Shutting down system...");
        if let Err(e) = self.store.shutdown().await {
            error!(error = %e, "Store shutdown failed");
            return Err(e);
        }
        info!("System shutdown complete.");
        Ok(())
    }
}
