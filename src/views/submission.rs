use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::model::{Menu, MenuItem, OrderDraft, OrderId, OrderKind, ValidationError};
use crate::order_actor::StoreError;
use crate::store::OrderStore;

/// State of one guest's order form: the menu being ordered from, the picked items and notes.
pub struct OrderForm {
    store: Arc<dyn OrderStore>,
    kind: OrderKind,
    menu: Menu,
    guest: String,
    selected: Vec<MenuItem>,
    notes: String,
}

impl OrderForm {
    pub fn new(store: Arc<dyn OrderStore>, kind: OrderKind, menu: Menu, guest: impl Into<String>) -> Self {
        Self {
            store,
            kind,
            menu,
            guest: guest.into(),
            selected: Vec::new(),
            notes: String::new(),
        }
    }

    pub fn kind(&self) -> OrderKind {
        self.kind
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn guest(&self) -> &str {
        &self.guest
    }

    /// Selects the named item, or deselects it when it already is. Returns whether it is
    /// selected afterwards.
    pub fn toggle(&mut self, name: &str) -> Result<bool, ValidationError> {
        if let Some(index) = self.selected.iter().position(|item| item.name == name) {
            self.selected.remove(index);
            return Ok(false);
        }
        let item = self
            .menu
            .find(name)
            .ok_or_else(|| ValidationError::UnknownItem(name.to_string()))?;
        self.selected.push(item.clone());
        Ok(true)
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected.iter().any(|item| item.name == name)
    }

    /// Picked items in the order they were picked.
    pub fn selected(&self) -> &[MenuItem] {
        &self.selected
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// "2 drinks selected", "1 dish selected"; `None` when nothing is picked.
    pub fn selection_summary(&self) -> Option<String> {
        let count = self.selected.len();
        let noun = match (self.kind, count) {
            (_, 0) => return None,
            (OrderKind::Drink, 1) => "drink",
            (OrderKind::Drink, _) => "drinks",
            (OrderKind::Food, 1) => "dish",
            (OrderKind::Food, _) => "dishes",
        };
        Some(format!("{count} {noun} selected"))
    }

    /// Sends the order to the store.
    ///
    /// An empty selection fails without touching the store. The form is cleared before the
    /// store answers; if the store fails, the selection and notes are put back.
    #[instrument(skip(self), fields(kind = %self.kind, guest = %self.guest))]
    pub async fn submit(&mut self) -> Result<OrderId, StoreError> {
        let draft = OrderDraft::new(&self.guest, self.selected.clone(), &self.notes, self.kind)?;

        let selected = std::mem::take(&mut self.selected);
        let notes = std::mem::take(&mut self.notes);
        match self.store.add(draft).await {
            Ok(id) => {
                info!(%id, items = selected.len(), "Order submitted");
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, "Order submission failed, restoring form");
                self.selected = selected;
                self.notes = notes;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FALLBACK_CUSTOMER;
    use crate::store::VolatileStore;

    fn drinks() -> Menu {
        Menu::new(vec![
            MenuItem::new("Moscow Mule", "🥃", "Classic"),
            MenuItem::new("Tokyo Tea", "🍵", "Signature"),
        ])
    }

    #[tokio::test]
    async fn test_submit_clears_form_and_defaults_customer() {
        let store: Arc<dyn OrderStore> = Arc::new(VolatileStore::start(8));
        let mut form = OrderForm::new(store.clone(), OrderKind::Drink, drinks(), "  ");

        assert_eq!(form.selection_summary(), None);
        assert_eq!(form.toggle("Tokyo Tea"), Ok(true));
        assert_eq!(form.toggle("Moscow Mule"), Ok(true));
        assert_eq!(form.selection_summary().as_deref(), Some("2 drinks selected"));
        form.set_notes("one without ice");

        let id = form.submit().await.unwrap();
        assert!(form.selected().is_empty());
        assert!(form.notes().is_empty());

        let subscription = store.subscribe().await.unwrap();
        let order = &subscription.current()[0];
        assert_eq!(order.id, id);
        assert_eq!(order.customer, FALLBACK_CUSTOMER);
        assert_eq!(order.items[0].name, "Tokyo Tea");
        assert_eq!(order.notes.as_deref(), Some("one without ice"));
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_toggle_and_empty_submit() {
        let store: Arc<dyn OrderStore> = Arc::new(VolatileStore::start(8));
        let mut form = OrderForm::new(store.clone(), OrderKind::Food, drinks(), "Sam");

        assert_eq!(
            form.toggle("Espresso Martini"),
            Err(ValidationError::UnknownItem("Espresso Martini".to_string()))
        );
        assert_eq!(form.toggle("Moscow Mule"), Ok(true));
        assert_eq!(form.selection_summary().as_deref(), Some("1 dish selected"));
        assert_eq!(form.toggle("Moscow Mule"), Ok(false));
        assert!(!form.is_selected("Moscow Mule"));

        let result = form.submit().await;
        assert_eq!(
            result,
            Err(StoreError::Validation(ValidationError::EmptySelection))
        );
        assert!(store.subscribe().await.unwrap().current().is_empty());
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_submit_restores_selection() {
        let store: Arc<dyn OrderStore> = Arc::new(VolatileStore::start(8));
        let mut form = OrderForm::new(store.clone(), OrderKind::Drink, drinks(), "Sam");
        form.toggle("Moscow Mule").unwrap();
        form.set_notes("extra lime");

        store.shutdown().await.unwrap();
        assert_eq!(form.submit().await, Err(StoreError::Closed));
        assert_eq!(form.selected().len(), 1);
        assert_eq!(form.notes(), "extra lime");
    }
}
