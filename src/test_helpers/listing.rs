use crate::models::{Entity, attr};

/// A builder for creating listing-like `Entity` instances for testing.
#[derive(Debug, Clone)]
pub struct ListingBuilder {
    entity: Entity,
}

impl ListingBuilder {
    /// Creates a listing with a title derived from its id, no bids and a
    /// price of 1.50.
    pub fn new(id: u64) -> Self {
        let entity = Entity::new(id)
            .with(attr::TITLE, format!("Item {id}"))
            .with(attr::BIDS, 0i64)
            .with(attr::PRICE, 1.5)
            .with(attr::TIME_LEFT, "3d 2h")
            .with(attr::BUY_IT_NOW, false)
            .with(attr::ENDS_WITHIN_24H, false)
            .with(attr::ENDS_WITHIN_1H, false);
        Self { entity }
    }

    /// Sets the title.
    pub fn title(mut self, title: &str) -> Self {
        self.entity = self.entity.with(attr::TITLE, title);
        self
    }

    /// Sets the bid count.
    pub fn bids(mut self, bids: i64) -> Self {
        self.entity = self.entity.with(attr::BIDS, bids);
        self
    }

    /// Sets the price.
    pub fn price(mut self, price: f64) -> Self {
        self.entity = self.entity.with(attr::PRICE, price);
        self
    }

    /// Marks the listing as ending within 24 hours.
    pub fn ending_today(mut self) -> Self {
        self.entity = self
            .entity
            .with(attr::ENDS_WITHIN_24H, true)
            .with(attr::TIME_LEFT, "5h 3m");
        self
    }

    /// Marks the listing as ending within the hour, which implies today.
    pub fn ending_this_hour(mut self) -> Self {
        self.entity = self
            .entity
            .with(attr::ENDS_WITHIN_24H, true)
            .with(attr::ENDS_WITHIN_1H, true)
            .with(attr::TIME_LEFT, "12m");
        self
    }

    /// Builds the `Entity`.
    pub fn build(self) -> Entity {
        self.entity
    }
}
