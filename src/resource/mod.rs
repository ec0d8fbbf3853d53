//! Resource model: unique holders and countable tool stock

mod store;
mod wear;

pub use store::ResourceStore;
pub use wear::{wear_after_use, WearModel};

/// Availability of a unique asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Borrowed,
    Maintenance,
    Retired,
}

/// Physical address of a resource inside a cabinet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub locker: String,
    pub cell: u32,
}

impl Slot {
    pub fn new(locker: impl Into<String>, cell: u32) -> Self {
        Self {
            locker: locker.into(),
            cell,
        }
    }
}

/// A non-consumable, individually tracked item (tool holder)
#[derive(Debug, Clone, PartialEq)]
pub struct Holder {
    /// Internal code, identity of the resource
    pub code: String,
    /// RFID tag the cabinet verifies on borrow/return
    pub rfid: String,
    pub name: String,
    pub availability: Availability,
    /// Percent of useful life consumed, 0..=100
    pub wear: u8,
    pub slot: Slot,
}

impl Holder {
    pub fn new(
        code: impl Into<String>,
        rfid: impl Into<String>,
        name: impl Into<String>,
        slot: Slot,
    ) -> Self {
        Self {
            code: code.into(),
            rfid: rfid.into(),
            name: name.into(),
            availability: Availability::Available,
            wear: 0,
            slot,
        }
    }
}

/// A consumable item tracked only by quantity on hand
#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    /// Item code, identity of the resource
    pub code: String,
    pub name: String,
    pub quantity: u32,
    /// Informational only; crossing it is logged, never enforced
    pub low_stock_threshold: u32,
    pub slot: Slot,
}

impl Tool {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        quantity: u32,
        low_stock_threshold: u32,
        slot: Slot,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            quantity,
            low_stock_threshold,
            slot,
        }
    }

    /// True when stock has dropped to or below the reorder threshold
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }
}

/// A resource under coordinator ownership
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Holder(Holder),
    Tool(Tool),
}

impl Resource {
    /// Identity code of the resource
    pub fn code(&self) -> &str {
        match self {
            Resource::Holder(h) => &h.code,
            Resource::Tool(t) => &t.code,
        }
    }

    /// Cabinet address of the resource
    pub fn slot(&self) -> &Slot {
        match self {
            Resource::Holder(h) => &h.slot,
            Resource::Tool(t) => &t.slot,
        }
    }
}
