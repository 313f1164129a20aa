//! Core contract entity, commodity terms and lifecycle states
use crate::error::ValidationError;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

/// Which side of the market opened the contract
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    #[n(0)]
    OfferToSell,
    #[n(1)]
    DemandToBuy,
}

/// Lifecycle states. Transitions only ever move forward, `Created` is the
/// sole non-terminal state.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractStatus {
    #[n(0)]
    Created,
    #[n(1)]
    Accepted,
    #[n(2)]
    Cancelled,
    #[n(3)]
    Expired,
}

/// Publication state of the canonical document in the content-addressed store
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Published,
    #[n(2)]
    Failed,
}

/// Recognised delivery window descriptors, parsed from strings such as
/// "30 Days", "6 Weeks" or "3 Months". Anything else is rejected at
/// validation instead of being carried around as free text.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryWindow {
    #[n(0)]
    Days(#[n(0)] u32),
    #[n(1)]
    Weeks(#[n(0)] u32),
    #[n(2)]
    Months(#[n(0)] u32),
}

impl FromStr for DeliveryWindow {
    type Err = ValidationError;

    fn from_str(descriptor: &str) -> Result<Self, Self::Err> {
        let unrecognised = || ValidationError::UnrecognisedDeliveryWindow(descriptor.to_string());

        let mut parts = descriptor.split_whitespace();
        let (Some(count), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(unrecognised());
        };
        let count: u32 = count.parse().map_err(|_| unrecognised())?;
        if count == 0 {
            return Err(unrecognised());
        }

        match unit.to_ascii_lowercase().as_str() {
            "day" | "days" => Ok(Self::Days(count)),
            "week" | "weeks" => Ok(Self::Weeks(count)),
            "month" | "months" => Ok(Self::Months(count)),
            _ => Err(unrecognised()),
        }
    }
}

impl fmt::Display for DeliveryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Days(n) => write!(f, "{n} Days"),
            Self::Weeks(n) => write!(f, "{n} Weeks"),
            Self::Months(n) => write!(f, "{n} Months"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Draft commodity terms, built up field by field and validated on `build`.
// Amounts are integers: quantity in whole `unit`s, strike price in minor
// currency units per `unit`. No floats anywhere near the hashed content.
#[derive(Debug, Default, Clone)]
pub struct TermsDraft {
    crop: Option<String>,
    quantity: u64,
    unit: Option<String>,
    strike_price: u64,
    delivery_window: Option<DeliveryWindow>,
}

impl TermsDraft {
    /// Construct a new builder object, this becomes the basis for a draft
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_crop(mut self, crop: &str) -> Self {
        self.crop = Some(crop.trim().to_string());
        self
    }
    pub fn set_quantity(mut self, quantity: u64) -> Self {
        self.quantity = quantity;
        self
    }
    pub fn set_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.trim().to_string());
        self
    }
    pub fn set_strike_price(mut self, strike_price: u64) -> Self {
        self.strike_price = strike_price;
        self
    }
    pub fn set_delivery_window(mut self, window: DeliveryWindow) -> Self {
        self.delivery_window = Some(window);
        self
    }
    /// Accepts the textual descriptor form, e.g. "30 Days"
    pub fn parse_delivery_window(mut self, descriptor: &str) -> Result<Self, ValidationError> {
        self.delivery_window = Some(descriptor.parse()?);
        Ok(self)
    }

    // Checks every field, then returns the finalised immutable terms
    pub fn build(self) -> Result<Terms, ValidationError> {
        let crop = self
            .crop
            .filter(|c| !c.is_empty())
            .ok_or(ValidationError::EmptyCrop)?;
        let unit = self
            .unit
            .filter(|u| !u.is_empty())
            .ok_or(ValidationError::EmptyUnit)?;
        if self.quantity == 0 {
            return Err(ValidationError::ZeroQuantity);
        }
        if self.strike_price == 0 {
            return Err(ValidationError::ZeroStrikePrice);
        }
        let delivery_window = self
            .delivery_window
            .ok_or(ValidationError::MissingDeliveryWindow)?;

        Ok(Terms {
            crop,
            quantity: self.quantity,
            unit,
            strike_price: self.strike_price,
            delivery_window,
        })
    }
}

/// Validated commodity terms. Immutable once the contract leaves `Created`,
/// these fields are what the document hash is computed over.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Terms {
    #[n(0)]
    pub crop: String,
    #[n(1)]
    pub quantity: u64,
    #[n(2)]
    pub unit: String,
    #[n(3)]
    pub strike_price: u64,
    #[n(4)]
    pub delivery_window: DeliveryWindow,
}

/// Hash-derived verification record plus artifact publication state.
/// Written only by the anchoring service and the artifact pipeline.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    #[n(0)]
    pub document_hash: String, // hex encoded sha-256
    #[n(1)]
    pub pseudo_tx_id: String,
    #[n(2)]
    pub explorer_url: String,
    #[n(3)]
    pub artifact_ref: Option<String>, // content-addressed locator
    #[n(4)]
    pub artifact_status: ArtifactStatus,
}

/// The central entity. One row per contract in the store, keyed by `id`.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    #[n(0)]
    pub id: String, // uuid7, bech32 encoded
    #[n(1)]
    pub kind: ContractKind,
    #[n(2)]
    pub terms: Terms,
    #[n(3)]
    pub status: ContractStatus,
    #[n(4)]
    pub offering_party: String, // the creator, known from day one
    #[n(5)]
    pub accepting_party: Option<String>, // set exactly once, with Created -> Accepted
    #[n(6)]
    pub created_at: TimeStamp<Utc>,
    #[n(7)]
    pub accepted_at: Option<TimeStamp<Utc>>,
    #[n(8)]
    pub verification: Option<Verification>,
}

impl Contract {
    /// A fresh proposal in the `Created` state
    pub fn new(id: String, kind: ContractKind, terms: Terms, offering_party: String) -> Self {
        Self {
            id,
            kind,
            terms,
            status: ContractStatus::Created,
            offering_party,
            accepting_party: None,
            created_at: TimeStamp::new(),
            accepted_at: None,
            verification: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::new();

        let encoding = minicbor::to_vec(original.clone()).unwrap();
        let decode: TimeStamp<Utc> = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn delivery_window_parses_descriptor_forms() {
        assert_eq!("30 Days".parse::<DeliveryWindow>(), Ok(DeliveryWindow::Days(30)));
        assert_eq!("1 day".parse::<DeliveryWindow>(), Ok(DeliveryWindow::Days(1)));
        assert_eq!("6 WEEKS".parse::<DeliveryWindow>(), Ok(DeliveryWindow::Weeks(6)));
        assert_eq!("3 Months".parse::<DeliveryWindow>(), Ok(DeliveryWindow::Months(3)));
    }

    #[test]
    fn delivery_window_rejects_free_text() {
        for bad in ["", "Days", "30", "0 Days", "thirty Days", "30 Fortnights", "30 Days extra"] {
            assert!(bad.parse::<DeliveryWindow>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn delivery_window_display_roundtrip() {
        for window in [
            DeliveryWindow::Days(30),
            DeliveryWindow::Weeks(6),
            DeliveryWindow::Months(3),
        ] {
            assert_eq!(window.to_string().parse::<DeliveryWindow>(), Ok(window));
        }
    }
}
