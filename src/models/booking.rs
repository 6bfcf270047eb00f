use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Lifecycle of a booking. The only legal transition is Booked -> Cancelled;
/// a cancelled booking is never reactivated, the seat is re-taken by a fresh row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Booked,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Booked => "booked",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "booked" => Some(BookingStatus::Booked),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// One claim on one seat of one show. Rows are never deleted; cancellation
/// flips `status` and leaves the row behind as history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub show_id: i64,
    pub user_id: i64,
    pub seat_number: i32,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
}
