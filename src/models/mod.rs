pub mod user;
pub mod movie;
pub mod show;
pub mod booking;

pub use user::{NewUser, User};
pub use movie::Movie;
pub use show::Show;
pub use booking::{Booking, BookingStatus};
