//! Database models

pub mod booking;
pub mod room;
pub mod user;

pub use booking::{Booking, BookingStatus};
pub use room::{Amenity, Photo, Room, RoomType};
pub use user::{Role, User};
