pub mod conversations;
pub mod images;
pub mod uploads;
