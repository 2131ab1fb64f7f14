pub mod health;
pub mod unzip;
